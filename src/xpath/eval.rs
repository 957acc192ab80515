//! XPath Evaluation Engine
//!
//! Evaluates compiled paths against a [`Navigator`], one step at a time over
//! the whole context set. After every step the set is in document order
//! without duplicates.

use super::compiler::{AttributeTest, Axis, CompiledPath, Function, NameTest, Predicate, Step};
use super::value::{EvalResult, Match, Mode};
use crate::core::entities::decode_text;
use crate::nav::{Navigator, Position};
use std::collections::HashMap;

/// Evaluate a compiled path
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate(path: &CompiledPath, nav: &mut Navigator<'_>, mode: Mode) -> EvalResult {
    let matches = select(path, nav);
    log::trace!("path selected {} locations", matches.len());

    match path.function {
        Some(Function::Count) => EvalResult::Number(matches.len()),
        Some(Function::Boolean) => EvalResult::Boolean(!matches.is_empty()),
        None => match mode {
            Mode::List => EvalResult::List(matches),
            Mode::Single => matches
                .first()
                .copied()
                .map(EvalResult::Single)
                .unwrap_or(EvalResult::Missing),
        },
    }
}

/// All locations selected by the path, in document order
pub fn select(path: &CompiledPath, nav: &mut Navigator<'_>) -> Vec<Match> {
    let mut context = if path.absolute {
        vec![Position::Document]
    } else {
        nav.index().root.map(Position::Element).into_iter().collect()
    };

    for step in &path.steps {
        let mut next = Vec::new();
        for &ctx in &context {
            let candidates = expand(nav, ctx, step, path.namespace_aware);
            next.extend(apply_predicates(nav, candidates, &step.predicates));
        }
        next.sort_unstable();
        next.dedup();
        context = next.into_iter().map(Position::Element).collect();

        if context.is_empty() {
            return Vec::new();
        }
    }

    match &path.attribute {
        Some(test) => {
            // `@x` and `/@x` address the root element
            if path.steps.is_empty() {
                context = nav.index().root.map(Position::Element).into_iter().collect();
            }
            select_attributes(nav, &context, test)
        }
        None => context
            .into_iter()
            .filter_map(|p| match p {
                Position::Element(idx) => Some(Match::Element(idx)),
                Position::Document => None,
            })
            .collect(),
    }
}

/// Elements reached from one context node along the step's axis that pass
/// its name test, in document order
fn expand(nav: &mut Navigator<'_>, ctx: Position, step: &Step, namespace_aware: bool) -> Vec<u32> {
    let index = nav.index();
    let candidates: Vec<u32> = match (step.axis, &step.test) {
        (Axis::Child, _) => {
            nav.to_document();
            if let Position::Element(idx) = ctx {
                nav.move_to(idx);
            }
            let mut out = Vec::new();
            if nav.first_child() {
                loop {
                    out.extend(nav.current());
                    if !nav.next_sibling() {
                        break;
                    }
                }
            }
            out
        }
        (Axis::Descendant, NameTest::Name { local, .. }) => {
            nav.to_document();
            if let Position::Element(idx) = ctx {
                nav.move_to(idx);
            }
            nav.descendants_named(local).collect()
        }
        (Axis::Descendant, NameTest::Wildcard) => match ctx {
            Position::Document => (0..index.element_count() as u32).collect(),
            Position::Element(idx) => index.descendants(idx).collect(),
        },
    };

    let nav: &Navigator<'_> = nav;
    candidates
        .into_iter()
        .filter(|&idx| name_matches(nav, idx, &step.test, namespace_aware))
        .collect()
}

fn name_matches(nav: &Navigator<'_>, idx: u32, test: &NameTest, namespace_aware: bool) -> bool {
    let NameTest::Name { qname, local, uri } = test else {
        return true;
    };
    let index = nav.index();
    let input = nav.input();

    if !namespace_aware {
        return index.element_name(idx, input) == Some(qname.as_str());
    }
    // Unprefixed steps (no URI) only match elements in no namespace
    index.element_local_name(idx, input) == Some(local.as_str())
        && nav.namespace_uri(idx) == uri.as_deref()
}

/// Filter candidates through each predicate in turn
///
/// Positions count among candidates sharing a parent.
fn apply_predicates(nav: &Navigator<'_>, mut candidates: Vec<u32>, predicates: &[Predicate]) -> Vec<u32> {
    let index = nav.index();
    let input = nav.input();

    for predicate in predicates {
        candidates = match predicate {
            Predicate::Position(n) => {
                let mut seen: HashMap<u32, usize> = HashMap::new();
                candidates
                    .into_iter()
                    .filter(|&idx| {
                        let parent = index.get_element(idx).map(|e| e.parent).unwrap_or(u32::MAX);
                        let count = seen.entry(parent).or_insert(0);
                        *count += 1;
                        *count == *n
                    })
                    .collect()
            }
            Predicate::AttributeExists(name) => candidates
                .into_iter()
                .filter(|&idx| index.get_attribute(idx, name, input).is_some())
                .collect(),
            // Compared against the decoded attribute value
            Predicate::AttributeEquals(name, literal) => candidates
                .into_iter()
                .filter(|&idx| {
                    index
                        .get_attribute(idx, name, input)
                        .is_some_and(|value| decode_text(value) == literal.as_str())
                })
                .collect(),
        };
    }
    candidates
}

fn select_attributes(nav: &Navigator<'_>, context: &[Position], test: &AttributeTest) -> Vec<Match> {
    let index = nav.index();
    let input = nav.input();
    let mut out = Vec::new();

    for &pos in context {
        let Position::Element(element) = pos else {
            continue;
        };
        let Some(elem) = index.get_element(element) else {
            continue;
        };
        for (name_tok, value_tok) in elem.attribute_tokens() {
            let Some(name) = index.token(name_tok).map(|t| t.span.slice(input)) else {
                continue;
            };
            let selected = match test {
                AttributeTest::Any => name != b"xmlns" && !name.starts_with(b"xmlns:"),
                AttributeTest::Named(n) => name == n.as_bytes(),
            };
            if selected {
                out.push(Match::Attribute {
                    element,
                    value: value_tok,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::xpath::compiler::{compile, Namespaces};

    const XML: &[u8] = br#"<XXX number="3">
  <UsersCodes>
    <Element>1</Element>
    <Element Id="1123E01">2</Element>
    <Element/>
    <Element Id="x">3</Element>
  </UsersCodes>
  <zone><Zone><Element>42</Element><Element/><Element/></Zone></zone>
</XXX>"#;

    fn eval(xpath: &str, mode: Mode) -> EvalResult {
        let index = build_index(XML).unwrap();
        let mut nav = Navigator::new(&index, XML);
        let path = compile(xpath, &Namespaces::new()).unwrap();
        evaluate(&path, &mut nav, mode)
    }

    fn names(xpath: &str) -> Vec<String> {
        let index = build_index(XML).unwrap();
        let mut nav = Navigator::new(&index, XML);
        let path = compile(xpath, &Namespaces::new()).unwrap();
        select(&path, &mut nav)
            .into_iter()
            .filter_map(|m| index.element_name(m.element(), XML).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(eval("/XXX/UsersCodes/Element", Mode::List).to_count(), 4);
        assert_eq!(eval("zone/Zone/Element", Mode::List).to_count(), 3);
        assert_eq!(eval("/UsersCodes", Mode::List).to_count(), 0);
    }

    #[test]
    fn test_single_is_first_match() {
        let index = build_index(XML).unwrap();
        let first = index.elements_named(b"Element")[0];
        assert_eq!(
            eval("/XXX/UsersCodes/Element", Mode::Single),
            EvalResult::Single(Match::Element(first))
        );
        assert_eq!(eval("/XXX/nothing", Mode::Single), EvalResult::Missing);
    }

    #[test]
    fn test_descendant() {
        assert_eq!(eval("//Element", Mode::List).to_count(), 7);
        assert_eq!(eval("/XXX//Zone/Element", Mode::List).to_count(), 3);
        assert_eq!(names("//*[1]"), vec!["XXX", "UsersCodes", "Element", "Zone", "Element"]);
    }

    #[test]
    fn test_predicates() {
        assert_eq!(eval("/XXX/UsersCodes/Element[@Id]", Mode::List).to_count(), 2);
        assert_eq!(eval("/XXX/UsersCodes/Element[@Id='x']", Mode::List).to_count(), 1);
        // predicates apply left to right
        assert_eq!(eval("/XXX/UsersCodes/Element[@Id][2]", Mode::List).to_count(), 1);
        assert_eq!(eval("/XXX/UsersCodes/Element[2][@Id='x']", Mode::List).to_count(), 0);
        assert_eq!(eval("/XXX/*/*/Element[3]", Mode::List).to_count(), 1);
    }

    #[test]
    fn test_attribute_equality_decodes_entities() {
        let xml: &[u8] = br#"<r><i name="A &amp; B">1</i><i name="A &#38; B"/><i name="A B"/></r>"#;
        let index = build_index(xml).unwrap();
        let mut nav = Navigator::new(&index, xml);
        let path = compile(r#"/r/i[@name="A & B"]"#, &Namespaces::new()).unwrap();
        assert_eq!(select(&path, &mut nav), vec![Match::Element(1), Match::Element(2)]);

        let path = compile("/r/i[@name='A &amp; B']", &Namespaces::new()).unwrap();
        assert!(select(&path, &mut nav).is_empty());
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("count(//Element)", Mode::Single), EvalResult::Number(7));
        assert_eq!(eval("count(/nothing)", Mode::Single), EvalResult::Number(0));
        assert_eq!(eval("boolean(zone)", Mode::Single), EvalResult::Boolean(true));
        assert_eq!(eval("boolean(/zone)", Mode::Single), EvalResult::Boolean(false));
    }

    #[test]
    fn test_attributes() {
        let index = build_index(XML).unwrap();
        let mut nav = Navigator::new(&index, XML);

        let path = compile("@number", &Namespaces::new()).unwrap();
        let matches = select(&path, &mut nav);
        assert_eq!(matches.len(), 1);
        let Match::Attribute { value, .. } = matches[0] else {
            panic!("expected attribute match");
        };
        assert_eq!(index.token(value).unwrap().span.as_str(XML), Some("3"));

        let path = compile("/XXX/UsersCodes/Element/@Id", &Namespaces::new()).unwrap();
        assert_eq!(select(&path, &mut nav).len(), 2);
        let path = compile("/XXX/UsersCodes/Element[1]/@Id", &Namespaces::new()).unwrap();
        assert!(select(&path, &mut nav).is_empty());
    }

    #[test]
    fn test_namespaces() {
        let xml: &[u8] = br#"<r xmlns:d="document" xmlns:e="other"><d:a>1</d:a><e:a>2</e:a><a>3</a></r>"#;
        let index = build_index(xml).unwrap();

        let mut ns = Namespaces::new();
        ns.insert("doc".to_string(), "document".to_string());
        let mut nav = Navigator::new(&index, xml);
        let path = compile("/r/doc:a", &ns).unwrap();
        let found = select(&path, &mut nav);
        assert_eq!(found, vec![Match::Element(1)]);

        let path = compile("/r/a", &ns).unwrap();
        assert_eq!(select(&path, &mut nav), vec![Match::Element(3)]);

        // Without bindings names compare as written
        let mut nav = Navigator::new(&index, xml);
        let path = compile("/r/e:a", &Namespaces::new()).unwrap();
        assert_eq!(select(&path, &mut nav), vec![Match::Element(2)]);
        let path = compile("/r/a", &Namespaces::new()).unwrap();
        assert_eq!(select(&path, &mut nav), vec![Match::Element(3)]);
    }
}
