//! Property-based tests for parsing and querying.

use proptest::prelude::*;
use xmlview::Document;

/// A generated element tree
#[derive(Debug, Clone)]
enum Node {
    /// Element with non-empty text and no children
    Leaf(String, String),
    Branch(String, Vec<Node>),
}

impl Node {
    fn write(&self, out: &mut String) {
        match self {
            Node::Leaf(name, text) => {
                out.push_str(&format!("<{name}>{}</{name}>", escape(text)));
            }
            Node::Branch(name, children) => {
                out.push_str(&format!("<{name}>"));
                for child in children {
                    child.write(out);
                }
                out.push_str(&format!("</{name}>"));
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c"]).prop_map(str::to_string)
}

fn text() -> impl Strategy<Value = String> {
    "[a-z0-9&<> ]{0,8}[a-z0-9&<>]"
}

fn tree(min_children: usize) -> impl Strategy<Value = Node> {
    let leaf = (name(), text()).prop_map(|(n, t)| Node::Leaf(n, t));
    leaf.prop_recursive(4, 32, 4, move |inner| {
        (name(), prop::collection::vec(inner, min_children..4))
            .prop_map(|(n, c)| Node::Branch(n, c))
    })
}

fn document() -> impl Strategy<Value = String> {
    documents(0)
}

/// Documents whose only childless elements are leaves with text
fn dense_document() -> impl Strategy<Value = String> {
    documents(1)
}

fn documents(min_children: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(tree(min_children), min_children..5).prop_map(|children| {
        let mut xml = String::new();
        Node::Branch("root".to_string(), children).write(&mut xml);
        xml
    })
}

const PATHS: &[&str] = &[
    "/root/a",
    "/root/*/b",
    "//a",
    "//b/c",
    "//*[2]",
    "a/b",
    "/root/c[1]",
    "//a//c",
];

proptest! {
    /// bytes() always equals the construction input
    #[test]
    fn prop_bytes_roundtrip(xml in document()) {
        let doc = Document::parse(xml.clone()).unwrap();
        prop_assert_eq!(doc.bytes(), xml.as_bytes());
    }

    /// exists(p) == (node_count(p) > 0)
    #[test]
    fn prop_exists_matches_count(xml in document()) {
        let doc = Document::parse(xml).unwrap();
        for path in PATHS {
            prop_assert_eq!(doc.exists(path).unwrap(), doc.node_count(path).unwrap() > 0);
        }
    }

    /// With leaf-only matches, every match contributes one list value
    #[test]
    fn prop_leaf_count_matches_list(xml in dense_document()) {
        let doc = Document::parse(xml).unwrap();
        for path in PATHS {
            let count = doc.node_count(path).unwrap();
            let with_children = doc.node_count(&format!("{path}/*")).unwrap();
            if with_children == 0 {
                prop_assert_eq!(doc.element_value_list(path).unwrap().len(), count);
            }
        }
    }

    /// Repeated calls return identical results
    #[test]
    fn prop_idempotent(xml in document()) {
        let doc = Document::parse(xml).unwrap();
        for path in PATHS {
            prop_assert_eq!(doc.element_value(path).unwrap(), doc.element_value(path).unwrap());
            prop_assert_eq!(
                doc.element_value_list(path).unwrap(),
                doc.element_value_list(path).unwrap()
            );
        }
    }

    /// `<t>value</t>` yields the value, trimmed and unescaped
    #[test]
    fn prop_leaf_value(value in text()) {
        let doc = Document::parse(format!("<t>{}</t>", escape(&value))).unwrap();
        prop_assert_eq!(doc.element_value("/t").unwrap(), value.trim());
        prop_assert_eq!(doc.concatenated_string("/t").unwrap(), value.trim());
    }

    /// Arbitrary input never panics: it parses or fails with an offset in range
    #[test]
    fn prop_arbitrary_input(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Err(err) = Document::parse(bytes.clone()) {
            prop_assert!(err.offset <= bytes.len());
        }
    }
}
