//! Tree helpers over the `markup5ever_rcdom` node handles.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, QualName, local_name, ns};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

/// Extensions to the node handle that keep tree surgery readable.
pub trait NodeHandleExt {
    /// Returns a handle to the parent node, if there is one.
    fn parent_node(&self) -> Option<Self>
    where
        Self: Sized;

    /// Gets an attribute in the null namespace, or None if absent or not an element.
    fn get_attribute(&self, name: &str) -> Option<String>;

    fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// Returns true if the attribute exists and has the value mentioned.
    fn attribute_is(&self, name: &str, expected: &str) -> bool {
        self.get_attribute(name).as_deref() == Some(expected)
    }

    /// Sets an attribute on the element, replacing any existing value.
    fn set_attribute(&self, name: &str, value: &str);

    /// Removes an attribute from the element, if present.
    fn remove_attribute(&self, name: &str);

    /// Snapshot of the element's attributes as (name, value) pairs, in source order.
    fn attributes(&self) -> Vec<(String, String)>;

    fn is_element(&self) -> bool;

    /// True for an element in the HTML namespace with the given tag name.
    fn is_html_element(&self, tag_name: &LocalName) -> bool;

    /// True for an element outside the HTML namespace (SVG, MathML).
    fn is_foreign_element(&self) -> bool;

    /// True if the whitespace-separated `class` list contains `class`.
    fn has_class(&self, class: &str) -> bool;

    /// If this is a text node, returns its text.
    fn node_text(&self) -> Option<String>;

    /// Replaces the contents of a text node. Does nothing for other nodes.
    fn set_node_text(&self, text: &str);

    /// Concatenates the text of the node and its descendants.
    fn text_content(&self) -> String;

    fn child_nodes(&self) -> Vec<Self>
    where
        Self: Sized;

    /// The only child, when that child is an element.
    fn only_element_child(&self) -> Option<Self>
    where
        Self: Sized;

    /// Nearest inclusive ancestor matching the predicate.
    fn closest(&self, f: impl Fn(&Self) -> bool) -> Option<Self>
    where
        Self: Sized;

    /// True if any proper descendant matches the predicate.
    fn has_descendant(&self, f: impl Fn(&Self) -> bool) -> bool;

    /// Appends children, which must be detached.
    fn append_children(&self, children: impl Iterator<Item = Self>);

    /// Prepends children, which must be detached, keeping their order.
    fn prepend_children(&self, children: Vec<Self>)
    where
        Self: Sized;

    /// Detaches and returns all children.
    fn take_children(&self) -> Vec<Self>
    where
        Self: Sized;

    /// Removes the node from its parent and puts the replacements at its position.
    /// Does nothing if the node has no parent.
    fn replace_with(&self, replacements: Vec<Self>)
    where
        Self: Sized;

    fn create_element(name: LocalName) -> Self
    where
        Self: Sized;

    fn create_text_node(text: &str) -> Self
    where
        Self: Sized;
}

fn attribute_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name))
}

fn is_named(attribute: &Attribute, name: &str) -> bool {
    attribute.name.ns == ns!() && &*attribute.name.local == name
}

impl NodeHandleExt for Handle {
    fn parent_node(&self) -> Option<Handle> {
        let weak_parent = self.parent.take()?;
        let parent = weak_parent.upgrade();
        self.parent.set(Some(weak_parent));
        parent
    }

    fn get_attribute(&self, name: &str) -> Option<String> {
        let attrs = match self.data {
            NodeData::Element { ref attrs, .. } => attrs.borrow(),
            _ => return None,
        };
        attrs
            .iter()
            .find(|a| is_named(a, name))
            .map(|a| a.value.to_string())
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let NodeData::Element { ref attrs, .. } = self.data else {
            return;
        };
        let mut attrs = attrs.borrow_mut();
        if let Some(attr) = attrs.iter_mut().find(|a| is_named(a, name)) {
            attr.value = value.into();
        } else {
            attrs.push(Attribute {
                name: attribute_name(name),
                value: value.into(),
            });
        }
    }

    fn remove_attribute(&self, name: &str) {
        if let NodeData::Element { ref attrs, .. } = self.data {
            attrs.borrow_mut().retain(|a| !is_named(a, name));
        }
    }

    fn attributes(&self) -> Vec<(String, String)> {
        match self.data {
            NodeData::Element { ref attrs, .. } => attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn is_element(&self) -> bool {
        matches!(&self.data, NodeData::Element { .. })
    }

    fn is_html_element(&self, tag_name: &LocalName) -> bool {
        match &self.data {
            NodeData::Element {
                name: QualName {
                    ns: ns!(html),
                    local,
                    ..
                },
                ..
            } => local == tag_name,
            _ => false,
        }
    }

    fn is_foreign_element(&self) -> bool {
        match &self.data {
            NodeData::Element { name, .. } => name.ns != ns!(html),
            _ => false,
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.get_attribute("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    fn node_text(&self) -> Option<String> {
        match &self.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        }
    }

    fn set_node_text(&self, text: &str) {
        if let NodeData::Text { contents } = &self.data {
            *contents.borrow_mut() = text.into();
        }
    }

    fn text_content(&self) -> String {
        let mut text = String::new();
        scan_dom(self, &mut |n| {
            if let NodeData::Text { contents } = &n.data {
                text.push_str(&contents.borrow());
            }
        });
        text
    }

    fn child_nodes(&self) -> Vec<Handle> {
        self.children.borrow().clone()
    }

    fn only_element_child(&self) -> Option<Handle> {
        let children = self.children.borrow();
        match children.as_slice() {
            [only] if only.is_element() => Some(only.clone()),
            _ => None,
        }
    }

    fn closest(&self, f: impl Fn(&Handle) -> bool) -> Option<Handle> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if f(&node) {
                return Some(node);
            }
            current = node.parent_node();
        }
        None
    }

    fn has_descendant(&self, f: impl Fn(&Handle) -> bool) -> bool {
        fn walk(node: &Handle, f: &dyn Fn(&Handle) -> bool) -> bool {
            node.children.borrow().iter().any(|c| f(c) || walk(c, f))
        }
        walk(self, &f)
    }

    fn append_children(&self, children: impl Iterator<Item = Handle>) {
        self.children.borrow_mut().extend(children.inspect(|c| {
            let old_parent = c.parent.replace(Some(Rc::downgrade(self)));
            debug_assert!(old_parent.is_none());
        }));
    }

    fn prepend_children(&self, children: Vec<Handle>) {
        for child in &children {
            let old_parent = child.parent.replace(Some(Rc::downgrade(self)));
            debug_assert!(old_parent.is_none());
        }
        self.children.borrow_mut().splice(0..0, children);
    }

    fn take_children(&self) -> Vec<Handle> {
        let children = self.children.take();
        for child in &children {
            child.parent.take();
        }
        children
    }

    fn replace_with(&self, replacements: Vec<Handle>) {
        let Some(parent) = self.parent.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        for new_child in replacements.iter() {
            new_child.parent.replace(Some(Rc::downgrade(&parent)));
        }
        let mut children = parent.children.borrow_mut();
        if let Some(i) = children.iter().position(|c| Rc::ptr_eq(c, self)) {
            children.splice(i..=i, replacements);
        }
    }

    fn create_element(name: LocalName) -> Handle {
        Node::new(NodeData::Element {
            name: QualName::new(None, ns!(html), name),
            attrs: RefCell::new(Vec::new()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: false,
        })
    }

    fn create_text_node(text: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(text.into()),
        })
    }
}

/// Recursively visits every node in document order. Template contents are
/// visited after children.
pub fn scan_dom<F: FnMut(&Handle)>(handle: &Handle, f: &mut F) {
    f(handle);

    for child in handle.children.borrow().iter() {
        scan_dom(child, f);
    }

    if let NodeData::Element {
        template_contents: ref tc,
        ..
    } = handle.data
        && let Some(ref tc_handle) = *tc.borrow()
    {
        scan_dom(tc_handle, f);
    }
}

/// Collects the matching nodes in document order. The returned list is a
/// snapshot: later tree mutation does not change it.
pub fn collect_nodes(root: &Handle, f: impl Fn(&Handle) -> bool) -> Vec<Handle> {
    let mut found = Vec::new();
    scan_dom(root, &mut |n| {
        if f(n) {
            found.push(n.clone());
        }
    });
    found
}

/// True if the node is still reachable from `root` through parent links.
pub fn is_attached(node: &Handle, root: &Handle) -> bool {
    node.closest(|n| Rc::ptr_eq(n, root)).is_some()
}

/// Parses a full document. The caller must keep the returned handle alive
/// while using any node inside it: dropping the document empties its subtree.
pub fn parse_document(source: &str) -> Handle {
    let dom = html5ever::parse_document(RcDom::default(), Default::default()).one(source);
    dom.document
}

/// Parses markup as body content and returns the detached top-level nodes.
pub fn parse_body_nodes(source: &str) -> Vec<Handle> {
    let document = parse_document(source);
    body_element(&document)
        .map(|body| body.take_children())
        .unwrap_or_default()
}

/// Finds the `<body>` element of a parsed document.
pub fn body_element(document: &Handle) -> Option<Handle> {
    collect_nodes(document, |n| n.is_html_element(&local_name!("body")))
        .into_iter()
        .next()
}

/// Serializes the children of `node`, without the node itself.
pub fn serialize_children(node: &Handle) -> Result<String> {
    let mut output = Vec::new();
    serialize(
        &mut output,
        &SerializableHandle::from(node.clone()),
        SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        },
    )
    .context("failed to serialize document tree")?;
    String::from_utf8(output).context("serialized document is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The body, with the document that owns it.
    fn body_of(source: &str) -> (Handle, Handle) {
        let document = parse_document(source);
        let body = body_element(&document).expect("parsed document has a body");
        (document, body)
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let (_document, body) = body_of("<p>one <b>two</b> three</p>");
        assert_eq!(body.text_content(), "one two three");
    }

    #[test]
    fn attributes_round_trip_through_set_and_remove() {
        let (_document, body) = body_of(r#"<span data-x="Foo">x</span>"#);
        let span = body.child_nodes()[0].clone();
        assert_eq!(span.get_attribute("data-x").as_deref(), Some("Foo"));

        span.set_attribute("data-x", "bar");
        span.set_attribute("id", "baz");
        assert_eq!(
            span.attributes(),
            vec![
                ("data-x".to_string(), "bar".to_string()),
                ("id".to_string(), "baz".to_string()),
            ]
        );

        span.remove_attribute("data-x");
        assert!(!span.has_attribute("data-x"));
    }

    #[test]
    fn replace_with_keeps_sibling_order() {
        let (_document, body) = body_of("<p>a<span>b</span>c</p>");
        let p = body.child_nodes()[0].clone();
        let span = p.child_nodes()[1].clone();

        let children = span.take_children();
        span.replace_with(children);

        assert_eq!(serialize_children(&p).unwrap(), "abc");
        assert_eq!(p.child_nodes().len(), 3);
        assert!(span.parent_node().is_none());
    }

    #[test]
    fn only_element_child_ignores_text_siblings() {
        let (_document, body) = body_of("<p><i>x</i></p><p> <i>x</i></p>");
        let nodes = body.child_nodes();
        assert!(nodes[0].only_element_child().is_some());
        assert!(nodes[1].only_element_child().is_none());
    }

    #[test]
    fn detached_nodes_are_not_attached() {
        let document = parse_document("<p><span>x</span></p>");
        let span = collect_nodes(&document, |n| n.is_html_element(&local_name!("span")))[0].clone();
        assert!(is_attached(&span, &document));
        span.replace_with(Vec::new());
        assert!(!is_attached(&span, &document));
    }

    #[test]
    fn body_nodes_are_detached_top_level_nodes() {
        let nodes = parse_body_nodes("<pre class=metadata>Group: X</pre><p>y</p>");
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_html_element(&local_name!("pre")));
        assert!(nodes.iter().all(|n| n.parent_node().is_none()));
    }
}
