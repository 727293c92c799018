use html5ever::local_name;
use markup5ever_rcdom::Handle;

use crate::dom::{NodeHandleExt, collect_nodes};
use crate::xref::attributes::{
    DFN_TYPE, LINK_TEXT, LINK_TEXT_INPUT, LOCAL_LINK_TEXT, LOCAL_LINK_TEXT_INPUT,
};
use crate::xref::diagnostics::{Diagnostic, Diagnostics};

pub const LINK_TEXT_DELIMITER: char = '|';

/// Whether link texts keep their case. IDL-style definitions are matched
/// case-sensitively; prose terms are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    Insensitive,
    Sensitive,
}

impl TextCase {
    pub fn for_definition(node: &Handle) -> Self {
        match node.get_attribute(DFN_TYPE).as_deref() {
            None | Some("") | Some("dfn") => Self::Insensitive,
            Some(_) => Self::Sensitive,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTexts {
    pub texts: Vec<String>,
    /// True when the texts came from an explicit override attribute.
    pub overridden: bool,
}

/// Computes the link-text set of a definition, link or heading node.
///
/// An explicit `lt`/`data-lt` is split on `|` (an empty value yields no
/// texts). Otherwise one text is derived from the node's content, when the
/// node kind has derivable text.
pub fn link_texts(node: &Handle, case: TextCase) -> LinkTexts {
    if let Some(value) = override_value(node) {
        let texts = value
            .split(LINK_TEXT_DELIMITER)
            .map(|text| normalize_link_text(text, case))
            .filter(|text| !text.is_empty())
            .collect();
        return LinkTexts {
            texts,
            overridden: true,
        };
    }

    let texts = derived_text(node)
        .map(|text| normalize_link_text(&text, case))
        .filter(|text| !text.is_empty())
        .into_iter()
        .collect();
    LinkTexts {
        texts,
        overridden: false,
    }
}

/// The supplementary local text of a node. It is a single text, so a value
/// containing the delimiter is reported and ignored.
pub fn local_text(
    node: &Handle,
    case: TextCase,
    topic: &str,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let value = node
        .get_attribute(LOCAL_LINK_TEXT)
        .or_else(|| node.get_attribute(LOCAL_LINK_TEXT_INPUT))?;

    if value.contains(LINK_TEXT_DELIMITER) {
        diagnostics.report(Diagnostic::MalformedLocalText {
            topic: topic.to_string(),
            text: value,
        });
        return None;
    }

    Some(normalize_link_text(&value, case)).filter(|text| !text.is_empty())
}

pub fn normalize_link_text(raw: &str, case: TextCase) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .replace('’', "'");
    match case {
        TextCase::Insensitive => collapsed.to_lowercase(),
        TextCase::Sensitive => collapsed,
    }
}

fn override_value(node: &Handle) -> Option<String> {
    node.get_attribute(LINK_TEXT)
        .or_else(|| node.get_attribute(LINK_TEXT_INPUT))
}

fn derived_text(node: &Handle) -> Option<String> {
    if node.is_html_element(&local_name!("dfn")) || node.is_html_element(&local_name!("a")) {
        return Some(node.text_content());
    }
    if is_heading(node) {
        let content = collect_nodes(node, |n| n.is_element() && n.has_class("content"))
            .into_iter()
            .find(|n| !std::rc::Rc::ptr_eq(n, node));
        return Some(content.unwrap_or_else(|| node.clone()).text_content());
    }
    None
}

fn is_heading(node: &Handle) -> bool {
    [
        local_name!("h1"),
        local_name!("h2"),
        local_name!("h3"),
        local_name!("h4"),
        local_name!("h5"),
        local_name!("h6"),
    ]
    .iter()
    .any(|name| node.is_html_element(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{body_element, parse_document};

    /// The first body child, with the document that owns it.
    fn first_child(source: &str) -> (Handle, Handle) {
        let document = parse_document(source);
        let node = body_element(&document).unwrap().child_nodes()[0].clone();
        (document, node)
    }

    #[test]
    fn definitions_derive_one_lowercased_text() {
        let (_document, dfn) = first_child("<dfn>The  Document’s\n Body</dfn>");
        let texts = link_texts(&dfn, TextCase::for_definition(&dfn));
        assert_eq!(texts.texts, vec!["the document's body".to_string()]);
        assert!(!texts.overridden);
    }

    #[test]
    fn idl_definitions_keep_case() {
        let (_document, dfn) = first_child(r#"<dfn data-dfn-type="constructor">new Image()</dfn>"#);
        let texts = link_texts(&dfn, TextCase::for_definition(&dfn));
        assert_eq!(texts.texts, vec!["new Image()".to_string()]);
    }

    #[test]
    fn overrides_split_on_the_delimiter() {
        let (_document, dfn) = first_child(r#"<dfn data-lt="Reset|form reset | ">x</dfn>"#);
        let texts = link_texts(&dfn, TextCase::Insensitive);
        assert_eq!(texts.texts, vec!["reset".to_string(), "form reset".to_string()]);
        assert!(texts.overridden);

        let (_document, empty) = first_child(r#"<dfn lt="">x</dfn>"#);
        let texts = link_texts(&empty, TextCase::Insensitive);
        assert!(texts.texts.is_empty());
        assert!(texts.overridden);
    }

    #[test]
    fn headings_prefer_their_content_element() {
        let (_document, heading) = first_child(r#"<h3><span class="secno">1.2</span> <span class="content">Parsing Rules</span></h3>"#);
        assert_eq!(
            link_texts(&heading, TextCase::Insensitive).texts,
            vec!["parsing rules".to_string()]
        );

        let (_document, plain) = first_child("<h2>Intro</h2>");
        assert_eq!(link_texts(&plain, TextCase::Insensitive).texts, vec!["intro".to_string()]);
    }

    #[test]
    fn other_elements_have_no_derivable_text() {
        let (_document, span) = first_child("<span>text</span>");
        assert!(link_texts(&span, TextCase::Insensitive).texts.is_empty());
    }

    #[test]
    fn local_text_rejects_the_delimiter() {
        let mut diagnostics = Diagnostics::new();
        let (_document, ok) = first_child(r#"<dfn data-local-lt="Shortcut">x</dfn>"#);
        assert_eq!(
            local_text(&ok, TextCase::Insensitive, "x", &mut diagnostics).as_deref(),
            Some("shortcut")
        );

        let (_document, bad) = first_child(r#"<dfn data-local-lt="a|b">x</dfn>"#);
        assert_eq!(local_text(&bad, TextCase::Insensitive, "x", &mut diagnostics), None);
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(diagnostics.entries()[0].kind(), "malformed-local-text");
    }
}
