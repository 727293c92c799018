//! Attribute names read and written by the rewriter, and their classification.

use markup5ever_rcdom::Handle;

use crate::dom::{NodeHandleExt, scan_dom};
use crate::xref::diagnostics::{Diagnostic, Diagnostics};
use crate::xref::element_name;

pub const TOPIC: &str = "data-x";
pub const LINK_TEXT_INPUT: &str = "data-lt";
pub const LINK_TEXT: &str = "lt";
pub const LOCAL_LINK_TEXT_INPUT: &str = "data-local-lt";
pub const LOCAL_LINK_TEXT: &str = "local-lt";
pub const DFN_FOR: &str = "data-dfn-for";
pub const FOR: &str = "for";
pub const DFN_TYPE: &str = "data-dfn-type";
pub const EXPORT: &str = "export";
pub const DATA_EXPORT: &str = "data-export";
pub const NOEXPORT: &str = "noexport";
pub const DATA_NOEXPORT: &str = "data-noexport";
pub const DEV_ONLY: &str = "w-dev";
pub const NO_DEV: &str = "w-nodev";
pub const XMLNS: &str = "xmlns";
pub const ID: &str = "id";
pub const CLASS: &str = "class";

/// Attributes starting with this prefix belong to the source scheme and are
/// checked against the recognized set.
pub const PRIVATE_PREFIX: &str = "data-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    TopicOverride,
    LinkTextOverride,
    LocalLinkText,
    Scope,
    DefinitionType,
    ExportRetention,
    ExportSuppression,
    DeveloperEdition,
    ForeignMarkup,
    Identifier,
    Class,
    /// A private-prefixed attribute outside the recognized set.
    Unrecognized,
    /// Any other attribute; passed through silently.
    Other,
}

impl AttributeKind {
    pub fn classify(name: &str) -> Self {
        match name {
            TOPIC => Self::TopicOverride,
            LINK_TEXT_INPUT | LINK_TEXT => Self::LinkTextOverride,
            LOCAL_LINK_TEXT_INPUT | LOCAL_LINK_TEXT => Self::LocalLinkText,
            DFN_FOR | FOR => Self::Scope,
            DFN_TYPE => Self::DefinitionType,
            EXPORT | DATA_EXPORT => Self::ExportRetention,
            NOEXPORT | DATA_NOEXPORT => Self::ExportSuppression,
            DEV_ONLY | NO_DEV => Self::DeveloperEdition,
            XMLNS => Self::ForeignMarkup,
            ID => Self::Identifier,
            CLASS => Self::Class,
            _ if name.starts_with(PRIVATE_PREFIX) => Self::Unrecognized,
            _ => Self::Other,
        }
    }
}

/// Output name for an attribute carried onto a link or definition: input
/// override names are renamed to their produced counterparts.
pub fn output_name(name: &str) -> &str {
    match name {
        LINK_TEXT_INPUT => LINK_TEXT,
        LOCAL_LINK_TEXT_INPUT => LOCAL_LINK_TEXT,
        _ => name,
    }
}

/// Renames the override inputs on `node` to their produced names.
pub fn rename_override_inputs(node: &Handle) {
    for input in [LINK_TEXT_INPUT, LOCAL_LINK_TEXT_INPUT] {
        if let Some(value) = node.get_attribute(input) {
            node.remove_attribute(input);
            node.set_attribute(output_name(input), &value);
        }
    }
}

/// Removes the topic override from `node` and every descendant.
pub fn strip_topic_overrides(node: &Handle) {
    scan_dom(node, &mut |n| n.remove_attribute(TOPIC));
}

/// Reports every unrecognized private attribute left in the tree. Attributes
/// are left unmodified.
pub fn report_unrecognized(root: &Handle, diagnostics: &mut Diagnostics) -> usize {
    let mut reported = 0;
    scan_dom(root, &mut |node| {
        for (name, _) in node.attributes() {
            if AttributeKind::classify(&name) == AttributeKind::Unrecognized {
                diagnostics.report(Diagnostic::DisallowedAttribute {
                    element: element_name(node),
                    attribute: name,
                });
                reported += 1;
            }
        }
    });
    reported
}
