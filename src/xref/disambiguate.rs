use markup5ever_rcdom::Handle;

use crate::dom::NodeHandleExt;
use crate::xref::attributes::{FOR, LINK_TEXT, LOCAL_LINK_TEXT};
use crate::xref::diagnostics::{Diagnostic, Diagnostics};
use crate::xref::link_text::{TextCase, link_texts};
use crate::xref::registry::{Definition, LinkTextCounts};

/// Prepended to a definition identifier to form its private link text.
pub const PRIVATE_TEXT_PREFIX: &str = "id-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The link carries a scope; its text is resolved within that scope.
    Scoped,
    /// A globally unique link text was assigned.
    Unique(String),
    /// The definition's private text was assigned. `synthesized` is true the
    /// first time the private text is created.
    Private { text: String, synthesized: bool },
    /// No text could be assigned; a diagnostic was reported.
    Unassigned,
}

/// Gives `link` the `lt` that resolves it to `definition` under a
/// first-match-among-equal-texts rule, unless scope resolution applies.
pub fn disambiguate(
    link: &Handle,
    definition: &mut Definition,
    counts: &LinkTextCounts,
    diagnostics: &mut Diagnostics,
) -> Outcome {
    // TODO: copy the scope only when the link text would otherwise be ambiguous.
    if let Some(scope) = &definition.scope {
        link.set_attribute(FOR, scope);
    }
    if link.has_attribute(FOR) {
        return Outcome::Scoped;
    }

    if definition.link_texts.is_empty() {
        diagnostics.report(Diagnostic::MissingLinkText {
            topic: definition.topic.clone(),
            reason: "definition has no link text".to_string(),
        });
        return Outcome::Unassigned;
    }

    if link_texts(link, TextCase::Insensitive).texts.is_empty() {
        diagnostics.report(Diagnostic::MissingLinkText {
            topic: definition.topic.clone(),
            reason: "link has no derivable text".to_string(),
        });
        return Outcome::Unassigned;
    }

    if let Some(unique) = definition
        .link_texts
        .iter()
        .find(|text| counts.count(text) == 1)
    {
        link.set_attribute(LINK_TEXT, unique);
        return Outcome::Unique(unique.clone());
    }

    // A local text only serves as the private text while no other definition shares it.
    let mut synthesized = false;
    let local_is_private = definition
        .local_text
        .as_deref()
        .is_some_and(|text| counts.count(text) <= 1);
    if !local_is_private {
        let Some(id) = &definition.id else {
            diagnostics.report(Diagnostic::MissingIdentifier {
                topic: definition.topic.clone(),
            });
            return Outcome::Unassigned;
        };
        let private = format!("{PRIVATE_TEXT_PREFIX}{id}");
        definition.node.set_attribute(LOCAL_LINK_TEXT, &private);
        definition.local_text = Some(private);
        synthesized = true;
    }

    let Some(private) = definition.local_text.clone() else {
        return Outcome::Unassigned;
    };
    link.set_attribute(LINK_TEXT, &private);
    Outcome::Private {
        text: private,
        synthesized,
    }
}
