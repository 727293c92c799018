use std::fmt;

use serde::Serialize;
use tracing::warn;

/// A non-fatal problem found while rewriting. Each kind has a fixed fallback
/// applied by the code that reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    /// A second definition claimed a topic; the first one stays registered.
    DuplicateTopic { topic: String },
    /// A code reference names a topic with no definition; the node is left as-is.
    UnresolvedReference { element: String, topic: String },
    /// A link could not be given disambiguating text.
    MissingLinkText { topic: String, reason: String },
    /// A private text was needed but the definition has no identifier.
    MissingIdentifier { topic: String },
    /// An unrecognized private attribute was passed through.
    DisallowedAttribute { element: String, attribute: String },
    /// An attribute was dropped while rewriting a container.
    DiscardedAttribute { element: String, attribute: String },
    UnknownLanguageTag { tag: String },
    /// A preformatted block had content besides its code element.
    UnexpectedBlockContent { tag: String },
    /// A local text contained the pipe delimiter and was ignored.
    MalformedLocalText { topic: String, text: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTopic { topic } => write!(f, "duplicate definition topic: {topic}"),
            Self::UnresolvedReference { element, topic } => {
                write!(f, "unresolved <{element}> reference: {topic}")
            }
            Self::MissingLinkText { topic, reason } => {
                write!(f, "no link text for {topic}: {reason}")
            }
            Self::MissingIdentifier { topic } => {
                write!(f, "definition without identifier needs a private text: {topic}")
            }
            Self::DisallowedAttribute { element, attribute } => {
                write!(f, "unhandled <{element}> attribute: {attribute}")
            }
            Self::DiscardedAttribute { element, attribute } => {
                write!(f, "discarding <{element}> attribute: {attribute}")
            }
            Self::UnknownLanguageTag { tag } => write!(f, "unknown code block language: {tag}"),
            Self::UnexpectedBlockContent { tag } => {
                write!(f, "code block with extra content skipped: {tag}")
            }
            Self::MalformedLocalText { topic, text } => {
                write!(f, "local link text may not contain '|' ({topic}): {text}")
            }
        }
    }
}

/// Collects diagnostics for the run and logs each one as it arrives.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!(kind = diagnostic.kind(), "{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateTopic { .. } => "duplicate-topic",
            Self::UnresolvedReference { .. } => "unresolved-reference",
            Self::MissingLinkText { .. } => "missing-link-text",
            Self::MissingIdentifier { .. } => "missing-identifier",
            Self::DisallowedAttribute { .. } => "disallowed-attribute",
            Self::DiscardedAttribute { .. } => "discarded-attribute",
            Self::UnknownLanguageTag { .. } => "unknown-language-tag",
            Self::UnexpectedBlockContent { .. } => "unexpected-block-content",
            Self::MalformedLocalText { .. } => "malformed-local-text",
        }
    }
}
