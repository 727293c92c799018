use anyhow::{Context, Result};
use markup5ever_rcdom::Handle;
use regex::Regex;
use tracing::debug;

use crate::dom::NodeHandleExt;
use crate::xref::attributes::TOPIC;

/// Longest chain of single-element wrappers followed when deriving a topic.
pub const MAX_WRAPPER_DEPTH: usize = 64;

/// Canonical topic key for a definition or reference node.
///
/// An explicit `data-x` wins, even when empty. Otherwise a node whose only
/// child is an element takes its topic from that child, repeated down the
/// wrapper chain; anything else uses its full text content.
pub fn topic_for(node: &Handle) -> String {
    let mut current = node.clone();
    let mut depth = 0;

    let raw = loop {
        if let Some(value) = current.get_attribute(TOPIC) {
            break value;
        }
        match current.only_element_child() {
            Some(child) if depth < MAX_WRAPPER_DEPTH => {
                current = child;
                depth += 1;
            }
            Some(_) => {
                debug!(depth, "wrapper chain too deep, using text content");
                break current.text_content();
            }
            None => break current.text_content(),
        }
    };

    normalize_topic(&raw)
}

/// Strips `#`, collapses whitespace runs, lowercases and trims.
pub fn normalize_topic(raw: &str) -> String {
    raw.replace('#', "")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// Derives identifier-safe strings from topics.
pub struct IdentifierGenerator {
    separators: Regex,
}

impl IdentifierGenerator {
    pub fn new() -> Result<Self> {
        let separators = Regex::new(r"[\s<>\\\[\]^|{}%]+")
            .context("failed to compile identifier separator regex")?;
        Ok(Self { separators })
    }

    pub fn identifier_for(&self, topic: &str) -> String {
        let stripped: String = topic
            .chars()
            .filter(|ch| !matches!(ch, '"' | '\'' | '“' | '”' | '‘' | '’' | '?' | '`'))
            .collect();

        self.separators
            .replace_all(&stripped, "-")
            .trim_matches(|ch| ch == '-' || ch == ' ')
            .to_string()
    }
}
