use std::collections::{HashMap, HashSet};

use html5ever::local_name;
use markup5ever_rcdom::Handle;
use serde::Serialize;
use tracing::debug;

use crate::dom::{NodeHandleExt, collect_nodes};
use crate::xref::attributes::{
    DFN_FOR, DFN_TYPE, FOR, ID, LINK_TEXT, TOPIC, rename_override_inputs, strip_topic_overrides,
};
use crate::xref::diagnostics::{Diagnostic, Diagnostics};
use crate::xref::link_text::{LINK_TEXT_DELIMITER, TextCase, link_texts, local_text};
use crate::xref::topic::{IdentifierGenerator, topic_for};

/// Definitions of this type drop a leading constructor prefix from their text.
pub const CONSTRUCTOR_TYPE: &str = "constructor";
pub const CONSTRUCTOR_PREFIX: &str = "new ";

pub type DefinitionId = usize;

#[derive(Debug, Clone)]
pub struct Definition {
    pub topic: String,
    pub node: Handle,
    pub id: Option<String>,
    /// Candidate link texts, in construction order.
    pub link_texts: Vec<String>,
    pub scope: Option<String>,
    /// Local text: supplied by the source, or synthesized during disambiguation.
    pub local_text: Option<String>,
}

/// How many unscoped definitions expose each link text.
#[derive(Debug, Clone, Default)]
pub struct LinkTextCounts {
    counts: HashMap<String, usize>,
}

impl LinkTextCounts {
    pub fn count(&self, text: &str) -> usize {
        self.counts.get(text).copied().unwrap_or(0)
    }

    fn increment(&mut self, text: &str) {
        *self.counts.entry(text.to_string()).or_insert(0) += 1;
    }

    /// Texts exposed by more than one definition, sorted by text.
    pub fn ambiguous(&self) -> Vec<AmbiguousLinkText> {
        let mut ambiguous: Vec<AmbiguousLinkText> = self
            .counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(text, count)| AmbiguousLinkText {
                text: text.clone(),
                count: *count,
            })
            .collect();
        ambiguous.sort_by(|a, b| a.text.cmp(&b.text));
        ambiguous
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousLinkText {
    pub text: String,
    pub count: usize,
}

/// Topic to definition map, built once in document order.
#[derive(Debug, Default)]
pub struct Registry {
    definitions: Vec<Definition>,
    topics: HashMap<String, DefinitionId>,
    bare: Vec<Handle>,
    duplicate_count: usize,
    counts: LinkTextCounts,
}

impl Registry {
    /// Scans every `<dfn>` under `root`. Assigns missing identifiers and
    /// rewrites definition attributes into their output form as it goes.
    pub fn build(
        root: &Handle,
        ids: &IdentifierGenerator,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut registry = Self::default();

        for dfn in collect_nodes(root, |n| n.is_html_element(&local_name!("dfn"))) {
            let topic = topic_for(&dfn);

            if topic.is_empty() {
                strip_topic_overrides(&dfn);
                rename_override_inputs(&dfn);
                // An empty override keeps the derived text from matching links.
                dfn.set_attribute(LINK_TEXT, "");
                registry.bare.push(dfn);
                continue;
            }

            if registry.topics.contains_key(&topic) {
                diagnostics.report(Diagnostic::DuplicateTopic { topic });
                registry.duplicate_count += 1;
                continue;
            }

            let definition = register_definition(dfn, topic, ids, diagnostics);
            if definition.scope.is_none() {
                for text in &definition.link_texts {
                    registry.counts.increment(text);
                }
            }

            registry
                .topics
                .insert(definition.topic.clone(), registry.definitions.len());
            registry.definitions.push(definition);
        }

        debug!(
            definitions = registry.definitions.len(),
            bare = registry.bare.len(),
            duplicates = registry.duplicate_count,
            "definition registry built"
        );

        registry
    }

    pub fn resolve(&self, topic: &str) -> Option<DefinitionId> {
        self.topics.get(topic).copied()
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn bare_definitions(&self) -> &[Handle] {
        &self.bare
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicate_count
    }

    pub fn counts(&self) -> &LinkTextCounts {
        &self.counts
    }

    /// Mutable access to one definition alongside the frozen count table.
    pub fn entry_and_counts(&mut self, id: DefinitionId) -> (&mut Definition, &LinkTextCounts) {
        (&mut self.definitions[id], &self.counts)
    }
}

fn register_definition(
    dfn: Handle,
    topic: String,
    ids: &IdentifierGenerator,
    diagnostics: &mut Diagnostics,
) -> Definition {
    let id = match dfn.get_attribute(ID) {
        Some(existing) => existing,
        None => {
            let generated = ids.identifier_for(&topic);
            if !generated.is_empty() {
                dfn.set_attribute(ID, &generated);
            }
            generated
        }
    };
    let id = Some(id).filter(|value| !value.is_empty());

    let scope = dfn
        .get_attribute(DFN_FOR)
        .or_else(|| dfn.get_attribute(FOR))
        .filter(|value| !value.trim().is_empty());

    let case = TextCase::for_definition(&dfn);
    let computed = link_texts(&dfn, case);
    let mut texts = computed.texts.clone();

    if !computed.overridden {
        let is_constructor = dfn.attribute_is(DFN_TYPE, CONSTRUCTOR_TYPE);
        for text in texts.iter_mut() {
            if is_constructor && let Some(rest) = text.strip_prefix(CONSTRUCTOR_PREFIX) {
                *text = rest.to_string();
            }
            if let Some(owner) = scope.as_deref()
                && let Some(rest) = strip_owner_qualifier(text, owner, case)
            {
                *text = rest;
            }
        }
        if texts != computed.texts {
            dfn.set_attribute(LINK_TEXT, &texts.join(&LINK_TEXT_DELIMITER.to_string()));
        }
    }

    let local = local_text(&dfn, case, &topic, diagnostics);
    texts.extend(local.clone());
    let mut seen = HashSet::new();
    texts.retain(|text| seen.insert(text.clone()));

    rename_override_inputs(&dfn);

    // The topic survives in the output only where the content no longer implies it.
    strip_topic_overrides(&dfn);
    if topic_for(&dfn) != topic {
        dfn.set_attribute(TOPIC, &topic);
    }

    Definition {
        topic,
        node: dfn,
        id,
        link_texts: texts,
        scope,
        local_text: local,
    }
}

fn strip_owner_qualifier(text: &str, owner: &str, case: TextCase) -> Option<String> {
    let owner = owner.trim();
    let prefix = match case {
        TextCase::Sensitive => format!("{owner}."),
        TextCase::Insensitive => format!("{}.", owner.to_lowercase()),
    };
    text.strip_prefix(&prefix)
        .filter(|rest| !rest.is_empty())
        .map(ToOwned::to_owned)
}
