use std::collections::HashSet;

use tracing::debug;

use crate::dom::NodeHandleExt;
use crate::xref::attributes::{DATA_EXPORT, EXPORT, NOEXPORT};
use crate::xref::registry::{DefinitionId, Registry};

/// Definitions referenced by at least one rewritten link.
#[derive(Debug, Clone, Default)]
pub struct UsageSet {
    used: HashSet<DefinitionId>,
}

impl UsageSet {
    pub fn mark(&mut self, id: DefinitionId) {
        self.used.insert(id);
    }

    pub fn contains(&self, id: DefinitionId) -> bool {
        self.used.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }
}

/// Marks unreferenced definitions `noexport`, unless they ask to be exported.
/// Bare definitions are always marked. Returns the number of marked nodes.
pub fn suppress_unused_exports(registry: &Registry, usage: &UsageSet) -> usize {
    let mut marked = 0;

    for (id, definition) in registry.definitions().iter().enumerate() {
        if usage.contains(id) {
            continue;
        }
        let node = &definition.node;
        if node.has_attribute(EXPORT) || node.has_attribute(DATA_EXPORT) {
            continue;
        }
        node.set_attribute(NOEXPORT, "");
        marked += 1;
    }

    for node in registry.bare_definitions() {
        node.set_attribute(NOEXPORT, "");
        marked += 1;
    }

    debug!(used = usage.len(), marked, "export suppression applied");
    marked
}
