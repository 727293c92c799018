//! Cross-reference rewriting: topic annotations in, disambiguated links out.

pub mod attributes;
pub mod diagnostics;
pub mod disambiguate;
pub mod link_text;
pub mod registry;
pub mod rewrite;
pub mod topic;
pub mod usage;


use anyhow::Result;
use markup5ever_rcdom::{Handle, NodeData};
use tracing::info;

use crate::xref::diagnostics::Diagnostics;
use crate::xref::registry::Registry;
use crate::xref::rewrite::{PassContext, RewriteStats, rewrite_references};
use crate::xref::topic::IdentifierGenerator;
use crate::xref::usage::{UsageSet, suppress_unused_exports};

#[derive(Debug)]
pub struct ConversionOutcome {
    pub registry: Registry,
    pub usage: UsageSet,
    pub stats: RewriteStats,
    pub noexport_marked: usize,
    pub disallowed_attributes: usize,
    pub diagnostics: Diagnostics,
}

/// Builds the registry, rewrites references, then applies export
/// suppression and reports leftover private attributes. Mutates `root` in place.
pub fn convert(root: &Handle) -> Result<ConversionOutcome> {
    let ids = IdentifierGenerator::new()?;
    let mut diagnostics = Diagnostics::new();

    let mut registry = Registry::build(root, &ids, &mut diagnostics);
    info!(
        definitions = registry.definitions().len(),
        bare = registry.bare_definitions().len(),
        duplicates = registry.duplicate_count(),
        "scanned definitions"
    );

    let mut usage = UsageSet::default();
    let stats = {
        let mut ctx = PassContext::new(&mut registry, &mut usage, &mut diagnostics);
        rewrite_references(root, &mut ctx);
        ctx.stats
    };

    let noexport_marked = suppress_unused_exports(&registry, &usage);
    let disallowed_attributes = attributes::report_unrecognized(root, &mut diagnostics);
    info!(
        noexport = noexport_marked,
        disallowed = disallowed_attributes,
        diagnostics = diagnostics.entries().len(),
        "conversion finished"
    );

    Ok(ConversionOutcome {
        registry,
        usage,
        stats,
        noexport_marked,
        disallowed_attributes,
        diagnostics,
    })
}

/// Tag name of an element, for diagnostics.
pub(crate) fn element_name(node: &Handle) -> String {
    match &node.data {
        NodeData::Element { name, .. } => name.local.to_string(),
        _ => "#node".to_string(),
    }
}
