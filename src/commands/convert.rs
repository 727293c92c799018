use anyhow::{Context, Result};
use html5ever::local_name;
use markup5ever_rcdom::Handle;
use tracing::{info, warn};

use crate::cli::ConvertArgs;
use crate::dom::{
    NodeHandleExt, body_element, collect_nodes, parse_body_nodes, parse_document,
    serialize_children,
};
use crate::model::{ConversionCounts, ConversionReport};
use crate::util::{now_utc_string, read_text, sha256_file, write_json_pretty, write_text};
use crate::xref::attributes::ID;
use crate::xref::diagnostics::Diagnostic;
use crate::xref::{self, ConversionOutcome};

#[cfg(test)]
mod tests;

const REFERENCE_LIST_ID: &str = "ref-list";

#[derive(Debug)]
pub struct ConvertedDocument {
    pub markup: String,
    pub counts: ConversionCounts,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let source = read_text(&args.input)?;
    let boilerplate = args.boilerplate.as_deref().map(read_text).transpose()?;

    let converted = convert_markup(&source, boilerplate.as_deref())
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    write_text(&args.output, &converted.markup)?;
    info!(path = %args.output.display(), "wrote converted document");

    if let Some(report_path) = &args.report_path {
        let report = ConversionReport {
            manifest_version: 1,
            generated_at: now_utc_string(),
            input_path: args.input.display().to_string(),
            output_path: args.output.display().to_string(),
            input_sha256: sha256_file(&args.input)?,
            boilerplate_path: args.boilerplate.as_ref().map(|p| p.display().to_string()),
            counts: converted.counts.clone(),
            diagnostics: converted.diagnostics.clone(),
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote conversion report");
    }

    info!(
        links = converted.counts.links_created,
        noexport = converted.counts.noexport_marked,
        diagnostics = converted.diagnostics.len(),
        "conversion completed"
    );

    Ok(())
}

/// Converts a whole document and returns the body's inner markup.
pub fn convert_markup(source: &str, boilerplate: Option<&str>) -> Result<ConvertedDocument> {
    let document = parse_document(source);
    let body = body_element(&document).context("parsed document has no body element")?;

    if let Some(markup) = boilerplate {
        let nodes = parse_body_nodes(markup);
        if nodes.is_empty() {
            warn!("boilerplate contains no body content");
        }
        body.prepend_children(nodes);
    }

    let reference_labels_escaped = escape_reference_labels(&body);
    let outcome = xref::convert(&body)?;
    let markup = escape_double_brackets(&serialize_children(&body)?);

    Ok(ConvertedDocument {
        markup,
        counts: conversion_counts(&outcome, reference_labels_escaped),
        diagnostics: outcome.diagnostics.into_entries(),
    })
}

/// Escapes a leading `[` in the first text of every reference list term, so
/// labels like `[DOM]` are not read as bibliography links downstream.
fn escape_reference_labels(root: &Handle) -> usize {
    let mut escaped = 0;

    for list in collect_nodes(root, |n| n.attribute_is(ID, REFERENCE_LIST_ID)) {
        for term in collect_nodes(&list, |n| n.is_html_element(&local_name!("dt"))) {
            let Some(first) = term.child_nodes().into_iter().next() else {
                continue;
            };
            let Some(text) = first.node_text() else {
                continue;
            };
            if text.starts_with('[') {
                first.set_node_text(&format!("\\{text}"));
                escaped += 1;
            }
        }
    }

    escaped
}

fn escape_double_brackets(markup: &str) -> String {
    markup.replace("[[", "\\[[")
}

fn conversion_counts(outcome: &ConversionOutcome, reference_labels_escaped: usize) -> ConversionCounts {
    let stats = &outcome.stats;
    ConversionCounts {
        definitions: outcome.registry.definitions().len(),
        bare_definitions: outcome.registry.bare_definitions().len(),
        duplicate_topics: outcome.registry.duplicate_count(),
        links_created: stats.links_created,
        definitions_used: outcome.usage.len(),
        containers_unwrapped: stats.containers_unwrapped,
        code_blocks_reclassified: stats.code_blocks_reclassified,
        unresolved_references: stats.unresolved_references,
        scoped_links: stats.scoped_links,
        private_texts_synthesized: stats.private_texts_synthesized,
        links_without_text: stats.links_without_text,
        noexport_marked: outcome.noexport_marked,
        disallowed_attributes: outcome.disallowed_attributes,
        reference_labels_escaped,
    }
}
