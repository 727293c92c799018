use serde::{Deserialize, Serialize};

use crate::xref::diagnostics::Diagnostic;
use crate::xref::registry::AmbiguousLinkText;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionEntry {
    pub topic: String,
    pub id: Option<String>,
    pub link_texts: Vec<String>,
    pub scope: Option<String>,
    pub local_text: Option<String>,
    pub bare: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefinitionInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source: String,
    pub source_sha256: String,
    pub definition_count: usize,
    pub bare_count: usize,
    pub duplicate_count: usize,
    pub definitions: Vec<DefinitionEntry>,
    pub ambiguous_link_texts: Vec<AmbiguousLinkText>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionCounts {
    pub definitions: usize,
    pub bare_definitions: usize,
    pub duplicate_topics: usize,
    pub links_created: usize,
    pub definitions_used: usize,
    pub containers_unwrapped: usize,
    pub code_blocks_reclassified: usize,
    pub unresolved_references: usize,
    pub scoped_links: usize,
    pub private_texts_synthesized: usize,
    pub links_without_text: usize,
    pub noexport_marked: usize,
    pub disallowed_attributes: usize,
    pub reference_labels_escaped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub output_path: String,
    pub input_sha256: String,
    pub boilerplate_path: Option<String>,
    pub counts: ConversionCounts,
    pub diagnostics: Vec<Diagnostic>,
}
