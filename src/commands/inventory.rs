use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::dom::{NodeHandleExt, body_element, parse_document};
use crate::model::{DefinitionEntry, DefinitionInventoryManifest};
use crate::util::{now_utc_string, read_text, sha256_file, write_json_pretty};
use crate::xref::attributes::ID;
use crate::xref::diagnostics::Diagnostics;
use crate::xref::link_text::{TextCase, link_texts};
use crate::xref::registry::Registry;
use crate::xref::topic::IdentifierGenerator;

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.input)?;

    if args.dry_run {
        info!(
            definition_count = manifest.definition_count,
            bare_count = manifest.bare_count,
            ambiguous = manifest.ambiguous_link_texts.len(),
            source = %manifest.source,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.input.with_extension("definitions.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote definition inventory");
    info!(
        definition_count = manifest.definition_count,
        "inventory completed"
    );

    Ok(())
}

/// Scans the definitions of a document without rewriting any references.
pub fn build_manifest(input: &Path) -> Result<DefinitionInventoryManifest> {
    let source = read_text(input)?;
    let document = parse_document(&source);
    let body = body_element(&document)
        .with_context(|| format!("no body element in {}", input.display()))?;

    let ids = IdentifierGenerator::new()?;
    let mut diagnostics = Diagnostics::new();
    let registry = Registry::build(&body, &ids, &mut diagnostics);

    let mut definitions: Vec<DefinitionEntry> = registry
        .definitions()
        .iter()
        .map(|definition| DefinitionEntry {
            topic: definition.topic.clone(),
            id: definition.id.clone(),
            link_texts: definition.link_texts.clone(),
            scope: definition.scope.clone(),
            local_text: definition.local_text.clone(),
            bare: false,
        })
        .collect();
    let bare_count = registry.bare_definitions().len();
    definitions.extend(registry.bare_definitions().iter().map(|node| DefinitionEntry {
        topic: String::new(),
        id: node.get_attribute(ID).filter(|id| !id.is_empty()),
        link_texts: link_texts(node, TextCase::for_definition(node)).texts,
        scope: None,
        local_text: None,
        bare: true,
    }));

    Ok(DefinitionInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source: input.display().to_string(),
        source_sha256: sha256_file(input)?,
        definition_count: registry.definitions().len(),
        bare_count,
        duplicate_count: registry.duplicate_count(),
        definitions,
        ambiguous_link_texts: registry.counts().ambiguous(),
        diagnostics: diagnostics.into_entries(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn manifest_lists_definitions_and_ambiguous_texts() {
        let dir = std::env::temp_dir().join(format!("xref_inventory_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("source.html");
        fs::write(
            &input,
            r#"<dfn data-x="a">shared</dfn><dfn data-x="b">shared</dfn><dfn data-x="">Loose</dfn><dfn data-x="a">again</dfn>"#,
        )
        .unwrap();

        let manifest = build_manifest(&input).unwrap();

        assert_eq!(manifest.definition_count, 2);
        assert_eq!(manifest.bare_count, 1);
        assert_eq!(manifest.duplicate_count, 1);
        assert_eq!(manifest.definitions.len(), 3);
        assert_eq!(manifest.definitions[0].topic, "a");
        assert_eq!(manifest.definitions[0].id.as_deref(), Some("a"));
        assert!(manifest.definitions[2].bare);
        assert!(manifest.definitions[2].link_texts.is_empty());
        assert_eq!(manifest.ambiguous_link_texts.len(), 1);
        assert_eq!(manifest.ambiguous_link_texts[0].text, "shared");
        assert_eq!(manifest.ambiguous_link_texts[0].count, 2);
        assert_eq!(manifest.diagnostics.len(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = std::env::temp_dir().join(format!("xref_inventory_dry_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("source.html");
        let manifest_path = dir.join("definitions.json");
        fs::write(&input, "<dfn>Foo</dfn>").unwrap();

        run(InventoryArgs {
            input,
            manifest_path: Some(manifest_path.clone()),
            dry_run: true,
        })
        .unwrap();

        assert!(!manifest_path.exists());
        fs::remove_dir_all(&dir).ok();
    }
}
