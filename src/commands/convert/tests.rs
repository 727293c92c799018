use std::fs;
use std::path::PathBuf;

use super::*;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "xref_rewrite_{}_{}",
        name,
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("scratch directory is creatable");
    dir
}

#[test]
fn output_is_the_body_inner_markup() {
    let converted = convert_markup(
        "<!DOCTYPE html><title>t</title><dfn>Foo</dfn><p><span>Foo</span></p>",
        None,
    )
    .unwrap();

    assert_eq!(
        converted.markup,
        r#"<dfn id="foo">Foo</dfn><p><a lt="foo">Foo</a></p>"#
    );
    assert_eq!(converted.counts.links_created, 1);
    assert_eq!(converted.counts.definitions_used, 1);
    assert!(converted.diagnostics.is_empty());
}

#[test]
fn boilerplate_is_prepended_to_the_body() {
    let converted =
        convert_markup("<p>body</p>", Some("<pre class=metadata>Group: X</pre>")).unwrap();

    assert_eq!(
        converted.markup,
        r#"<pre class="metadata">Group: X</pre><p>body</p>"#
    );
}

#[test]
fn reference_list_labels_are_escaped() {
    let converted = convert_markup(
        r#"<dl id="ref-list"><dt id="refsDOM">[DOM]</dt><dd>DOM Standard</dd></dl><dl><dt>[kept]</dt></dl>"#,
        None,
    )
    .unwrap();

    assert_eq!(
        converted.markup,
        r#"<dl id="ref-list"><dt id="refsDOM">\[DOM]</dt><dd>DOM Standard</dd></dl><dl><dt>[kept]</dt></dl>"#
    );
    assert_eq!(converted.counts.reference_labels_escaped, 1);
}

#[test]
fn double_brackets_are_escaped_in_the_output() {
    let converted = convert_markup("<p>See [[HTML]].</p>", None).unwrap();
    assert_eq!(converted.markup, r"<p>See \[[HTML]].</p>");
}

#[test]
fn diagnostics_are_collected_without_failing() {
    let converted = convert_markup(
        r#"<p><code data-x="missing">x</code><span data-odd="1">y</span></p>"#,
        None,
    )
    .unwrap();

    let kinds: Vec<_> = converted.diagnostics.iter().map(Diagnostic::kind).collect();
    assert_eq!(kinds, vec!["unresolved-reference", "disallowed-attribute"]);
    assert_eq!(converted.counts.unresolved_references, 1);
    assert_eq!(converted.counts.disallowed_attributes, 1);
}

#[test]
fn run_writes_output_and_report() {
    let dir = scratch_dir("run");
    let input = dir.join("source.html");
    let output = dir.join("out").join("index.bs");
    let report_path = dir.join("report.json");
    fs::write(&input, "<dfn>Foo</dfn><p><span>Foo</span></p>").unwrap();

    run(ConvertArgs {
        input: input.clone(),
        output: output.clone(),
        boilerplate: None,
        report_path: Some(report_path.clone()),
    })
    .unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        r#"<dfn id="foo">Foo</dfn><p><a lt="foo">Foo</a></p>"#
    );

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["manifest_version"], 1);
    assert_eq!(report["counts"]["links_created"], 1);
    assert_eq!(report["input_sha256"].as_str().map(str::len), Some(64));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn run_fails_when_the_input_is_missing() {
    let dir = scratch_dir("missing");
    let err = run(ConvertArgs {
        input: dir.join("absent.html"),
        output: dir.join("out.bs"),
        boilerplate: None,
        report_path: None,
    })
    .unwrap_err();

    assert!(err.to_string().contains("failed to read"));
    fs::remove_dir_all(&dir).ok();
}
