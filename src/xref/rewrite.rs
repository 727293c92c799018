//! Rewrites reference-capable nodes into links.
//!
//! Passes run in a fixed order: generic containers, preformatted code blocks,
//! inline code, annotated emphasis. Each pass snapshots its candidates before
//! touching the tree, so splicing and replacement never skip or repeat a
//! candidate, and each pass sees everything earlier passes did.

use std::iter;

use html5ever::local_name;
use markup5ever_rcdom::Handle;
use serde::Serialize;
use tracing::{debug, info};

use crate::dom::{NodeHandleExt, collect_nodes, is_attached};
use crate::xref::attributes::{
    AttributeKind, CLASS, DEV_ONLY, ID, NO_DEV, TOPIC, XMLNS, output_name, strip_topic_overrides,
};
use crate::xref::diagnostics::{Diagnostic, Diagnostics};
use crate::xref::disambiguate::{Outcome, disambiguate};
use crate::xref::element_name;
use crate::xref::registry::{DefinitionId, Registry};
use crate::xref::topic::topic_for;
use crate::xref::usage::UsageSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub links_created: usize,
    pub containers_unwrapped: usize,
    pub code_blocks_reclassified: usize,
    pub unresolved_references: usize,
    pub scoped_links: usize,
    pub private_texts_synthesized: usize,
    pub links_without_text: usize,
}

/// State shared by the passes of one run.
pub struct PassContext<'a> {
    pub registry: &'a mut Registry,
    pub usage: &'a mut UsageSet,
    pub diagnostics: &'a mut Diagnostics,
    pub stats: RewriteStats,
}

impl<'a> PassContext<'a> {
    pub fn new(
        registry: &'a mut Registry,
        usage: &'a mut UsageSet,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            registry,
            usage,
            diagnostics,
            stats: RewriteStats::default(),
        }
    }

    fn link_to(&mut self, link: &Handle, id: DefinitionId) {
        let (definition, counts) = self.registry.entry_and_counts(id);
        let topic = definition.topic.clone();
        match disambiguate(link, definition, counts, self.diagnostics) {
            Outcome::Scoped => self.stats.scoped_links += 1,
            Outcome::Unique(text) => debug!(topic = %topic, lt = %text, "unique link text"),
            Outcome::Private { text, synthesized } => {
                if synthesized {
                    self.stats.private_texts_synthesized += 1;
                }
                debug!(topic = %topic, lt = %text, synthesized, "private link text");
            }
            Outcome::Unassigned => self.stats.links_without_text += 1,
        }
        self.usage.mark(id);
        self.stats.links_created += 1;
    }
}

/// Runs every pass over `root`, in order.
pub fn rewrite_references(root: &Handle, ctx: &mut PassContext<'_>) {
    rewrite_containers(root, ctx);
    reclassify_code_blocks(root, ctx);
    rewrite_inline_code(root, ctx);
    rewrite_emphasis(root, ctx);

    info!(
        links = ctx.stats.links_created,
        unwrapped = ctx.stats.containers_unwrapped,
        code_blocks = ctx.stats.code_blocks_reclassified,
        unresolved = ctx.stats.unresolved_references,
        "references rewritten"
    );
}

/// Turns resolvable `<span>` elements into links, or drops the span when it
/// only wraps a `<code>` that the inline code pass will link.
pub fn rewrite_containers(root: &Handle, ctx: &mut PassContext<'_>) {
    let spans = collect_nodes(root, |n| n.is_html_element(&local_name!("span")));

    for span in spans {
        if !is_attached(&span, root) {
            continue;
        }
        // Only the innermost of nested spans is handled.
        if span.has_descendant(|n| n.is_html_element(&local_name!("span"))) {
            continue;
        }
        if span.has_attribute(DEV_ONLY) || span.has_attribute(NO_DEV) {
            continue;
        }
        if in_foreign_markup(&span) {
            continue;
        }
        // An empty span with an id only preserves an old anchor.
        if span.has_attribute(ID) && span.child_nodes().is_empty() {
            continue;
        }
        if span.attribute_is(TOPIC, "") {
            continue;
        }

        let topic = topic_for(&span);
        let Some(id) = ctx.registry.resolve(&topic) else {
            continue;
        };

        if let Some(code) = sole_code_child(&span) {
            unwrap_container(&span, &code, ctx.diagnostics);
            ctx.stats.containers_unwrapped += 1;
            continue;
        }

        let link = Handle::create_element(local_name!("a"));
        for (name, value) in span.attributes() {
            match AttributeKind::classify(&name) {
                AttributeKind::Identifier | AttributeKind::LinkTextOverride => {
                    link.set_attribute(output_name(&name), &value);
                }
                AttributeKind::TopicOverride => {}
                AttributeKind::Unrecognized => link.set_attribute(&name, &value),
                _ => ctx.diagnostics.report(Diagnostic::DiscardedAttribute {
                    element: "span".to_string(),
                    attribute: name,
                }),
            }
        }
        link.append_children(span.take_children().into_iter());
        strip_topic_overrides(&link);
        span.replace_with(vec![link.clone()]);

        ctx.link_to(&link, id);
    }
}

/// Rewrites `<pre><code class=LANG>` into `<pre class=STYLE>` holding plain text.
/// Never produces a link.
pub fn reclassify_code_blocks(root: &Handle, ctx: &mut PassContext<'_>) {
    let blocks = collect_nodes(root, |n| {
        n.is_html_element(&local_name!("code")) && n.parent_node().is_some_and(|p| is_pre(&p))
    });

    for code in blocks {
        let Some(pre) = code.parent_node() else {
            continue;
        };
        let Some(tag) = code
            .get_attribute(CLASS)
            .and_then(|class| class.split_ascii_whitespace().next().map(ToOwned::to_owned))
        else {
            continue;
        };
        let Some(style) = block_style(&tag) else {
            ctx.diagnostics
                .report(Diagnostic::UnknownLanguageTag { tag });
            continue;
        };
        if pre.child_nodes().len() != 1 {
            ctx.diagnostics
                .report(Diagnostic::UnexpectedBlockContent { tag });
            continue;
        }

        let text = code.text_content();
        let normalized = format!("\n{}\n", text.trim_matches('\n'));
        pre.take_children();
        pre.append_children(iter::once(Handle::create_text_node(&normalized)));
        add_class(&pre, &style);

        debug!(tag = %tag, style = %style, "reclassified code block");
        ctx.stats.code_blocks_reclassified += 1;
    }
}

/// Wraps resolvable `<code>` elements in links, moving the code's attributes
/// onto the link.
pub fn rewrite_inline_code(root: &Handle, ctx: &mut PassContext<'_>) {
    let codes = collect_nodes(root, |n| n.is_html_element(&local_name!("code")));

    for code in codes {
        if !is_attached(&code, root) {
            continue;
        }
        if code.attribute_is(TOPIC, "") {
            continue;
        }
        if code.parent_node().is_some_and(|p| is_pre(&p)) {
            continue;
        }
        if code
            .closest(|n| {
                n.is_html_element(&local_name!("a")) || n.is_html_element(&local_name!("dfn"))
            })
            .is_some()
        {
            continue;
        }

        let topic = topic_for(&code);
        if topic.is_empty() {
            continue;
        }
        let Some(id) = ctx.registry.resolve(&topic) else {
            ctx.diagnostics.report(Diagnostic::UnresolvedReference {
                element: "code".to_string(),
                topic,
            });
            ctx.stats.unresolved_references += 1;
            continue;
        };

        let link = Handle::create_element(local_name!("a"));
        for (name, value) in code.attributes() {
            code.remove_attribute(&name);
            if AttributeKind::classify(&name) != AttributeKind::TopicOverride {
                link.set_attribute(output_name(&name), &value);
            }
        }
        code.replace_with(vec![link.clone()]);
        link.append_children(iter::once(code));

        ctx.link_to(&link, id);
    }
}

/// Wraps `<i>`/`<em>` elements that carry a topic in links.
pub fn rewrite_emphasis(root: &Handle, ctx: &mut PassContext<'_>) {
    let candidates = collect_nodes(root, |n| {
        (n.is_html_element(&local_name!("i")) || n.is_html_element(&local_name!("em")))
            && n.get_attribute(TOPIC).is_some_and(|value| !value.is_empty())
    });

    for node in candidates {
        if !is_attached(&node, root) {
            continue;
        }
        if node
            .closest(|n| n.is_html_element(&local_name!("dfn")))
            .is_some()
        {
            continue;
        }

        let topic = topic_for(&node);
        let Some(id) = ctx.registry.resolve(&topic) else {
            continue;
        };

        node.remove_attribute(TOPIC);
        let link = Handle::create_element(local_name!("a"));
        node.replace_with(vec![link.clone()]);
        link.append_children(iter::once(node));

        ctx.link_to(&link, id);
    }
}

/// Block style for a code language tag.
pub fn block_style(tag: &str) -> Option<String> {
    match tag {
        "idl" => Some("idl".to_string()),
        "js" => Some("lang-javascript".to_string()),
        "abnf" | "css" | "html" | "json" => Some(format!("lang-{tag}")),
        _ => None,
    }
}

/// The `<code>` child of a container whose only content is that code,
/// optionally between two `"` text nodes.
fn sole_code_child(span: &Handle) -> Option<Handle> {
    let is_code = |n: &Handle| n.is_html_element(&local_name!("code"));
    let is_quote = |n: &Handle| n.node_text().as_deref() == Some("\"");

    match span.child_nodes().as_slice() {
        [code] if is_code(code) => Some(code.clone()),
        [open, code, close] if is_quote(open) && is_code(code) && is_quote(close) => {
            Some(code.clone())
        }
        _ => None,
    }
}

/// Replaces the container with its children. The container's topic moves to
/// the code when the code has none of its own; other attributes are lost.
fn unwrap_container(span: &Handle, code: &Handle, diagnostics: &mut Diagnostics) {
    for (name, value) in span.attributes() {
        if AttributeKind::classify(&name) == AttributeKind::TopicOverride {
            if !code.has_attribute(TOPIC) {
                code.set_attribute(TOPIC, &value);
            }
            continue;
        }
        diagnostics.report(Diagnostic::DiscardedAttribute {
            element: element_name(span),
            attribute: name,
        });
    }

    let children = span.take_children();
    span.replace_with(children);
}

fn in_foreign_markup(node: &Handle) -> bool {
    node.closest(|n| n.has_attribute(XMLNS) || n.is_foreign_element())
        .is_some()
}

fn is_pre(node: &Handle) -> bool {
    node.is_html_element(&local_name!("pre"))
}

fn add_class(node: &Handle, class: &str) {
    match node.get_attribute(CLASS) {
        Some(existing) if !existing.trim().is_empty() => {
            if !node.has_class(class) {
                node.set_attribute(CLASS, &format!("{} {class}", existing.trim()));
            }
        }
        _ => node.set_attribute(CLASS, class),
    }
}
