//! Tree Serializer - finished component tree → declarative shadow DOM HTML
//!
//! This module handles:
//! - Node kind dispatch in document order
//! - `<template shadowrootmode>` wrappers for encapsulated subtrees
//! - Linking or inlining each shadow root's style sheets
//! - Hoisting global style sheets into the document head, once per sheet
//!
//! Nodes are visited one after another into a single buffer, so the
//! output of sibling subtrees never interleaves.

use ahash::AHashSet;
use std::sync::Arc;

use crate::arena::DomArena;
use crate::cache::StyleCache;
use crate::error::{DomError, Result};
use crate::styles::{self, StyleResolver};
use crate::types::*;

/// Deepest nesting accepted before the tree is considered broken
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Serializer configuration
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// URL prefix of linked sheets, e.g. `/ct-stylesheets`
    pub style_base: String,
    pub inline_all_component_styles: bool,
    pub max_depth: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            style_base: String::new(),
            inline_all_component_styles: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Accumulated page output
#[derive(Debug, Default)]
pub struct RenderOutput {
    /// Body markup
    pub html: String,
    /// Markup for the document head (title, hoisted global styles)
    pub head: String,
    /// Global sheets already written to `head`
    pub global_styles: AHashSet<SheetId>,
}

impl RenderOutput {
    pub fn new() -> Self {
        Self {
            html: String::with_capacity(4096),
            ..Self::default()
        }
    }

    /// Output whose head starts with a `<title>` element
    pub fn with_title(title: &str) -> Self {
        let mut output = Self::new();
        output.head.push_str(&format!("<title>{}</title>", title));
        output
    }
}

/// Pending work of the tree walk
#[derive(Debug)]
enum Step {
    Enter { node_id: NodeId, depth: usize },
    /// Close a shadow template, then hoist the host's global styles
    CloseTemplate { host: NodeId },
    CloseElement { tag: String },
}

/// Tree Serializer
pub struct DomSerializer {
    config: SerializerConfig,
    cache: Arc<dyn StyleCache>,
}

impl DomSerializer {
    pub fn new(cache: Arc<dyn StyleCache>) -> Self {
        Self::with_config(SerializerConfig::default(), cache)
    }

    pub fn with_config(config: SerializerConfig, cache: Arc<dyn StyleCache>) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Serialize the subtree rooted at `node_id`, appending to `output`
    ///
    /// The walk keeps its own stack of pending steps instead of recursing,
    /// so tree depth is bounded by `max_depth` only, never by the thread
    /// stack.
    pub async fn serialize(
        &self,
        arena: &DomArena,
        node_id: NodeId,
        output: &mut RenderOutput,
        resolver: &mut StyleResolver,
    ) -> Result<()> {
        let mut stack = vec![Step::Enter { node_id, depth: 0 }];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter { node_id, depth } => {
                    self.enter_node(arena, node_id, depth, &mut stack, output, resolver)
                        .await?;
                }
                Step::CloseTemplate { host } => {
                    output.html.push_str("</template>");
                    let node = arena.get(host)?;
                    if let Some(shadow) = node.shadow_root() {
                        self.hoist_global_styles(arena, &node.node_name.to_lowercase(), shadow, output)
                            .await;
                    }
                }
                Step::CloseElement { tag } => {
                    output.html.push_str("</");
                    output.html.push_str(&tag);
                    output.html.push('>');
                }
            }
        }

        Ok(())
    }

    /// Write a node's opening markup and schedule what follows it
    ///
    /// Steps are pushed in reverse, so they pop in document order.
    async fn enter_node(
        &self,
        arena: &DomArena,
        node_id: NodeId,
        depth: usize,
        stack: &mut Vec<Step>,
        output: &mut RenderOutput,
        resolver: &mut StyleResolver,
    ) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(DomError::MaxDepthExceeded {
                current: depth,
                max: self.config.max_depth,
            });
        }

        let node = arena.get(node_id)?;
        let children = |ids: &[NodeId], stack: &mut Vec<Step>| {
            stack.extend(ids.iter().rev().map(|&node_id| Step::Enter {
                node_id,
                depth: depth + 1,
            }));
        };

        match node.node_type {
            NodeType::Text => {
                output.html.push_str(&node.node_value);
            }
            NodeType::Comment => {
                output.html.push_str("<!--");
                output.html.push_str(&node.node_value);
                output.html.push_str("-->");
            }
            NodeType::ProcessingInstruction => {
                output
                    .html
                    .push_str(&format!("<?{} {}>", node.node_name, node.node_value));
            }
            NodeType::Document | NodeType::DocumentFragment => {
                children(&node.children_ids, stack);
            }
            NodeType::Element => {
                let tag = node.node_name.to_lowercase();

                output.html.push('<');
                output.html.push_str(&tag);
                for (name, value) in &node.attributes {
                    output.html.push_str(&format!(" {}=\"{}\"", name, value));
                }
                output.html.push('>');

                stack.push(Step::CloseElement { tag: tag.clone() });
                // Light children are siblings of the template, not nested in it
                children(&node.children_ids, stack);

                if let Some(shadow) = node.shadow_root() {
                    output.html.push_str(&format!(
                        "<template tag=\"{}\" shadowrootmode=\"{}\">",
                        tag, shadow.mode
                    ));

                    self.write_shadow_styles(arena, node, shadow, output, resolver)
                        .await?;

                    stack.push(Step::CloseTemplate { host: node_id });
                    children(&shadow.children_ids, stack);
                }
            }
            other => {
                tracing::trace!(node_id, kind = ?other, "skipping node kind");
            }
        }

        Ok(())
    }

    /// Emit `<link>`/`<style>` for every sheet the shadow root adopts
    async fn write_shadow_styles(
        &self,
        arena: &DomArena,
        host: &DomNode,
        shadow: &ShadowRoot,
        output: &mut RenderOutput,
        resolver: &mut StyleResolver,
    ) -> Result<()> {
        let files = resolver
            .resolve_subtree_styles(arena, host, shadow, self.cache.as_ref())
            .await?;

        for file in &files {
            if let Some(reference) =
                styles::style_reference(file, host, &self.config, self.cache.as_ref()).await?
            {
                reference.write_to(&mut output.html);
            }
        }

        Ok(())
    }

    /// Append each not yet written global sheet to the head
    ///
    /// A sheet that fails to resolve is logged and skipped; the rest of
    /// the page still renders.
    async fn hoist_global_styles(
        &self,
        arena: &DomArena,
        tag: &str,
        shadow: &ShadowRoot,
        output: &mut RenderOutput,
    ) {
        for global in &shadow.global_styles {
            let sheet_id = match global.resolve().await {
                Ok(sheet_id) => sheet_id,
                Err(e) => {
                    tracing::error!(tag, error = %e, "global style failed to resolve");
                    continue;
                }
            };

            if output.global_styles.contains(&sheet_id) {
                continue;
            }

            let sheet = match arena.sheet(sheet_id) {
                Ok(sheet) => sheet,
                Err(e) => {
                    tracing::error!(tag, error = %e, "global style failed to resolve");
                    continue;
                }
            };

            output.global_styles.insert(sheet_id);
            output.head.push_str(&format!(
                "<style data-associated-tag-name=\"{}\">{}</style>",
                tag,
                styles::convert_style_sheet_to_text(sheet)
            ));
        }
    }
}
