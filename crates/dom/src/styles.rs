//! Style Resolver - shadow root style sheets → reference file names
//!
//! Resolution runs once per tag name and pass: the first element with a
//! given tag walks its adopted sheets, names them, and writes their text
//! into the style cache. Every later element with that tag reuses the
//! memoized list. This assumes all instances of a tag adopt the same
//! sheets.
//!
//! Sheet identity is the `SheetId`. A sheet already named earlier in the
//! pass (typically a shared design-system sheet seen under another tag)
//! keeps its first name and is not written again.

use ahash::AHashMap;

use crate::arena::DomArena;
use crate::cache::StyleCache;
use crate::error::Result;
use crate::serializer::SerializerConfig;
use crate::types::{DomNode, ShadowRoot, SheetId, StyleSheet};
use crate::utils::{self, STYLE_SHEET_EXTENSION};

/// Prefix of identifiers generated for shared sheets
pub const SHARED_PREFIX: &str = "shared-";

/// Lowercased tag name → resolved style sheet file names
pub type StyleSourceMap = AHashMap<String, Vec<String>>;

/// Flatten a sheet's rules into CSS text, one rule per line
pub fn convert_style_sheet_to_text(sheet: &StyleSheet) -> String {
    sheet.rules.join("\n")
}

/// `shared-{n}` for shared sheets, `{tag}-{n}` otherwise
pub fn generate_style_sheet_identifier(sheet: &StyleSheet, tag_name: &str, local_index: usize) -> String {
    if sheet.is_shared() {
        format!("{}{}", SHARED_PREFIX, local_index)
    } else {
        format!("{}-{}", tag_name.to_lowercase(), local_index)
    }
}

/// Per-pass resolver state
#[derive(Debug, Default)]
pub struct StyleResolver {
    source_map: StyleSourceMap,
    /// Identity side-table: sheet → identifier assigned this pass
    sheet_names: AHashMap<SheetId, String>,
}

impl StyleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_map(&self) -> &StyleSourceMap {
        &self.source_map
    }

    /// Identifier memoized for a sheet, if it was named this pass
    pub fn sheet_identifier(&self, sheet_id: SheetId) -> Option<&str> {
        self.sheet_names.get(&sheet_id).map(String::as_str)
    }

    /// Resolve the file names of the sheets adopted by `host`'s shadow root
    pub async fn resolve_subtree_styles(
        &mut self,
        arena: &DomArena,
        host: &DomNode,
        shadow: &ShadowRoot,
        cache: &dyn StyleCache,
    ) -> Result<Vec<String>> {
        // Keyed like the emitted tag, so `MY-WIDGET` and `my-widget` resolve once
        let tag_name = host.node_name.to_lowercase();
        if let Some(files) = self.source_map.get(&tag_name) {
            return Ok(files.clone());
        }

        let mut files = Vec::with_capacity(shadow.style_sheets.len());
        let mut local_index = 0;

        for &sheet_id in &shadow.style_sheets {
            let sheet = arena.sheet(sheet_id)?;
            if sheet.is_empty() {
                continue;
            }

            if let Some(name) = self.sheet_names.get(&sheet_id) {
                files.push(format!("{}{}", name, STYLE_SHEET_EXTENSION));
                continue;
            }

            let name = generate_style_sheet_identifier(sheet, &tag_name, local_index);
            local_index += 1;

            cache.set(&name, convert_style_sheet_to_text(sheet)).await?;
            tracing::debug!(tag = %tag_name, sheet = sheet_id, name = %name, "style sheet resolved");

            files.push(format!("{}{}", name, STYLE_SHEET_EXTENSION));
            self.sheet_names.insert(sheet_id, name);
        }

        self.source_map.insert(tag_name, files.clone());
        Ok(files)
    }
}

/// How one style sheet file is written into a shadow root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleReference {
    Link { href: String },
    Inline { css: String },
}

impl StyleReference {
    pub fn write_to(&self, output: &mut String) {
        match self {
            StyleReference::Link { href } => {
                output.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">", href));
            }
            StyleReference::Inline { css } => {
                output.push_str("<style>");
                output.push_str(css);
                output.push_str("</style>");
            }
        }
    }
}

/// Decide between `<link>` and `<style>` for one resolved file
///
/// Shared sheets always link. Other sheets are inlined when the element
/// or the configuration asks for it. `None` means the sheet should be
/// inlined but the cache has no text for it.
pub async fn style_reference(
    file: &str,
    host: &DomNode,
    config: &SerializerConfig,
    cache: &dyn StyleCache,
) -> Result<Option<StyleReference>> {
    let inline = host.wants_inline_styles() || config.inline_all_component_styles;

    if inline && !file.starts_with(SHARED_PREFIX) {
        let key = utils::sheet_key(file);
        return match cache.get(key).await? {
            Some(css) => Ok(Some(StyleReference::Inline { css })),
            None => {
                tracing::warn!(key, cache = cache.name(), "style sheet missing from cache, nothing inlined");
                Ok(None)
            }
        };
    }

    Ok(Some(StyleReference::Link {
        href: utils::stylesheet_href(&config.style_base, file),
    }))
}
