//! Page rendering: serialize a finished tree and splice it into the
//! HTML template.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::arena::DomArena;
use crate::cache::StyleCache;
use crate::config::CartridgeConfig;
use crate::error::{DomError, Result};
use crate::serializer::{DomSerializer, RenderOutput};
use crate::styles::StyleResolver;

/// Placeholder replaced by the rendered head markup
pub const HEAD_PLACEHOLDER: &str = "<!--app-head-->";
/// Placeholder replaced by the rendered body markup
pub const HTML_PLACEHOLDER: &str = "<!--app-html-->";

/// Template used when a project has no `index.html`
pub const DEFAULT_TEMPLATE: &str = "<!DOCTYPE html>\n<html>\n<head>\n<!--app-head-->\n</head>\n<body>\n<!--app-html-->\n</body>\n</html>\n";

/// Render the arena's root into body and head markup
///
/// Every call starts from a fresh style source map, so pages never
/// share memoized tag resolutions. The cache is shared.
pub async fn render_page(
    arena: &DomArena,
    cache: Arc<dyn StyleCache>,
    config: &CartridgeConfig,
) -> Result<RenderOutput> {
    let root = arena.root_id().ok_or(DomError::NoRoot)?;
    let started = Instant::now();

    let serializer = DomSerializer::with_config(config.serializer_config(), cache);
    let mut resolver = StyleResolver::new();
    let mut output = RenderOutput::with_title(&config.title);

    serializer
        .serialize(arena, root, &mut output, &mut resolver)
        .await?;

    tracing::debug!(
        bytes = output.html.len(),
        tags = resolver.source_map().len(),
        global_styles = output.global_styles.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "page rendered"
    );
    Ok(output)
}

/// HTML page template with head and body placeholders
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Read a template file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(tokio::fs::read_to_string(path).await?))
    }

    /// Substitute the first occurrence of each placeholder
    pub fn apply(&self, output: &RenderOutput) -> String {
        self.source
            .replacen(HEAD_PLACEHOLDER, &output.head, 1)
            .replacen(HTML_PLACEHOLDER, &output.html, 1)
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
