//! Cartridge DOM Serialization Library
//!
//! Turns a finished, server-rendered component tree into a single HTML
//! document using declarative shadow DOM, with style sheets deduplicated
//! and externalized through a pluggable cache.
//!
//! ## Core Design
//!
//! ```text
//! snapshot JSON → TreeLoader → DomArena → DomSerializer → RenderOutput → Template
//!                                              ↓
//!                                    StyleResolver ↔ StyleCache
//! ```

pub mod arena;
pub mod cache;
pub mod config;
pub mod error;
pub mod render;
pub mod serializer;
pub mod service;
pub mod styles;
pub mod types;
pub mod utils;

pub use arena::DomArena;
pub use cache::{build_style_cache, DiskStyleCache, MemoryStyleCache, StyleCache};
pub use config::{CartridgeConfig, ConfigError};
pub use error::{DomError, Result};
pub use render::{render_page, Template};
pub use serializer::{DomSerializer, RenderOutput, SerializerConfig};
pub use service::TreeLoader;
pub use styles::{
    convert_style_sheet_to_text, generate_style_sheet_identifier, StyleReference, StyleResolver,
    StyleSourceMap,
};
pub use types::*;
