//! Tree Loader - builds an arena from a rendered tree snapshot
//!
//! The headless renderer hands over the finished tree as JSON:
//!
//! ```json
//! {
//!   "styleSheets": [{ "rules": ["div{color:red}"], "shared": false }],
//!   "root": {
//!     "nodeType": 1,
//!     "nodeName": "my-widget",
//!     "attributes": ["id", "main"],
//!     "inlineStyles": false,
//!     "children": [],
//!     "shadowRoot": {
//!       "mode": "open",
//!       "styleSheets": [0],
//!       "globalStyles": [],
//!       "children": []
//!     }
//!   }
//! }
//! ```
//!
//! Sheets are referenced by their index in `styleSheets`, so two nodes
//! naming the same index share one sheet identity.

use serde::Deserialize;
use serde_json::Value;

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::*;

/// Style sheet entry of a snapshot
#[derive(Debug, Clone, Deserialize)]
struct RawStyleSheet {
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    shared: bool,
}

/// Builds a [`DomArena`] from snapshot JSON
#[derive(Debug, Default)]
pub struct TreeLoader {
    arena: DomArena,
    /// Snapshot sheet index → arena sheet id
    sheet_ids: Vec<SheetId>,
}

impl TreeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to internal arena
    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    pub fn into_arena(self) -> DomArena {
        self.arena
    }

    /// Parse a snapshot and set its root as the arena root
    pub fn load(&mut self, snapshot: &Value) -> Result<NodeId> {
        let root = snapshot
            .get("root")
            .ok_or_else(|| DomError::MalformedTree("Missing 'root' in snapshot".to_string()))?;

        self.arena.clear();
        self.sheet_ids.clear();

        if let Some(sheets) = snapshot.get("styleSheets") {
            let sheets: Vec<RawStyleSheet> = serde_json::from_value(sheets.clone())?;
            for raw in sheets {
                let sheet_id = self.arena.add_sheet(StyleSheet {
                    rules: raw.rules,
                    shared: raw.shared,
                });
                self.sheet_ids.push(sheet_id);
            }
        }

        let root_id = self.parse_node(root, None)?;
        self.arena.set_root(root_id)?;

        tracing::debug!(
            nodes = self.arena.len(),
            sheets = self.arena.sheet_count(),
            "tree snapshot loaded"
        );
        Ok(root_id)
    }

    /// Recursively parse a snapshot node
    fn parse_node(&mut self, raw: &Value, parent_id: Option<NodeId>) -> Result<NodeId> {
        let node_type_val = raw["nodeType"]
            .as_u64()
            .ok_or_else(|| DomError::MalformedTree("Missing nodeType".to_string()))?;

        let node_type = u8::try_from(node_type_val)
            .ok()
            .and_then(NodeType::from_u8)
            .unwrap_or_else(|| {
                tracing::debug!(node_type = node_type_val, "unknown node kind kept as Unknown");
                NodeType::Unknown
            });

        let node_name = raw["nodeName"].as_str().unwrap_or("").to_string();
        let mut node = DomNode::new(node_type, node_name)
            .with_value(raw["nodeValue"].as_str().unwrap_or(""))
            .with_inline_styles(raw["inlineStyles"].as_bool().unwrap_or(false));

        // Attributes come as a flat [name, value, name, value, ...] list
        if let Some(attrs) = raw["attributes"].as_array() {
            for pair in attrs.chunks_exact(2) {
                if let (Some(key), Some(value)) = (pair[0].as_str(), pair[1].as_str()) {
                    node.attributes.push((key.to_string(), value.to_string()));
                }
            }
        }

        let current_node_id = self.arena.add_node(node);
        if let Some(parent_id) = parent_id {
            self.arena.get_mut(current_node_id)?.parent_id = Some(parent_id);
        }

        if let Some(shadow) = raw.get("shadowRoot").filter(|v| !v.is_null()) {
            self.parse_shadow_root(shadow, current_node_id)?;
        }

        if let Some(children) = raw["children"].as_array() {
            for child in children {
                let child_id = self.parse_node(child, Some(current_node_id))?;
                self.arena.get_mut(current_node_id)?.children_ids.push(child_id);
            }
        }

        Ok(current_node_id)
    }

    fn parse_shadow_root(&mut self, raw: &Value, host: NodeId) -> Result<()> {
        let mode = match raw["mode"].as_str() {
            None => ShadowRootMode::default(),
            Some(mode) => ShadowRootMode::parse(mode).ok_or_else(|| {
                DomError::MalformedTree(format!("Unknown shadow root mode '{}'", mode))
            })?,
        };
        self.arena.attach_shadow(host, mode)?;

        for index in Self::indices(&raw["styleSheets"])? {
            let sheet_id = self.sheet_id(index)?;
            self.arena.adopt_style_sheet(host, sheet_id)?;
        }

        for index in Self::indices(&raw["globalStyles"])? {
            let sheet_id = self.sheet_id(index)?;
            self.arena.add_global_style(host, GlobalStyleRef::Ready(sheet_id))?;
        }

        if let Some(children) = raw["children"].as_array() {
            for child in children {
                let child_id = self.parse_node(child, Some(host))?;
                self.arena.append_shadow_child(host, child_id)?;
            }
        }

        Ok(())
    }

    fn indices(raw: &Value) -> Result<Vec<usize>> {
        match raw {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64().map(|i| i as usize).ok_or_else(|| {
                        DomError::MalformedTree(format!("Invalid style sheet index {}", item))
                    })
                })
                .collect(),
            other => Err(DomError::MalformedTree(format!(
                "Expected an array of style sheet indices, got {}",
                other
            ))),
        }
    }

    fn sheet_id(&self, index: usize) -> Result<SheetId> {
        self.sheet_ids.get(index).copied().ok_or_else(|| {
            DomError::MalformedTree(format!("Style sheet index {} out of range", index))
        })
    }
}
