//! Arena-based storage for the rendered tree and its style sheets
//!
//! Nodes and sheets are stored sequentially and addressed by `u32`
//! indices. A `SheetId` doubles as the identity of a sheet: every node
//! that adopts the same sheet holds the same index.
//!
//! ## Memory Layout
//!
//! ```text
//! nodes:  [Node0][Node1][Node2]...
//! sheets: [Sheet0][Sheet1]...
//!          ↑ 4-byte index, not 8-byte pointer
//! ```

use crate::error::{DomError, Result};
use crate::types::{DomNode, GlobalStyleRef, NodeId, NodeType, ShadowRoot, ShadowRootMode, SheetId, StyleSheet};

/// Arena allocator for tree nodes and style sheets
#[derive(Debug, Default)]
pub struct DomArena {
    /// All nodes stored sequentially
    nodes: Vec<DomNode>,

    /// All style sheets, indexed by `SheetId`
    sheets: Vec<StyleSheet>,

    /// Root node ID (if set)
    root_id: Option<NodeId>,
}

impl DomArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create arena with specific node capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            sheets: Vec::new(),
            root_id: None,
        }
    }

    /// Add a node to the arena, returns its ID
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        self.nodes.push(node);
        node_id
    }

    /// Register a style sheet, returns its identity
    pub fn add_sheet(&mut self, sheet: StyleSheet) -> SheetId {
        let sheet_id = self.sheets.len() as SheetId;
        self.sheets.push(sheet);
        sheet_id
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get style sheet by ID
    pub fn sheet(&self, sheet_id: SheetId) -> Result<&StyleSheet> {
        self.sheets
            .get(sheet_id as usize)
            .ok_or(DomError::SheetNotFound(sheet_id))
    }

    /// Append `child` to the light children of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.link(parent, child)?;
        self.get_mut(parent)?.children_ids.push(child);
        Ok(())
    }

    /// Append `child` to the shadow root hosted by `host`
    pub fn append_shadow_child(&mut self, host: NodeId, child: NodeId) -> Result<()> {
        self.link(host, child)?;
        self.shadow_mut(host)?.children_ids.push(child);
        Ok(())
    }

    /// Attach an empty shadow root to an element
    ///
    /// An element holds at most one shadow root; attaching again keeps
    /// the existing one and only updates its mode.
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> Result<()> {
        let node = self.get_mut(host)?;
        if node.node_type != NodeType::Element {
            return Err(DomError::InvalidNodeType {
                expected: "Element".to_string(),
                actual: format!("{:?}", node.node_type),
            });
        }

        match node.shadow_root.as_mut() {
            Some(shadow) => shadow.mode = mode,
            None => node.shadow_root = Some(Box::new(ShadowRoot::new(mode))),
        }
        Ok(())
    }

    /// Adopt a registered sheet into the shadow root of `host`
    pub fn adopt_style_sheet(&mut self, host: NodeId, sheet_id: SheetId) -> Result<()> {
        self.sheet(sheet_id)?;
        self.shadow_mut(host)?.style_sheets.push(sheet_id);
        Ok(())
    }

    /// Associate a global (head) style with the shadow root of `host`
    pub fn add_global_style(&mut self, host: NodeId, global: GlobalStyleRef) -> Result<()> {
        if let GlobalStyleRef::Ready(sheet_id) = global {
            self.sheet(sheet_id)?;
        }
        self.shadow_mut(host)?.global_styles.push(global);
        Ok(())
    }

    fn shadow_mut(&mut self, host: NodeId) -> Result<&mut ShadowRoot> {
        self.get_mut(host)?
            .shadow_root
            .as_deref_mut()
            .ok_or(DomError::NoShadowRoot(host))
    }

    /// Set the parent link, refusing edges that would close a cycle
    fn link(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.get(child)?;

        let mut current = Some(parent);
        while let Some(id) = current {
            if id == child {
                return Err(DomError::CyclicTree { parent, child });
            }
            current = self.get(id)?.parent_id;
        }

        self.get_mut(child)?.parent_id = Some(parent);
        Ok(())
    }

    /// Set root node
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        // Verify node exists
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    /// Get root node ID
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of registered style sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Find all elements by tag name
    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| {
                node.node_type == NodeType::Element && node.node_name.eq_ignore_ascii_case(tag)
            })
            .map(|node| node.node_id)
            .collect()
    }

    /// Clear arena (reuse allocation)
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.sheets.clear();
        self.root_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_basic() {
        let mut arena = DomArena::new();

        let id = arena.add_node(DomNode::element("div"));
        assert_eq!(id, 0);

        let retrieved = arena.get(id).unwrap();
        assert_eq!(retrieved.node_name, "div");
        assert_eq!(retrieved.node_id, 0);
        assert!(matches!(arena.get(9), Err(DomError::NodeNotFound(9))));
    }

    #[test]
    fn test_append_child_sets_parent() {
        let mut arena = DomArena::new();
        let root = arena.add_node(DomNode::element("div"));
        let child = arena.add_node(DomNode::element("span"));

        arena.append_child(root, child).unwrap();

        assert_eq!(arena.get(child).unwrap().parent_id, Some(root));
        assert_eq!(arena.get(root).unwrap().children_ids.as_slice(), &[child]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut arena = DomArena::new();
        let a = arena.add_node(DomNode::element("div"));
        let b = arena.add_node(DomNode::element("div"));
        arena.append_child(a, b).unwrap();

        let err = arena.append_child(b, a).unwrap_err();
        assert!(matches!(err, DomError::CyclicTree { parent, child } if parent == b && child == a));

        assert!(arena.append_child(a, a).is_err());
    }

    #[test]
    fn test_shadow_requires_element() {
        let mut arena = DomArena::new();
        let text = arena.add_node(DomNode::text("hi"));
        assert!(arena.attach_shadow(text, ShadowRootMode::Open).is_err());

        let host = arena.add_node(DomNode::element("my-card"));
        let sheet = arena.add_sheet(StyleSheet::new(["p{margin:0}"]));
        assert!(matches!(
            arena.adopt_style_sheet(host, sheet),
            Err(DomError::NoShadowRoot(_))
        ));

        arena.attach_shadow(host, ShadowRootMode::Closed).unwrap();
        arena.adopt_style_sheet(host, sheet).unwrap();
        arena.append_shadow_child(host, text).unwrap();

        let shadow = arena.get(host).unwrap().shadow_root().unwrap();
        assert_eq!(shadow.mode, ShadowRootMode::Closed);
        assert_eq!(shadow.style_sheets.as_slice(), &[sheet]);
        assert_eq!(shadow.children_ids.as_slice(), &[text]);
    }

    #[test]
    fn test_find_by_tag() {
        let mut arena = DomArena::new();
        arena.add_node(DomNode::element("MY-WIDGET"));
        arena.add_node(DomNode::element("div"));
        arena.add_node(DomNode::element("my-widget"));

        assert_eq!(arena.find_by_tag("my-widget"), vec![0, 2]);
    }
}
