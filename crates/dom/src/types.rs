//! Core type definitions for a finished component tree
//!
//! Key design principles:
//! 1. Use u32 for indices (nodes and sheets both live in the arena)
//! 2. Identity is the index, never the content
//! 3. Use SmallVec for small arrays (avoid heap allocation)
//! 4. Use Option<Box<T>> for large optional fields (reduce struct size)

use futures_util::future::{BoxFuture, FutureExt, Shared};
use smallvec::SmallVec;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::DomError;

/// Node identifier (index into arena)
pub type NodeId = u32;

/// Style sheet identifier (index into arena)
///
/// Two sheets with identical text but different ids are different sheets.
pub type SheetId = u32;

/// Node type matching DOM specification
///
/// `Unknown` covers kinds a newer tree producer may emit. The serializer
/// skips every kind it has no markup for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    Unknown = 0,
    Element = 1,
    Attribute = 2,
    Text = 3,
    CdataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NodeType::Element),
            2 => Some(NodeType::Attribute),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::CdataSection),
            5 => Some(NodeType::EntityReference),
            6 => Some(NodeType::Entity),
            7 => Some(NodeType::ProcessingInstruction),
            8 => Some(NodeType::Comment),
            9 => Some(NodeType::Document),
            10 => Some(NodeType::DocumentType),
            11 => Some(NodeType::DocumentFragment),
            12 => Some(NodeType::Notation),
            _ => None,
        }
    }
}

/// Shadow root encapsulation mode, printed verbatim into `shadowrootmode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

impl ShadowRootMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShadowRootMode::Open => "open",
            ShadowRootMode::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(ShadowRootMode::Open),
            "closed" => Some(ShadowRootMode::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for ShadowRootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One encapsulated style sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    /// CSS text of each rule, in declaration order
    pub rules: Vec<String>,
    /// Reused across several tag names (design-system base sheets)
    pub shared: bool,
}

impl StyleSheet {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
            shared: false,
        }
    }

    /// Same as [`StyleSheet::new`], flagged as shared
    pub fn shared<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shared: true,
            ..Self::new(rules)
        }
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A global sheet that may still be loading
pub type PendingSheet = Shared<BoxFuture<'static, Result<SheetId, Arc<DomError>>>>;

/// Reference to a style sheet hoisted into the document head
#[derive(Clone)]
pub enum GlobalStyleRef {
    Ready(SheetId),
    Pending(PendingSheet),
}

impl GlobalStyleRef {
    /// Wrap a future that resolves to an already registered sheet
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = crate::error::Result<SheetId>> + Send + 'static,
    {
        GlobalStyleRef::Pending(future.map(|r| r.map_err(Arc::new)).boxed().shared())
    }

    /// Wait for the sheet. Pending refs can be awaited any number of times.
    pub async fn resolve(&self) -> Result<SheetId, Arc<DomError>> {
        match self {
            GlobalStyleRef::Ready(id) => Ok(*id),
            GlobalStyleRef::Pending(future) => future.clone().await,
        }
    }
}

impl fmt::Debug for GlobalStyleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalStyleRef::Ready(id) => f.debug_tuple("Ready").field(id).finish(),
            GlobalStyleRef::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl From<SheetId> for GlobalStyleRef {
    fn from(id: SheetId) -> Self {
        GlobalStyleRef::Ready(id)
    }
}

/// Encapsulated subtree attached to one element
#[derive(Debug, Clone, Default)]
pub struct ShadowRoot {
    pub mode: ShadowRootMode,
    pub children_ids: SmallVec<[NodeId; 4]>,
    /// Adopted sheets, in declared order
    pub style_sheets: SmallVec<[SheetId; 2]>,
    /// Sheets destined for the document head
    pub global_styles: Vec<GlobalStyleRef>,
}

impl ShadowRoot {
    pub fn new(mode: ShadowRootMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// The main tree node structure
///
/// Design philosophy:
/// - Small fixed-size fields first (better packing)
/// - Use indices instead of pointers
/// - Attributes keep insertion order, output must be reproducible
#[derive(Debug, Clone)]
pub struct DomNode {
    // IDs
    pub node_id: NodeId,
    pub node_type: NodeType,

    // Navigation indices
    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>,

    /// Tag name for elements, target for processing instructions
    pub node_name: String,
    /// Text, comment or processing instruction data
    pub node_value: String,
    pub attributes: SmallVec<[(String, String); 4]>,

    // Encapsulated subtree (boxed, most nodes have none)
    pub shadow_root: Option<Box<ShadowRoot>>,

    /// Element asks for its component styles to be inlined
    pub inline_styles: bool,
}

impl DomNode {
    /// Create a new node. The arena assigns `node_id` on insertion.
    pub fn new(node_type: NodeType, node_name: impl Into<String>) -> Self {
        Self {
            node_id: 0,
            node_type,
            parent_id: None,
            children_ids: SmallVec::new(),
            node_name: node_name.into(),
            node_value: String::new(),
            attributes: SmallVec::new(),
            shadow_root: None,
            inline_styles: false,
        }
    }

    pub fn element(tag_name: impl Into<String>) -> Self {
        Self::new(NodeType::Element, tag_name)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeType::Text, "#text").with_value(content)
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::new(NodeType::Comment, "#comment").with_value(content)
    }

    pub fn processing_instruction(target: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(NodeType::ProcessingInstruction, target).with_value(data)
    }

    pub fn fragment() -> Self {
        Self::new(NodeType::DocumentFragment, "#document-fragment")
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.node_value = value.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_inline_styles(mut self, inline: bool) -> Self {
        self.inline_styles = inline;
        self
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set attribute value, keeping the position of an existing attribute
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn shadow_root(&self) -> Option<&ShadowRoot> {
        self.shadow_root.as_deref()
    }

    pub fn wants_inline_styles(&self) -> bool {
        self.inline_styles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_order() {
        let mut node = DomNode::element("input")
            .with_attr("type", "text")
            .with_attr("name", "q")
            .with_attr("id", "search");

        node.set_attr("name", "query");

        let names: Vec<_> = node.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(names, vec![("type", "text"), ("name", "query"), ("id", "search")]);
        assert_eq!(node.attr("id"), Some("search"));
        assert_eq!(node.attr("missing"), None);
    }

    #[test]
    fn test_shadow_mode_round_trip() {
        assert_eq!(ShadowRootMode::parse("closed"), Some(ShadowRootMode::Closed));
        assert_eq!(ShadowRootMode::Open.to_string(), "open");
        assert_eq!(ShadowRootMode::parse("user-agent"), None);
    }

    #[tokio::test]
    async fn test_pending_global_style_resolves_twice() {
        let global = GlobalStyleRef::pending(async { Ok(7) });

        assert_eq!(global.resolve().await.unwrap(), 7);
        assert_eq!(global.clone().resolve().await.unwrap(), 7);
    }
}
