//! Core domain types for a collection compilation run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CollectionMetadata
// ---------------------------------------------------------------------------

/// A named top-level grouping of documents, fetched once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Collection identifier as used by the remote service.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Markdown description, if the collection has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// DocumentNode
// ---------------------------------------------------------------------------

/// One node of the collection's document tree.
///
/// Each node exclusively owns its children, in the order the service
/// returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    /// Create a leaf node with no parent.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent_id: None,
            children: Vec::new(),
        }
    }

    /// Attach children, setting their `parent_id` to this node.
    pub fn with_children(mut self, children: Vec<DocumentNode>) -> Self {
        self.children = children
            .into_iter()
            .map(|mut child| {
                child.parent_id = Some(self.id.clone());
                child
            })
            .collect();
        self
    }

    /// A node with no children terminates its branch.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DocumentContent / DocumentRecord
// ---------------------------------------------------------------------------

/// Full content of a single document as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub title: String,
    /// Raw markdown. Empty when the service sends no text.
    pub body: String,
    pub author: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A fully populated document, ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    /// Raw markdown body.
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Depth in the tree (0 for top-level documents).
    pub depth: usize,
    /// Position in the depth-first traversal sequence.
    pub index: usize,
}

// ---------------------------------------------------------------------------
// CompilationResult
// ---------------------------------------------------------------------------

/// Everything the HTML assembler needs: the collection and its documents in
/// traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationResult {
    pub metadata: CollectionMetadata,
    pub records: Vec<DocumentRecord>,
}
