//! JSON shapes of the remote knowledge-base API.
//!
//! Every endpoint answers with an envelope: `{ "ok": true, "data": ... }` on
//! success and `{ "ok": false, "error": "...", "message": "..." }` on failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use docbinder_shared::{CollectionMetadata, DocumentContent, DocumentNode};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default = "default_ok")]
    pub ok: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// Error body, parsed leniently from non-success responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Best human-readable description available.
    pub fn describe(&self, fallback: &str) -> String {
        match (&self.error, &self.message) {
            (Some(code), Some(msg)) if !msg.is_empty() => format!("{code}: {msg}"),
            (_, Some(msg)) if !msg.is_empty() => msg.clone(),
            (Some(code), _) => code.clone(),
            _ => fallback.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// collections.info
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct WireCollection {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<WireCollection> for CollectionMetadata {
    fn from(wire: WireCollection) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            description: wire.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// collections.documents
// ---------------------------------------------------------------------------

/// A node of the navigation tree returned by `collections.documents`.
#[derive(Debug, Deserialize)]
pub(crate) struct NavigationNode {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub children: Vec<NavigationNode>,
}

impl NavigationNode {
    /// Convert into a [`DocumentNode`], recording the parent on every child.
    pub fn into_document_node(self, parent_id: Option<&str>) -> DocumentNode {
        let children = self
            .children
            .into_iter()
            .map(|child| child.into_document_node(Some(&self.id)))
            .collect();

        DocumentNode {
            id: self.id,
            title: self.title,
            parent_id: parent_id.map(str::to_string),
            children,
        }
    }
}

// ---------------------------------------------------------------------------
// documents.info
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_by: Option<WireUser>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// `None` when the field is absent, `Some(None)` for an explicit `null`
    /// (a draft).
    #[serde(default, deserialize_with = "present")]
    pub published_at: Option<Option<String>>,
    #[serde(default)]
    pub archived_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl WireDocument {
    /// Why this document must not be compiled, if anything.
    ///
    /// Drafts, archived and deleted documents are reported as absent.
    pub fn unavailable_reason(&self) -> Option<&'static str> {
        if self.deleted_at.is_some() {
            Some("document was deleted")
        } else if self.archived_at.is_some() {
            Some("document is archived")
        } else if matches!(self.published_at, Some(None)) {
            Some("document is an unpublished draft")
        } else {
            None
        }
    }
}

impl From<WireDocument> for DocumentContent {
    fn from(wire: WireDocument) -> Self {
        Self {
            title: wire.title,
            body: wire.text.unwrap_or_default(),
            author: wire
                .created_by
                .and_then(|u| u.name)
                .filter(|n| !n.trim().is_empty()),
            updated_at: wire.updated_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Deserialize a field that is present, keeping an explicit `null` distinct
/// from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
