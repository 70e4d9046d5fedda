//! In-memory [`DocumentSource`] used by the core tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use docbinder_client::DocumentSource;
use docbinder_shared::{
    CollectionMetadata, DocbinderError, DocumentContent, DocumentNode, Result,
};

/// Scripted answer for one `document_content` call.
#[derive(Debug, Clone)]
pub(crate) enum Stub {
    Found(DocumentContent),
    Missing,
    Unauthorized,
    RateLimited,
    Timeout,
}

pub(crate) struct MemorySource {
    pub metadata: Option<CollectionMetadata>,
    pub tree: Vec<DocumentNode>,
    /// Scripted failure for the metadata call (takes precedence over `metadata`).
    pub metadata_failure: Option<Stub>,
    /// Scripted failure for the tree call.
    pub tree_failure: Option<Stub>,
    pub documents: HashMap<String, Stub>,
    /// Per-document artificial latency, to force out-of-order completion.
    pub delays: HashMap<String, Duration>,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub content_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(metadata: CollectionMetadata, tree: Vec<DocumentNode>) -> Self {
        Self {
            metadata: Some(metadata),
            tree,
            metadata_failure: None,
            tree_failure: None,
            documents: HashMap::new(),
            delays: HashMap::new(),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            content_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_doc(mut self, id: &str, stub: Stub) -> Self {
        self.documents.insert(id.to_string(), stub);
        self
    }

    pub fn failing_metadata(mut self, stub: Stub) -> Self {
        self.metadata_failure = Some(stub);
        self
    }

    pub fn failing_tree(mut self, stub: Stub) -> Self {
        self.tree_failure = Some(stub);
        self
    }

    pub fn with_delay(mut self, id: &str, millis: u64) -> Self {
        self.delays.insert(id.to_string(), Duration::from_millis(millis));
        self
    }
}

/// Published content with the given title and body, no byline.
pub(crate) fn content(title: &str, body: &str) -> Stub {
    Stub::Found(DocumentContent {
        title: title.to_string(),
        body: body.to_string(),
        author: None,
        updated_at: None,
    })
}

pub(crate) fn collection(name: &str, description: Option<&str>) -> CollectionMetadata {
    CollectionMetadata {
        id: "col-1".into(),
        name: name.into(),
        description: description.map(str::to_string),
    }
}

impl DocumentSource for MemorySource {
    async fn collection_metadata(&self, collection_id: &str) -> Result<CollectionMetadata> {
        if let Some(stub) = &self.metadata_failure {
            return Err(failure(stub, collection_id));
        }
        self.metadata
            .clone()
            .ok_or_else(|| DocbinderError::not_found("collection", collection_id))
    }

    async fn document_tree(&self, collection_id: &str) -> Result<Vec<DocumentNode>> {
        if let Some(stub) = &self.tree_failure {
            return Err(failure(stub, collection_id));
        }
        Ok(self.tree.clone())
    }

    async fn document_content(&self, document_id: &str) -> Result<DocumentContent> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(document_id) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.documents.get(document_id) {
            Some(Stub::Found(content)) => Ok(content.clone()),
            Some(stub) => Err(failure(stub, document_id)),
            None => Err(failure(&Stub::Missing, document_id)),
        }
    }
}

/// The error a scripted failure stands for.
fn failure(stub: &Stub, id: &str) -> DocbinderError {
    match stub {
        Stub::Unauthorized => DocbinderError::Unauthenticated {
            message: "token revoked".into(),
        },
        Stub::RateLimited => DocbinderError::RateLimited {
            message: "slow down".into(),
        },
        Stub::Timeout => DocbinderError::Connection(format!("{id}: operation timed out")),
        Stub::Missing | Stub::Found(_) => {
            DocbinderError::not_found("document", format!("{id}: Resource not found"))
        }
    }
}
