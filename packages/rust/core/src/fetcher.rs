//! Resolves flattened tree nodes into fully populated document records.
//!
//! Content calls may run concurrently, but results are always yielded back
//! in traversal order.

use futures_util::{StreamExt, stream};
use tracing::{debug, instrument, warn};

use docbinder_client::DocumentSource;
use docbinder_shared::{DocumentContent, DocumentRecord, Result};

use crate::pipeline::ProgressReporter;
use crate::traverse::FlatNode;

/// Default number of concurrent document fetches.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Title used when neither the document nor the tree node has one.
const UNTITLED: &str = "Untitled";

/// Options for [`resolve`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum in-flight content calls (values below 1 are treated as 1).
    pub concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// A document left out of the compilation, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub id: String,
    pub title: String,
    /// Traversal position the document would have occupied.
    pub index: usize,
    pub reason: String,
}

/// Records in traversal order plus everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub records: Vec<DocumentRecord>,
    pub skipped: Vec<SkippedDocument>,
}

/// Fetch the content of every node, in order.
///
/// Each record's `index` is the node's position in `nodes`, so skipping a
/// document leaves a gap but never reorders the rest. Missing documents and
/// per-document transport failures are skipped; credential and rate-limit
/// errors abort.
#[instrument(skip_all, fields(documents = nodes.len(), concurrency = opts.concurrency))]
pub async fn resolve<S: DocumentSource>(
    source: &S,
    nodes: &[FlatNode<'_>],
    opts: &FetchOptions,
    progress: &dyn ProgressReporter,
) -> Result<FetchOutcome> {
    let total = nodes.len();
    let mut outcome = FetchOutcome {
        records: Vec::with_capacity(total),
        skipped: Vec::new(),
    };

    // `buffered` (not `buffer_unordered`) yields in input order regardless of
    // which call finishes first.
    let mut results = stream::iter(nodes.iter().enumerate())
        .map(|(index, flat)| async move {
            let fetched = source.document_content(&flat.node.id).await;
            (index, *flat, fetched)
        })
        .buffered(opts.concurrency.max(1));

    let mut completed = 0;
    while let Some((index, flat, fetched)) = results.next().await {
        completed += 1;
        progress.document_fetched(&flat.node.title, completed, total);

        match fetched {
            Ok(content) => {
                debug!(id = %flat.node.id, index, depth = flat.depth, "document resolved");
                outcome.records.push(build_record(flat, index, content));
            }
            Err(e) if e.is_skippable() => {
                warn!(id = %flat.node.id, title = %flat.node.title, error = %e, "skipping document");
                outcome.skipped.push(SkippedDocument {
                    id: flat.node.id.clone(),
                    title: flat.node.title.clone(),
                    index,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(outcome)
}

fn build_record(flat: FlatNode<'_>, index: usize, content: DocumentContent) -> DocumentRecord {
    let title = [content.title.as_str(), flat.node.title.as_str()]
        .into_iter()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    DocumentRecord {
        id: flat.node.id.clone(),
        title,
        body: content.body,
        author: content.author,
        updated_at: content.updated_at,
        depth: flat.depth,
        index,
    }
}
