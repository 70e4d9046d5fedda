//! End-to-end compile pipeline: metadata → tree → flatten → fetch → assemble.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use docbinder_client::DocumentSource;
use docbinder_shared::{CollectionMetadata, CompilationResult, Result};

use crate::assembler::{self, AssembleOptions, DegradedDocument};
use crate::fetcher::{self, FetchOptions, SkippedDocument};
use crate::traverse;

/// Configuration for [`compile_collection`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Collection to compile.
    pub collection_id: String,
    /// Document fetch settings.
    pub fetch: FetchOptions,
    /// Timestamp shown in the header. Defaults to the current time; fixed in
    /// tests so output is reproducible.
    pub compiled_at: Option<DateTime<Utc>>,
}

impl CompileOptions {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            fetch: FetchOptions::default(),
            compiled_at: None,
        }
    }
}

/// Result of [`compile_collection`].
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// The assembled HTML document.
    pub html: String,
    pub collection: CollectionMetadata,
    /// Number of sections in the output.
    pub document_count: usize,
    pub skipped: Vec<SkippedDocument>,
    pub degraded: Vec<DegradedDocument>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per document, in traversal order, after its fetch settles.
    fn document_fetched(&self, title: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &CompileReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_fetched(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &CompileReport) {}
}

/// Compile one collection into a single HTML document.
///
/// Metadata and tree failures abort the run. Individual documents that
/// cannot be fetched are skipped and listed in the report.
#[instrument(skip_all, fields(collection_id = %opts.collection_id))]
pub async fn compile_collection<S: DocumentSource>(
    source: &S,
    opts: &CompileOptions,
    progress: &dyn ProgressReporter,
) -> Result<CompileReport> {
    let start = Instant::now();
    info!("starting compilation");

    // --- Phase 1: Metadata ---
    progress.phase("Fetching collection metadata");
    let metadata = source.collection_metadata(&opts.collection_id).await?;
    info!(name = %metadata.name, "collection found");

    // --- Phase 2: Tree ---
    progress.phase("Fetching document tree");
    let forest = source.document_tree(&opts.collection_id).await?;
    let flat = traverse::flatten(&forest)?;
    info!(documents = flat.len(), "document tree flattened");

    // --- Phase 3: Documents ---
    progress.phase("Fetching documents");
    let outcome = fetcher::resolve(source, &flat, &opts.fetch, progress).await?;
    if !outcome.skipped.is_empty() {
        warn!(skipped = outcome.skipped.len(), "some documents were skipped");
    }

    // --- Phase 4: Assemble ---
    progress.phase("Assembling HTML");
    let result = CompilationResult {
        metadata,
        records: outcome.records,
    };
    let assemble_opts = AssembleOptions {
        compiled_at: opts.compiled_at.unwrap_or_else(Utc::now),
    };
    let assembled = assembler::assemble(&result, &assemble_opts);

    let report = CompileReport {
        html: assembled.html,
        document_count: result.records.len(),
        collection: result.metadata,
        skipped: outcome.skipped,
        degraded: assembled.degraded,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        documents = report.document_count,
        skipped = report.skipped.len(),
        degraded = report.degraded.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "compilation complete"
    );

    Ok(report)
}
