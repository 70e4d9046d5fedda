//! Single-file HTML assembler.
//!
//! Takes the collection metadata and the ordered document records and
//! produces one self-contained HTML document: header, description, table of
//! contents, and one section per record. Pure function of its inputs and the
//! injected compilation timestamp.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use docbinder_markdown::{RenderOptions, escape_html, render};
use docbinder_shared::{CollectionMetadata, CompilationResult, DocumentRecord};

/// Horizontal indentation per tree level, in pixels.
pub const INDENT_STEP_PX: usize = 20;

/// Levels to push document headings down so they nest under the `<h2>`
/// section title.
const CONTENT_HEADING_OFFSET: usize = 2;

/// Anchor prefix for headings inside the collection description.
const DESCRIPTION_ANCHOR: &str = "collection-description";

const STYLESHEET: &str = r#"body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    max-width: 900px;
    margin: 0 auto;
    padding: 20px;
    color: #333;
}
.header { border-bottom: 3px solid #2684FF; padding-bottom: 20px; margin-bottom: 40px; }
.header h1 { margin: 0 0 10px 0; color: #2684FF; }
.header .meta { color: #666; font-size: 0.9em; }
.collection-description { background: #f5f5f5; padding: 15px; border-radius: 5px; margin-bottom: 30px; }
.toc { background: #f9f9f9; border: 1px solid #ddd; padding: 20px; margin-bottom: 40px; border-radius: 5px; }
.toc h2 { margin-top: 0; }
.toc ul { list-style-type: none; padding-left: 0; }
.toc li { margin: 5px 0; }
.document { margin-bottom: 60px; page-break-inside: avoid; }
.document-header { border-left: 4px solid #2684FF; padding-left: 15px; margin-bottom: 20px; }
.document-title { margin: 0 0 5px 0; color: #2684FF; }
.document-meta { color: #666; font-size: 0.85em; }
.document-content { padding-left: 20px; }
pre { background: #f5f5f5; padding: 15px; border-radius: 5px; overflow-x: auto; }
code { background: #f5f5f5; padding: 2px 6px; border-radius: 3px; font-family: "Courier New", Courier, monospace; }
pre code { background: none; padding: 0; }
pre.raw-markup { white-space: pre-wrap; }
table { border-collapse: collapse; width: 100%; margin: 20px 0; }
th, td { border: 1px solid #ddd; padding: 12px; text-align: left; }
th { background: #f5f5f5; font-weight: bold; }
blockquote { border-left: 4px solid #ddd; padding-left: 15px; margin-left: 0; color: #666; }
img { max-width: 100%; height: auto; }
a { color: #2684FF; text-decoration: none; }
a:hover { text-decoration: underline; }
@media print {
    body { max-width: 100%; }
    .document { page-break-after: always; }
}"#;

/// Inputs that are not part of the compilation data itself.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Wall-clock time of the run, shown in the header.
    pub compiled_at: DateTime<Utc>,
}

/// A document whose body could not be rendered and was included as
/// escaped raw markup instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedDocument {
    pub id: String,
    pub title: String,
    pub reason: String,
}

/// Output of [`assemble`].
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub html: String,
    pub degraded: Vec<DegradedDocument>,
}

/// Assemble the complete HTML document.
///
/// Records must already be in traversal order; the table of contents and the
/// sections are both emitted in that order.
#[instrument(skip_all, fields(collection = %result.metadata.name, documents = result.records.len()))]
pub fn assemble(result: &CompilationResult, opts: &AssembleOptions) -> AssembledDocument {
    debug_assert!(
        result.records.windows(2).all(|w| w[0].index < w[1].index),
        "records must be in traversal order"
    );

    let mut html = String::new();
    let mut degraded = Vec::new();

    write_head(&mut html, &result.metadata);
    write_header(&mut html, &result.metadata, opts.compiled_at);
    write_description(&mut html, &result.metadata);
    write_toc(&mut html, &result.records);

    html.push_str("<main>\n");
    for record in &result.records {
        if let Some(d) = write_section(&mut html, record) {
            degraded.push(d);
        }
    }
    html.push_str("</main>\n</body>\n</html>\n");

    debug!(
        html_len = html.len(),
        degraded = degraded.len(),
        "HTML assembly complete"
    );

    AssembledDocument { html, degraded }
}

/// Stable, unique anchor for a document id.
///
/// ASCII alphanumerics and `-` are kept; every other byte (including `_`)
/// becomes `_xx`, so distinct ids always map to distinct anchors. An `_` is
/// always followed by two hex digits, which keeps section anchors apart from
/// the `_h-` / `_fn-` ids the renderer derives from them.
pub fn anchor_for(id: &str) -> String {
    let mut anchor = String::with_capacity(id.len() + 4);
    anchor.push_str("doc-");
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            anchor.push(byte as char);
        } else {
            let _ = write!(anchor, "_{byte:02x}");
        }
    }
    anchor
}

/// Indentation for a given depth, strictly increasing with depth.
pub fn indent_px(depth: usize) -> usize {
    depth * INDENT_STEP_PX
}

// ---------------------------------------------------------------------------
// Sections of the page
// ---------------------------------------------------------------------------

fn write_head(html: &mut String, meta: &CollectionMetadata) {
    let _ = write!(
        html,
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <meta name=\"generator\" content=\"docbinder\">\n\
         <title>{}</title>\n\
         <style>\n{STYLESHEET}\n</style>\n\
         </head>\n\
         <body>\n",
        escape_html(&meta.name)
    );
}

fn write_header(html: &mut String, meta: &CollectionMetadata, compiled_at: DateTime<Utc>) {
    let _ = write!(
        html,
        "<header class=\"header\">\n\
         <h1>{}</h1>\n\
         <div class=\"meta\">Compiled on {}</div>\n\
         </header>\n",
        escape_html(&meta.name),
        compiled_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

fn write_description(html: &mut String, meta: &CollectionMetadata) {
    let Some(description) = meta.description.as_deref().filter(|d| !d.trim().is_empty()) else {
        return;
    };

    let opts = RenderOptions {
        anchor_prefix: DESCRIPTION_ANCHOR.to_string(),
        heading_offset: CONTENT_HEADING_OFFSET,
    };
    let body = render(description, &opts).unwrap_or_else(|e| {
        warn!(error = %e, "collection description could not be rendered");
        format!("<p>{}</p>\n", escape_html(description))
    });

    let _ = write!(
        html,
        "<div class=\"collection-description\">\n\
         <h3>Collection Description</h3>\n\
         {body}\
         </div>\n"
    );
}

fn write_toc(html: &mut String, records: &[DocumentRecord]) {
    html.push_str("<nav class=\"toc\">\n<h2>Table of Contents</h2>\n<ul>\n");
    for record in records {
        let _ = writeln!(
            html,
            "<li class=\"depth-{depth}\" style=\"padding-left: {indent}px\"><a href=\"#{anchor}\">{title}</a></li>",
            depth = record.depth,
            indent = indent_px(record.depth),
            anchor = anchor_for(&record.id),
            title = escape_html(&record.title),
        );
    }
    html.push_str("</ul>\n</nav>\n");
}

/// Write one document section. Returns the degradation, if rendering failed.
fn write_section(html: &mut String, record: &DocumentRecord) -> Option<DegradedDocument> {
    let anchor = anchor_for(&record.id);
    let opts = RenderOptions {
        anchor_prefix: anchor.clone(),
        heading_offset: CONTENT_HEADING_OFFSET,
    };

    let (body, degraded) = match render(&record.body, &opts) {
        Ok(body) => (body, None),
        Err(e) => {
            warn!(id = %record.id, title = %record.title, error = %e, "falling back to raw markup");
            (
                format!("<pre class=\"raw-markup\">{}</pre>\n", escape_html(&record.body)),
                Some(DegradedDocument {
                    id: record.id.clone(),
                    title: record.title.clone(),
                    reason: e.to_string(),
                }),
            )
        }
    };

    let _ = write!(
        html,
        "<section class=\"document depth-{depth}\" id=\"{anchor}\" style=\"margin-left: {indent}px\">\n\
         <div class=\"document-header\">\n\
         <h2 class=\"document-title\">{title}</h2>\n",
        depth = record.depth,
        indent = indent_px(record.depth),
        title = escape_html(&record.title),
    );

    if let Some(byline) = byline(record) {
        let _ = writeln!(html, "<div class=\"document-meta\">{byline}</div>");
    }

    let _ = write!(
        html,
        "</div>\n\
         <div class=\"document-content\">\n\
         {body}\
         </div>\n\
         </section>\n"
    );

    degraded
}

/// `Author: … | Updated: YYYY-MM-DD`, with absent parts left out entirely.
fn byline(record: &DocumentRecord) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(author) = record.author.as_deref().filter(|a| !a.trim().is_empty()) {
        parts.push(format!("Author: {}", escape_html(author)));
    }
    if let Some(updated) = record.updated_at {
        parts.push(format!("Updated: {}", updated.format("%Y-%m-%d")));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
