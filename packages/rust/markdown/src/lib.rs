//! Markdown-to-HTML rendering for compiled documents.
//!
//! Parses markdown with `pulldown-cmark` (tables, task lists, strikethrough,
//! footnotes), then rewrites the event stream before HTML generation:
//! - fenced code blocks get a `language-*` class for client-side highlighting
//! - headings get stable ids, namespaced per document, and are shifted down
//!   so they nest under the section title
//! - footnote ids are namespaced so several documents can share one page
//! - raw HTML in the source is escaped and shown as text

mod cleanup;

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use tracing::{debug, instrument};

use docbinder_shared::{DocbinderError, Result};

/// Largest markdown body we attempt to render (10 MB).
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Deepest heading level HTML supports.
const MAX_HEADING_LEVEL: usize = 6;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for rendering one markdown body.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Prefix for generated heading and footnote ids (e.g. the section anchor).
    /// Ids are `{prefix}_h-{slug}` and `{prefix}_fn-{n}`, so they can never
    /// equal a prefix produced by the assembler's anchor encoding. Empty means
    /// headings use the bare slug and footnotes `fn-{n}`.
    pub anchor_prefix: String,
    /// Number of levels to push headings down (`# A` with offset 2 → `<h3>`).
    pub heading_offset: usize,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Render markdown to an HTML fragment.
///
/// Malformed markup never fails: the parser recovers and unrecognized
/// constructs come out as text. Only oversized input or a parser panic
/// produce [`DocbinderError::RenderFailure`].
#[instrument(skip_all, fields(len = markdown.len(), prefix = %opts.anchor_prefix))]
pub fn render(markdown: &str, opts: &RenderOptions) -> Result<String> {
    if markdown.len() > MAX_INPUT_BYTES {
        return Err(DocbinderError::render(format!(
            "markdown body too large ({} bytes, max {MAX_INPUT_BYTES})",
            markdown.len()
        )));
    }

    let cleaned = cleanup::run_pipeline(markdown);

    let html = panic::catch_unwind(AssertUnwindSafe(|| render_cleaned(&cleaned, opts)))
        .map_err(|_| DocbinderError::render("markdown parser panicked"))?;

    debug!(html_len = html.len(), "markdown rendered");
    Ok(html)
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

fn render_cleaned(markdown: &str, opts: &RenderOptions) -> String {
    let parser = Parser::new_ext(markdown, parser_options());
    let events = EventRewriter::new(opts).rewrite(parser);

    let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turn heading text into an id fragment: lowercase alphanumerics (any
/// script) separated by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    slug
}

// ---------------------------------------------------------------------------
// Event rewriting
// ---------------------------------------------------------------------------

struct PendingHeading<'a> {
    level: usize,
    text: String,
    events: Vec<Event<'a>>,
}

struct PendingCode {
    lang: Option<String>,
    content: String,
}

impl PendingCode {
    fn new(kind: &CodeBlockKind<'_>) -> Self {
        let lang = match kind {
            CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
            CodeBlockKind::Indented => None,
        };
        Self {
            lang,
            content: String::new(),
        }
    }

    fn into_html(self) -> String {
        match self.lang {
            Some(lang) => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                escape_html(&lang),
                escape_html(&self.content)
            ),
            None => format!("<pre><code>{}</code></pre>\n", escape_html(&self.content)),
        }
    }
}

/// Stateful rewrite of one document's event stream.
struct EventRewriter<'o> {
    opts: &'o RenderOptions,
    /// Every id handed out in this document, headings and footnotes alike.
    used_ids: HashSet<String>,
    /// Footnote label → (id, display number).
    footnotes: HashMap<String, (String, usize)>,
}

impl<'o> EventRewriter<'o> {
    fn new(opts: &'o RenderOptions) -> Self {
        Self {
            opts,
            used_ids: HashSet::new(),
            footnotes: HashMap::new(),
        }
    }

    fn rewrite<'a>(mut self, events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::new();
        let mut heading: Option<PendingHeading<'a>> = None;
        let mut code: Option<PendingCode> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => code = Some(PendingCode::new(&kind)),
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = code.take() {
                        out.push(Event::Html(block.into_html().into()));
                    }
                }
                Event::Text(text) if code.is_some() => {
                    if let Some(block) = code.as_mut() {
                        block.content.push_str(&text);
                    }
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    heading = Some(PendingHeading {
                        level: level as usize,
                        text: String::new(),
                        events: Vec::new(),
                    });
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(pending) = heading.take() {
                        self.emit_heading(pending, &mut out);
                    }
                }
                other => {
                    let rewritten = self.rewrite_event(other);
                    match heading.as_mut() {
                        Some(pending) => {
                            if let Event::Text(t) | Event::Code(t) = &rewritten {
                                pending.text.push_str(t);
                            }
                            pending.events.push(rewritten);
                        }
                        None => out.push(rewritten),
                    }
                }
            }
        }

        out
    }

    fn rewrite_event<'a>(&mut self, event: Event<'a>) -> Event<'a> {
        match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::FootnoteReference(name) => {
                let (id, number) = self.footnote(&name);
                Event::Html(
                    format!(
                        "<sup class=\"footnote-reference\"><a href=\"#{id}\">{number}</a></sup>"
                    )
                    .into(),
                )
            }
            Event::Start(Tag::FootnoteDefinition(name)) => {
                let (id, number) = self.footnote(&name);
                Event::Html(
                    format!(
                        "<div class=\"footnote-definition\" id=\"{id}\">\
                         <sup class=\"footnote-definition-label\">{number}</sup>"
                    )
                    .into(),
                )
            }
            Event::End(TagEnd::FootnoteDefinition) => Event::Html(CowStr::Borrowed("</div>\n")),
            other => other,
        }
    }

    fn emit_heading<'a>(&mut self, pending: PendingHeading<'a>, out: &mut Vec<Event<'a>>) {
        let level = (pending.level + self.opts.heading_offset).min(MAX_HEADING_LEVEL);
        let id = self.unique_id(&pending.text);

        out.push(Event::Html(format!("<h{level} id=\"{id}\">").into()));
        out.extend(pending.events);
        out.push(Event::Html(format!("</h{level}>\n").into()));
    }

    /// Allocate a heading id unique within this document.
    fn unique_id(&mut self, text: &str) -> String {
        let slug = slugify(text);
        let slug = if slug.is_empty() { "section" } else { &slug };
        let base = if self.opts.anchor_prefix.is_empty() {
            slug.to_string()
        } else {
            format!("{}_h-{slug}", self.opts.anchor_prefix)
        };
        self.claim(base)
    }

    /// Stable id and display number for a footnote label.
    ///
    /// Numbers are assigned per label in order of first appearance, so two
    /// labels that slug identically still get distinct ids.
    fn footnote(&mut self, name: &str) -> (String, usize) {
        if let Some(known) = self.footnotes.get(name) {
            return known.clone();
        }

        let number = self.footnotes.len() + 1;
        let base = if self.opts.anchor_prefix.is_empty() {
            format!("fn-{number}")
        } else {
            format!("{}_fn-{number}", self.opts.anchor_prefix)
        };
        let id = self.claim(base);

        self.footnotes.insert(name.to_string(), (id.clone(), number));
        (id, number)
    }

    /// Reserve `base`, or the first free `base-N`.
    fn claim(&mut self, base: String) -> String {
        let mut candidate = base.clone();
        let mut n = 1;
        while self.used_ids.contains(&candidate) {
            candidate = format!("{base}-{n}");
            n += 1;
        }

        self.used_ids.insert(candidate.clone());
        candidate
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
