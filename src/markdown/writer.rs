//! Two-pass markdown writer.
//!
//! The same traversal renders a block twice: a collection pass that records
//! every substantial text run, and a substitution pass that replays the
//! traversal and swaps each run for its translated counterpart. Traversal
//! state lives in an explicit [`RenderPass`] value threaded through every
//! call, so the writer stays reentrant across concurrent entry tasks.

use crate::markdown::ast::{Block, Inline, List, Table, TableCell};
use crate::translate::{SpanCollection, TranslationMap};

/// Text runs with at most this many alphabetic characters render as-is and
/// are never collected; sending them to the backend wastes a round trip and
/// risks corrupting punctuation-only runs.
const SHORT_RUN_ALPHA_MAX: usize = 2;

/// Traversal context for one rendering pass over a block.
pub enum RenderPass<'a> {
    /// Text renders as written; no collection, no substitution.
    Verbatim,
    /// Collection pass: substantial runs are appended in traversal order.
    Collect(&'a mut SpanCollection),
    /// Substitution pass: the cursor replays the same traversal order and
    /// consumes one translated entry per substantial run.
    Substitute {
        map: &'a TranslationMap,
        cursor: usize,
    },
}

impl<'a> RenderPass<'a> {
    pub fn substitute(map: &'a TranslationMap) -> Self {
        RenderPass::Substitute { map, cursor: 0 }
    }

    fn emit_text(&mut self, raw: &str) -> String {
        let alpha = raw.chars().filter(|c| c.is_alphabetic()).count();
        if alpha <= SHORT_RUN_ALPHA_MAX {
            return raw.to_string();
        }
        match self {
            RenderPass::Verbatim => raw.to_string(),
            RenderPass::Collect(spans) => {
                spans.push(raw);
                raw.to_string()
            }
            RenderPass::Substitute { map, cursor } => {
                // A missing index falls back to the original run; a failed
                // translation must never drop content.
                let out = map.get(cursor).cloned().unwrap_or_else(|| raw.to_string());
                *cursor += 1;
                out
            }
        }
    }
}

pub fn render_blocks(blocks: &[Block], pass: &mut RenderPass) -> String {
    blocks.iter().map(|b| render_block(b, pass)).collect()
}

pub fn render_block(block: &Block, pass: &mut RenderPass) -> String {
    match block {
        Block::Paragraph(inlines) => format!("{}\n\n", render_inlines(inlines, pass)),
        Block::Heading { level, inlines } => format!(
            "{} {}\n\n",
            "#".repeat(usize::from(*level)),
            render_inlines(inlines, pass)
        ),
        Block::List(list) => format!("{}\n", render_list(list, pass)),
        Block::Table(table) => format!("{}\n", render_table(table, pass)),
        Block::CodeBlock { info, literal } => {
            let mut out = format!("```{info}\n{literal}");
            if !literal.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n\n");
            out
        }
        Block::BlockQuote(blocks) => quote(&render_blocks(blocks, pass)),
        Block::HtmlBlock(literal) => format!("{}\n\n", literal.trim_end()),
        Block::ThematicBreak => "---\n\n".to_string(),
    }
}

/// Prefix every line of `body` with a blockquote marker.
pub fn quote(body: &str) -> String {
    let mut out = String::new();
    for line in body.trim_end().lines() {
        if line.is_empty() {
            out.push_str(">\n");
        } else {
            out.push_str("> ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

fn render_list(list: &List, pass: &mut RenderPass) -> String {
    let mut out = String::new();
    for (i, item) in list.items.iter().enumerate() {
        let mut marker = if list.ordered {
            format!("{}. ", list.start + i)
        } else {
            "- ".to_string()
        };
        if let Some(checked) = item.task {
            marker.push_str(if checked { "[x] " } else { "[ ] " });
        }
        let indent = " ".repeat(marker.len());

        // Nested lists render through the same pass by plain recursion; a
        // sub-list never opens its own collection.
        let body = render_blocks(&item.blocks, pass);
        let body = body.trim_end();
        if body.is_empty() {
            out.push_str(marker.trim_end());
            out.push('\n');
            continue;
        }
        for (j, line) in body.lines().enumerate() {
            if j == 0 {
                out.push_str(&marker);
                out.push_str(line);
            } else if !line.is_empty() {
                out.push_str(&indent);
                out.push_str(line);
            }
            out.push('\n');
        }
    }
    out
}

fn render_table(table: &Table, pass: &mut RenderPass) -> String {
    let mut out = String::new();
    if !table.header.is_empty() {
        out.push_str(&render_row(&table.header, pass));
        out.push_str(&separator_line(table.header.len()));
    }
    for row in &table.rows {
        out.push_str(&render_row(row, pass));
    }
    out
}

fn render_row(cells: &[TableCell], pass: &mut RenderPass) -> String {
    let rendered: Vec<String> = cells.iter().map(|c| render_inlines(c, pass)).collect();
    format!("| {} |\n", rendered.join(" | "))
}

/// Structural formatting only: the header separator is generated from the
/// column count and never participates in collection or substitution.
fn separator_line(columns: usize) -> String {
    format!("| {} |\n", vec!["---"; columns].join(" | "))
}

pub fn render_inlines(inlines: &[Inline], pass: &mut RenderPass) -> String {
    inlines.iter().map(|i| render_inline(i, pass)).collect()
}

fn render_inline(inline: &Inline, pass: &mut RenderPass) -> String {
    match inline {
        Inline::Text(raw) => pass.emit_text(raw),
        Inline::Code(literal) => format!("`{literal}`"),
        Inline::Html(raw) => raw.clone(),
        Inline::SoftBreak => "\n".to_string(),
        Inline::LineBreak => "  \n".to_string(),
        Inline::Emph(children) => format!("*{}*", render_inlines(children, pass)),
        Inline::Strong(children) => format!("**{}**", render_inlines(children, pass)),
        Inline::Strikethrough(children) => format!("~~{}~~", render_inlines(children, pass)),
        Inline::Link {
            url,
            title,
            children,
        } => {
            let text = render_inlines(children, pass);
            if title.is_empty() {
                format!("[{text}]({url})")
            } else {
                format!("[{text}]({url} \"{title}\")")
            }
        }
        Inline::Image { url, title, alt } => {
            let text = render_inlines(alt, pass);
            if title.is_empty() {
                format!("![{text}]({url})")
            } else {
                format!("![{text}]({url} \"{title}\")")
            }
        }
    }
}
