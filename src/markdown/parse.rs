// src/markdown/parse.rs
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};

use crate::markdown::ast::{Block, Inline, List, ListItem, Table, TableCell};

/// Shared comrak options: the same extension set is used for parsing the
/// entry markdown and for the final markdown -> HTML rendering, so the two
/// sides agree on what a table or a task item is.
pub fn comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

/// Parse markdown text into the owned block tree.
pub fn parse_markdown(source: &str) -> Vec<Block> {
    let arena = Arena::new();
    let root = parse_document(&arena, source, &comrak_options());
    collect_blocks(root)
}

fn collect_blocks<'a>(parent: &'a AstNode<'a>) -> Vec<Block> {
    parent.children().filter_map(block_from_node).collect()
}

fn block_from_node<'a>(node: &'a AstNode<'a>) -> Option<Block> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::Paragraph => Some(Block::Paragraph(collect_inlines(node))),
        NodeValue::Heading(heading) => Some(Block::Heading {
            level: heading.level,
            inlines: collect_inlines(node),
        }),
        NodeValue::List(list) => Some(Block::List(List {
            ordered: matches!(list.list_type, ListType::Ordered),
            start: list.start,
            items: node.children().filter_map(item_from_node).collect(),
        })),
        NodeValue::Table(_) => Some(Block::Table(table_from_node(node))),
        NodeValue::CodeBlock(code) => Some(Block::CodeBlock {
            info: code.info.clone(),
            literal: code.literal.clone(),
        }),
        NodeValue::BlockQuote => Some(Block::BlockQuote(collect_blocks(node))),
        NodeValue::HtmlBlock(html) => Some(Block::HtmlBlock(html.literal.clone())),
        NodeValue::ThematicBreak => Some(Block::ThematicBreak),
        // Anything else (front matter, footnote machinery) is dropped; the
        // enabled extensions above do not produce those kinds.
        _ => None,
    }
}

fn item_from_node<'a>(node: &'a AstNode<'a>) -> Option<ListItem> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::Item(_) => Some(ListItem {
            task: None,
            blocks: collect_blocks(node),
        }),
        NodeValue::TaskItem(symbol) => Some(ListItem {
            task: Some(symbol.is_some()),
            blocks: collect_blocks(node),
        }),
        _ => None,
    }
}

fn table_from_node<'a>(node: &'a AstNode<'a>) -> Table {
    let mut header: Vec<TableCell> = Vec::new();
    let mut rows: Vec<Vec<TableCell>> = Vec::new();

    for row in node.children() {
        let is_header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
        let cells: Vec<TableCell> = row
            .children()
            .filter(|cell| matches!(cell.data.borrow().value, NodeValue::TableCell))
            .map(collect_inlines)
            .collect();
        if is_header && header.is_empty() {
            header = cells;
        } else {
            rows.push(cells);
        }
    }

    Table { header, rows }
}

fn collect_inlines<'a>(parent: &'a AstNode<'a>) -> Vec<Inline> {
    parent.children().filter_map(inline_from_node).collect()
}

fn inline_from_node<'a>(node: &'a AstNode<'a>) -> Option<Inline> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::Text(text) => Some(Inline::Text(text.clone())),
        NodeValue::Code(code) => Some(Inline::Code(code.literal.clone())),
        NodeValue::HtmlInline(html) => Some(Inline::Html(html.clone())),
        NodeValue::SoftBreak => Some(Inline::SoftBreak),
        NodeValue::LineBreak => Some(Inline::LineBreak),
        NodeValue::Emph => Some(Inline::Emph(collect_inlines(node))),
        NodeValue::Strong => Some(Inline::Strong(collect_inlines(node))),
        NodeValue::Strikethrough => Some(Inline::Strikethrough(collect_inlines(node))),
        NodeValue::Link(link) => Some(Inline::Link {
            url: link.url.clone(),
            title: link.title.clone(),
            children: collect_inlines(node),
        }),
        NodeValue::Image(link) => Some(Inline::Image {
            url: link.url.clone(),
            title: link.title.clone(),
            alt: collect_inlines(node),
        }),
        _ => None,
    }
}
