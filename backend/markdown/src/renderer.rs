//! Renderers for the Markdown IR
//!
//! Replies are shown as ANSI text in the terminal, as plain text when color
//! is off, and as HTML in the browser page and exported documents.

use pulldown_cmark::{html, Event, Options, Parser};

use crate::ir::{IrParser, MarkdownNode};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

pub struct Renderer;

/// One top-level block of plain text, for paginated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainBlock {
    pub text: String,
    pub heading: bool,
}

impl Renderer {
    /// Renders AST for a terminal. With `color` off the output carries no
    /// escape sequences.
    pub fn to_terminal(nodes: &[MarkdownNode], color: bool) -> String {
        let style = Style { color };
        render_blocks(nodes, style).join("\n\n")
    }

    /// Renders AST to uncolored blocks, keeping block boundaries so a
    /// paginator can avoid splitting them.
    pub fn to_plain_blocks(nodes: &[MarkdownNode]) -> Vec<PlainBlock> {
        tagged_blocks(nodes, Style { color: false })
    }

    /// Parse and render in one step.
    pub fn markdown_to_terminal(markdown: &str, color: bool) -> String {
        Self::to_terminal(&IrParser::parse(markdown), color)
    }

    /// Renders Markdown to an HTML fragment. Raw HTML in the input is shown
    /// as text rather than passed through.
    pub fn to_html(markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(markdown, options).map(|event| match event {
            Event::Html(raw) => Event::Text(raw),
            other => other,
        });
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

#[derive(Clone, Copy)]
struct Style {
    color: bool,
}

impl Style {
    fn paint(self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Render a sequence of nodes as blocks. Runs of inline nodes (tight list
/// items carry them without a paragraph) form one block.
fn render_blocks(nodes: &[MarkdownNode], style: Style) -> Vec<String> {
    tagged_blocks(nodes, style).into_iter().map(|b| b.text).collect()
}

fn tagged_blocks(nodes: &[MarkdownNode], style: Style) -> Vec<PlainBlock> {
    let mut blocks = Vec::new();
    let mut inline_run: Vec<MarkdownNode> = Vec::new();
    let inline_block = |run: &[MarkdownNode]| PlainBlock {
        text: render_inline(run, style),
        heading: false,
    };

    for node in nodes {
        if node.is_inline() {
            inline_run.push(node.clone());
            continue;
        }
        if !inline_run.is_empty() {
            blocks.push(inline_block(&inline_run));
            inline_run.clear();
        }
        blocks.push(PlainBlock {
            text: render_block(node, style),
            heading: matches!(node, MarkdownNode::Heading(..)),
        });
    }
    if !inline_run.is_empty() {
        blocks.push(inline_block(&inline_run));
    }

    blocks.retain(|b| !b.text.is_empty());
    blocks
}

fn render_block(node: &MarkdownNode, style: Style) -> String {
    match node {
        MarkdownNode::Heading(_, children) => {
            let text = render_inline(children, style);
            if style.color {
                format!("{BOLD}{CYAN}{text}{RESET}")
            } else {
                text
            }
        }
        MarkdownNode::Paragraph(children) => render_inline(children, style),
        MarkdownNode::CodeBlock(lang, content) => {
            let body = content
                .trim_end_matches('\n')
                .lines()
                .map(|line| format!("    {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            let body = style.paint(DIM, &body);
            if lang.is_empty() {
                body
            } else {
                format!("  {}\n{}", style.paint(YELLOW, &format!("[{lang}]")), body)
            }
        }
        MarkdownNode::List(start, items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let marker = match start {
                    Some(n) => format!("{}.", n + i as u64),
                    None => "-".to_string(),
                };
                let children = match item {
                    MarkdownNode::ListItem(children) => children.as_slice(),
                    other => std::slice::from_ref(other),
                };
                hang(&marker, &render_blocks(children, style).join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        MarkdownNode::ListItem(children) => hang("-", &render_blocks(children, style).join("\n")),
        MarkdownNode::Blockquote(children) => render_blocks(children, style)
            .join("\n\n")
            .lines()
            .map(|line| format!("{} {line}", style.paint(DIM, "│")))
            .collect::<Vec<_>>()
            .join("\n"),
        MarkdownNode::Rule => style.paint(DIM, &"─".repeat(40)),
        inline => render_inline(std::slice::from_ref(inline), style),
    }
}

/// Prefix the first line with `marker` and indent the rest to match.
fn hang(marker: &str, body: &str) -> String {
    let pad = " ".repeat(marker.chars().count() + 1);
    body.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{marker} {line}")
            } else if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_inline(nodes: &[MarkdownNode], style: Style) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            MarkdownNode::Text(text) => out.push_str(text),
            MarkdownNode::InlineCode(code) => out.push_str(&style.paint(YELLOW, code)),
            MarkdownNode::Emphasis(children) => {
                out.push_str(&style.paint(ITALIC, &render_inline(children, style)))
            }
            MarkdownNode::Strong(children) => {
                out.push_str(&style.paint(BOLD, &render_inline(children, style)))
            }
            MarkdownNode::Link(url, children) => {
                let label = render_inline(children, style);
                if label == *url || label.is_empty() {
                    out.push_str(url);
                } else {
                    out.push_str(&format!("{label} ({url})"));
                }
            }
            MarkdownNode::Image(url, alt) => out.push_str(&format!("[image: {alt}] ({url})")),
            MarkdownNode::LineBreak => out.push('\n'),
            block => out.push_str(&render_block(block, style)),
        }
    }
    out
}
