//! Markdown Intermediate Representation
//!
//! Parses model replies into a typed tree so the terminal and plain-text
//! renderers share one walk over the `pulldown-cmark` event stream.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MarkdownNode {
    Heading(u32, Vec<MarkdownNode>),
    Paragraph(Vec<MarkdownNode>),
    Text(String),
    InlineCode(String),
    CodeBlock(String, String), // language, content
    List(Option<u64>, Vec<MarkdownNode>), // start number for ordered lists
    ListItem(Vec<MarkdownNode>),
    Blockquote(Vec<MarkdownNode>),
    Emphasis(Vec<MarkdownNode>),
    Strong(Vec<MarkdownNode>),
    Link(String, Vec<MarkdownNode>), // url, label
    Image(String, String),           // url, alt_text
    LineBreak,
    Rule,
}

impl MarkdownNode {
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            MarkdownNode::Text(_)
                | MarkdownNode::InlineCode(_)
                | MarkdownNode::Emphasis(_)
                | MarkdownNode::Strong(_)
                | MarkdownNode::Link(..)
                | MarkdownNode::Image(..)
                | MarkdownNode::LineBreak
        )
    }
}

/// Open container while walking the event stream.
enum Frame {
    Heading(u32),
    Paragraph,
    CodeBlock(String, String),
    List(Option<u64>),
    ListItem,
    Blockquote,
    Emphasis,
    Strong,
    Link(String),
    Image(String),
    /// Containers without a node of their own (tables, footnotes); children
    /// are spliced into the parent.
    Transparent,
}

pub struct IrParser;

impl IrParser {
    /// Parse Markdown into a list of top-level nodes.
    pub fn parse(markdown: &str) -> Vec<MarkdownNode> {
        let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);
        let mut root: Vec<MarkdownNode> = Vec::new();
        let mut stack: Vec<(Frame, Vec<MarkdownNode>)> = Vec::new();

        for event in parser {
            match event {
                Event::Start(tag) => stack.push((frame_for(tag), Vec::new())),
                Event::End(_) => {
                    let Some((frame, children)) = stack.pop() else { continue };
                    let parent = match stack.last_mut() {
                        Some((_, siblings)) => siblings,
                        None => &mut root,
                    };
                    match close(frame, children) {
                        Closed::Node(node) => parent.push(node),
                        Closed::Splice(nodes) => parent.extend(nodes),
                    }
                }
                Event::Text(text) | Event::Html(text) => {
                    if let Some((Frame::CodeBlock(_, content), _)) = stack.last_mut() {
                        content.push_str(&text);
                    } else {
                        push_leaf(&mut stack, &mut root, MarkdownNode::Text(text.into_string()));
                    }
                }
                Event::Code(code) => {
                    push_leaf(&mut stack, &mut root, MarkdownNode::InlineCode(code.into_string()))
                }
                Event::SoftBreak => push_leaf(&mut stack, &mut root, MarkdownNode::Text(" ".into())),
                Event::HardBreak => push_leaf(&mut stack, &mut root, MarkdownNode::LineBreak),
                Event::Rule => push_leaf(&mut stack, &mut root, MarkdownNode::Rule),
                Event::TaskListMarker(done) => {
                    let marker = if done { "[x] " } else { "[ ] " };
                    push_leaf(&mut stack, &mut root, MarkdownNode::Text(marker.into()))
                }
                Event::FootnoteReference(label) => {
                    push_leaf(&mut stack, &mut root, MarkdownNode::Text(format!("[^{label}]")))
                }
            }
        }

        // Unclosed frames only happen on malformed streams; keep their content.
        while let Some((frame, children)) = stack.pop() {
            let parent = match stack.last_mut() {
                Some((_, siblings)) => siblings,
                None => &mut root,
            };
            match close(frame, children) {
                Closed::Node(node) => parent.push(node),
                Closed::Splice(nodes) => parent.extend(nodes),
            }
        }

        merge_text(root)
    }
}

fn frame_for(tag: Tag<'_>) -> Frame {
    match tag {
        Tag::Heading(level, _, _) => Frame::Heading(level as u32),
        Tag::Paragraph => Frame::Paragraph,
        Tag::CodeBlock(CodeBlockKind::Fenced(lang)) => {
            let lang = lang.split_whitespace().next().unwrap_or_default().to_string();
            Frame::CodeBlock(lang, String::new())
        }
        Tag::CodeBlock(CodeBlockKind::Indented) => Frame::CodeBlock(String::new(), String::new()),
        Tag::List(start) => Frame::List(start),
        Tag::Item => Frame::ListItem,
        Tag::BlockQuote => Frame::Blockquote,
        Tag::Emphasis => Frame::Emphasis,
        Tag::Strong => Frame::Strong,
        Tag::Link(_, url, _) => Frame::Link(url.into_string()),
        Tag::Image(_, url, _) => Frame::Image(url.into_string()),
        _ => Frame::Transparent,
    }
}

enum Closed {
    Node(MarkdownNode),
    Splice(Vec<MarkdownNode>),
}

fn close(frame: Frame, children: Vec<MarkdownNode>) -> Closed {
    let node = match frame {
        Frame::Heading(level) => MarkdownNode::Heading(level, merge_text(children)),
        Frame::Paragraph => MarkdownNode::Paragraph(merge_text(children)),
        Frame::CodeBlock(lang, content) => MarkdownNode::CodeBlock(lang, content),
        Frame::List(start) => MarkdownNode::List(start, children),
        Frame::ListItem => MarkdownNode::ListItem(merge_text(children)),
        Frame::Blockquote => MarkdownNode::Blockquote(children),
        Frame::Emphasis => MarkdownNode::Emphasis(merge_text(children)),
        Frame::Strong => MarkdownNode::Strong(merge_text(children)),
        Frame::Link(url) => MarkdownNode::Link(url, merge_text(children)),
        Frame::Image(url) => MarkdownNode::Image(url, plain_text(&children)),
        Frame::Transparent => return Closed::Splice(children),
    };
    Closed::Node(node)
}

fn push_leaf(
    stack: &mut [(Frame, Vec<MarkdownNode>)],
    root: &mut Vec<MarkdownNode>,
    node: MarkdownNode,
) {
    match stack.last_mut() {
        Some((_, children)) => children.push(node),
        None => root.push(node),
    }
}

/// Join adjacent text runs (the parser splits text at entities and breaks).
fn merge_text(nodes: Vec<MarkdownNode>) -> Vec<MarkdownNode> {
    let mut out: Vec<MarkdownNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match (out.last_mut(), node) {
            (Some(MarkdownNode::Text(prev)), MarkdownNode::Text(next)) => prev.push_str(&next),
            (_, node) => out.push(node),
        }
    }
    out
}

/// Flatten inline content to its visible text.
pub fn plain_text(nodes: &[MarkdownNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            MarkdownNode::Text(t) | MarkdownNode::InlineCode(t) => out.push_str(t),
            MarkdownNode::LineBreak => out.push('\n'),
            MarkdownNode::Image(_, alt) => out.push_str(alt),
            MarkdownNode::Heading(_, c)
            | MarkdownNode::Paragraph(c)
            | MarkdownNode::ListItem(c)
            | MarkdownNode::Blockquote(c)
            | MarkdownNode::Emphasis(c)
            | MarkdownNode::Strong(c)
            | MarkdownNode::Link(_, c)
            | MarkdownNode::List(_, c) => out.push_str(&plain_text(c)),
            MarkdownNode::CodeBlock(_, content) => out.push_str(content),
            MarkdownNode::Rule => {}
        }
    }
    out
}
