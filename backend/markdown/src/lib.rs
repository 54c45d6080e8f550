//! Markdown rendering for model replies
//!
//! Turns the Markdown a model returns into terminal text, HTML fragments,
//! and paginated PDF exports.

pub mod export;
pub mod ir;
pub mod renderer;

pub use export::{render_pdf, DocumentExporter, ExportOptions};
pub use ir::{IrParser, MarkdownNode};
pub use renderer::{PlainBlock, Renderer};
