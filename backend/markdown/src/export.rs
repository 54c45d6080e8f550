//! PDF export
//!
//! Lays the conversation history and latest reply out on US letter pages in
//! portrait orientation and writes them as a PDF. Text is set in the PDF
//! base Courier faces, so no font files are needed and line width is a
//! fixed column count.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::info;

use crate::ir::IrParser;
use crate::renderer::{PlainBlock, Renderer};

const PAGE_WIDTH_IN: f32 = 8.5;
const PAGE_HEIGHT_IN: f32 = 11.0;
const POINTS_PER_INCH: f32 = 72.0;
const MM_PER_INCH: f32 = 25.4;
const FONT_SIZE_PT: f32 = 10.0;
const LINE_HEIGHT_PT: f32 = 13.0;
/// Courier advance width as a fraction of the font size.
const COURIER_ADVANCE: f32 = 0.6;

pub const HISTORY_HEADING: &str = "Conversation History:";
pub const REPLY_HEADING: &str = "CodeContextAI says:";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub title: String,
    pub file_name: String,
    pub margin_inches: f32,
    /// Move a block to the next page rather than split it, unless the block
    /// is taller than a page.
    pub avoid_page_breaks: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: "CodeContextAI".to_string(),
            file_name: "CodeContextA.pdf".to_string(),
            margin_inches: 1.0,
            avoid_page_breaks: true,
        }
    }
}

/// Writes export documents into one output directory.
pub struct DocumentExporter {
    pub output_dir: PathBuf,
}

impl DocumentExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    /// Render and write the PDF, returning the written path.
    pub async fn export(
        &self,
        transcript: &str,
        latest_reply: &str,
        options: &ExportOptions,
    ) -> Result<PathBuf> {
        let path = self.target_path(&options.file_name)?;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let pdf = render_pdf(transcript, latest_reply, options)?;
        tokio::fs::write(&path, &pdf)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = pdf.len(), "Exported conversation");
        Ok(path)
    }

    fn target_path(&self, file_name: &str) -> Result<PathBuf> {
        let name = file_name.trim();
        if name.is_empty() {
            bail!("export file name is empty");
        }
        let candidate = Path::new(name);
        if candidate.components().count() != 1 || candidate.file_name().is_none() {
            bail!("export file name must not contain path separators: {name}");
        }
        Ok(self.output_dir.join(candidate))
    }
}

/// Build the PDF bytes. Both section headings are always present, even when
/// the conversation is empty.
pub fn render_pdf(transcript: &str, latest_reply: &str, options: &ExportOptions) -> Result<Vec<u8>> {
    let grid = PageGrid::for_margin(options.margin_inches);
    let blocks = document_lines(transcript, latest_reply, grid.columns);
    let pages = paginate(&blocks, grid.rows, options.avoid_page_breaks);

    let width = Mm(PAGE_WIDTH_IN * MM_PER_INCH);
    let height = Mm(PAGE_HEIGHT_IN * MM_PER_INCH);
    let (doc, first_page, first_layer) =
        PdfDocument::new(options.title.as_str(), width, height, "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| anyhow!("loading Courier: {e}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::CourierBold)
        .map_err(|e| anyhow!("loading Courier-Bold: {e}"))?;

    let left = Mm(grid.margin_inches * MM_PER_INCH);
    let top_pt = (PAGE_HEIGHT_IN - grid.margin_inches) * POINTS_PER_INCH - FONT_SIZE_PT;
    let mut first = Some((first_page, first_layer));
    for page in &pages {
        let (page_index, layer_index) = first
            .take()
            .unwrap_or_else(|| doc.add_page(width, height, "Layer 1"));
        let layer = doc.get_page(page_index).get_layer(layer_index);
        for (row, line) in page.iter().enumerate() {
            if line.text.is_empty() {
                continue;
            }
            let baseline_pt = top_pt - row as f32 * LINE_HEIGHT_PT;
            let font = if line.bold { &bold } else { &regular };
            layer.use_text(
                line.text.as_str(),
                FONT_SIZE_PT,
                left,
                Mm(baseline_pt / POINTS_PER_INCH * MM_PER_INCH),
                font,
            );
        }
    }

    doc.save_to_bytes().map_err(|e| anyhow!("writing PDF: {e}"))
}

/// Text area of one page, in Courier cells.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageGrid {
    margin_inches: f32,
    columns: usize,
    rows: usize,
}

impl PageGrid {
    fn for_margin(margin_inches: f32) -> Self {
        let margin_inches = margin_inches.clamp(0.0, 3.0);
        let width_pt = (PAGE_WIDTH_IN - 2.0 * margin_inches) * POINTS_PER_INCH;
        let height_pt = (PAGE_HEIGHT_IN - 2.0 * margin_inches) * POINTS_PER_INCH;
        Self {
            margin_inches,
            columns: ((width_pt / (FONT_SIZE_PT * COURIER_ADVANCE)) as usize).max(20),
            rows: ((height_pt / LINE_HEIGHT_PT) as usize).max(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    text: String,
    bold: bool,
}

impl Line {
    fn blank() -> Self {
        Self { text: String::new(), bold: false }
    }
}

/// Headings and rendered Markdown, each block wrapped to `columns`.
fn document_lines(transcript: &str, latest_reply: &str, columns: usize) -> Vec<Vec<Line>> {
    let heading = |text: &str| PlainBlock { text: text.to_string(), heading: true };

    let mut blocks = vec![heading(HISTORY_HEADING)];
    blocks.extend(Renderer::to_plain_blocks(&IrParser::parse(transcript)));
    blocks.push(heading(REPLY_HEADING));
    blocks.extend(Renderer::to_plain_blocks(&IrParser::parse(latest_reply)));

    blocks
        .into_iter()
        .map(|block| {
            wrap(&block.text, columns)
                .into_iter()
                .map(|text| Line { text, bold: block.heading })
                .collect()
        })
        .collect()
}

/// Base fonts only cover a single-byte encoding.
fn sanitize(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.trim_end().chars() {
        match c {
            '\t' => out.push_str("    "),
            '│' => out.push('|'),
            '─' => out.push('-'),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Word-wrap to `columns`, hard-breaking words that are longer than a line.
/// Leading indentation is never a break point.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let mut line = sanitize(raw);
        while line.len() > columns {
            let indent = line.len() - line.trim_start().len();
            let split = line[..=columns]
                .rfind(' ')
                .filter(|&i| i > indent)
                .unwrap_or(columns);
            let rest = line[split..].trim_start().to_string();
            line.truncate(split);
            out.push(line.trim_end().to_string());
            line = rest;
        }
        out.push(line);
    }
    out
}

fn push_line(pages: &mut Vec<Vec<Line>>, line: Line, rows: usize) {
    if pages.last().map_or(true, |page| page.len() >= rows) {
        pages.push(Vec::new());
    }
    if let Some(page) = pages.last_mut() {
        page.push(line);
    }
}

/// Split blocks into pages of at most `rows` lines, one blank line between
/// blocks.
fn paginate(blocks: &[Vec<Line>], rows: usize, avoid_breaks: bool) -> Vec<Vec<Line>> {
    let mut pages: Vec<Vec<Line>> = vec![Vec::new()];
    for block in blocks {
        let used = pages.last().map_or(0, Vec::len);
        if used > 0 {
            let fits = used + 1 + block.len() <= rows;
            let keep_whole = avoid_breaks && block.len() <= rows;
            if (!fits && keep_whole) || used + 1 >= rows {
                pages.push(Vec::new());
            } else {
                push_line(&mut pages, Line::blank(), rows);
            }
        }
        for line in block {
            push_line(&mut pages, line.clone(), rows);
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(n: usize) -> Vec<Line> {
        (0..n).map(|i| Line { text: format!("line {i}"), bold: false }).collect()
    }

    #[test]
    fn letter_page_with_inch_margin() {
        let grid = PageGrid::for_margin(1.0);
        assert_eq!(grid.columns, 78);
        assert_eq!(grid.rows, 49);
    }

    #[test]
    fn document_has_both_sections_in_order() {
        let lines: Vec<Line> = document_lines("\nfirst", "**second**", 78).concat();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec![HISTORY_HEADING, "first", REPLY_HEADING, "second"]);
        assert!(lines[0].bold);
        assert!(!lines[1].bold);
    }

    #[test]
    fn empty_conversation_still_has_both_headings() {
        let blocks = document_lines("", "", 78);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        let lines = wrap("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn non_ascii_is_replaced() {
        assert_eq!(sanitize("│ quote ─ é\t"), "| quote - ?");
    }

    #[test]
    fn avoid_breaks_moves_block_to_next_page() {
        let pages = paginate(&[block(3), block(3)], 5, true);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 3);
        assert_eq!(pages[1].len(), 3);
    }

    #[test]
    fn blocks_split_when_breaks_allowed() {
        let pages = paginate(&[block(3), block(3)], 5, false);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 5);
        assert_eq!(pages[0][3], Line::blank());
        assert_eq!(pages[1].len(), 2);
    }

    #[test]
    fn block_taller_than_a_page_still_splits() {
        let pages = paginate(&[block(2), block(7)], 5, true);
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 2 + 1 + 7);
        assert!(pages.iter().all(|page| page.len() <= 5));
    }

    #[test]
    fn pdf_bytes_have_pdf_header() {
        let pdf = render_pdf("\nhello", "world", &ExportOptions::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn export_writes_file_with_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DocumentExporter::new(dir.path().join("out"));
        let path = exporter
            .export("\nhello", "world", &ExportOptions::default())
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "CodeContextA.pdf");
        let written = tokio::fs::read(&path).await.unwrap();
        assert!(written.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn export_rejects_paths_in_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DocumentExporter::new(dir.path());
        let options = ExportOptions { file_name: "../escape.pdf".into(), ..ExportOptions::default() };
        assert!(exporter.export("", "", &options).await.is_err());
        let options = ExportOptions { file_name: "  ".into(), ..ExportOptions::default() };
        assert!(exporter.export("", "", &options).await.is_err());
    }
}
