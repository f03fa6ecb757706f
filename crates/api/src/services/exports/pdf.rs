//! Minimal PDF 1.4 writer.
//!
//! Produces A4 portrait pages of Helvetica text and simple ruled tables.
//! Only the two standard Type 1 fonts are referenced, so nothing has to be
//! embedded; text is encoded as WinAnsi and characters outside Latin-1
//! are replaced with `?`.

use std::io::Write;

use super::ExportError;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const FOOTER_Y: f32 = 30.0;
const TABLE_FONT_SIZE: f32 = 8.0;
const ROW_HEIGHT: f32 = 14.0;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// One table column: header text and width in points.
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub width: f32,
}

impl Column {
    pub fn new(header: impl Into<String>, width: f32) -> Self {
        Self {
            header: header.into(),
            width,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Paginated document builder. Content flows top to bottom; a new page is
/// started whenever the next line would cross the bottom margin.
#[derive(Debug)]
pub struct PdfDocument {
    pages: Vec<String>,
    cursor_y: f32,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        Self {
            pages: vec![String::new()],
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn title(&mut self, text: &str) {
        self.line(text, Font::Bold, 18.0, 26.0);
    }

    pub fn heading(&mut self, text: &str) {
        self.line(text, Font::Bold, 13.0, 20.0);
    }

    pub fn text(&mut self, text: &str) {
        self.line(text, Font::Regular, 10.0, 15.0);
    }

    pub fn spacer(&mut self, height: f32) {
        self.cursor_y -= height;
    }

    /// Draws the table, repeating the header row on every page it spans.
    pub fn table(&mut self, table: &Table) {
        self.ensure_room(ROW_HEIGHT * 2.0);
        self.table_header(&table.columns);

        for row in &table.rows {
            if self.cursor_y - ROW_HEIGHT < MARGIN {
                self.new_page();
                self.table_header(&table.columns);
            }
            self.cursor_y -= ROW_HEIGHT;
            let mut x = MARGIN;
            for (column, cell) in table.columns.iter().zip(row) {
                let clipped = clip_to_width(cell, column.width, TABLE_FONT_SIZE);
                self.draw_text(x, self.cursor_y, Font::Regular, TABLE_FONT_SIZE, &clipped);
                x += column.width;
            }
        }
        self.cursor_y -= ROW_HEIGHT / 2.0;
    }

    fn table_header(&mut self, columns: &[Column]) {
        self.cursor_y -= ROW_HEIGHT;
        let mut x = MARGIN;
        for column in columns {
            let clipped = clip_to_width(&column.header, column.width, TABLE_FONT_SIZE);
            self.draw_text(x, self.cursor_y, Font::Bold, TABLE_FONT_SIZE, &clipped);
            x += column.width;
        }
        let rule_y = self.cursor_y - 4.0;
        let right = MARGIN + columns.iter().map(|c| c.width).sum::<f32>();
        self.draw_rule(MARGIN, right.min(PAGE_WIDTH - MARGIN), rule_y);
        self.cursor_y -= 4.0;
    }

    fn line(&mut self, text: &str, font: Font, size: f32, leading: f32) {
        self.ensure_room(leading);
        self.cursor_y -= leading;
        self.draw_text(MARGIN, self.cursor_y, font, size, text);
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor_y - height < MARGIN {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        self.pages.push(String::new());
        self.cursor_y = PAGE_HEIGHT - MARGIN;
    }

    fn current_page(&mut self) -> &mut String {
        // pages is never empty: `new` seeds the first page.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn draw_text(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        let op = text_op(x, y, font, size, text);
        self.current_page().push_str(&op);
    }

    fn draw_rule(&mut self, x1: f32, x2: f32, y: f32) {
        let op = format!("0.5 w {:.2} {:.2} m {:.2} {:.2} l S\n", x1, y, x2, y);
        self.current_page().push_str(&op);
    }

    /// Serializes the document, stamping "Page i of n" on every page.
    pub fn render(self) -> Result<Vec<u8>, ExportError> {
        let total = self.pages.len();
        let mut out: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = Vec::new();

        out.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

        let kids = (0..total)
            .map(|i| format!("{} 0 R", 5 + i * 2))
            .collect::<Vec<_>>()
            .join(" ");

        offsets.push(out.len());
        write!(out, "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n")?;
        offsets.push(out.len());
        write!(
            out,
            "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
            kids, total
        )?;
        offsets.push(out.len());
        write!(
            out,
            "3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>\nendobj\n"
        )?;
        offsets.push(out.len());
        write!(
            out,
            "4 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>\nendobj\n"
        )?;

        for (index, mut content) in self.pages.into_iter().enumerate() {
            let page_obj = 5 + index * 2;
            let footer = format!("Page {} of {}", index + 1, total);
            content.push_str(&text_op(MARGIN, FOOTER_Y, Font::Regular, 8.0, &footer));

            offsets.push(out.len());
            write!(
                out,
                "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>\nendobj\n",
                page_obj,
                PAGE_WIDTH as u32,
                PAGE_HEIGHT as u32,
                page_obj + 1
            )?;

            offsets.push(out.len());
            write!(
                out,
                "{} 0 obj\n<< /Length {} >>\nstream\n",
                page_obj + 1,
                content.len()
            )?;
            out.write_all(content.as_bytes())?;
            write!(out, "\nendstream\nendobj\n")?;
        }

        let xref_offset = out.len();
        write!(out, "xref\n0 {}\n", offsets.len() + 1)?;
        write!(out, "0000000000 65535 f \n")?;
        for offset in &offsets {
            write!(out, "{:010} 00000 n \n", offset)?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref_offset
        )?;

        Ok(out)
    }
}

fn text_op(x: f32, y: f32, font: Font, size: f32, text: &str) -> String {
    format!(
        "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
        font.resource(),
        size,
        x,
        y,
        escape_text(text)
    )
}

/// Escapes a string literal for a content stream.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            ' '..='~' => escaped.push(c),
            '\u{a0}'..='\u{ff}' => escaped.push_str(&format!("\\{:03o}", c as u32)),
            _ => escaped.push('?'),
        }
    }
    escaped
}

fn clip_to_width(text: &str, width: f32, size: f32) -> String {
    let max_chars = ((width - 4.0) / (size * AVG_GLYPH_WIDTH)).floor().max(1.0) as usize;
    text.chars().take(max_chars).collect()
}
