//! Printable disposal certificate.
//!
//! The certificate is laid out on fixed-height pages with a running vertical
//! offset: every line advances the offset by the line height, and a block
//! that would run past the page height starts a new page at the top margin.
//! Pages are rendered as plain text separated by form feeds.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::error::{Error, Result};
use crate::record::DisposalRecord;

/// Page separator in rendered output.
pub const FORM_FEED: char = '\u{0c}';

const TITLE: &str = "TERMO DE DESCARTE DE PERIFÉRICOS";
const SIGNATURE_RULE: &str = "________________________________________";

/// Vertical layout constants, in page units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Usable page height.
    pub page_height: u32,
    /// Offset of the first line on a page.
    pub top_margin: u32,
    /// Advance per line.
    pub line_height: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            page_height: 280,
            top_margin: 20,
            line_height: 10,
        }
    }
}

/// One laid-out page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Text lines, blank lines included.
    pub lines: Vec<String>,
}

/// A disposal certificate for one or more retired units.
#[derive(Debug, Clone)]
pub struct Certificate {
    issued_on: NaiveDate,
    technician: String,
    items: Vec<DisposalRecord>,
}

impl Certificate {
    /// Build a certificate.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `items` is empty.
    pub fn new(items: Vec<DisposalRecord>, technician: &str, issued_on: NaiveDate) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::validation("items", "a certificate needs at least one disposal"));
        }
        Ok(Self {
            issued_on,
            technician: technician.trim().to_string(),
            items,
        })
    }

    /// Number of units covered.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn header(&self) -> Vec<String> {
        let technician = if self.technician.is_empty() {
            "-"
        } else {
            self.technician.as_str()
        };
        vec![
            TITLE.to_string(),
            format!("Data: {}", self.issued_on.format("%d/%m/%Y")),
            format!("Técnico Responsável: {technician}"),
            format!("Itens: {}", self.items.len()),
            String::new(),
        ]
    }

    fn item_block(index: usize, item: &DisposalRecord) -> Vec<String> {
        let note = if item.note.is_empty() { "-" } else { item.note.as_str() };
        vec![
            format!("Item {}", index + 1),
            format!("  SN/Patrimônio: {}", item.serial),
            format!("  Tipo: {}", item.kind),
            format!("  Data: {}", item.date),
            format!("  OCOMON: {}", item.ticket),
            format!("  Motivo: {}", item.reason),
            format!("  Observação: {note}"),
            String::new(),
        ]
    }

    fn signatures() -> Vec<String> {
        vec![
            String::new(),
            SIGNATURE_RULE.to_string(),
            "Técnico Responsável".to_string(),
            String::new(),
            SIGNATURE_RULE.to_string(),
            "Supervisor".to_string(),
        ]
    }

    /// Lay the certificate out on pages.
    ///
    /// Blocks are kept whole; a block taller than a page is split line by line.
    #[must_use]
    pub fn paginate(&self, layout: Layout) -> Vec<Page> {
        let mut pages = vec![Page::default()];
        let mut y = layout.top_margin;

        let blocks = std::iter::once(self.header())
            .chain(self.items.iter().enumerate().map(|(i, item)| Self::item_block(i, item)))
            .chain(std::iter::once(Self::signatures()));

        for block in blocks {
            let height = u32::try_from(block.len())
                .unwrap_or(u32::MAX)
                .saturating_mul(layout.line_height);
            let page_has_content = pages.last().is_some_and(|p| !p.lines.is_empty());
            if page_has_content && y.saturating_add(height) > layout.page_height {
                pages.push(Page::default());
                y = layout.top_margin;
            }
            for line in block {
                if y + layout.line_height > layout.page_height
                    && pages.last().is_some_and(|p| !p.lines.is_empty())
                {
                    pages.push(Page::default());
                    y = layout.top_margin;
                }
                if let Some(page) = pages.last_mut() {
                    page.lines.push(line);
                }
                y += layout.line_height;
            }
        }
        pages
    }

    /// Render as text, pages separated by a form feed.
    #[must_use]
    pub fn render(&self, layout: Layout) -> String {
        join_pages(&self.paginate(layout))
    }

    /// Write the rendered certificate to `path`, returning the page count.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: &Path, layout: Layout) -> Result<usize> {
        let pages = self.paginate(layout);
        fs::write(path, join_pages(&pages) + "\n")?;
        info!(path = %path.display(), pages = pages.len(), items = self.items.len(), "Wrote certificate");
        Ok(pages.len())
    }
}

fn join_pages(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|page| page.lines.join("\n"))
        .collect::<Vec<_>>()
        .join(&format!("\n{FORM_FEED}\n"))
}
