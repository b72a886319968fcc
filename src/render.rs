//! Table and JSON presentation of advisories.

use crate::error::Result;
use crate::models::Advisory;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display columns available to a value before it wraps.
pub const VALUE_WIDTH: usize = 100;

/// Box-drawing glyphs, in the order top-left, top-mid, top-right, mid-left,
/// cross, mid-right, bottom-left, bottom-mid, bottom-right, horizontal,
/// vertical.
const NORMAL_BORDER: [char; 11] = ['┌', '┬', '┐', '├', '┼', '┤', '└', '┴', '┘', '─', '│'];
const HIDDEN_BORDER: [char; 11] = [' '; 11];

/// Two-column (field, value) table for one advisory.
#[derive(Debug, Clone, Copy)]
pub struct TableRenderer {
    border: bool,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self { border: true }
    }
}

impl TableRenderer {
    /// With `border` unset, the box drawing is replaced by spaces so the
    /// layout stays aligned.
    pub fn new(border: bool) -> Self {
        Self { border }
    }

    /// Field/value rows shown for an advisory, in display order.
    pub fn rows(advisory: &Advisory) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Title".to_string(), advisory.document_title.clone()),
            ("ID".to_string(), advisory.tracking.id.clone()),
            (
                "Release Date".to_string(),
                advisory.tracking.current_release_date.clone(),
            ),
            ("Link".to_string(), advisory.link()),
            (
                "CVSS Score".to_string(),
                advisory.vulnerability.cvss.base_score_v3.clone(),
            ),
        ];

        rows.extend(
            advisory
                .notes
                .iter()
                .map(|note| (note.title.clone(), note.text.clone())),
        );

        if advisory.affected_products_unlisted {
            for product in advisory.affected_listing() {
                rows.push(("Product Type Affected".to_string(), product.product_type));
                rows.push(("Affected Versions".to_string(), product.versions.join("\n")));
            }
        }

        rows
    }

    pub fn render(&self, advisory: &Advisory) -> String {
        let glyphs = if self.border {
            NORMAL_BORDER
        } else {
            HIDDEN_BORDER
        };
        let [top_l, top_m, top_r, mid_l, mid_m, mid_r, bot_l, bot_m, bot_r, horizontal, vertical] =
            glyphs;

        let rows = Self::rows(advisory);
        let label_width = rows
            .iter()
            .map(|(label, _)| label.width())
            .max()
            .unwrap_or(0);

        let rule = |left: char, middle: char, right: char| {
            let mut line = String::new();
            line.push(left);
            line.extend(std::iter::repeat_n(horizontal, label_width + 1));
            line.push(middle);
            line.extend(std::iter::repeat_n(horizontal, VALUE_WIDTH + 1));
            line.push(right);
            line
        };

        let mut lines = vec![rule(top_l, top_m, top_r)];
        for (index, (label, value)) in rows.iter().enumerate() {
            if index > 0 {
                lines.push(rule(mid_l, mid_m, mid_r));
            }

            let wrapped = wrap(value, VALUE_WIDTH);
            for (line_index, text) in wrapped.iter().enumerate() {
                let label = if line_index == 0 { label.as_str() } else { "" };
                lines.push(format!(
                    "{v} {}{v} {}{v}",
                    pad(label, label_width),
                    pad(text, VALUE_WIDTH),
                    v = vertical
                ));
            }
        }
        lines.push(rule(bot_l, bot_m, bot_r));

        lines.join("\n")
    }
}

/// Pretty-printed JSON array of advisories.
pub fn to_json(advisories: &[Advisory]) -> Result<String> {
    Ok(serde_json::to_string_pretty(advisories)?)
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Split text into lines no wider than `width` display columns.
///
/// Existing line breaks are kept; lines break at spaces where possible and
/// inside a word only when the word alone is too wide. Always yields at
/// least one line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let needed = if current.is_empty() {
                word.width()
            } else {
                current.width() + 1 + word.width()
            };
            if needed <= width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if word.width() <= width {
                current.push_str(word);
                continue;
            }

            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if current.width() + ch_width > width {
                    lines.push(std::mem::take(&mut current));
                }
                current.push(ch);
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
