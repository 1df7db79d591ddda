//! Paragraph layout for documents authored from plain text
//!
//! Uses the standard Helvetica widths so lines wrap close to where a viewer
//! renders them; text outside WinAnsi is replaced with `?`.

use crate::config::LayoutConfig;

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

const FALLBACK_WIDTH: u16 = 556;

/// A laid-out line, already encoded for a WinAnsi font
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutLine {
    Text(Vec<u8>),
    /// Vertical gap separating paragraphs
    Blank,
}

/// Lines grouped by page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub lines: Vec<LayoutLine>,
}

/// Encodes a character for WinAnsiEncoding
fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '\u{20ac}' => 0x80,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\t' => b' ',
        _ => b'?',
    }
}

fn byte_width(byte: u8, font_size: f32) -> f32 {
    let units = match byte {
        0x20..=0x7E => HELVETICA_WIDTHS[(byte - 0x20) as usize],
        _ => FALLBACK_WIDTH,
    };
    units as f32 * font_size / 1000.0
}

fn text_width(bytes: &[u8], font_size: f32) -> f32 {
    bytes.iter().map(|&b| byte_width(b, font_size)).sum()
}

/// Wraps one paragraph to `max_width`, breaking on spaces and splitting
/// words that are longer than a whole line
pub fn wrap_paragraph(paragraph: &str, max_width: f32, font_size: f32) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let space = byte_width(b' ', font_size);

    for word in paragraph.split_whitespace() {
        let word: Vec<u8> = word.chars().map(win_ansi_byte).collect();
        let word_width = text_width(&word, font_size);
        let current_width = text_width(&current, font_size);

        if !current.is_empty() && current_width + space + word_width <= max_width {
            current.push(b' ');
            current.extend_from_slice(&word);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if word_width <= max_width {
            current = word;
        } else {
            let mut piece = Vec::new();
            for byte in word {
                if !piece.is_empty() && text_width(&piece, font_size) + byte_width(byte, font_size) > max_width {
                    lines.push(std::mem::take(&mut piece));
                }
                piece.push(byte);
            }
            current = piece;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Splits text into paragraphs on blank lines, or on single newlines when
/// the text has no blank lines
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalised = text.replace("\r\n", "\n");
    let separator = if normalised.contains("\n\n") { "\n\n" } else { "\n" };
    normalised
        .split(separator)
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Flows paragraphs over as many pages as needed. Always yields at least one
/// page.
pub fn layout_paragraphs(paragraphs: &[String], layout: &LayoutConfig) -> Vec<PageLayout> {
    let line_height = layout.font_size * layout.leading;
    let usable_height = layout.page_size.height - 2.0 * layout.margin;
    let lines_per_page = ((usable_height / line_height).floor() as usize).max(1);
    let max_width = layout.page_size.width - 2.0 * layout.margin;

    let mut pages = Vec::new();
    let mut current = Vec::new();

    for (index, paragraph) in paragraphs.iter().enumerate() {
        // A page break already separates paragraphs
        if index > 0 && !current.is_empty() && current.len() < lines_per_page {
            current.push(LayoutLine::Blank);
        }
        for line in wrap_paragraph(paragraph, max_width, layout.font_size) {
            if current.len() >= lines_per_page {
                pages.push(PageLayout { lines: std::mem::take(&mut current) });
            }
            current.push(LayoutLine::Text(line));
        }
    }

    if !current.is_empty() || pages.is_empty() {
        pages.push(PageLayout { lines: current });
    }
    pages
}
