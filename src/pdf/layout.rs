//! Minimal flowing-text layout on A4 pages using the standard Helvetica family.

use lopdf::Object;
use lopdf::content::Operation;

pub(crate) const PAGE_WIDTH: f32 = 595.28;
pub(crate) const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 48.0;
const LINE_SPACING: f32 = 1.45;

/// Fonts registered in the page resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    pub(crate) const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Italic];

    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }

    pub(crate) fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
    Right,
}

/// Accumulates content-stream operations page by page, top to bottom.
pub(crate) struct PageWriter {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor_y: f32,
}

impl PageWriter {
    pub(crate) fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub(crate) fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.pages.push(finished);
        self.cursor_y = PAGE_HEIGHT - MARGIN;
    }

    pub(crate) fn gap(&mut self, points: f32) {
        self.cursor_y -= points;
    }

    /// Emit one unwrapped line.
    pub(crate) fn line(&mut self, text: &str, font: Font, size: f32, align: Align) {
        let line_height = size * LINE_SPACING;
        if self.cursor_y - line_height < MARGIN {
            if text.is_empty() {
                return;
            }
            self.new_page();
        }
        self.cursor_y -= line_height;

        if text.is_empty() {
            return;
        }
        let width = text_width(text, font, size);
        let x = match align {
            Align::Left => MARGIN,
            Align::Center => ((PAGE_WIDTH - width) / 2.0).max(MARGIN),
            Align::Right => (PAGE_WIDTH - MARGIN - width).max(MARGIN),
        };

        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource_name().into(), size.into()]),
            Operation::new("Td", vec![x.into(), self.cursor_y.into()]),
            Operation::new("Tj", vec![Object::string_literal(to_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Emit text wrapped to the printable width, keeping its line breaks.
    pub(crate) fn paragraph(&mut self, text: &str, font: Font, size: f32) {
        let max_width = PAGE_WIDTH - 2.0 * MARGIN;
        for source_line in text.lines() {
            let wrapped = wrap(source_line, font, size, max_width);
            if wrapped.is_empty() {
                self.line("", font, size, Align::Left);
            }
            for line in wrapped {
                self.line(&line, font, size, Align::Left);
            }
        }
    }

    pub(crate) fn finish(mut self) -> Vec<Vec<Operation>> {
        self.new_page();
        self.pages
    }
}

/// Greedy word wrap. Words wider than the line are split by character.
pub(crate) fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word, font, size) <= max_width {
            current = word.to_string();
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if text_width(&current, font, size) > max_width {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Approximate Helvetica advance widths, in thousandths of an em.
fn glyph_width(ch: char) -> f32 {
    match ch {
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' | ' ' => 278.0,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '/' | '-' => 333.0,
        'm' | 'M' => 833.0,
        'w' | 'W' => 778.0,
        'A'..='Z' => 667.0,
        '•' => 350.0,
        '—' | '%' => 889.0,
        _ => 556.0,
    }
}

pub(crate) fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let weight = if font == Font::Bold { 1.06 } else { 1.0 };
    text.chars().map(glyph_width).sum::<f32>() * size * weight / 1000.0
}

/// Encode text for a WinAnsiEncoding simple font. Unmappable characters become `?`.
pub(crate) fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|ch| match ch {
            '\t' => Some(b' '),
            ' '..='~' => Some(ch as u8),
            '\u{a0}'..='\u{ff}' => Some(ch as u32 as u8),
            '€' => Some(0x80),
            '…' => Some(0x85),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            c if c.is_control() => None,
            _ => Some(b'?'),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width_and_keeps_every_word() {
        let text = "Recommend complete blood count, basic metabolic panel, and chest radiograph";
        let lines = wrap(text, Font::Regular, 12.0, 150.0);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 12.0) <= 150.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn overlong_words_are_split() {
        let word = "x".repeat(200);
        let lines = wrap(&word, Font::Regular, 10.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn win_ansi_maps_bullets_and_replaces_unknowns() {
        assert_eq!(to_win_ansi("• café"), vec![0x95, b' ', b'c', b'a', b'f', 0xe9]);
        assert_eq!(to_win_ansi("日\u{7}"), b"?".to_vec());
    }

    #[test]
    fn overflowing_lines_start_a_new_page() {
        let mut writer = PageWriter::new();
        for _ in 0..200 {
            writer.line("row", Font::Regular, 12.0, Align::Left);
        }
        let pages = writer.finish();
        assert!(pages.len() >= 3);
        assert!(pages.iter().all(|ops| !ops.is_empty()));
    }

    #[test]
    fn blank_lines_at_the_page_bottom_do_not_open_a_page() {
        let mut writer = PageWriter::new();
        while writer.cursor_y - 12.0 * LINE_SPACING >= MARGIN {
            writer.line("row", Font::Regular, 12.0, Align::Left);
        }
        writer.paragraph("\n\n", Font::Regular, 12.0);

        let pages = writer.finish();
        assert_eq!(pages.len(), 1);
        assert!(!pages[0].is_empty());
    }
}
