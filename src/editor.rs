//! Line-oriented editor access for cursor-driven link actions.

use crate::link::{link_at, LinkInfo};

/// Cursor position: zero-based line and character column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub ch: usize,
}

/// The host editor, as far as link actions need it
pub trait Editor {
    fn line(&self, n: usize) -> Option<String>;

    fn set_line(&mut self, n: usize, text: &str);

    fn cursor(&self) -> Cursor;
}

/// In-memory [`Editor`] over a note's text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    lines: Vec<String>,
    cursor: Cursor,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            cursor: Cursor::default(),
        }
    }

    pub fn with_cursor(mut self, line: usize, ch: usize) -> Self {
        self.cursor = Cursor { line, ch };
        self
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Editor for TextBuffer {
    fn line(&self, n: usize) -> Option<String> {
        self.lines.get(n).cloned()
    }

    fn set_line(&mut self, n: usize, text: &str) {
        if let Some(line) = self.lines.get_mut(n) {
            *line = text.to_string();
        }
    }

    fn cursor(&self) -> Cursor {
        self.cursor
    }
}

/// Byte offset of character column `ch`, clamped to the end of the line
fn byte_offset(line: &str, ch: usize) -> usize {
    line.char_indices().nth(ch).map(|(idx, _)| idx).unwrap_or(line.len())
}

/// The link under character column `ch` of `line`. A cursor on the boundary
/// of two adjacent links selects the earlier one.
pub fn selected_link(line: &str, ch: usize) -> Option<LinkInfo> {
    link_at(line, byte_offset(line, ch))
}

/// Replace `link` on line `line_no` with `new_text`. Returns `false` when the
/// line no longer holds the link at its recorded span.
pub fn replace_link(editor: &mut dyn Editor, line_no: usize, link: &LinkInfo, new_text: &str) -> bool {
    let Some(line) = editor.line(line_no) else {
        return false;
    };
    if line.get(link.start..link.end) != Some(link.raw.as_str()) {
        return false;
    }

    let updated = format!("{}{}{}", &line[..link.start], new_text, &line[link.end..]);
    editor.set_line(line_no, &updated);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_round_trips_text() {
        let text = "# Title\n\n![[a.png]]\n";
        let buffer = TextBuffer::new(text);
        assert_eq!(buffer.line_count(), 4);
        assert_eq!(buffer.line(2).as_deref(), Some("![[a.png]]"));
        assert_eq!(buffer.text(), text);
    }

    #[test]
    fn test_selected_link_uses_character_columns() {
        let line = "写真 ![[a.png]] and [b](b.png) end";
        assert_eq!(selected_link(line, 5).unwrap().path, "a.png");
        assert_eq!(selected_link(line, 20).unwrap().path, "b.png");
        assert!(selected_link(line, 1).is_none());
        assert!(selected_link(line, 100).is_none());
    }

    #[test]
    fn test_selected_link_prefers_earlier_on_boundary() {
        let line = "[[a.png]][[b.png]]";
        assert_eq!(selected_link(line, 9).unwrap().path, "a.png");
    }

    #[test]
    fn test_replace_link() {
        let mut buffer = TextBuffer::new("x\nsee [[a.png]] here").with_cursor(1, 6);
        let link = selected_link(&buffer.line(1).unwrap(), buffer.cursor().ch).unwrap();

        assert!(replace_link(&mut buffer, 1, &link, "![a](https://s/a.png)"));
        assert_eq!(buffer.text(), "x\nsee ![a](https://s/a.png) here");

        // the span is stale now
        assert!(!replace_link(&mut buffer, 1, &link, ""));
        assert!(!replace_link(&mut buffer, 5, &link, ""));
    }
}
