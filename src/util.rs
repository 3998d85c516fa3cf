/// Utility functions shared by the front-end, the completion engine and
/// the server.
///
/// This module contains helpers for position/offset conversion, line
/// boundary lookup and identifier character classification.  Offsets are
/// byte offsets into the buffer; LSP positions count characters within a
/// line (sufficient for the overwhelmingly ASCII C++ sources we deal with).
use memchr::{memchr, memrchr};
use tower_lsp::lsp_types::Position;

/// Convert an LSP `Position` (line, character) to a byte offset in `content`.
///
/// Positions past the end of a line clamp to the line end; positions past
/// the last line clamp to the end of the content.
pub fn position_to_byte_offset(content: &str, position: Position) -> usize {
    let mut offset = 0usize;
    for (i, line) in content.split('\n').enumerate() {
        if i == position.line as usize {
            let byte_col = line
                .char_indices()
                .nth(position.character as usize)
                .map(|(idx, _)| idx)
                .unwrap_or(line.len());
            return offset + byte_col;
        }
        // +1 for the newline character
        offset += line.len() + 1;
    }
    content.len()
}

/// Convert a byte offset in `content` back to an LSP `Position`.
pub fn byte_offset_to_position(content: &str, offset: usize) -> Position {
    let offset = clamp_to_char_boundary(content, offset);
    let start = line_start(content, offset);
    let line = content.as_bytes()[..start]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u32;
    let character = content[start..offset].chars().count() as u32;
    Position { line, character }
}

/// Zero-based line and *byte* column of `offset`, the coordinate system
/// the front-end records scope ranges in.
pub fn line_and_column(content: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let start = line_start(content, offset);
    let line = content.as_bytes()[..start]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u32;
    (line, (offset - start) as u32)
}

/// Byte offset of the first character of the line containing `offset`.
pub fn line_start(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    match memrchr(b'\n', &content.as_bytes()[..offset]) {
        Some(nl) => nl + 1,
        None => 0,
    }
}

/// Byte offset of the newline (or end of content) terminating the line
/// containing `offset`.
pub fn line_end(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    match memchr(b'\n', &content.as_bytes()[offset..]) {
        Some(nl) => offset + nl,
        None => content.len(),
    }
}

/// The character immediately before `offset`, if any.
pub fn char_before(content: &str, offset: usize) -> Option<char> {
    content.get(..offset)?.chars().next_back()
}

/// The character starting at `offset`, if any.
pub fn char_at(content: &str, offset: usize) -> Option<char> {
    content.get(offset..)?.chars().next()
}

/// Whether `c` may appear inside a C++ identifier.
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `c` may start a C++ identifier.
pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Walk backwards from `offset` over identifier characters and return the
/// offset where the identifier begins.
pub fn find_start_of_name(content: &str, offset: usize) -> usize {
    let mut start = offset.min(content.len());
    while let Some(c) = char_before(content, start) {
        if !is_identifier_char(c) {
            break;
        }
        start -= c.len_utf8();
    }
    start
}

/// Return the last segment of a `::`-qualified name.
pub fn short_name(qualified: &str) -> &str {
    qualified.rsplit("::").next().unwrap_or(qualified)
}

fn clamp_to_char_boundary(content: &str, offset: usize) -> usize {
    let mut offset = offset.min(content.len());
    while !content.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trip_on_second_line() {
        let text = "int a;\nvoid f() { a. }\n";
        let offset = position_to_byte_offset(
            text,
            Position {
                line: 1,
                character: 13,
            },
        );
        assert_eq!(&text[offset - 2..offset], "a.");
        assert_eq!(
            byte_offset_to_position(text, offset),
            Position {
                line: 1,
                character: 13
            }
        );
    }

    #[test]
    fn test_find_start_of_name_stops_at_operator() {
        let text = "obj->memb";
        assert_eq!(find_start_of_name(text, text.len()), 5);
        assert_eq!(find_start_of_name(text, 5), 5);
    }

    #[test]
    fn test_line_bounds() {
        let text = "ab\ncd\nef";
        assert_eq!(line_start(text, 4), 3);
        assert_eq!(line_end(text, 4), 5);
        assert_eq!(line_end(text, 7), 8);
        assert_eq!(line_and_column(text, 7), (2, 1));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("a::b::Foo"), "Foo");
        assert_eq!(short_name("Foo"), "Foo");
    }
}
