//! Context-sensitive lexing rules
//!
//! Xbase source is not regular: whether `;`, a leading `*`, a backslash in a
//! string or a `[` starts something depends on what surrounds it. Each rule
//! is a predicate over the buffer and a byte position, so the scanner stays a
//! plain dispatch loop and every rule can be tested on its own. The two
//! same-line lookaheads live on [`LineLookahead`], which remembers how far it
//! has already scanned.

/// Byte index of the `\n` ending the line that contains `pos`, or the
/// buffer length on the last line
#[must_use]
pub fn line_end(source: &str, pos: usize) -> usize {
    source.as_bytes()[pos.min(source.len())..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(source.len(), |offset| pos + offset)
}

const fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\x0c')
}

/// True if the two bytes at `pos` open a line comment (`//` or `&&`)
#[must_use]
pub fn starts_line_comment(source: &str, pos: usize) -> bool {
    let rest = &source.as_bytes()[pos.min(source.len())..];
    rest.starts_with(b"//") || rest.starts_with(b"&&")
}

/// A `*` is a legacy full-line comment when only whitespace separates it
/// from the previous newline (or the start of the buffer).
#[must_use]
pub fn is_legacy_comment_start(source: &str, pos: usize) -> bool {
    let bytes = source.as_bytes();
    if bytes.get(pos) != Some(&b'*') {
        return false;
    }
    bytes[..pos]
        .iter()
        .rev()
        .find(|&&b| !is_blank(b))
        .map_or(true, |&b| b == b'\n')
}

/// A `;` continues the statement onto the next line when nothing but
/// whitespace or a line comment follows it on its own line and the next
/// physical line has content. Any other `;` separates statements.
#[must_use]
pub fn is_line_continuation(source: &str, pos: usize) -> bool {
    let bytes = source.as_bytes();
    if bytes.get(pos) != Some(&b';') {
        return false;
    }

    let mut i = pos + 1;
    while i < bytes.len() && is_blank(bytes[i]) {
        i += 1;
    }
    if starts_line_comment(source, i) {
        i = line_end(source, i);
    }
    if bytes.get(i) != Some(&b'\n') {
        return false;
    }

    let next_start = i + 1;
    let next_end = line_end(source, next_start);
    bytes[next_start..next_end].iter().any(|&b| !is_blank(b))
}

/// Same-line lookaheads for `\"` and `[`, cached for a scanner that only
/// moves forward. Each byte of a line is examined at most once per question,
/// so a line packed with either construct still lexes in linear time.
///
/// Queries must come in non-decreasing `pos` order.
#[derive(Debug, Default)]
pub struct LineLookahead {
    /// End of the line `last_quote` was computed for
    quote_line_end: usize,
    /// Last `"` on that line
    last_quote: Option<usize>,
    /// Where the last bracket scan stopped (`]`, newline or buffer end)
    bracket_stop: usize,
    /// The `]` the last bracket scan stopped on
    bracket_close: Option<usize>,
    /// Last backslash seen by the last bracket scan
    last_backslash: Option<usize>,
}

impl LineLookahead {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// For a backslash at `pos` followed by `"`: the pair is an escaped quote
    /// only when another `"` closes the string later on the same line.
    pub fn backslash_escapes_quote(&mut self, source: &str, pos: usize) -> bool {
        let bytes = source.as_bytes();
        if bytes.get(pos) != Some(&b'\\') || bytes.get(pos + 1) != Some(&b'"') {
            return false;
        }
        if self.quote_line_end <= pos {
            let end = line_end(source, pos);
            self.quote_line_end = end;
            self.last_quote = bytes[pos..end]
                .iter()
                .rposition(|&b| b == b'"')
                .map(|offset| pos + offset);
        }
        self.last_quote.is_some_and(|quote| quote > pos + 1)
    }

    /// For a `[` at `pos`: returns the index of the closing `]` when the
    /// bracketed text stays on one line and contains a backslash, which marks
    /// a legacy path literal such as `[C:\data\]`.
    pub fn bracket_string_end(&mut self, source: &str, pos: usize) -> Option<usize> {
        let bytes = source.as_bytes();
        if bytes.get(pos) != Some(&b'[') {
            return None;
        }
        // A scan that started before `pos` and stopped after it already
        // answers for `pos`: nothing between them was a `]` or a newline.
        if self.bracket_stop <= pos {
            self.bracket_close = None;
            self.last_backslash = None;
            let mut i = pos + 1;
            loop {
                match bytes.get(i) {
                    None | Some(b'\n' | b'\r') => break,
                    Some(b']') => {
                        self.bracket_close = Some(i);
                        break;
                    }
                    Some(b'\\') => self.last_backslash = Some(i),
                    Some(_) => {}
                }
                i += 1;
            }
            self.bracket_stop = i;
        }
        let close = self.bracket_close?;
        self.last_backslash
            .is_some_and(|backslash| backslash > pos)
            .then_some(close)
    }
}

/// A `.` after a digit run belongs to the number only if a digit follows it;
/// otherwise it is left for a dot-keyword or member access.
#[must_use]
pub fn number_fraction_follows(source: &str, pos: usize) -> bool {
    let bytes = source.as_bytes();
    bytes.get(pos) == Some(&b'.') && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
}
