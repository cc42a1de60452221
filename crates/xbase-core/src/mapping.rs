//! Offset mapping between a preprocessed buffer and the original source
//!
//! The lexer scans whatever buffer it is given, but every token it emits
//! must point into the text the user actually wrote. A preprocessing stage
//! that removes or substitutes directives hands the lexer its filtered
//! buffer together with an [`OffsetMap`] that translates ranges back.
//!
//! [`IdentityMap`] is the default when no preprocessing happened.
//! [`DirectiveFilter`] is the concrete stage used by the pipeline: it drops
//! `#include`/`#define`/`#ifdef`... lines so they do not lex as `#` (not
//! equal) followed by an identifier.

use crate::lexer::Span;

/// Translates a span in the scanned buffer to a span in the original source
pub trait OffsetMap {
    /// Map a filtered-buffer range, or `None` if it has no original position
    fn map(&self, range: Span) -> Option<Span>;
}

/// Mapping used when the buffer is the original source
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMap;

impl OffsetMap for IdentityMap {
    fn map(&self, range: Span) -> Option<Span> {
        Some(range)
    }
}

/// Directive names removed by [`DirectiveFilter`]
const DIRECTIVES: &[&str] = &[
    "include",
    "define",
    "undef",
    "ifdef",
    "ifndef",
    "if",
    "elif",
    "else",
    "endif",
    "command",
    "xcommand",
    "translate",
    "xtranslate",
    "pragma",
    "error",
    "stdout",
];

/// A run of bytes copied verbatim from the original into the filtered buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    filtered: u32,
    original: u32,
    len: u32,
}

/// Preprocessing stage that strips directive lines from a source buffer
#[derive(Debug, Clone)]
pub struct DirectiveFilter {
    text: String,
    segments: Vec<Segment>,
    original_len: u32,
}

impl DirectiveFilter {
    /// Filter `source`, removing every directive line (and its `;`
    /// continuation lines) including the terminating newline.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Spans are u32; sources over 4GB are unsupported
    pub fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut segments: Vec<Segment> = Vec::new();
        let mut removed = 0usize;
        let mut line_start = 0usize;
        let mut in_directive = false;

        while line_start < source.len() {
            let line_end = source[line_start..]
                .find('\n')
                .map_or(source.len(), |i| line_start + i + 1);
            let line = &source[line_start..line_end];

            let drop_line = in_directive || is_directive_line(line);
            if drop_line {
                in_directive = line.trim_end().ends_with(';');
                removed += 1;
            } else {
                match segments.last_mut() {
                    Some(last) if (last.original + last.len) as usize == line_start => {
                        last.len += line.len() as u32;
                    }
                    _ => segments.push(Segment {
                        filtered: text.len() as u32,
                        original: line_start as u32,
                        len: line.len() as u32,
                    }),
                }
                text.push_str(line);
            }
            line_start = line_end;
        }

        if removed > 0 {
            log::debug!("directive filter removed {removed} line(s)");
        }

        Self {
            text,
            segments,
            original_len: source.len() as u32,
        }
    }

    /// The filtered buffer to hand to the lexer
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Original offset of a filtered offset that starts a range. At a seam
    /// between two segments the later segment wins.
    fn map_start(&self, offset: u32) -> Option<u32> {
        let idx = self
            .segments
            .partition_point(|seg| seg.filtered <= offset)
            .checked_sub(1)?;
        let seg = self.segments[idx];
        let delta = offset - seg.filtered;
        if delta <= seg.len {
            Some(seg.original + delta)
        } else {
            None
        }
    }

    /// Original offset of a filtered offset that ends a range. At a seam
    /// between two segments the earlier segment wins.
    fn map_end(&self, offset: u32) -> Option<u32> {
        let idx = self
            .segments
            .partition_point(|seg| seg.filtered < offset)
            .checked_sub(1)?;
        let seg = self.segments[idx];
        let delta = offset - seg.filtered;
        if delta <= seg.len {
            Some(seg.original + delta)
        } else {
            None
        }
    }
}

impl OffsetMap for DirectiveFilter {
    fn map(&self, range: Span) -> Option<Span> {
        if self.segments.is_empty() {
            return Some(Span::empty(self.original_len));
        }
        let start = self.map_start(range.start)?;
        if range.is_empty() {
            // EOF sits after the last kept byte; anything removed past it
            // still belongs before the end of the original text
            let filtered_len = self.text.len() as u32;
            if range.start == filtered_len {
                return Some(Span::empty(self.original_len));
            }
            return Some(Span::empty(start));
        }
        let end = self.map_end(range.end)?;
        Some(Span::new(start, end.max(start)))
    }
}

/// True if the line's first non-blank text is `#` followed by a directive name
fn is_directive_line(line: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix('#') else {
        return false;
    };
    let rest = rest.trim_start();
    let word_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let word = rest[..word_len].to_ascii_lowercase();
    DIRECTIVES.contains(&word.as_str())
}
