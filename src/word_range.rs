//! Identifier spans under the cursor.
//!
//! Offsets are byte offsets into the document text. Only ASCII characters
//! take part in a word, so every returned range lies on char boundaries.

use std::ops::Range;

fn is_dotted_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn is_simple_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'@'
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Expand left and right from `offset` while `pred` holds.
fn expand(text: &str, offset: usize, pred: fn(u8) -> bool) -> Option<Range<usize>> {
    let offset = offset.min(text.len());
    if !text.is_char_boundary(offset) {
        return None;
    }

    let bytes = text.as_bytes();
    let mut start = offset;
    let mut end = offset;
    while start > 0 && pred(bytes[start - 1]) {
        start -= 1;
    }
    while end < bytes.len() && pred(bytes[end]) {
        end += 1;
    }

    (start < end).then_some(start..end)
}

/// A `Name.Member` span at `offset`.
///
/// Returns `None` when the word under the cursor has no dot. Only one dot
/// level is captured: `A.B.C` resolves to `A.B`.
pub fn resolve_dotted(text: &str, offset: usize) -> Option<Range<usize>> {
    let span = expand(text, offset, is_dotted_word)?;
    let word = &text.as_bytes()[span.clone()];
    if !word.contains(&b'.') {
        return None;
    }

    let head = word.iter().take_while(|b| is_ident(**b)).count();
    if head == 0 {
        return None;
    }

    let mut len = head;
    if word.get(head) == Some(&b'.') {
        let tail = word[head + 1..].iter().take_while(|b| is_ident(**b)).count();
        if tail > 0 {
            len = head + 1 + tail;
        }
    }

    Some(span.start..span.start + len)
}

/// A plain word at `offset`, used for opcodes and `@label` references.
/// A leading `@` is not part of the result.
pub fn resolve_simple(text: &str, offset: usize) -> Option<Range<usize>> {
    let span = expand(text, offset, is_simple_word)?;
    let start = if text.as_bytes()[span.start] == b'@' {
        span.start + 1
    } else {
        span.start
    };
    (start < span.end).then_some(start..span.end)
}
