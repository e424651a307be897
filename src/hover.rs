//! Hover text for class members, enum members and opcodes.

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

use crate::commands::CommandMode;
use crate::helpers::{byte_offset_at, range_of};
use crate::index::Index;
use crate::word_range::{resolve_dotted, resolve_simple};

/// Markdown shown when hovering at `offset`, with the byte range it
/// describes.
pub fn hover_text(index: &Index, text: &str, offset: usize) -> Option<(String, std::ops::Range<usize>)> {
    if let Some(range) = resolve_dotted(text, offset)
        && let Some((owner, member)) = text[range.clone()].split_once('.')
    {
        if let Some(command) = index.class_member(owner, member) {
            let body = format!(
                "{}\n\n{}",
                command.signature(CommandMode::ClassMember),
                command.short_desc
            );
            return Some((body, range));
        }
        if let Some(element) = index.enum_member(owner, member) {
            return Some((format!("{owner}.{member}\nValue: {}", element.value), range));
        }
    }

    let range = resolve_simple(text, offset)?;
    // `@name` is a label jump, never an opcode
    if text[..range.start].ends_with('@') {
        return None;
    }
    let command = index.opcode(&text[range.clone()])?;
    let body = format!(
        "{}\n\n{}",
        command.signature(CommandMode::Opcode),
        command.short_desc
    );
    Some((body, range))
}

pub fn hover(index: &Index, text: &str, position: Position) -> Option<Hover> {
    let offset = byte_offset_at(text, position)?;
    let (value, range) = hover_text(index, text, offset)?;
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(range_of(text, range)),
    })
}
