//! Navigation support: labels, `{$INCLUDE}` links and workspace symbols.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{
    DocumentLink, DocumentSymbol, Location, Position, Range, SymbolInformation, SymbolKind, Url,
};

use crate::commands::CommandMode;
use crate::helpers::{self, LineIndex};
use crate::index::Index;
use crate::lexer::{Token, TokenKind, tokenize};
use crate::word_range::resolve_simple;

static INCLUDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\$INCLUDE\s+([^\}]+)\}").expect("valid regex"));

fn is_label(token: &Token) -> bool {
    matches!(token.kind, TokenKind::LabelDefine | TokenKind::LabelJump)
}

/// Label name under the cursor, without its `@` or `:` tag.
fn label_at(text: &str, position: Position) -> Option<String> {
    let offset = helpers::byte_offset_at(text, position)?;
    let range = resolve_simple(text, offset)?;
    Some(text[range].to_string())
}

fn label_ranges(text: &str, name: &str, include_jumps: bool) -> Vec<Range> {
    let lines = LineIndex::new(text);
    tokenize(text)
        .iter()
        .filter(|t| is_label(t) && (include_jumps || t.kind == TokenKind::LabelDefine))
        .filter(|t| t.bare_name().eq_ignore_ascii_case(name))
        .map(|t| lines.token_range(t))
        .collect()
}

/// `:label` definitions matching the word at `position`.
pub fn find_definition(text: &str, position: Position, uri: &Url) -> Vec<Location> {
    let Some(name) = label_at(text, position) else {
        return Vec::new();
    };
    label_ranges(text, &name, false)
        .into_iter()
        .map(|range| Location::new(uri.clone(), range))
        .collect()
}

/// Every `@label` and `:label` occurrence of the label at `position`.
pub fn find_references(
    text: &str,
    position: Position,
    uri: &Url,
    include_declaration: bool,
) -> Vec<Location> {
    let Some(name) = label_at(text, position) else {
        return Vec::new();
    };
    let lines = LineIndex::new(text);
    tokenize(text)
        .iter()
        .filter(|t| is_label(t) && t.bare_name().eq_ignore_ascii_case(&name))
        .filter(|t| include_declaration || t.kind == TokenKind::LabelJump)
        .map(|t| Location::new(uri.clone(), lines.token_range(t)))
        .collect()
}

/// Links for `{$INCLUDE path}` directives, resolved against the document's
/// folder.
pub fn document_links(text: &str, document: &Path) -> Vec<DocumentLink> {
    let base = document.parent().unwrap_or(document);
    INCLUDE_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let raw = caps.get(1)?;
            let trimmed = raw.as_str().trim();
            if trimmed.is_empty() {
                return None;
            }
            let start = raw.start() + (raw.as_str().len() - raw.as_str().trim_start().len());
            let target = Url::from_file_path(base.join(trimmed)).ok();
            Some(DocumentLink {
                range: helpers::range_of(text, start..start + trimmed.len()),
                target,
                tooltip: None,
                data: None,
            })
        })
        .collect()
}

/// Labels defined in the document, as a flat outline.
pub fn get_document_symbols(text: &str) -> Vec<DocumentSymbol> {
    let lines = LineIndex::new(text);
    tokenize(text)
        .iter()
        .filter(|t| t.kind == TokenKind::LabelDefine && !t.bare_name().is_empty())
        .map(|t| {
            let range = lines.token_range(t);
            DocumentSymbol {
                name: t.bare_name().to_string(),
                detail: None,
                kind: SymbolKind::KEY,
                tags: None,
                #[allow(deprecated)]
                deprecated: None,
                range,
                selection_range: range,
                children: None,
            }
        })
        .collect()
}

pub fn get_workspace_symbols(query: &str, index: &Index) -> Vec<SymbolInformation> {
    let Some(uri) = index.source().and_then(|p| Url::from_file_path(p).ok()) else {
        return Vec::new();
    };

    index
        .search(query)
        .into_iter()
        .map(|hit| {
            let (kind, container_name) = match hit.mode {
                CommandMode::Opcode => (SymbolKind::FUNCTION, None),
                CommandMode::ClassMember => (SymbolKind::METHOD, hit.command.class.clone()),
            };
            SymbolInformation {
                name: format!("{} {}", hit.label, hit.command.signature(hit.mode)),
                kind,
                tags: None,
                #[allow(deprecated)]
                deprecated: None,
                location: Location {
                    uri: uri.clone(),
                    range: Range::new(Position::new(0, 0), Position::new(0, 0)),
                },
                container_name,
            }
        })
        .collect()
}
