//! Completion items drawn from the index.

use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind, Position,
};

use crate::commands::{Command, CommandMode};
use crate::helpers::{byte_offset_at, line_prefix};
use crate::index::Index;

pub const TRIGGER_CHARACTERS: &[&str] = &["."];

static MEMBER_ACCESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\.$").expect("valid regex"));

fn sort_text(idx: usize) -> String {
    format!("{idx:06}")
}

fn documentation(command: &Command, mode: CommandMode) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value: format!("{}\n\n{}", command.signature(mode), command.short_desc),
    })
}

fn member_items(index: &Index, owner: &str) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    if let Some(members) = index.class_members(owner) {
        for command in members {
            let Some(member) = command.member.as_deref() else {
                continue;
            };
            items.push(CompletionItem {
                label: member.to_string(),
                kind: Some(CompletionItemKind::METHOD),
                detail: Some(format!("(Class member) {owner}.{member}")),
                documentation: Some(documentation(command, CommandMode::ClassMember)),
                sort_text: Some(sort_text(items.len())),
                ..Default::default()
            });
        }
    }

    if let Some(found) = index.enum_by_name(owner) {
        for (idx, element) in found.members.iter().enumerate() {
            items.push(CompletionItem {
                label: element.name.clone(),
                kind: Some(CompletionItemKind::ENUM_MEMBER),
                detail: Some(format!(
                    "(Enum member) {owner}.{} = {}",
                    element.name, element.value
                )),
                sort_text: Some(sort_text(idx)),
                ..Default::default()
            });
        }
    }

    items
}

fn top_level_items(index: &Index) -> Vec<CompletionItem> {
    let classes = index.commands_by_class().keys().map(|name| CompletionItem {
        label: name.clone(),
        kind: Some(CompletionItemKind::CLASS),
        detail: Some("Class".to_string()),
        ..Default::default()
    });

    let enums = index.enums().keys().map(|name| CompletionItem {
        label: name.clone(),
        kind: Some(CompletionItemKind::ENUM),
        detail: Some("Enum".to_string()),
        ..Default::default()
    });

    let opcodes = index
        .commands_by_name()
        .iter()
        .filter_map(|(name, commands)| Some((name, commands.first()?)))
        .map(|(name, command)| CompletionItem {
            label: name.clone(),
            kind: Some(CompletionItemKind::FUNCTION),
            detail: Some(format!("(Opcode) {name}")),
            documentation: Some(documentation(command, CommandMode::Opcode)),
            ..Default::default()
        });

    classes.chain(enums).chain(opcodes).collect()
}

/// Items for the cursor at `offset`: members after `Name.`, otherwise every
/// class, enum and opcode name.
pub fn completion_items(index: &Index, text: &str, offset: usize) -> Vec<CompletionItem> {
    let before = line_prefix(text, offset);
    match MEMBER_ACCESS.captures(before).and_then(|c| c.get(1)) {
        Some(owner) => member_items(index, owner.as_str()),
        None => top_level_items(index),
    }
}

pub fn completion(index: &Index, text: &str, position: Position) -> Vec<CompletionItem> {
    match byte_offset_at(text, position) {
        Some(offset) => completion_items(index, text, offset),
        None => Vec::new(),
    }
}
