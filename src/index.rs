//! The published, immutable index snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::commands::{self, Command, CommandIndex, CommandMap, CommandMode, Definitions};
use crate::enums::{Enum, EnumMember};

#[derive(Debug, Clone, Default)]
pub struct Index {
    commands_by_name: CommandMap,
    commands_by_class: CommandMap,
    enums: IndexMap<String, Enum>,
    /// Definition file the commands came from.
    source: Option<PathBuf>,
}

/// One workspace-symbol style match.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub label: String,
    pub mode: CommandMode,
    pub command: Arc<Command>,
}

impl Index {
    pub fn new(commands: CommandIndex, enums: IndexMap<String, Enum>) -> Self {
        Self {
            commands_by_name: commands.by_name,
            commands_by_class: commands.by_class,
            enums,
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Build from already loaded sources; absent sources stay empty.
    pub fn build(definitions: Option<Definitions>, enums: Option<IndexMap<String, Enum>>) -> Self {
        let commands = definitions
            .map(commands::build_command_index)
            .unwrap_or_default();
        Self::new(commands, enums.unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        self.commands_by_name.is_empty() && self.enums.is_empty()
    }

    pub fn commands_by_name(&self) -> &CommandMap {
        &self.commands_by_name
    }

    pub fn commands_by_class(&self) -> &CommandMap {
        &self.commands_by_class
    }

    pub fn enums(&self) -> &IndexMap<String, Enum> {
        &self.enums
    }

    pub fn command_count(&self) -> usize {
        self.commands_by_name.values().map(Vec::len).sum()
    }

    /// First command named `name`, compared case-insensitively.
    pub fn opcode(&self, name: &str) -> Option<&Arc<Command>> {
        self.commands_by_name
            .get(name.to_lowercase().as_str())
            .and_then(|commands| commands.first())
    }

    pub fn class_members(&self, class: &str) -> Option<&[Arc<Command>]> {
        self.commands_by_class.get(class).map(Vec::as_slice)
    }

    pub fn class_member(&self, class: &str, member: &str) -> Option<&Arc<Command>> {
        self.class_members(class)?
            .iter()
            .find(|c| c.member.as_deref() == Some(member))
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&Enum> {
        self.enums.get(name)
    }

    pub fn enum_member(&self, name: &str, member: &str) -> Option<&EnumMember> {
        self.enum_by_name(name)?.member(member)
    }

    /// Case-insensitive substring search over opcode names and
    /// `Class.Member` names, in document order.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = query.to_lowercase();
        let mut hits = Vec::new();

        for (name, commands) in &self.commands_by_name {
            if !name.contains(&query) {
                continue;
            }
            hits.extend(commands.iter().map(|command| SearchHit {
                label: name.clone(),
                mode: CommandMode::Opcode,
                command: Arc::clone(command),
            }));
        }

        for (class, commands) in &self.commands_by_class {
            for command in commands {
                let label = format!("{class}.{}", command.member.as_deref().unwrap_or_default());
                if label.to_lowercase().contains(&query) {
                    hits.push(SearchHit {
                        label,
                        mode: CommandMode::ClassMember,
                        command: Arc::clone(command),
                    });
                }
            }
        }

        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::parse_definitions;
    use crate::enums::parse_enums;

    fn index() -> Index {
        let definitions = parse_definitions(
            r#"{ "extensions": [{ "commands": [
                { "id": "0001", "name": "WAIT", "short_desc": "" },
                { "id": "00A5", "name": "CREATE_CAR", "class": "Car", "member": "Create", "short_desc": "" },
                { "id": "00A6", "name": "DELETE_CAR", "class": "Car", "member": "Delete", "short_desc": "" }
            ]}]}"#,
        )
        .unwrap();
        let enums = parse_enums("enum Color\n Red\n Green\nend").unwrap();
        Index::build(Some(definitions), Some(enums))
    }

    #[test]
    fn test_lookups() {
        let index = index();
        assert_eq!(index.opcode("Wait").unwrap().id, "0001");
        assert_eq!(index.class_member("Car", "Delete").unwrap().id, "00A6");
        assert!(index.class_member("Car", "Explode").is_none());
        assert!(index.class_member("car", "Create").is_none());
        assert_eq!(index.enum_member("Color", "Green").unwrap().value.to_string(), "1");
        assert_eq!(index.command_count(), 3);
    }

    #[test]
    fn test_search() {
        let index = index();
        let labels: Vec<_> = index.search("car").into_iter().map(|h| h.label).collect();
        assert_eq!(
            labels,
            vec!["create_car", "delete_car", "Car.Create", "Car.Delete"]
        );
        assert!(index.search("zzz").is_empty());
    }

    #[test]
    fn test_missing_sources_are_empty() {
        let index = Index::build(None, None);
        assert!(index.is_empty());
        assert!(index.opcode("wait").is_none());
    }
}
