//! Command definitions: the JSON schema, the in-memory [`Command`], and the
//! two lookup views built from a definition document.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::IndexError;
use crate::formatter;

/// Display convention used when rendering a command signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandMode {
    Opcode,
    ClassMember,
}

impl CommandMode {
    pub const ALL: [Self; 2] = [Self::Opcode, Self::ClassMember];
}

/// One input or output parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttrs {
    #[serde(default)]
    pub is_unsupported: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommand {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub member: Option<String>,
    #[serde(default)]
    pub input: Option<Vec<Arg>>,
    #[serde(default)]
    pub output: Option<Vec<Arg>>,
    #[serde(default)]
    pub short_desc: String,
    #[serde(default)]
    pub attrs: Option<RawAttrs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawExtension {
    #[serde(default)]
    pub commands: Vec<RawCommand>,
}

/// A schema-checked definition document.
#[derive(Debug, Clone, Deserialize)]
pub struct Definitions {
    pub extensions: Vec<RawExtension>,
}

/// Validate and decode a definition document.
pub fn parse_definitions(json: &str) -> Result<Definitions, IndexError> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug, Clone, Default)]
struct SignatureCache {
    opcode: OnceLock<String>,
    class_member: OnceLock<String>,
}

impl SignatureCache {
    fn slot(&self, mode: CommandMode) -> &OnceLock<String> {
        match mode {
            CommandMode::Opcode => &self.opcode,
            CommandMode::ClassMember => &self.class_member,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    pub id: String,
    /// Lowercased.
    pub name: String,
    pub class: Option<String>,
    pub member: Option<String>,
    pub input: Option<Vec<Arg>>,
    pub output: Option<Vec<Arg>>,
    pub short_desc: String,
    pub is_unsupported: bool,
    signatures: SignatureCache,
}

impl Command {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into().to_lowercase(),
            class: None,
            member: None,
            input: None,
            output: None,
            short_desc: String::new(),
            is_unsupported: false,
            signatures: SignatureCache::default(),
        }
    }

    pub fn from_raw(raw: RawCommand) -> Self {
        let is_unsupported = raw.attrs.and_then(|a| a.is_unsupported) == Some(true);
        Self {
            id: raw.id,
            name: raw.name.to_lowercase(),
            class: raw.class.filter(|c| !c.is_empty()),
            member: raw.member.filter(|m| !m.is_empty()),
            input: raw.input,
            output: raw.output,
            short_desc: raw.short_desc,
            is_unsupported,
            signatures: SignatureCache::default(),
        }
    }

    /// Both `class` and `member` are present.
    pub fn class_member(&self) -> Option<(&str, &str)> {
        match (&self.class, &self.member) {
            (Some(class), Some(member)) => Some((class, member)),
            _ => None,
        }
    }

    pub fn is_class_member(&self) -> bool {
        self.class_member().is_some()
    }

    /// Plain signature for `mode`, computed once and cached.
    pub fn signature(&self, mode: CommandMode) -> &str {
        self.signatures
            .slot(mode)
            .get_or_init(|| formatter::format(self, mode))
    }

    /// Highlighted signature for `mode`.
    pub fn highlighted(&self, mode: CommandMode) -> String {
        formatter::highlight(self.signature(mode), self, mode)
    }

    /// Modes this command can be displayed in.
    pub fn modes(&self) -> &'static [CommandMode] {
        if self.is_class_member() {
            &CommandMode::ALL
        } else {
            &[CommandMode::Opcode]
        }
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let format: IndexMap<CommandMode, String> = self
            .modes()
            .iter()
            .map(|mode| (*mode, self.highlighted(*mode)))
            .collect();

        let mut state = serializer.serialize_struct("Command", 10)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("class", &self.class)?;
        state.serialize_field("member", &self.member)?;
        state.serialize_field("input", &self.input)?;
        state.serialize_field("output", &self.output)?;
        state.serialize_field("shortDesc", &self.short_desc)?;
        state.serialize_field("isUnsupported", &self.is_unsupported)?;
        state.serialize_field("format", &format)?;
        state.end()
    }
}

pub type CommandMap = IndexMap<String, Vec<Arc<Command>>>;

#[derive(Debug, Clone, Default)]
pub struct CommandIndex {
    pub by_name: CommandMap,
    pub by_class: CommandMap,
}

/// Build the by-name and by-class views. Every command is listed under its
/// name; class-member commands are additionally listed under their class.
pub fn build_command_index(definitions: Definitions) -> CommandIndex {
    let mut index = CommandIndex::default();
    let mut seen_ids = HashSet::new();

    for extension in definitions.extensions {
        for raw in extension.commands {
            let command = Arc::new(Command::from_raw(raw));

            if !seen_ids.insert(command.id.clone()) {
                tracing::warn!(id = %command.id, name = %command.name, "duplicate command id");
            }

            if let Some((class, _)) = command.class_member() {
                index
                    .by_class
                    .entry(class.to_string())
                    .or_default()
                    .push(Arc::clone(&command));
            }

            index
                .by_name
                .entry(command.name.clone())
                .or_default()
                .push(command);
        }
    }

    index
}
