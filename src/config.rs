//! Server settings from `initializationOptions` and
//! `workspace/didChangeConfiguration`.

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::ConfigError;
use crate::loader::VersionTable;

const SECTION: &str = "sannyBuilder";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Sanny Builder install folder. Asked from client storage when unset.
    pub folder_path: Option<PathBuf>,
    /// Version identifier such as `sa_sbl`. Asked from the client when unset.
    pub game_version: Option<String>,
    pub request_timeout_ms: u64,
    /// Extra identifier to definition file entries.
    pub versions: IndexMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            folder_path: None,
            game_version: None,
            request_timeout_ms: 5000,
            versions: IndexMap::new(),
        }
    }
}

impl ServerConfig {
    /// Parse a settings payload. `null` yields the defaults; the payload may
    /// be nested under a `sannyBuilder` key.
    pub fn from_value(value: Option<Value>) -> Result<Self, ConfigError> {
        let value = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(mut map)) if map.contains_key(SECTION) => {
                map.remove(SECTION).unwrap_or(Value::Null)
            },
            Some(other) => other,
        };
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn version_table(&self) -> VersionTable {
        VersionTable::merged(&self.versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_value(None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(ServerConfig::from_value(Some(Value::Null)).unwrap(), config);
    }

    #[test]
    fn test_nested_section() {
        let config = ServerConfig::from_value(Some(json!({
            "sannyBuilder": {
                "folderPath": "C:/SB4",
                "gameVersion": "vc_sbl",
                "requestTimeoutMs": 250,
                "versions": { "sa_sbl_unreal": "sa_unreal.json" }
            }
        })))
        .unwrap();
        assert_eq!(config.folder_path, Some(PathBuf::from("C:/SB4")));
        assert_eq!(config.game_version.as_deref(), Some("vc_sbl"));
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.version_table().definitions_file("sa_sbl_unreal"),
            "sa_unreal.json"
        );
    }

    #[test]
    fn test_flat_payload_and_partial_fields() {
        let config = ServerConfig::from_value(Some(json!({ "gameVersion": "sa_sbl" }))).unwrap();
        assert_eq!(config.game_version.as_deref(), Some("sa_sbl"));
        assert_eq!(config.request_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_payload() {
        let err = ServerConfig::from_value(Some(json!({ "requestTimeoutMs": "soon" })));
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }
}
