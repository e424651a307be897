//! Typed requests between the server and its editor client.
//!
//! The server answers [`method::GET_OPCODES`] and
//! [`method::GET_CLASSES_MEMBERS`]; everything else here is sent to the
//! client through [`RpcBridge`], which bounds every call with a timeout and
//! a cancellation token.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::request::Request;
use tower_lsp::{Client, async_trait, jsonrpc};

use crate::config::ServerConfig;
use crate::errors::RpcError;
use crate::loader::Selection;

pub mod method {
    pub const GET_OPCODES: &str = "sb4/command/get-opcodes";
    pub const GET_CLASSES_MEMBERS: &str = "sb4/command/get-classes-members";
    pub const GET_VERSION_IDENTIFIER: &str = "sb4/gta-version/get-identifier";
    pub const STORAGE_GET: &str = "sb4/storage/get";
    pub const STORAGE_SET: &str = "sb4/storage/set";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKey {
    #[serde(rename = "gtaVersion")]
    GtaVersion,
    #[serde(rename = "sb4FolderPath")]
    Sb4FolderPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageGetParams {
    pub key: StorageKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSetParams {
    pub key: StorageKey,
    pub value: Value,
}

#[derive(Debug)]
pub enum GetVersionIdentifier {}

impl Request for GetVersionIdentifier {
    type Params = ();
    type Result = Option<String>;
    const METHOD: &'static str = method::GET_VERSION_IDENTIFIER;
}

#[derive(Debug)]
pub enum StorageGet {}

impl Request for StorageGet {
    type Params = StorageGetParams;
    type Result = Option<Value>;
    const METHOD: &'static str = method::STORAGE_GET;
}

#[derive(Debug)]
pub enum StorageSet {}

impl Request for StorageSet {
    type Params = StorageSetParams;
    type Result = ();
    const METHOD: &'static str = method::STORAGE_SET;
}

/// Anything that can deliver a request to the client.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send<R>(&self, params: R::Params) -> jsonrpc::Result<R::Result>
    where
        R: Request,
        R::Params: Send;
}

#[async_trait]
impl RequestSender for Client {
    async fn send<R>(&self, params: R::Params) -> jsonrpc::Result<R::Result>
    where
        R: Request,
        R::Params: Send,
    {
        self.send_request::<R>(params).await
    }
}

#[derive(Debug)]
pub struct RpcBridge<S> {
    sender: S,
    timeout_ms: AtomicU64,
}

impl<S: RequestSender> RpcBridge<S> {
    pub fn new(sender: S, timeout: Duration) -> Self {
        let bridge = Self {
            sender,
            timeout_ms: AtomicU64::new(0),
        };
        bridge.set_timeout(timeout);
        bridge
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    pub fn set_timeout(&self, timeout: Duration) {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.timeout_ms.store(ms, Ordering::Relaxed);
    }

    /// Send `R`, giving up when `cancel` fires or the timeout elapses.
    pub async fn call<R>(
        &self,
        params: R::Params,
        cancel: &CancellationToken,
    ) -> Result<R::Result, RpcError>
    where
        R: Request,
        R::Params: Send,
    {
        let after = self.timeout();
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RpcError::Cancelled { method: R::METHOD }),
            result = tokio::time::timeout(after, self.sender.send::<R>(params)) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(RpcError::Remote {
                    method: R::METHOD,
                    message: err.message.into_owned(),
                }),
                Err(_) => Err(RpcError::Timeout {
                    method: R::METHOD,
                    after,
                }),
            },
        }
    }

    pub async fn version_identifier(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, RpcError> {
        let identifier = self.call::<GetVersionIdentifier>((), cancel).await?;
        Ok(identifier.filter(|id| !id.is_empty()))
    }

    pub async fn storage_get(
        &self,
        key: StorageKey,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, RpcError> {
        let value = self
            .call::<StorageGet>(StorageGetParams { key }, cancel)
            .await?;
        Ok(value.filter(|v| !v.is_null()))
    }

    pub async fn storage_set(
        &self,
        key: StorageKey,
        value: Value,
        cancel: &CancellationToken,
    ) -> Result<(), RpcError> {
        self.call::<StorageSet>(StorageSetParams { key, value }, cancel)
            .await
    }

    /// Resolve the folder and version to load, preferring values set in
    /// `config` over what the client reports. `None` when either is unknown.
    pub async fn selection(
        &self,
        config: &ServerConfig,
        cancel: &CancellationToken,
    ) -> Result<Option<Selection>, RpcError> {
        let folder = match &config.folder_path {
            Some(path) => Some(path.clone()),
            None => self
                .storage_get(StorageKey::Sb4FolderPath, cancel)
                .await?
                .as_ref()
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        };
        let Some(folder) = folder else {
            return Ok(None);
        };

        let version = match &config.game_version {
            Some(version) => Some(version.clone()),
            None => self.version_identifier(cancel).await?,
        };

        Ok(version.map(|version| config.version_table().select(folder, version)))
    }
}
