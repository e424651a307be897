use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sanny_lsp::bridge::{RequestSender, RpcBridge, StorageKey, method};
use sanny_lsp::config::ServerConfig;
use sanny_lsp::errors::RpcError;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::{self, ErrorCode};
use tower_lsp::lsp_types::request::Request;
use tower_lsp::async_trait;

enum Reply {
    Value(Value),
    Error(&'static str),
    Hang,
}

/// In-process stand-in for the editor client.
#[derive(Default)]
struct FakeClient {
    replies: HashMap<&'static str, Reply>,
    seen: Mutex<Vec<(&'static str, Value)>>,
}

impl FakeClient {
    fn reply(mut self, method: &'static str, reply: Reply) -> Self {
        self.replies.insert(method, reply);
        self
    }
}

#[async_trait]
impl RequestSender for FakeClient {
    async fn send<R>(&self, params: R::Params) -> jsonrpc::Result<R::Result>
    where
        R: Request,
        R::Params: Send,
    {
        let params = serde_json::to_value(&params).unwrap();
        self.seen.lock().unwrap().push((R::METHOD, params));

        match self.replies.get(R::METHOD) {
            Some(Reply::Value(value)) => Ok(serde_json::from_value(value.clone()).unwrap()),
            Some(Reply::Error(message)) => Err(jsonrpc::Error {
                code: ErrorCode::InternalError,
                message: (*message).into(),
                data: None,
            }),
            Some(Reply::Hang) | None => std::future::pending().await,
        }
    }
}

fn bridge(client: FakeClient) -> RpcBridge<FakeClient> {
    RpcBridge::new(client, Duration::from_millis(50))
}

#[tokio::test]
async fn test_selection_asks_the_client() {
    let bridge = bridge(
        FakeClient::default()
            .reply(method::STORAGE_GET, Reply::Value(json!("C:/SB4")))
            .reply(method::GET_VERSION_IDENTIFIER, Reply::Value(json!("sa_sbl"))),
    );

    let selection = bridge
        .selection(&ServerConfig::default(), &CancellationToken::new())
        .await
        .unwrap()
        .expect("both values are known");
    assert_eq!(selection.root, PathBuf::from("C:/SB4"));
    assert_eq!(selection.version, "sa_sbl");
    assert_eq!(selection.definitions_file, "sa.json");
}

#[tokio::test]
async fn test_config_overrides_skip_requests() {
    let bridge = bridge(FakeClient::default());
    let config = ServerConfig {
        folder_path: Some(PathBuf::from("/opt/sb")),
        game_version: Some("vc_sbl".to_string()),
        ..ServerConfig::default()
    };

    let selection = bridge
        .selection(&config, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selection.definitions_path(), PathBuf::from("/opt/sb/data/vc_sbl/vc.json"));
    assert!(bridge.sender().seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unset_folder_means_not_configured() {
    let bridge = bridge(
        FakeClient::default()
            .reply(method::STORAGE_GET, Reply::Value(Value::Null))
            .reply(method::GET_VERSION_IDENTIFIER, Reply::Value(json!("sa_sbl"))),
    );

    let selection = bridge
        .selection(&ServerConfig::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(selection, None);
}

#[tokio::test]
async fn test_unknown_version_means_not_configured() {
    let bridge = bridge(
        FakeClient::default()
            .reply(method::STORAGE_GET, Reply::Value(json!("C:/SB4")))
            .reply(method::GET_VERSION_IDENTIFIER, Reply::Value(Value::Null)),
    );

    let selection = bridge
        .selection(&ServerConfig::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(selection, None);
}

#[tokio::test]
async fn test_call_times_out() {
    let bridge = bridge(FakeClient::default().reply(method::GET_VERSION_IDENTIFIER, Reply::Hang));

    let err = bridge
        .version_identifier(&CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        RpcError::Timeout { method: name, after } => {
            assert_eq!(name, method::GET_VERSION_IDENTIFIER);
            assert_eq!(after, Duration::from_millis(50));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_call_honours_cancellation() {
    let bridge = RpcBridge::new(
        FakeClient::default().reply(method::STORAGE_GET, Reply::Hang),
        Duration::from_secs(60),
    );
    let token = CancellationToken::new();

    let cancel = token.clone();
    let (result, ()) = tokio::join!(
        bridge.storage_get(StorageKey::Sb4FolderPath, &token),
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        }
    );
    assert!(matches!(
        result,
        Err(RpcError::Cancelled { method: method::STORAGE_GET })
    ));
}

#[tokio::test]
async fn test_remote_error_is_reported() {
    let bridge = bridge(
        FakeClient::default().reply(method::GET_VERSION_IDENTIFIER, Reply::Error("no version picked")),
    );

    let err = bridge
        .version_identifier(&CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "request `sb4/gta-version/get-identifier` failed: no version picked"
    );
}

#[tokio::test]
async fn test_storage_round_trip_params() {
    let client = FakeClient::default()
        .reply(method::STORAGE_SET, Reply::Value(Value::Null))
        .reply(method::STORAGE_GET, Reply::Value(json!("GTA SA")));
    let bridge = bridge(client);
    let token = CancellationToken::new();

    bridge
        .storage_set(StorageKey::GtaVersion, json!("GTA SA"), &token)
        .await
        .unwrap();
    let value = bridge.storage_get(StorageKey::GtaVersion, &token).await.unwrap();
    assert_eq!(value, Some(json!("GTA SA")));

    let seen = bridge.sender().seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (method::STORAGE_SET, json!({ "key": "gtaVersion", "value": "GTA SA" })),
            (method::STORAGE_GET, json!({ "key": "gtaVersion" })),
        ]
    );
}

#[test]
fn test_timeout_is_adjustable() {
    let bridge = bridge(FakeClient::default());
    bridge.set_timeout(Duration::from_millis(1500));
    assert_eq!(bridge.timeout(), Duration::from_millis(1500));
}
