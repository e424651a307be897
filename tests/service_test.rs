use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use sanny_lsp::errors::IndexError;
use sanny_lsp::loader::{Selection, VersionTable};
use sanny_lsp::service::{IndexService, RebuildOutcome, ServiceState};

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn select(root: &Path, version: &str) -> Selection {
    VersionTable::default().select(root, version)
}

fn write(root: &Path, version: &str, file: &str, content: &str) {
    let dir = root.join("data").join(version);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), content).unwrap();
}

#[tokio::test]
async fn test_rebuild_publishes_fixture_index() {
    let service = IndexService::new();
    let outcome = service
        .rebuild(Some(select(&fixtures_root(), "sa_sbl")))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RebuildOutcome::Published {
            opcodes: 6,
            classes: 3,
            enums: 3,
        }
    );
    assert_eq!(service.state(), ServiceState::Ready);

    let index = service.snapshot();
    assert!(index.opcode("wait").is_some());
    assert!(index.source().is_some_and(|p| p.ends_with("data/sa_sbl/sa.json")));
}

#[tokio::test]
async fn test_missing_files_give_empty_sections() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "vc_sbl", "enums.txt", "enum Gang\n  Ballas\nend\n");

    let service = IndexService::new();
    let outcome = service
        .rebuild(Some(select(dir.path(), "vc_sbl")))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RebuildOutcome::Published {
            opcodes: 0,
            classes: 0,
            enums: 1,
        }
    );

    let index = service.snapshot();
    assert!(index.commands_by_name().is_empty());
    assert!(index.enum_member("Gang", "Ballas").is_some());
    assert!(index.source().is_none());

    // no folder at all
    let outcome = service
        .rebuild(Some(select(&dir.path().join("nowhere"), "sa_sbl")))
        .await
        .unwrap();
    assert!(matches!(outcome, RebuildOutcome::Published { opcodes: 0, .. }));
    assert_eq!(service.state(), ServiceState::Empty);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_index() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "sa_sbl", "sa.json", "{ \"extensions\": \"oops\" }");

    let service = IndexService::new();
    service
        .rebuild(Some(select(&fixtures_root(), "sa_sbl")))
        .await
        .unwrap();
    let before = service.snapshot();

    let err = service
        .rebuild(Some(select(dir.path(), "sa_sbl")))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Definitions(_)));
    assert_eq!(service.state(), ServiceState::Ready);
    assert!(std::sync::Arc::ptr_eq(&before, &service.snapshot()));
}

#[tokio::test]
async fn test_unterminated_enum_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "gta3_sbl", "enums.txt", "enum Open\n  A\n");

    let service = IndexService::new();
    let err = service
        .rebuild(Some(select(dir.path(), "gta3_sbl")))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::UnterminatedEnum { ref name, line: 1 } if name == "Open"));
    assert_eq!(service.state(), ServiceState::Empty);
}

#[tokio::test]
async fn test_superseded_rebuild_is_not_published() {
    let service = IndexService::new();
    let stale = service.begin_rebuild();
    let fresh = service.begin_rebuild();
    assert!(stale.token().is_cancelled());

    let outcome = service
        .complete_rebuild(stale, Some(select(&fixtures_root(), "sa_sbl")))
        .await
        .unwrap();
    assert_eq!(outcome, RebuildOutcome::Superseded);
    assert!(service.snapshot().is_empty());

    let outcome = service
        .complete_rebuild(fresh, Some(select(&fixtures_root(), "sa_sbl")))
        .await
        .unwrap();
    assert!(matches!(outcome, RebuildOutcome::Published { .. }));
    assert!(!service.snapshot().is_empty());
}

#[tokio::test]
async fn test_unconfigured_rebuild_clears_index() {
    let service = IndexService::new();
    service
        .rebuild(Some(select(&fixtures_root(), "sa_sbl")))
        .await
        .unwrap();

    let outcome = service.rebuild(None).await.unwrap();
    assert_eq!(outcome, RebuildOutcome::NotConfigured);
    assert_eq!(service.state(), ServiceState::Empty);
    assert!(service.snapshot().is_empty());
}
