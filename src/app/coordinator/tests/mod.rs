//! Unit tests for the download orchestrator
//!
//! Providers are served in-process from gzip buffers. Service-level tests
//! live in the top-level tests directory.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rusqlite::Connection;
use tempfile::TempDir;
use url::Url;

use super::*;
use crate::app::client::ProviderStream;
use crate::app::coordinator::resources::tests::CountingKeepAwake;
use crate::app::decoder::tests::{gzip, HEADER};
use crate::app::providers::{Provider, ProviderSettings};
use crate::errors::NetworkError;

const OCID_HOST: &str = "ocid.test";
const MLS_HOST: &str = "mls.test";

fn row(mcc: u16, mnc: u16, cell: u32) -> String {
    format!("GSM,{mcc},{mnc},100,{cell},0,13.4,52.5,1000,3,1,0,0,0\n")
}

fn export(rows: &[String]) -> Vec<u8> {
    gzip(&format!("{HEADER}{}", rows.concat()))
}

/// Serve `ocid` and `mls` by host; `None` answers with HTTP 404
fn routed_source(ocid: Option<Vec<u8>>, mls: Option<Vec<u8>>) -> Arc<dyn ProviderSource> {
    Arc::new(move |url: &Url| -> Result<ProviderStream> {
        let body = match url.host_str() {
            Some(OCID_HOST) => ocid.clone(),
            Some(MLS_HOST) => mls.clone(),
            _ => None,
        };
        match body {
            Some(bytes) => Ok(ProviderStream {
                content_length: Some(bytes.len() as u64),
                body: Box::new(Cursor::new(bytes)),
            }),
            None => Err(NetworkError::ServerError {
                status: 404,
                url: url.to_string(),
            }
            .into()),
        }
    })
}

fn test_config(output: &Path) -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_output_path(output)
        .with_providers(ProviderSettings {
            opencellid_api_key: "test-key".to_string(),
            opencellid_url: format!("https://{OCID_HOST}/cells.csv.gz?token={{api_key}}"),
            mozilla_url: format!("https://{MLS_HOST}/export-{{date}}.csv.gz"),
            ..Default::default()
        })
}

fn count_rows(path: &Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row("SELECT COUNT(*) FROM cells", [], |r| r.get(0))
        .unwrap()
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_run_publishes_all_providers() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    let source = routed_source(
        Some(export(&[row(262, 1, 1), row(262, 2, 2)])),
        Some(export(&[row(262, 1, 3)])),
    );

    let orchestrator = DownloadOrchestrator::new(test_config(&output), source);
    let outcome = orchestrator.run().await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.records_inserted(), 3);
    assert_eq!(outcome.providers().len(), 2);
    assert_eq!(outcome.providers()[0].provider, Provider::OpenCellId);
    assert_eq!(count_rows(&output), 3);
    assert_eq!(dir_entries(dir.path()), vec!["new_lacells.db".to_string()]);
    assert_eq!(orchestrator.session().state(), RunState::Completed);

    let text = orchestrator.session().log().text();
    assert!(text.contains("[info]  MCC filter: none (all codes)"));
    assert!(text.contains("[info]  Getting OpenCellID data"));
    assert!(text.contains("[info]  Getting Mozilla Location Service data"));
    assert!(text.contains("token=test-key"));
    assert!(text.contains("[info]  Total run time: "));
    assert!(text.ends_with("[info]  Finished\n"));
}

#[tokio::test]
async fn test_published_database_has_indices() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    let source = routed_source(Some(export(&[row(262, 1, 1)])), None);
    let mut config = test_config(&output);
    config.providers.use_mozilla = false;

    DownloadOrchestrator::new(config, source).run().await.unwrap();

    let conn = Connection::open(&output).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' ORDER BY name")
        .unwrap();
    let names: Vec<String> = stmt
        .query_map([], |r| r.get(0))
        .unwrap()
        .map(|n| n.unwrap())
        .collect();
    assert_eq!(names, vec!["_idx1".to_string(), "_idx2".to_string()]);
}

#[tokio::test]
async fn test_failed_provider_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    std::fs::write(&output, b"previous database").unwrap();

    let source = routed_source(Some(export(&[row(262, 1, 1)])), None);
    let keep_awake = Arc::new(CountingKeepAwake::default());
    let orchestrator =
        DownloadOrchestrator::new(test_config(&output), source).with_keep_awake(keep_awake.clone());

    let result = orchestrator.run().await;

    assert!(matches!(
        result,
        Err(AppError::Network(NetworkError::ServerError { status: 404, .. }))
    ));
    assert_eq!(std::fs::read(&output).unwrap(), b"previous database");
    assert_eq!(dir_entries(dir.path()), vec!["new_lacells.db".to_string()]);
    assert_eq!(orchestrator.session().state(), RunState::Failed);
    assert_eq!(keep_awake.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(keep_awake.released.load(Ordering::SeqCst), 1);

    let text = orchestrator.session().log().text();
    assert!(text.contains("[fail]  network: "));
    assert!(text.ends_with("[info]  Finished\n"));
}

#[tokio::test]
async fn test_truncated_export_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    std::fs::write(&output, b"previous database").unwrap();

    let rows: Vec<String> = (0..5000).map(|cell| row(262, 1, cell)).collect();
    let mut truncated = export(&rows);
    truncated.truncate(truncated.len() / 2);
    let source = routed_source(Some(truncated), Some(export(&[row(262, 1, 1)])));
    let orchestrator = DownloadOrchestrator::new(test_config(&output), source);

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(AppError::Decode(_))));
    assert_eq!(std::fs::read(&output).unwrap(), b"previous database");
    assert_eq!(dir_entries(dir.path()), vec!["new_lacells.db".to_string()]);
    assert_eq!(orchestrator.session().state(), RunState::Failed);

    let text = orchestrator.session().log().text();
    assert!(text.contains("[fail]  decode: "));
    assert!(!text.contains("Getting Mozilla Location Service data"));
}

#[tokio::test]
async fn test_cancelled_run_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    let source = routed_source(Some(export(&[row(262, 1, 1)])), Some(export(&[])));

    let orchestrator = DownloadOrchestrator::new(test_config(&output), source);
    orchestrator.session().cancel();
    let outcome = orchestrator.run().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled { .. }));
    assert!(outcome.providers().is_empty());
    assert!(dir_entries(dir.path()).is_empty());
    assert_eq!(orchestrator.session().state(), RunState::Cancelled);
    assert!(orchestrator
        .session()
        .log()
        .text()
        .contains("[warn]  Download cancelled, no database published"));
}

#[tokio::test]
async fn test_no_providers_publishes_empty_database() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    let mut config = test_config(&output);
    config.providers.use_opencellid = false;
    config.providers.use_mozilla = false;

    let outcome = DownloadOrchestrator::new(config, routed_source(None, None))
        .run()
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(count_rows(&output), 0);
}

#[tokio::test]
async fn test_invalid_config_fails_before_staging() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    let keep_awake = Arc::new(CountingKeepAwake::default());
    let orchestrator = DownloadOrchestrator::new(
        test_config(&output).with_batch_size(0),
        routed_source(None, None),
    )
    .with_keep_awake(keep_awake.clone());

    let result = orchestrator.run().await;

    assert!(matches!(
        result,
        Err(AppError::Coordinator(CoordinatorError::InvalidConfig { .. }))
    ));
    assert!(dir_entries(dir.path()).is_empty());
    assert_eq!(keep_awake.released.load(Ordering::SeqCst), 1);
    assert!(orchestrator.session().log().text().contains("[fail]  coordinator: "));
}

#[tokio::test]
async fn test_filter_log_lines() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    let mut config = test_config(&output).with_filters("262, 310", "x,y");
    config.providers.use_mozilla = false;
    let source = routed_source(
        Some(export(&[row(262, 1, 1), row(310, 5, 2), row(208, 1, 3)])),
        None,
    );

    let orchestrator = DownloadOrchestrator::new(config, source);
    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.records_inserted(), 2);
    let text = orchestrator.session().log().text();
    assert!(text.contains("[info]  MCC filter: 262,310"));
    assert!(text.contains("[warn]  MNC filter \"x,y\" has no valid code, accepting all codes"));
    assert!(text.contains("[info]  MNC filter: none (all codes)"));
}

#[tokio::test]
async fn test_session_is_cleared_between_runs() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("new_lacells.db");
    let mut config = test_config(&output);
    config.providers.use_mozilla = false;
    let orchestrator = DownloadOrchestrator::new(
        config,
        routed_source(Some(export(&[row(262, 1, 1)])), None),
    );

    orchestrator.run().await.unwrap();
    orchestrator.run().await.unwrap();

    let text = orchestrator.session().log().text();
    assert_eq!(text.matches("Getting OpenCellID data").count(), 1);
    assert_eq!(count_rows(&output), 1);
}
