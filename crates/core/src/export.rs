#![allow(missing_docs)]

//! Bomb log export: upload to a log store, fall back to a local archive.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::transport::Attachment;

/// Why an upload didn't produce a URL.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("upload timed out after {0:?}")]
    Timeout(Duration),
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("log store rejected the upload: {0}")]
    Rejected(String),
    #[error("malformed log store response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Remote log storage.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Upload `log` under `filename` and return a public URL.
    async fn upload(&self, log: &str, filename: &str) -> Result<String, ExportError>;
}

/// Connection settings for [`OpcLogStore`].
#[derive(Debug, Clone)]
pub struct OpcCredentials {
    pub endpoint: String,
    pub viewer_base: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Log store speaking the OnPointCoding logs API.
pub struct OpcLogStore {
    client: reqwest::Client,
    credentials: OpcCredentials,
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    log_data: &'a str,
    log_format: &'a str,
    log_filename: &'a str,
}

impl OpcLogStore {
    pub fn new(credentials: OpcCredentials, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build log store HTTP client")?;
        Ok(Self {
            client,
            credentials,
        })
    }
}

/// A falsy `error` field means success; anything else is a list of complaints.
fn parse_upload_response(body: &str, credentials: &OpcCredentials) -> Result<String, ExportError> {
    let decoded: Value = serde_json::from_str(body)?;
    let failed = match decoded.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    };
    if failed {
        let message = match &decoded["error"] {
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join("\n"),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(ExportError::Rejected(message));
    }

    let log_id = match &decoded["log_id"] {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return Err(ExportError::Rejected("response carries no log id".to_string())),
    };
    Ok(format!(
        "{}/{}/{}.log",
        credentials.viewer_base.trim_end_matches('/'),
        credentials.client_id,
        log_id
    ))
}

#[async_trait]
impl LogStore for OpcLogStore {
    async fn upload(&self, log: &str, filename: &str) -> Result<String, ExportError> {
        let request = UploadRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            log_data: log,
            log_format: "raw",
            log_filename: filename,
        };
        let body = self
            .client
            .post(&self.credentials.endpoint)
            .json(&request)
            .send()
            .await?
            .text()
            .await?;
        parse_upload_response(&body, &self.credentials)
    }
}

/// Directory of bomb logs named `ktanesim_bomb<n>.log`.
pub struct LogArchive {
    root: PathBuf,
    next_index: Mutex<Option<usize>>,
}

impl LogArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_index: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve the next file name. The first reservation counts the files already in
    /// the directory; later ones just increment.
    pub fn reserve_filename(&self) -> String {
        let mut next = self.next_index.lock();
        let index = match *next {
            Some(index) => index,
            None => self.existing_files() + 1,
        };
        *next = Some(index + 1);
        format!("ktanesim_bomb{index}.log")
    }

    fn existing_files(&self) -> usize {
        fs::read_dir(&self.root)
            .map(|entries| entries.filter_map(|entry| entry.ok()).count())
            .unwrap_or(0)
    }

    /// Write `log` under a previously reserved name.
    pub fn write(&self, filename: &str, log: &str) -> Result<Attachment> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.root.join(filename);
        fs::write(&path, log).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(Attachment {
            path,
            filename: filename.to_string(),
        })
    }
}

/// Message and optional file announcing where a bomb log went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub text: String,
    pub attachment: Option<Attachment>,
}

/// Ships finished bomb logs somewhere players can read them.
pub struct LogExporter {
    store: Option<Arc<dyn LogStore>>,
    archive: LogArchive,
    timeout: Duration,
    debug: bool,
}

impl LogExporter {
    pub fn new(
        store: Option<Arc<dyn LogStore>>,
        archive: LogArchive,
        timeout: Duration,
        debug: bool,
    ) -> Self {
        Self {
            store,
            archive,
            timeout,
            debug,
        }
    }

    /// Exporter that only ever writes to the archive.
    pub fn local(archive: LogArchive) -> Self {
        Self::new(None, archive, Duration::from_secs(10), false)
    }

    /// Upload within the timeout, otherwise archive locally. Never fails.
    pub async fn export(&self, log: &str) -> ExportOutcome {
        let filename = self.archive.reserve_filename();

        let text = match (&self.store, self.debug) {
            (_, true) => "Debug mode enabled - attaching the log instead of uploading it:".to_string(),
            (None, false) => "Bomb log:".to_string(),
            (Some(store), false) => {
                match tokio::time::timeout(self.timeout, store.upload(log, &filename)).await {
                    Ok(Ok(url)) => {
                        info!(%url, "Bomb log uploaded");
                        return ExportOutcome {
                            text: format!("Log: {url}"),
                            attachment: None,
                        };
                    }
                    Ok(Err(ExportError::Rejected(message))) => {
                        warn!(%message, "Log store rejected bomb log");
                        format!("Log upload failed, attaching it instead: ```\n{message}```")
                    }
                    Ok(Err(err)) => {
                        warn!(?err, "Bomb log upload failed");
                        "Log upload failed with an exception, attaching it instead:".to_string()
                    }
                    Err(_) => {
                        warn!(timeout = ?self.timeout, "Bomb log upload timed out");
                        "Log upload failed with timeout, attaching it instead:".to_string()
                    }
                }
            }
        };

        match self.archive.write(&filename, log) {
            Ok(attachment) => ExportOutcome {
                text,
                attachment: Some(attachment),
            },
            Err(err) => {
                error!(?err, "Failed to archive bomb log");
                ExportOutcome {
                    text: format!("{text} (the log could not be saved either, sorry)"),
                    attachment: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct FixedStore(Result<&'static str, &'static str>);

    #[async_trait]
    impl LogStore for FixedStore {
        async fn upload(&self, _log: &str, _filename: &str) -> Result<String, ExportError> {
            self.0
                .map(str::to_string)
                .map_err(|message| ExportError::Rejected(message.to_string()))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl LogStore for SlowStore {
        async fn upload(&self, _log: &str, _filename: &str) -> Result<String, ExportError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    fn exporter(store: Option<Arc<dyn LogStore>>, root: &Path) -> LogExporter {
        LogExporter::new(store, LogArchive::new(root), Duration::from_millis(50), false)
    }

    #[test]
    fn archive_numbers_after_existing_files() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("ktanesim_bomb1.log"), "old")?;
        fs::write(dir.path().join("notes.txt"), "unrelated")?;
        let archive = LogArchive::new(dir.path());

        assert_eq!(archive.reserve_filename(), "ktanesim_bomb3.log");
        assert_eq!(archive.reserve_filename(), "ktanesim_bomb4.log");

        let attachment = archive.write("ktanesim_bomb3.log", "Edgework: 0B 0H // KT4NE8")?;
        assert_eq!(fs::read_to_string(&attachment.path)?, "Edgework: 0B 0H // KT4NE8");
        Ok(())
    }

    #[tokio::test]
    async fn successful_upload_attaches_nothing() -> Result<()> {
        let dir = tempdir()?;
        let exporter = exporter(Some(Arc::new(FixedStore(Ok("https://logs/1.log")))), dir.path());
        let outcome = exporter.export("log").await;
        assert_eq!(outcome.text, "Log: https://logs/1.log");
        assert!(outcome.attachment.is_none());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_upload_falls_back_to_archive() -> Result<()> {
        let dir = tempdir()?;
        let exporter = exporter(Some(Arc::new(FixedStore(Err("bad secret")))), dir.path());
        let outcome = exporter.export("log body").await;
        assert!(outcome.text.contains("bad secret"));
        let attachment = outcome.attachment.expect("archived");
        assert_eq!(attachment.filename, "ktanesim_bomb1.log");
        assert_eq!(fs::read_to_string(attachment.path)?, "log body");
        Ok(())
    }

    #[tokio::test]
    async fn slow_upload_times_out() -> Result<()> {
        let dir = tempdir()?;
        let exporter = exporter(Some(Arc::new(SlowStore)), dir.path());
        let outcome = exporter.export("log").await;
        assert!(outcome.text.contains("timeout"));
        assert!(outcome.attachment.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn debug_mode_skips_upload() -> Result<()> {
        let dir = tempdir()?;
        let exporter = LogExporter::new(
            Some(Arc::new(FixedStore(Ok("https://never")))),
            LogArchive::new(dir.path()),
            Duration::from_secs(1),
            true,
        );
        let outcome = exporter.export("log").await;
        assert!(outcome.text.starts_with("Debug mode"));
        assert!(outcome.attachment.is_some());
        Ok(())
    }

    #[test]
    fn upload_response_parsing() {
        let credentials = OpcCredentials {
            endpoint: "https://api.example/v2/logs".to_string(),
            viewer_base: "https://logs.example/file/".to_string(),
            client_id: "bot".to_string(),
            client_secret: "secret".to_string(),
        };
        let ok = parse_upload_response(r#"{"error": false, "log_id": "abc"}"#, &credentials);
        assert_eq!(ok.ok().as_deref(), Some("https://logs.example/file/bot/abc.log"));
        let ok = parse_upload_response(r#"{"error": [], "log_id": 7}"#, &credentials);
        assert_eq!(ok.ok().as_deref(), Some("https://logs.example/file/bot/7.log"));

        let rejected = parse_upload_response(r#"{"error": ["no", "way"]}"#, &credentials);
        assert!(matches!(rejected, Err(ExportError::Rejected(m)) if m == "no\nway"));
        let garbage = parse_upload_response("<html>", &credentials);
        assert!(matches!(garbage, Err(ExportError::Malformed(_))));
    }
}
