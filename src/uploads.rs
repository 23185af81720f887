use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::gateway::{DocumentOut, Gateway, GatewayError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

/// A file staged for upload. `success` and `error` are terminal: an item
/// never re-enters `uploading`, and only `pending` items can be removed.
#[derive(Debug, Serialize, Clone)]
pub struct UploadItem {
    pub id: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub name: String,
    pub size: Option<u64>,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Snapshot of the upload dialog sent to the webview.
#[derive(Debug, Serialize, Clone)]
pub struct UploadDialogState {
    pub staged: Vec<UploadItem>,
    pub documents: Vec<DocumentOut>,
    pub all_uploaded: bool,
}

/// Per-item transition reported while a submission pass runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Started { id: String, name: String },
    Succeeded { id: String, name: String },
    Failed { id: String, name: String, detail: String },
    RefreshFailed { detail: String },
}

/// Owns the staged files and the mirror of the server-held document list.
/// The mirror is replaced wholesale on every refresh, never merged; the
/// server stays the source of truth.
#[derive(Default)]
pub struct UploadManager {
    staged: Vec<UploadItem>,
    documents: Vec<DocumentOut>,
    last_stamp: u64,
}

impl UploadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends new `pending` items for the selected paths. Existing items
    /// are never touched.
    pub fn stage<P: AsRef<Path>>(&mut self, paths: &[P]) {
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();
            let size = std::fs::metadata(path).map(|m| m.len()).ok();
            self.staged.push(UploadItem {
                id: format!("{}-{}", self.next_stamp(), name),
                path: path.to_path_buf(),
                name,
                size,
                status: UploadStatus::Pending,
                progress: None,
                error: None,
            });
        }
    }

    /// Removes a staged item, permitted only while it is still `pending`.
    pub fn remove(&mut self, id: &str) {
        self.staged
            .retain(|item| item.id != id || item.status != UploadStatus::Pending);
    }

    pub fn staged(&self) -> &[UploadItem] {
        &self.staged
    }

    pub fn staged_ids(&self) -> Vec<String> {
        self.staged.iter().map(|item| item.id.clone()).collect()
    }

    /// `pending` → `uploading`; returns the path and name to submit, or
    /// `None` when the item is missing, terminal or already mid-flight.
    pub fn begin_upload(&mut self, id: &str) -> Option<(PathBuf, String)> {
        let item = self.staged.iter_mut().find(|item| item.id == id)?;
        if item.status != UploadStatus::Pending {
            return None;
        }
        item.status = UploadStatus::Uploading;
        item.progress = Some(50);
        Some((item.path.clone(), item.name.clone()))
    }

    pub fn mark_success(&mut self, id: &str) {
        if let Some(item) = self.staged.iter_mut().find(|item| item.id == id) {
            item.status = UploadStatus::Success;
            item.progress = Some(100);
        }
    }

    pub fn mark_error(&mut self, id: &str, detail: &str) {
        if let Some(item) = self.staged.iter_mut().find(|item| item.id == id) {
            item.status = UploadStatus::Error;
            item.progress = None;
            item.error = Some(detail.to_string());
        }
    }

    pub fn documents(&self) -> &[DocumentOut] {
        &self.documents
    }

    /// Wholesale replacement of the mirror.
    pub fn replace_documents(&mut self, documents: Vec<DocumentOut>) {
        self.documents = documents;
    }

    /// Discards all staged items, whatever their state. The mirror is kept:
    /// already-uploaded server documents are unaffected by closing the dialog.
    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    /// True only when at least one file is staged and every one succeeded.
    /// Gates the dialog's primary action in the shell.
    pub fn all_uploaded(&self) -> bool {
        !self.staged.is_empty()
            && self
                .staged
                .iter()
                .all(|item| item.status == UploadStatus::Success)
    }

    pub fn snapshot(&self) -> UploadDialogState {
        UploadDialogState {
            staged: self.staged.clone(),
            documents: self.documents.clone(),
            all_uploaded: self.all_uploaded(),
        }
    }

    // Selection-time milliseconds with a monotonic tie-break, so two files
    // picked in the same millisecond still get distinct ids.
    fn next_stamp(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis() as u64;
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }
}

/// Replaces the mirror from the server. Callers decide how a failure is
/// surfaced; the mirror is untouched when the fetch fails.
pub async fn refresh_mirror(
    manager: &Mutex<UploadManager>,
    gateway: &Gateway,
) -> Result<(), GatewayError> {
    let documents = gateway.list_documents().await?;
    tracing::debug!(count = documents.len(), "document list refreshed");
    manager.lock().unwrap().replace_documents(documents);
    Ok(())
}

/// Submits every `pending` item in staged order, one at a time: each upload
/// is awaited before the next begins. A failing item becomes terminal
/// `error` and the pass moves on; after each success the mirror is
/// refreshed wholesale. The lock is never held across a network call.
pub async fn upload_all(
    manager: &Mutex<UploadManager>,
    gateway: &Gateway,
    mut on_event: impl FnMut(UploadEvent),
) {
    let ids = manager.lock().unwrap().staged_ids();
    for id in ids {
        let begun = manager.lock().unwrap().begin_upload(&id);
        let (path, name) = match begun {
            Some(item) => item,
            None => continue, // already terminal or mid-flight
        };
        on_event(UploadEvent::Started {
            id: id.clone(),
            name: name.clone(),
        });

        let outcome = match std::fs::read(&path) {
            Ok(bytes) => gateway.upload(&name, bytes).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(ingested) => {
                tracing::debug!(id = ingested.id, name = %ingested.name, "document ingested");
                manager.lock().unwrap().mark_success(&id);
                on_event(UploadEvent::Succeeded { id, name });
                if let Err(e) = refresh_mirror(manager, gateway).await {
                    tracing::warn!(error = %e, "document list refresh after upload failed");
                    on_event(UploadEvent::RefreshFailed {
                        detail: e.to_string(),
                    });
                }
            }
            Err(detail) => {
                tracing::error!(file = %name, error = %detail, "upload failed");
                manager.lock().unwrap().mark_error(&id, &detail);
                on_event(UploadEvent::Failed { id, name, detail });
            }
        }
    }
}

/// Deletes a server document and refreshes the mirror. When the delete
/// fails the mirror is left unchanged, so the displayed list never drops a
/// document the server still holds.
pub async fn delete_remote(
    manager: &Mutex<UploadManager>,
    gateway: &Gateway,
    id: i64,
) -> Result<(), GatewayError> {
    gateway.delete_document(id).await?;
    if let Err(e) = refresh_mirror(manager, gateway).await {
        tracing::warn!(error = %e, "document list refresh after delete failed");
    }
    Ok(())
}
