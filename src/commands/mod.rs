pub mod chat;
pub mod documents;
pub mod settings;

use std::sync::Mutex;

use serde::Serialize;
use tauri::Emitter;

use crate::db::Database;
use crate::gateway::{Gateway, DEFAULT_BACKEND_URL};
use crate::session::ChatSession;
use crate::uploads::UploadManager;

/// Mutable application state managed by Tauri. Each piece is owned by one
/// component and mutated only through its operations; the webview never
/// touches it directly.
#[derive(Default)]
pub struct AppState {
    pub session: Mutex<ChatSession>,
    pub uploads: Mutex<UploadManager>,
}

#[derive(Clone, Serialize)]
struct Notification {
    kind: &'static str,
    message: String,
}

/// Emits a transient toast to the webview.
pub fn notify(app: &tauri::AppHandle, kind: &'static str, message: impl Into<String>) {
    let _ = app.emit(
        "notification",
        Notification {
            kind,
            message: message.into(),
        },
    );
}

/// Resolve the backend gateway: stored setting, then environment, then the
/// localhost default.
pub fn resolve_gateway(db: &Database) -> Gateway {
    let base_url = db
        .get_setting("backend_url")
        .ok()
        .flatten()
        .or_else(|| std::env::var("DOCBOX_BACKEND_URL").ok())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
    Gateway::new(base_url)
}
