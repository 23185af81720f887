use tauri::{Emitter, State};

use crate::commands::{notify, resolve_gateway, AppState};
use crate::db::Database;
use crate::uploads::{self, UploadDialogState, UploadEvent};

/// Emits the current dialog snapshot to the webview and returns it.
fn emit_state(app: &tauri::AppHandle, state: &AppState) -> UploadDialogState {
    let snapshot = state.uploads.lock().unwrap().snapshot();
    let _ = app.emit("upload-state", &snapshot);
    snapshot
}

async fn refresh_documents(app: &tauri::AppHandle, db: &Database, state: &AppState) {
    let gateway = resolve_gateway(db);
    if let Err(e) = uploads::refresh_mirror(&state.uploads, &gateway).await {
        tracing::warn!(error = %e, "failed to load document list");
        notify(app, "error", "Failed to load documents");
    }
}

/// Opening the dialog refreshes the document mirror from the server.
#[tauri::command]
pub async fn open_upload_dialog(
    app: tauri::AppHandle,
    db: State<'_, Database>,
    state: State<'_, AppState>,
) -> Result<UploadDialogState, String> {
    refresh_documents(&app, &db, &state).await;
    Ok(emit_state(&app, &state))
}

/// Closing the dialog discards all staged items, whatever their state.
/// Already-uploaded server documents are unaffected.
#[tauri::command]
pub fn close_upload_dialog(state: State<'_, AppState>) -> Result<(), String> {
    state.uploads.lock().unwrap().clear_staged();
    Ok(())
}

/// Stages the selected files (from the picker or a drop) as `pending` items.
#[tauri::command]
pub fn stage_files(
    app: tauri::AppHandle,
    state: State<'_, AppState>,
    paths: Vec<String>,
) -> Result<UploadDialogState, String> {
    state.uploads.lock().unwrap().stage(&paths);
    Ok(emit_state(&app, &state))
}

#[tauri::command]
pub fn remove_staged_file(
    app: tauri::AppHandle,
    state: State<'_, AppState>,
    id: String,
) -> Result<UploadDialogState, String> {
    state.uploads.lock().unwrap().remove(&id);
    Ok(emit_state(&app, &state))
}

#[tauri::command]
pub fn get_upload_state(state: State<'_, AppState>) -> Result<UploadDialogState, String> {
    Ok(state.uploads.lock().unwrap().snapshot())
}

/// Submits all pending staged files, one at a time in staged order.
#[tauri::command]
pub async fn upload_staged(
    app: tauri::AppHandle,
    db: State<'_, Database>,
    state: State<'_, AppState>,
) -> Result<UploadDialogState, String> {
    let gateway = resolve_gateway(&db);
    uploads::upload_all(&state.uploads, &gateway, |event| {
        match event {
            UploadEvent::Started { .. } => {}
            UploadEvent::Succeeded { name, .. } => {
                notify(&app, "success", format!("Successfully uploaded {name}"));
            }
            UploadEvent::Failed { name, detail, .. } => {
                notify(&app, "error", format!("Failed to upload {name}: {detail}"));
            }
            UploadEvent::RefreshFailed { .. } => {
                notify(&app, "error", "Failed to load documents");
            }
        }
        emit_state(&app, &state);
    })
    .await;
    Ok(emit_state(&app, &state))
}

/// Deletes a server document. On failure the mirror is left unchanged.
#[tauri::command]
pub async fn delete_document(
    app: tauri::AppHandle,
    db: State<'_, Database>,
    state: State<'_, AppState>,
    id: i64,
) -> Result<UploadDialogState, String> {
    let gateway = resolve_gateway(&db);
    match uploads::delete_remote(&state.uploads, &gateway, id).await {
        Ok(()) => notify(&app, "success", "Document deleted successfully"),
        Err(e) => {
            tracing::error!(document = id, error = %e, "delete failed");
            notify(&app, "error", e.to_string());
        }
    }
    Ok(emit_state(&app, &state))
}
