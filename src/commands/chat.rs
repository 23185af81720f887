use tauri::State;

use crate::commands::{notify, resolve_gateway, AppState};
use crate::db::Database;
use crate::gateway::ChunkOut;
use crate::session::{self, Message, SubmitOutcome, DEFAULT_CONTEXT_SIZE};

/// Toast shown when the backend cannot produce an answer.
const ANSWER_FAILED_NOTICE: &str =
    "Failed to get answer. Please make sure the backend is running and you have uploaded some documents.";

/// Submits a question and returns the transcript after reconciliation.
/// Blank input, or a question already in flight, leaves it untouched.
#[tauri::command]
pub async fn submit_query(
    app: tauri::AppHandle,
    db: State<'_, Database>,
    state: State<'_, AppState>,
    input: String,
) -> Result<Vec<Message>, String> {
    let gateway = resolve_gateway(&db);
    let outcome = session::submit(&state.session, &gateway, &input).await;
    if outcome == SubmitOutcome::Failed {
        notify(&app, "error", ANSWER_FAILED_NOTICE);
    }
    Ok(state.session.lock().unwrap().transcript().to_vec())
}

#[tauri::command]
pub fn get_transcript(state: State<'_, AppState>) -> Result<Vec<Message>, String> {
    Ok(state.session.lock().unwrap().transcript().to_vec())
}

/// Raw chunk search against the backend, without answer generation.
#[tauri::command]
pub async fn search_chunks(
    db: State<'_, Database>,
    query: String,
    k: Option<usize>,
) -> Result<Vec<ChunkOut>, String> {
    let gateway = resolve_gateway(&db);
    gateway
        .search(&query, k.unwrap_or(DEFAULT_CONTEXT_SIZE))
        .await
        .map_err(|e| e.to_string())
}
