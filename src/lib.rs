mod commands;
mod db;
mod gateway;
mod session;
mod uploads;

use commands::AppState;
use db::Database;
use tauri::Manager;
use tracing_subscriber::EnvFilter;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let app_dir = app.path().app_data_dir()?;
            let database =
                Database::new(&app_dir).expect("Failed to initialize database");
            app.manage(database);
            app.manage(AppState::default());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::chat::submit_query,
            commands::chat::get_transcript,
            commands::chat::search_chunks,
            commands::documents::open_upload_dialog,
            commands::documents::close_upload_dialog,
            commands::documents::stage_files,
            commands::documents::remove_staged_file,
            commands::documents::get_upload_state,
            commands::documents::upload_staged,
            commands::documents::delete_document,
            commands::settings::get_settings,
            commands::settings::set_setting,
            commands::settings::delete_setting,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
