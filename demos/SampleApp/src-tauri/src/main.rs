#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod camera_state;
mod commands;
mod preview_channel;

use camera_capture_core::SessionConfiguration;

use camera_state::CameraState;

fn main() {
    env_logger::init();

    let config = SessionConfiguration::default();
    if let Err(e) = config.validate() {
        log::error!("Invalid session configuration: {}", e);
        std::process::exit(1);
    }

    let state = CameraState::new(config);
    match state.refresh_devices().require_devices() {
        Ok(devices) => log::info!("Found {} camera(s)", devices.len()),
        Err(e) => {
            // nothing to pick from; the app has no other function
            log::error!("Startup aborted: {}", e);
            std::process::exit(1);
        }
    }

    tauri::Builder::default()
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            commands::list_cameras,
            commands::start_camera,
            commands::stop_camera,
            commands::session_snapshot,
        ])
        .run(tauri::generate_context!())
        .expect("error running sample app");
}
