mod ui;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use gtk4::prelude::*;

use keymoment_capture::api::ProcessClient;
use keymoment_capture::{handle_backend_event, AppState, BackendEvent, Config};

fn main() {
    env_logger::init();
    log::info!("Keymoment Capture starting");

    // Requests run here; the GTK main thread only receives their events.
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let handle = runtime.handle().clone();

    let application = libadwaita::Application::builder()
        .application_id("io.github.keymoment.capture")
        .build();

    application.connect_activate(move |app| on_activate(app, handle.clone()));
    application.run();
}

fn on_activate(app: &libadwaita::Application, runtime: tokio::runtime::Handle) {
    // Create async channel for backend → UI communication
    let (backend_tx, backend_rx) = async_channel::unbounded::<BackendEvent>();

    let config = Config::load();
    let export_dir: PathBuf = config.resolved_export_dir();
    let client = ProcessClient::new(config.server_url.clone());
    log::info!("Processing service at {}", client.base_url());

    let state = Rc::new(RefCell::new(AppState::new(
        config,
        Arc::new(client),
        runtime,
        backend_tx,
    )));

    // Build UI
    let initial_threshold = state.borrow().threshold.value();
    let initial_server_url = state.borrow().config.server_url.clone();
    let form = ui::form_window::build_form_window(app, initial_threshold, &initial_server_url);
    ui::form_window::connect_handlers(&form, &state, export_dir);
    state.borrow_mut().attach_surface(Box::new(form.clone()));
    form.window.present();

    // Attach backend event handler
    gtk4::glib::spawn_future_local(async move {
        while let Ok(event) = backend_rx.recv().await {
            handle_backend_event(&mut state.borrow_mut(), event);
        }
    });
}
