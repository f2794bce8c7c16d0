use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use gtk4::gio;
use gtk4::prelude::*;
use libadwaita::prelude::*;

use keymoment_capture::form::{THRESHOLD_MAX, THRESHOLD_MIN, THRESHOLD_STEP};
use keymoment_capture::projection::{DisplaySurface, FormView};
use keymoment_capture::{AppState, Config, FileHandle, InputUpdate};

const NO_FILE: &str = "Ningún archivo seleccionado";

/// Handles returned from building the form window.
#[derive(Clone)]
pub struct FormWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub server_row: libadwaita::EntryRow,
    pub video_row: libadwaita::ActionRow,
    pub video_button: gtk4::Button,
    pub transcript_row: libadwaita::ActionRow,
    pub transcript_button: gtk4::Button,
    pub template_map_row: libadwaita::ActionRow,
    pub template_map_button: gtk4::Button,
    pub templates_row: libadwaita::ActionRow,
    pub templates_button: gtk4::Button,
    pub templates_clear_button: gtk4::Button,
    pub threshold_label: gtk4::Label,
    pub threshold_scale: gtk4::Scale,
    pub submit_button: gtk4::Button,
    pub error_label: gtk4::Label,
    pub result_group: libadwaita::PreferencesGroup,
    pub job_label: gtk4::Label,
    pub count_label: gtk4::Label,
    pub captures_list: gtk4::ListBox,
    pub export_button: gtk4::Button,
    pub export_label: gtk4::Label,
}

/// Build the main form window.
pub fn build_form_window(
    app: &libadwaita::Application,
    initial_threshold: f64,
    initial_server_url: &str,
) -> FormWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Capturas clave de vídeo")
        .default_width(520)
        .default_height(640)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();
    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let intro = gtk4::Label::new(Some(
        "Sube el vídeo y los archivos de configuración para generar capturas individuales con marcado.",
    ));
    intro.set_wrap(true);
    intro.set_xalign(0.0);
    intro.add_css_class("dim-label");
    intro.set_margin_bottom(12);
    content.append(&intro);

    // --- Files group ---
    let files_group = libadwaita::PreferencesGroup::new();
    files_group.set_title("Archivos");

    let (video_row, video_button) = file_row("Vídeo", "Elegir");
    files_group.add(&video_row);
    let (transcript_row, transcript_button) = file_row("Transcripción (JSON)", "Elegir");
    files_group.add(&transcript_row);
    let (template_map_row, template_map_button) = file_row("Template map (JSON)", "Elegir");
    files_group.add(&template_map_row);

    let (templates_row, templates_button) =
        file_row("Plantillas (opcional, múltiples PNG/JPG)", "Elegir");
    let templates_clear_button = gtk4::Button::from_icon_name("edit-clear-symbolic");
    templates_clear_button.set_valign(gtk4::Align::Center);
    templates_clear_button.set_tooltip_text(Some("Quitar plantillas"));
    templates_row.add_suffix(&templates_clear_button);
    files_group.add(&templates_row);

    content.append(&files_group);

    // --- Server group ---
    let server_group = libadwaita::PreferencesGroup::new();
    server_group.set_title("Servicio");
    server_group.set_margin_top(12);

    let server_row = libadwaita::EntryRow::builder()
        .title("URL del servicio")
        .text(initial_server_url)
        .show_apply_button(true)
        .build();
    server_group.add(&server_row);

    content.append(&server_group);

    // --- Threshold group ---
    let threshold_group = libadwaita::PreferencesGroup::new();
    threshold_group.set_margin_top(12);

    let threshold_row = libadwaita::ActionRow::new();
    let threshold_label = gtk4::Label::new(None);
    threshold_label.set_xalign(0.0);
    threshold_row.add_prefix(&threshold_label);

    let threshold_scale = gtk4::Scale::with_range(
        gtk4::Orientation::Horizontal,
        THRESHOLD_MIN,
        THRESHOLD_MAX,
        THRESHOLD_STEP,
    );
    threshold_scale.set_digits(2);
    threshold_scale.set_round_digits(2);
    threshold_scale.set_draw_value(false);
    threshold_scale.set_hexpand(true);
    threshold_scale.set_value(initial_threshold);
    threshold_row.add_suffix(&threshold_scale);
    threshold_group.add(&threshold_row);

    content.append(&threshold_group);

    // --- Submit ---
    let submit_button = gtk4::Button::builder()
        .halign(gtk4::Align::Center)
        .margin_top(16)
        .build();
    submit_button.add_css_class("suggested-action");
    submit_button.add_css_class("pill");
    content.append(&submit_button);

    let error_label = gtk4::Label::new(None);
    error_label.add_css_class("error");
    error_label.set_wrap(true);
    error_label.set_margin_top(12);
    error_label.set_visible(false);
    content.append(&error_label);

    // --- Result group ---
    let result_group = libadwaita::PreferencesGroup::new();
    result_group.set_title("Resultado");
    result_group.set_margin_top(16);
    result_group.set_visible(false);

    let job_row = libadwaita::ActionRow::builder().title("Job").build();
    let job_label = gtk4::Label::new(None);
    job_label.add_css_class("heading");
    job_label.set_selectable(true);
    job_row.add_suffix(&job_label);
    result_group.add(&job_row);

    let count_row = libadwaita::ActionRow::builder()
        .title("Capturas generadas")
        .build();
    let count_label = gtk4::Label::new(None);
    count_label.add_css_class("heading");
    count_row.add_suffix(&count_label);
    result_group.add(&count_row);

    let captures_list = gtk4::ListBox::new();
    captures_list.set_selection_mode(gtk4::SelectionMode::None);
    captures_list.add_css_class("boxed-list");
    captures_list.set_margin_top(8);
    result_group.add(&captures_list);

    let export_button = gtk4::Button::builder()
        .label("Guardar capturas")
        .halign(gtk4::Align::Start)
        .margin_top(8)
        .build();
    result_group.add(&export_button);

    let export_label = gtk4::Label::new(None);
    export_label.add_css_class("dim-label");
    export_label.set_wrap(true);
    export_label.set_xalign(0.0);
    export_label.set_visible(false);
    result_group.add(&export_label);

    content.append(&result_group);

    // Assemble
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    toolbar_view.set_content(Some(&scrolled));
    window.set_content(Some(&toolbar_view));

    FormWidgets {
        window,
        server_row,
        video_row,
        video_button,
        transcript_row,
        transcript_button,
        template_map_row,
        template_map_button,
        templates_row,
        templates_button,
        templates_clear_button,
        threshold_label,
        threshold_scale,
        submit_button,
        error_label,
        result_group,
        job_label,
        count_label,
        captures_list,
        export_button,
        export_label,
    }
}

fn file_row(title: &str, button_label: &str) -> (libadwaita::ActionRow, gtk4::Button) {
    let row = libadwaita::ActionRow::builder()
        .title(title)
        .subtitle(NO_FILE)
        .build();
    // Subtitles carry file names, not markup.
    row.set_use_markup(false);
    let button = gtk4::Button::builder()
        .label(button_label)
        .valign(gtk4::Align::Center)
        .build();
    row.add_suffix(&button);
    (row, button)
}

/// Wire every control to its controller operation.
pub fn connect_handlers(form: &FormWidgets, state: &Rc<RefCell<AppState>>, export_dir: PathBuf) {
    connect_single_picker(
        form,
        &form.video_button,
        state,
        ("Vídeo", "video/*"),
        InputUpdate::Video,
    );
    connect_single_picker(
        form,
        &form.transcript_button,
        state,
        ("JSON", "application/json"),
        InputUpdate::Transcript,
    );
    connect_single_picker(
        form,
        &form.template_map_button,
        state,
        ("JSON", "application/json"),
        InputUpdate::TemplateMap,
    );

    // Templates: the whole selection replaces the previous one.
    {
        let state_clone = state.clone();
        let window = form.window.clone();
        form.templates_button.connect_clicked(move |_| {
            let dialog = file_dialog("Plantillas", ("Imágenes", "image/*"));
            let state_inner = state_clone.clone();
            dialog.open_multiple(Some(&window), gio::Cancellable::NONE, move |res| {
                let model = match res {
                    Ok(model) => model,
                    Err(e) => {
                        log::debug!("Template picker dismissed: {e}");
                        return;
                    }
                };
                let files: Vec<FileHandle> = (0..model.n_items())
                    .filter_map(|i| model.item(i).and_downcast::<gio::File>())
                    .filter_map(|file| file.path())
                    .map(FileHandle::new)
                    .collect();
                state_inner
                    .borrow_mut()
                    .set_input(InputUpdate::Templates(files));
            });
        });
    }
    {
        let state_clone = state.clone();
        form.templates_clear_button.connect_clicked(move |_| {
            state_clone
                .borrow_mut()
                .set_input(InputUpdate::Templates(Vec::new()));
        });
    }

    {
        let state_clone = state.clone();
        form.threshold_scale.connect_value_changed(move |scale| {
            state_clone.borrow_mut().set_threshold(scale.value());
        });
    }

    // Wire up server URL changes
    {
        let state_clone = state.clone();
        form.server_row.connect_apply(move |row| {
            let url = row.text().to_string();
            let mut s = state_clone.borrow_mut();
            s.set_server_url(&url);
            let _ = s.save_config(&Config::path());
        });
    }

    // Remember the slider position for the next session
    {
        let state_clone = state.clone();
        form.window.connect_close_request(move |_| {
            let mut s = state_clone.borrow_mut();
            s.remember_threshold();
            let _ = s.save_config(&Config::path());
            gtk4::glib::Propagation::Proceed
        });
    }

    {
        let state_clone = state.clone();
        form.submit_button.connect_clicked(move |_| {
            // Validation errors are already on screen via the projection.
            let _ = state_clone.borrow_mut().submit();
        });
    }

    {
        let state_clone = state.clone();
        form.export_button.connect_clicked(move |_| {
            if let Err(e) = state_clone.borrow_mut().export_captures(&export_dir) {
                log::warn!("Export not started: {e}");
            }
        });
    }
}

fn connect_single_picker(
    form: &FormWidgets,
    button: &gtk4::Button,
    state: &Rc<RefCell<AppState>>,
    filter: (&'static str, &'static str),
    update: fn(Option<FileHandle>) -> InputUpdate,
) {
    let state_clone = state.clone();
    let window = form.window.clone();
    button.connect_clicked(move |_| {
        let dialog = file_dialog("Elegir archivo", filter);
        let state_inner = state_clone.clone();
        dialog.open(Some(&window), gio::Cancellable::NONE, move |res| match res {
            Ok(file) => match file.path() {
                Some(path) => state_inner
                    .borrow_mut()
                    .set_input(update(Some(FileHandle::new(path)))),
                None => log::warn!("Picked file has no local path: {}", file.uri()),
            },
            Err(e) => log::debug!("File picker dismissed: {e}"),
        });
    });
}

fn file_dialog(title: &str, (name, mime): (&str, &str)) -> gtk4::FileDialog {
    let filter = gtk4::FileFilter::new();
    filter.set_name(Some(name));
    filter.add_mime_type(mime);

    let filters = gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(&filter);

    let dialog = gtk4::FileDialog::builder().title(title).modal(true).build();
    dialog.set_filters(Some(&filters));
    dialog.set_default_filter(Some(&filter));
    dialog
}

fn file_subtitle(file: Option<&FileHandle>) -> String {
    file.map(FileHandle::file_name)
        .unwrap_or_else(|| NO_FILE.to_string())
}

/// Widgets only ever read the view; no signal handler fires from here, so
/// rendering while the state is borrowed is safe.
impl DisplaySurface for FormWidgets {
    fn render(&self, view: &FormView) {
        self.video_row
            .set_subtitle(&file_subtitle(view.inputs.video.as_ref()));
        self.transcript_row
            .set_subtitle(&file_subtitle(view.inputs.transcript.as_ref()));
        self.template_map_row
            .set_subtitle(&file_subtitle(view.inputs.template_map.as_ref()));
        let templates = if view.inputs.templates.is_empty() {
            NO_FILE.to_string()
        } else {
            view.inputs
                .templates
                .iter()
                .map(FileHandle::file_name)
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.templates_row.set_subtitle(&templates);

        self.threshold_label.set_text(&view.threshold_label);
        self.submit_button.set_label(view.submit_label);
        self.submit_button.set_sensitive(view.submit_enabled);

        match view.error {
            Some(ref error) => {
                self.error_label.set_text(error);
                self.error_label.set_visible(true);
            }
            None => self.error_label.set_visible(false),
        }

        self.captures_list.remove_all();
        match view.result {
            Some(ref result) => {
                self.job_label.set_text(&result.job_id);
                self.count_label.set_text(&result.capture_count.to_string());
                for line in &result.lines {
                    let label = gtk4::Label::new(Some(line));
                    label.set_wrap(true);
                    label.set_xalign(0.0);
                    label.set_margin_top(6);
                    label.set_margin_bottom(6);
                    label.set_margin_start(12);
                    label.set_margin_end(12);
                    self.captures_list.append(&label);
                }
                self.result_group.set_visible(true);
            }
            None => self.result_group.set_visible(false),
        }

        self.export_button.set_sensitive(view.export_enabled);
        match view.export_message {
            Some(ref message) => {
                self.export_label.set_text(message);
                self.export_label.set_visible(true);
            }
            None => self.export_label.set_visible(false),
        }
    }
}
