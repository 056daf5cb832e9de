use std::time::Duration;

use eframe::{egui, Frame};
use egui::Context;

use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::Result;

/// Server used when `PSSWRD_SERVER` is not set.
const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

/// Template shown before the server answers.
const FALLBACK_TEMPLATE: &str = "llllllllddd";

/// REST context holding a reusable blocking HTTP client.
struct RESTContext {
    client: Client,
    base_url: String,
}

impl RESTContext {
    /// Creates a new REST context with a timeout.
    fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::new(5, 0))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Sends a GET request to `/v1/generate` for one password.
    fn get_generated(&self, template: &str) -> Result<String> {
        let response = self.client
            .get(self.url("/v1/generate"))
            .query(&[("template", template)])
            .send()?
            .error_for_status()?;
        response.text()
    }

    /// Sends a GET request to `/v1/template`.
    fn get_template(&self) -> Result<String> {
        let response = self.client
            .get(self.url("/v1/template"))
            .send()?
            .error_for_status()?;
        response.text()
    }

    /// Sends a GET request to `/v1/corpora`.
    fn get_corpora(&self) -> Result<String> {
        let response = self.client
            .get(self.url("/v1/corpora"))
            .send()?
            .error_for_status()?;
        response.text()
    }

    /// Sends a GET request to `/v1/loaded_corpus`.
    fn get_loaded_corpus(&self) -> Result<String> {
        let response = self.client
            .get(self.url("/v1/loaded_corpus"))
            .send()?
            .error_for_status()?;
        response.text()
    }

    /// Sends a PUT request to `/v1/load_corpus`.
    fn put_load_corpus(&self, name: &str) -> Result<String> {
        let response = self.client
            .put(self.url("/v1/load_corpus"))
            .query(&[("name", name)])
            .send()?
            .error_for_status()?;
        response.text()
    }
}

/// Global UI state (MUST persist between frames in egui).
struct PasswordUI {
    rest: RESTContext,
    password: String,
    template: String,
    status: Option<String>,
    /// Set once the first frame asked for a password
    initialized: bool,

    available_corpora: Vec<String>,
    selected_corpus: String,
}

impl PasswordUI {
    /// Initializes the UI and shows a first password.
    fn new(base_url: String) -> Result<Self> {
        let mut ui = Self {
            rest: RESTContext::new(base_url)?,
            password: String::new(),
            template: FALLBACK_TEMPLATE.to_owned(),
            status: None,
            initialized: false,

            available_corpora: Vec::new(),
            selected_corpus: String::new(),
        };
        ui.get_template();
        ui.get_corpora();
        ui.get_loaded_corpus();
        Ok(ui)
    }

    /// Asks the server for a password with the current template.
    ///
    /// The password replaces the displayed one and is copied to the
    /// clipboard.
    fn get_generated(&mut self, ctx: &Context) {
        match self.rest.get_generated(&self.template) {
            Ok(password) => {
                ctx.copy_text(password.clone());
                self.password = password;
                self.status = Some("Copied to clipboard".to_owned());
            }
            Err(e) => {
                warn!("generation failed: {e}");
                self.status = Some(format!("Error: {e}"));
            }
        }
    }

    /// True on the first call only, whatever the startup requests returned.
    fn take_first_frame(&mut self) -> bool {
        !std::mem::replace(&mut self.initialized, true)
    }

    fn get_template(&mut self) {
        match self.rest.get_template() {
            Ok(template) => self.template = template,
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    fn get_corpora(&mut self) {
        match self.rest.get_corpora() {
            Ok(names) => {
                self.available_corpora = names
                    .lines()
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
                    .collect()
            }
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    fn get_loaded_corpus(&mut self) {
        match self.rest.get_loaded_corpus() {
            // First line is the corpus name, second the order
            Ok(body) => self.selected_corpus = body.lines().next().unwrap_or_default().to_owned(),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
    }

    fn put_load_corpus(&mut self, name: &str) {
        match self.rest.put_load_corpus(name) {
            Ok(message) => {
                debug!("switched corpus to {name}");
                self.status = Some(message);
            }
            Err(e) => {
                self.status = Some(format!("Error: {e}"));
                // Server kept its previous corpus
                self.get_loaded_corpus();
            }
        }
    }
}

impl eframe::App for PasswordUI {
    /// UI update loop (called every frame).
    fn update(&mut self, ctx: &Context, _: &mut Frame) {
        if self.take_first_frame() {
            self.get_generated(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Grid::new("password_grid")
                .num_columns(2)
                .spacing([20.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Password:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.password)
                            .desired_width(320.0)
                            .font(egui::TextStyle::Monospace),
                    );
                    ui.end_row();

                    ui.label("Template:");
                    ui.add(egui::TextEdit::singleline(&mut self.template).desired_width(200.0));
                    ui.end_row();

                    ui.label("Corpus:");
                    let previous_corpus = self.selected_corpus.clone();
                    egui::ComboBox::from_id_salt("corpus")
                        .selected_text(&self.selected_corpus)
                        .show_ui(ui, |ui| {
                            for corpus in &self.available_corpora {
                                ui.selectable_value(&mut self.selected_corpus, corpus.clone(), corpus);
                            }
                        });
                    // Check if the user changed the selection
                    if self.selected_corpus != previous_corpus {
                        let corpus = self.selected_corpus.clone();
                        self.put_load_corpus(&corpus);
                    }
                    ui.end_row();
                });

            ui.separator();

            ui.horizontal(|ui| {
                if ui.add_sized([100.0, 30.0], egui::Button::new("Again")).clicked() {
                    self.get_generated(ctx);
                }
                if ui.add_sized([100.0, 30.0], egui::Button::new("Done")).clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            if let Some(status) = &self.status {
                ui.label(status);
            }
        });
    }
}

/// Application entry point.
fn main() -> eframe::Result {
    env_logger::init();
    let base_url = std::env::var("PSSWRD_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_owned());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 200.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "psswrd - Generate a Password",
        options,
        Box::new(|_| Ok(Box::new(PasswordUI::new(base_url)?))),
    )
}
