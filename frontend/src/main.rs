mod components;

use components::handlers;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::{PredictResponse, PredictionResult};
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

const PREDICT_URL: &str = "/predict";

struct FileData {
    file: GlooFile,
    preview_url: ObjectUrl,
}

enum Msg {
    FileSelected(GlooFile),
    ClearFile,
    PredictionReceived {
        request: u64,
        outcome: Result<PredictResponse, String>,
    },

    SetError(Option<String>),
    SetDragging(bool),
    ToggleTheme,

    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

struct Model {
    file: Option<FileData>,
    result: Option<PredictionResult>,
    loading: bool,
    /// Id of the newest upload; replies to older ones are dropped.
    request_seq: u64,
    error: Option<String>,
    is_dragging: bool,
    paste_listener: Option<EventListener>,
    theme: String,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let theme = components::theme_toggle::stored_theme();
        components::theme_toggle::apply_theme(&theme);

        let mut model = Self {
            file: None,
            result: None,
            loading: false,
            request_seq: 0,
            error: None,
            is_dragging: false,
            paste_listener: None,
            theme,
        };

        if let Some(window) = web_sys::window() {
            let link = ctx.link().clone();
            let listener = EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            });
            model.paste_listener = Some(listener);
        }

        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => handlers::handle_file_selected(self, ctx, file),
            Msg::ClearFile => handlers::handle_clear_file(self),
            Msg::PredictionReceived { request, outcome } => {
                handlers::handle_prediction(self, request, outcome)
            }

            Msg::SetError(error) => {
                self.error = error;
                self.loading = false;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }
            Msg::ToggleTheme => handlers::handle_toggle_theme(self),

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { components::header::render_header() }
                <div class="top-right">
                    { components::theme_toggle::render_theme_toggle(&self.theme, ctx.link()) }
                </div>

                <main class="main-content">
                    { components::upload_section::render_upload_section(self, ctx) }
                    { components::preview_area::render_preview_area(self, ctx) }
                    { components::utils::render_error_message(self) }
                    { components::results::render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"NeuroScan | Fullstack Rust WASM | Not a medical device"}</p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
