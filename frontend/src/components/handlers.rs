use super::super::{FileData, Model, Msg, PREDICT_URL};
use super::theme_toggle::{apply_theme, store_theme};
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_net::http::Request;
use shared::PredictResponse;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

pub fn handle_file_selected(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    model.error = None;
    model.result = None;
    model.loading = true;
    model.request_seq += 1;

    let preview_url = ObjectUrl::from(file.clone());
    model.file = Some(FileData {
        file: file.clone(),
        preview_url,
    });

    send_prediction_request(ctx, model.request_seq, file);
    true
}

pub fn handle_clear_file(model: &mut Model) -> bool {
    model.file = None;
    model.result = None;
    model.error = None;
    model.loading = false;
    model.request_seq += 1;
    true
}

pub fn handle_prediction(
    model: &mut Model,
    request: u64,
    outcome: Result<PredictResponse, String>,
) -> bool {
    if request != model.request_seq {
        log::debug!("Dropping reply to superseded request {}", request);
        return false;
    }

    model.loading = false;
    match outcome {
        Ok(PredictResponse::Prediction(result)) => {
            model.error = None;
            model.result = Some(result);
        }
        Ok(PredictResponse::Error(error)) => {
            model.result = None;
            model.error = Some(format!("Analysis failed: {}", error.error));
        }
        Err(message) => {
            model.result = None;
            model.error = Some(message);
        }
    }
    true
}

pub fn handle_toggle_theme(model: &mut Model) -> bool {
    model.theme = if model.theme == "light" {
        "dark".to_string()
    } else {
        "light".to_string()
    };
    apply_theme(&model.theme);
    store_theme(&model.theme);
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(file_list) = event.data_transfer().and_then(|dt| dt.files()) {
        process_file_list(ctx, file_list);
    }

    true
}

pub fn handle_paste(ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(file_list) = event.clipboard_data().and_then(|dt| dt.files()) {
        if file_list.length() > 0 {
            event.prevent_default();
            process_file_list(ctx, file_list);
            return true;
        }
    }
    false
}

/// Picks the first image in the list; the service classifies one scan at a time.
pub fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    let mut selected = None;

    for i in 0..file_list.length() {
        if let Some(file) = file_list.item(i) {
            if file.type_().starts_with("image/") {
                if selected.is_none() {
                    selected = Some(GlooFile::from(file));
                }
            } else {
                log::warn!("Skipping non-image file: {}", file.name());
                ctx.link().send_message(Msg::SetError(Some(format!(
                    "Skipped non-image file: {}",
                    file.name()
                ))));
            }
        }
    }

    if let Some(file) = selected {
        ctx.link().send_message(Msg::FileSelected(file));
    }
}

pub fn send_prediction_request(ctx: &Context<Model>, request: u64, file: GlooFile) {
    spawn_local({
        let link = ctx.link().clone();

        async move {
            let outcome = request_prediction(&file).await;
            if let Err(message) = &outcome {
                log::error!("{}", message);
            }
            link.send_message(Msg::PredictionReceived { request, outcome });
        }
    });
}

async fn request_prediction(file: &GlooFile) -> Result<PredictResponse, String> {
    let form_data = web_sys::FormData::new()
        .map_err(|_| "Could not prepare the upload form.".to_string())?;
    form_data
        .append_with_blob_and_filename("file", file.as_ref(), &file.name())
        .map_err(|_| "Could not attach the image to the upload.".to_string())?;

    let request = Request::post(PREDICT_URL)
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?;

    let response = request
        .send()
        .await
        .map_err(|e| format!("Error connecting to backend: {}", e))?;

    if !response.ok() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Server error: {} - {}", status, body));
    }

    response
        .json::<PredictResponse>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}
