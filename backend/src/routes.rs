use actix_cors::Cors;
use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use log::{info, warn};
use sha2::{Digest, Sha256};
use shared::{PredictResponse, StatusResponse};
use std::path::PathBuf;

use crate::classifier::{PredictError, Predictor};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Copy)]
pub struct UploadLimit {
    pub max_bytes: usize,
}

impl UploadLimit {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: Option<PathBuf>) {
    cfg.service(web::resource("/").route(web::get().to(status)))
        .service(web::resource("/predict").route(web::post().to(predict)));

    if let Some(dir) = static_dir {
        cfg.service(Files::new("/static", dir).index_file("index.html"));
    }
}

pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

async fn status() -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse::default())
}

async fn predict(
    predictor: web::Data<Predictor>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> HttpResponse {
    let result = match read_upload(payload, limit.max_bytes).await {
        Ok(image) => {
            let digest = upload_digest(&image);
            let size = image.len();
            let predictor = predictor.clone();

            let outcome = web::block(move || predictor.predict(&image))
                .await
                .unwrap_or_else(|e| Err(PredictError::Inference(format!("inference worker failed: {}", e))));

            match &outcome {
                Ok(prediction) => info!(
                    "Upload {} ({} bytes): {} with confidence {:.4}",
                    digest, size, prediction.prediction, prediction.confidence
                ),
                Err(e) => warn!("Upload {} ({} bytes) failed: {}", digest, size, e),
            }
            outcome
        }
        Err(e) => {
            warn!("Rejected upload: {}", e);
            Err(e)
        }
    };

    HttpResponse::Ok().json(PredictResponse::from(result))
}

async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<Vec<u8>, PredictError> {
    while let Some(mut field) = payload.try_next().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            while field.try_next().await.map_err(upload_error)?.is_some() {}
            continue;
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(upload_error)? {
            if image_data.len() + chunk.len() > max_bytes {
                return Err(PredictError::Upload(format!(
                    "file exceeds the upload limit of {} bytes",
                    max_bytes
                )));
            }
            image_data.extend_from_slice(&chunk);
        }

        if image_data.is_empty() {
            return Err(PredictError::Upload("uploaded file is empty".into()));
        }
        return Ok(image_data);
    }

    Err(PredictError::Upload(format!(
        "missing multipart field `{}`",
        UPLOAD_FIELD
    )))
}

fn upload_error(err: actix_multipart::MultipartError) -> PredictError {
    PredictError::Upload(err.to_string())
}

/// Short content digest used to correlate log lines for the same upload.
fn upload_digest(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(&hasher.finalize()[..6])
}
