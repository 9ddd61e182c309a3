#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Unexpected shape: {0}")]
    Shape(String),
    #[error("Model inference error: {0}")]
    Inference(String),
    #[error("Upload error: {0}")]
    Upload(String),
}

impl From<tch::TchError> for PredictError {
    fn from(err: tch::TchError) -> Self {
        PredictError::Inference(err.to_string())
    }
}
