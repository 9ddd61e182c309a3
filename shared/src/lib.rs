use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter};

pub const STATUS_MESSAGE: &str = "Brain Tumor Detection API is running!";

/// Tumor classes in the order of the classifier's output vector.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCountMacro,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClassLabel {
    Glioma,
    Meningioma,
    NoTumor,
    Pituitary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInfo {
    pub description: &'static str,
    pub recommendation: &'static str,
}

impl ClassLabel {
    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    pub fn info(self) -> ClassInfo {
        match self {
            ClassLabel::Glioma => ClassInfo {
                description: "Glioma tumors arise from glial cells in the brain.",
                recommendation: "Consult a neuro-oncologist for diagnosis and treatment options.",
            },
            ClassLabel::Meningioma => ClassInfo {
                description: "Meningioma tumors originate from the meninges, the protective layers of the brain.",
                recommendation: "Seek medical evaluation; surgical removal may be required depending on size and symptoms.",
            },
            ClassLabel::NoTumor => ClassInfo {
                description: "No visible signs of brain tumor detected.",
                recommendation: "If symptoms persist, consult a neurologist for further evaluation.",
            },
            ClassLabel::Pituitary => ClassInfo {
                description: "Pituitary tumors develop in the pituitary gland at the base of the brain.",
                recommendation: "Consult an endocrinologist or neurosurgeon for assessment and possible treatment.",
            },
        }
    }

    pub fn count() -> usize {
        Self::COUNT
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResult {
    pub prediction: ClassLabel,
    pub confidence: f64,
    pub description: String,
    pub recommendation: String,
}

impl PredictionResult {
    pub fn new(label: ClassLabel, confidence: f64) -> Self {
        let info = label.info();
        Self {
            prediction: label,
            confidence,
            description: info.description.to_string(),
            recommendation: info.recommendation.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /predict`. Success and failure share the same status code,
/// so clients tell them apart by the presence of the `error` key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PredictResponse {
    Prediction(PredictionResult),
    Error(ErrorResponse),
}

impl PredictResponse {
    pub fn error(message: impl Into<String>) -> Self {
        PredictResponse::Error(ErrorResponse {
            error: message.into(),
        })
    }
}

impl<E: std::fmt::Display> From<Result<PredictionResult, E>> for PredictResponse {
    fn from(result: Result<PredictionResult, E>) -> Self {
        match result {
            Ok(prediction) => PredictResponse::Prediction(prediction),
            Err(e) => PredictResponse::error(e.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusResponse {
    pub message: String,
}

impl Default for StatusResponse {
    fn default() -> Self {
        Self {
            message: STATUS_MESSAGE.to_string(),
        }
    }
}
