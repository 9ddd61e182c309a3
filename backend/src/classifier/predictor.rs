use shared::{ClassLabel, PredictionResult};
use std::sync::Arc;

use super::{Infer, PredictError, Preprocessor};

const SCORE_TOLERANCE: f32 = 1e-6;

#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Infer>,
    preprocessor: Preprocessor,
}

impl Predictor {
    pub fn new(model: Arc<dyn Infer>, preprocessor: Preprocessor) -> Self {
        Self {
            model,
            preprocessor,
        }
    }

    /// Runs one blank batch through the model and checks that it yields one
    /// score per class.
    pub fn warm_up(&self) -> Result<(), PredictError> {
        let output = self.model.infer(&self.preprocessor.blank())?;
        check_output_len(&output)
    }

    pub fn predict(&self, image: &[u8]) -> Result<PredictionResult, PredictError> {
        let batch = self.preprocessor.preprocess(image)?;
        let output = self.model.infer(&batch)?;
        classify(&output)
    }
}

pub fn classify(output: &[f32]) -> Result<PredictionResult, PredictError> {
    check_output_len(output)?;
    if output.iter().any(|v| !v.is_finite()) {
        return Err(PredictError::Inference("model produced a non-finite score".into()));
    }
    if output
        .iter()
        .any(|&v| v < -SCORE_TOLERANCE || v > 1.0 + SCORE_TOLERANCE)
    {
        return Err(PredictError::Inference(
            "model scores are outside [0, 1]; set model.output to logits if the artifact has no softmax".into(),
        ));
    }

    let (index, score) =
        argmax(output).ok_or_else(|| PredictError::Shape("model produced no scores".into()))?;
    let label = ClassLabel::from_index(index)
        .ok_or_else(|| PredictError::Shape(format!("no class label at index {}", index)))?;

    Ok(PredictionResult::new(label, round_confidence(score)))
}

/// Index and value of the largest score. Ties go to the lowest index.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, top)) if v <= top => best,
            _ => Some((i, v)),
        })
}

pub fn round_confidence(score: f32) -> f64 {
    ((f64::from(score) * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}

fn check_output_len(output: &[f32]) -> Result<(), PredictError> {
    if output.len() != ClassLabel::count() {
        return Err(PredictError::Shape(format!(
            "model produced {} scores for {} classes",
            output.len(),
            ClassLabel::count()
        )));
    }
    Ok(())
}
