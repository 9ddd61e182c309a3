mod error;
mod model;
mod predictor;
mod preprocess;

pub use error::PredictError;
pub use model::{Infer, TorchModel};
pub use predictor::Predictor;
pub use preprocess::Preprocessor;
