mod correction;
mod error;
mod observer;
mod oracle;
mod pass_finder;
mod predictor;
mod sampling;
mod types;

pub use error::PredictError;
pub use observer::Observer;
pub use oracle::Sgp4Oracle;
pub use pass_finder::{SearchSettings, MIN_SAMPLES_PER_ORBIT};
pub use predictor::{Prediction, Predictor};
pub use types::{PassEvent, PredictionRequest, DEFAULT_FINE_RESOLUTION_MINUTES};
