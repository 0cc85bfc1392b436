pub mod attention;
pub mod classifier;
pub mod config;
pub mod model;
pub mod safetensors_util;

pub use classifier::{Classifier, Mode};
pub use config::ModelConfig;
pub use model::AttGru;
