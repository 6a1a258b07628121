pub mod batch;
pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod report;

pub use config::{AnalysisConfig, Magnification, PipelineVariant};
pub use detection::analyze_image;
pub use error::AnalysisError;
pub use models::{AnalysisResult, Colony, Contour};
pub use pipeline::{ColonyPipeline, DebugConfig, MaskStep, PipelineContext};
