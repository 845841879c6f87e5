pub mod config;
pub mod models;
pub mod risk;
pub mod database;
pub mod utils;
pub mod error;

pub use error::types::*;
pub use risk::{AnalysisReport, RiskAnalyzer};
