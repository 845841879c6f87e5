pub mod analyzer;
pub mod catalog;
pub mod graph;
pub mod identification;
pub mod metrics;
pub mod transmission;

pub use analyzer::*;
pub use catalog::*;
pub use graph::*;
pub use identification::*;
pub use metrics::*;
pub use transmission::*;
