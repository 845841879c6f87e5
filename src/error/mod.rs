pub mod types;
pub mod batch;

pub use types::*;
pub use batch::*;
