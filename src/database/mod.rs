pub mod store;
pub mod memory;

pub use store::*;
pub use memory::*;
