pub mod entity;
pub mod event;
pub mod relationship;
pub mod risk;

pub use entity::*;
pub use event::*;
pub use relationship::*;
pub use risk::*;
