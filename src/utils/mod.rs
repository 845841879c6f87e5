pub mod math;
pub mod time;
pub mod logging;

pub use math::*;
pub use time::*;
pub use logging::*;
