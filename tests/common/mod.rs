pub mod builders;
pub mod log_capture;
pub mod strategies;

pub use builders::*;
pub use log_capture::*;
pub use strategies::*;
