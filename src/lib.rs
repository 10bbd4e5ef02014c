mod mapping;

pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod number;
pub mod segment;
pub mod token;

pub use config::Config;
pub use console::Console;
pub use error::{Error, Result};
pub use segment::SharedSegment;
