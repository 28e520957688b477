#![forbid(unsafe_code)]

pub mod chunking;
pub mod duration;
pub mod error;
pub mod links;
pub mod model;
pub mod progress;
pub mod time;

pub use error::Error;
pub use time::Clock;
