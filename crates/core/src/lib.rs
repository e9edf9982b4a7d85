pub mod config;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod grid;
pub mod processor;

pub use config::load_dotenv;
pub use error::*;
pub use frame::{Frame, FrameLayout, FrameSource, TaskIndex};
pub use grid::Grid;
pub use processor::{FrameProcessor, HalveOffsetClamp, Latency};
