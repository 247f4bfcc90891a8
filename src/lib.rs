pub mod config;
pub mod error;
pub mod extraction;
pub mod filter;
pub mod math;
pub mod mesh;
pub mod pipeline;
pub mod postprocess;
pub mod render;
pub mod scene;
pub mod volume;

pub use error::{CraniumError, Result};
