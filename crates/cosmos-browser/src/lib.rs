pub mod api;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod status;
pub mod text_sanitize;
pub mod transform;
pub mod ui;

pub use error::{Error, Result};
