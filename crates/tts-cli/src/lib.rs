//! CLI library components for Transformer Test Studio.

pub mod logging;
pub mod render;
pub mod session;
