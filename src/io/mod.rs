//! File discovery and report rendering.

pub mod output;
pub mod walker;
