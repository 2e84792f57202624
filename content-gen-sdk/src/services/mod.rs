//! Service-specific client implementations
//!
//! - `openai`: the generative-text endpoint
//! - `youtube`: the authoritative video lookup

pub mod openai;
pub mod youtube;
mod common;

pub use common::UserAgent;
