//! HTTP handlers for the Gemini relay.

pub mod health;
pub mod relay;

pub use health::{health_check, index};
pub use relay::ask_gemini;
