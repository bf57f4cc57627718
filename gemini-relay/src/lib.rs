//! gemini-relay: keeps the Gemini API key on the server by relaying browser
//! requests to `generateContent` unchanged, apart from the appended key.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::AppState;
