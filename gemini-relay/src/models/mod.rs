//! Request-scoped payload types. Nothing here outlives a single request.

pub mod envelope;

pub use envelope::{RequestEnvelope, UpstreamReply};
