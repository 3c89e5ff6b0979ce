// Podium - LLM-driven debate simulator service
// Library exports

pub mod config;
pub mod debate;
pub mod extract;
pub mod gemini;
pub mod metrics;
pub mod moderator;
pub mod prompt;
pub mod server;
pub mod store;
