//! Stateless dialogue engine for the ABC compliance witness role-play.
//!
//! A trainee interviews an in-character witness. Each request carries the
//! whole transcript; the engine re-derives progress from it, routes the new
//! message to a response category, renders a bank line within the reply
//! budget and reports when the trainee has stated the correct resolution.

pub mod analysis;
pub mod bank;
pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod lexicon;
pub mod persona;
pub mod scenario;
pub mod select;
pub mod slots;
pub mod stage;
pub mod text;
pub mod tone;
pub mod transcript;

pub use chat::{ChatRequest, ChatResponse};
pub use config::{EngineConfig, PolicyLimits};
pub use engine::{Engine, Turn};
pub use error::EngineError;
pub use persona::Persona;
pub use select::{Budget, SelectionMode};
pub use stage::{ConversationStage, DialogueState};
