use std::sync::Arc;

use witness_core::{Engine, EngineConfig};

/// Shared, immutable request state. The engine holds no per-session data.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_env() -> Self {
        let config = EngineConfig::from_env();
        tracing::info!(
            max_sentences = config.budget.max_sentences,
            max_reply_chars = config.budget.max_chars,
            history_window = config.history_window_lines,
            seeded = matches!(config.selection, witness_core::SelectionMode::Seeded(_)),
            "engine configured"
        );
        Self::new(Engine::new(config))
    }
}
