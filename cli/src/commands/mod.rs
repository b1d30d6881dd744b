pub mod chat;
pub mod health;
pub mod say;

use witness_core::{ChatRequest, ChatResponse, Engine};

use crate::util;

/// Answers one turn, either in-process or over HTTP.
pub enum Responder {
    Local(Box<Engine>),
    Remote { api_url: String },
}

impl Responder {
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatResponse, String> {
        match self {
            Responder::Local(engine) => Ok(engine.respond(request)),
            Responder::Remote { api_url } => util::post_chat(api_url, request).await,
        }
    }
}
