//! Lenient body extractor for chat turns.
//!
//! Chat must always answer with a normal reply, so unlike `axum::Json` this
//! extractor never rejects: unreadable bodies, wrong content types and
//! malformed JSON all become an empty `ChatRequest`.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use witness_core::ChatRequest;

pub struct ChatBody(pub ChatRequest);

impl<S> FromRequest<S> for ChatBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Bytes::from_request(req, state).await {
            Ok(body) => Ok(ChatBody(ChatRequest::from_body(&body))),
            Err(rejection) => {
                tracing::warn!(error = %rejection, "unreadable chat body; treating as empty");
                Ok(ChatBody(ChatRequest::default()))
            }
        }
    }
}
