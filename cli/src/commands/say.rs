use witness_core::ChatRequest;

use super::Responder;
use crate::util::{print_error, print_json};

pub async fn run(
    responder: &Responder,
    message: &str,
    history: &str,
    persona: Option<&str>,
    structured: bool,
) -> i32 {
    let request = ChatRequest {
        message: message.to_string(),
        history: history.to_string(),
        persona: persona.map(str::to_string),
        structured,
    };

    match responder.respond(&request).await {
        Ok(response) => {
            print_json(&response);
            if response.ok { 0 } else { 2 }
        }
        Err(message) => {
            print_error(
                "connection_error",
                &message,
                Some("Is the API server running? Check WITNESS_API_URL."),
            );
            3
        }
    }
}
