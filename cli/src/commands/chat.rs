use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use witness_core::{ChatRequest, Persona};

use super::Responder;
use crate::util::{append_turn, print_error};

const TRAINEE: &str = "Detective";

/// Line-oriented interview. Blank input is sent as-is (the witness opens
/// with a greeting); `/quit`, `/exit` or EOF ends the session.
pub async fn run(responder: &Responder, persona: Option<&str>) -> i32 {
    let persona_kind = Persona::from_request(persona);
    let witness = persona_kind.first_name();
    let mut history = String::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    eprintln!(
        "Interviewing {}, {} Type /quit to leave, /restart to start over.",
        persona_kind.full_name(),
        persona_kind.role()
    );

    loop {
        if stdout.write_all(b"> ").await.is_err() || stdout.flush().await.is_err() {
            return 1;
        }

        let message = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return 0,
            Err(e) => {
                print_error("cli_error", &format!("Failed to read input: {e}"), None);
                return 1;
            }
        };
        if matches!(message.trim(), "/quit" | "/exit") {
            return 0;
        }

        let request = ChatRequest {
            message: message.clone(),
            history: history.clone(),
            persona: persona.map(str::to_string),
            ..ChatRequest::default()
        };
        let response = match responder.respond(&request).await {
            Ok(response) => response,
            Err(e) => {
                print_error(
                    "connection_error",
                    &e,
                    Some("Is the API server running? Check WITNESS_API_URL."),
                );
                return 3;
            }
        };

        println!("{witness}: {}", response.reply);
        if response.is_done() {
            eprintln!("(The witness considers the matter settled. Type /restart for a new scenario.)");
        }

        append_turn(
            &mut history,
            TRAINEE,
            &message,
            witness,
            &response.reply,
            response.marker.as_deref(),
        );
    }
}
