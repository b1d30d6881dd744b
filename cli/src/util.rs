use serde::Serialize;
use serde_json::json;
use witness_core::{ChatRequest, ChatResponse};

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn render(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

pub fn print_json(value: &impl Serialize) {
    println!("{}", render(value));
}

pub fn print_error(error: &str, message: &str, docs_hint: Option<&str>) {
    let mut err = json!({
        "error": error,
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", render(&err));
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    print_error("cli_error", message, docs_hint);
    std::process::exit(4);
}

/// GET a JSON endpoint and print the body.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error
pub async fn get_json(api_url: &str, path: &str) -> i32 {
    let url = format!("{}{path}", api_url.trim_end_matches('/'));
    let resp = match client().get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            print_error(
                "connection_error",
                &e.to_string(),
                Some("Is the API server running? Check WITNESS_API_URL."),
            );
            return 3;
        }
    };

    let status = resp.status().as_u16();
    let body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(e) => json!({"raw_error": format!("Failed to parse response as JSON: {e}")}),
    };

    let exit_code = match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    };
    if exit_code == 0 {
        println!("{}", render(&body));
    } else {
        eprintln!("{}", render(&body));
    }
    exit_code
}

/// POST one turn to `/v1/chat`. Throttled (429) replies still carry the chat
/// shape, so any JSON body that parses as a `ChatResponse` is returned.
pub async fn post_chat(api_url: &str, request: &ChatRequest) -> Result<ChatResponse, String> {
    let resp = client()
        .post(format!("{api_url}/v1/chat"))
        .json(request)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| e.to_string())?;
    serde_json::from_slice::<ChatResponse>(&body)
        .map_err(|e| format!("Unexpected response from API (HTTP {status}): {e}"))
}

/// Append one exchange to a transcript, echoing the state marker after the
/// witness line so the next request resumes from it.
pub fn append_turn(
    history: &mut String,
    trainee: &str,
    message: &str,
    witness: &str,
    reply: &str,
    marker: Option<&str>,
) {
    history.push_str(&format!("{trainee}: {}\n", message.trim()));
    match marker {
        Some(marker) => history.push_str(&format!("{witness}: {reply} {marker}\n")),
        None => history.push_str(&format!("{witness}: {reply}\n")),
    }
}
