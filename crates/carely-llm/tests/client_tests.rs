// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use carely_app::{ChatModel, CompletionBackend, CompletionError, MemorySettings, SYSTEM_PROMPT};
use carely_llm::Client;
use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};
use time::macros::datetime;

struct Captured {
    url: String,
    authorization: Option<String>,
    body: serde_json::Value,
}

fn serve_once(status: u16, body: &'static str) -> Result<(String, JoinHandle<Captured>)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/v1", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        let mut raw = String::new();
        request
            .as_reader()
            .read_to_string(&mut raw)
            .expect("request body should be readable");
        let authorization = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_owned());
        let captured = Captured {
            url: request.url().to_owned(),
            authorization,
            body: serde_json::from_str(&raw).expect("request body should be JSON"),
        };

        let response = Response::from_string(body)
            .with_status_code(status)
            .with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
        request.respond(response).expect("response should succeed");
        captured
    });

    Ok((addr, handle))
}

#[test]
fn complete_sends_documented_body_and_bearer_header() -> Result<()> {
    let (addr, handle) = serve_once(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"  Drink water.  "}}]}"#,
    )?;

    let client = Client::new(&addr, "gpt-3.5-turbo", Duration::from_secs(2))?
        .with_api_key(Some("sk-test"));
    let reply = client.complete(SYSTEM_PROMPT, "How much water?");
    let captured = handle.join().expect("server thread should join");

    assert_eq!(reply, Ok("Drink water.".to_owned()));
    assert_eq!(captured.url, "/v1/chat/completions");
    assert_eq!(captured.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(captured.body["model"], "gpt-3.5-turbo");
    assert_eq!(captured.body["max_tokens"], 500);
    assert_eq!(captured.body["messages"][0]["role"], "system");
    assert_eq!(captured.body["messages"][0]["content"], SYSTEM_PROMPT);
    assert_eq!(captured.body["messages"][1]["role"], "user");
    assert_eq!(captured.body["messages"][1]["content"], "How much water?");
    assert_eq!(
        captured.body["messages"].as_array().map(Vec::len),
        Some(2)
    );
    Ok(())
}

#[test]
fn unauthorized_maps_to_invalid_key() -> Result<()> {
    let (addr, handle) = serve_once(401, r#"{"error":{"message":"bad key"}}"#)?;
    let client = Client::new(&addr, "m", Duration::from_secs(2))?.with_api_key(Some("sk-bad"));

    let result = client.complete("sys", "hi");
    handle.join().expect("server thread should join");

    assert_eq!(result, Err(CompletionError::Unauthorized));
    Ok(())
}

#[test]
fn rate_limit_maps_to_rate_limited() -> Result<()> {
    let (addr, handle) = serve_once(429, "{}")?;
    let client = Client::new(&addr, "m", Duration::from_secs(2))?.with_api_key(Some("sk"));

    let result = client.complete("sys", "hi");
    handle.join().expect("server thread should join");

    assert_eq!(result, Err(CompletionError::RateLimited));
    Ok(())
}

#[test]
fn other_status_carries_server_message() -> Result<()> {
    let (addr, handle) = serve_once(503, r#"{"error":{"message":"overloaded"}}"#)?;
    let client = Client::new(&addr, "m", Duration::from_secs(2))?.with_api_key(Some("sk"));

    let result = client.complete("sys", "hi");
    handle.join().expect("server thread should join");

    let error = result.expect_err("503 should fail");
    assert_eq!(
        error,
        CompletionError::Status {
            code: 503,
            message: "overloaded".to_owned()
        }
    );
    assert!(error.to_string().contains("503"));
    Ok(())
}

#[test]
fn non_200_success_status_is_rejected() -> Result<()> {
    let (addr, handle) = serve_once(
        202,
        r#"{"choices":[{"message":{"role":"assistant","content":"queued"}}]}"#,
    )?;
    let client = Client::new(&addr, "m", Duration::from_secs(2))?.with_api_key(Some("sk"));

    let result = client.complete("sys", "hi");
    handle.join().expect("server thread should join");

    assert_eq!(
        result,
        Err(CompletionError::Status {
            code: 202,
            message: String::new()
        })
    );
    Ok(())
}

#[test]
fn empty_choices_are_malformed() -> Result<()> {
    let (addr, handle) = serve_once(200, r#"{"choices":[]}"#)?;
    let client = Client::new(&addr, "m", Duration::from_secs(2))?.with_api_key(Some("sk"));

    let result = client.complete("sys", "hi");
    handle.join().expect("server thread should join");

    assert!(matches!(result, Err(CompletionError::Malformed(_))));
    Ok(())
}

#[test]
fn unreachable_endpoint_is_a_transport_error() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/v1", "m", Duration::from_millis(200))?
        .with_api_key(Some("sk"));

    let error = client
        .complete("sys", "hi")
        .expect_err("unreachable endpoint should fail");
    assert!(matches!(error, CompletionError::Transport(_)));
    assert!(error.to_string().contains("127.0.0.1:1"));
    Ok(())
}

#[test]
fn chat_model_round_trip_over_http() -> Result<()> {
    let (addr, handle) = serve_once(
        200,
        r#"{"choices":[{"message":{"content":"Sleep 7 to 9 hours."}}]}"#,
    )?;
    let client = Client::new(&addr, "m", Duration::from_secs(2))?.with_api_key(Some("sk"));
    let mut store = MemorySettings::new();
    let mut model = ChatModel::load(&store);

    model.set_message_input("How much sleep?");
    let alert = model.send_message(&client, &mut store, || datetime!(2026-02-19 21:05 UTC));
    handle.join().expect("server thread should join");

    assert_eq!(alert, None);
    assert_eq!(model.messages().len(), 2);
    assert_eq!(model.messages()[1].text, "Sleep 7 to 9 hours.");
    assert_eq!(ChatModel::load(&store).messages().len(), 2);
    Ok(())
}
