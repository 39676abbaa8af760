use crate::state::AppState;
use axum::{
    extract::State,
    http::{self, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::Stream;
use praxis::{agent::Agent, errors::AgentError, models::message::Message};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Identifies which platform signing key produced the request signature.
const KEY_IDENTIFIER_HEADER: &str = "x-public-key-identifier";
/// Base64 DER ECDSA signature over the raw request body.
const SIGNATURE_HEADER: &str = "x-public-key-signature";
/// Bearer token the agent passes through to the completion API.
const TOKEN_HEADER: &str = "x-platform-token";

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
}

// Custom SSE response type for the platform's event stream
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let stream = self;
        let body = axum::body::Body::from_stream(stream);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            // Keeps reverse proxies from buffering the stream
            .header("X-Accel-Buffering", "no")
            .body(body)
            .unwrap()
    }
}

// Protocol-specific frame formatting
struct ProtocolFormatter;

impl ProtocolFormatter {
    /// The platform requires an assistant-turn-starting frame before any
    /// content.
    fn format_ack() -> String {
        let chunk = json!({
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant", "content": ""}
            }]
        });
        format!("data: {chunk}\n\n")
    }

    fn format_text(text: &str) -> String {
        let chunk = json!({
            "choices": [{
                "index": 0,
                "delta": {"content": text}
            }]
        });
        format!("data: {chunk}\n\n")
    }

    fn format_done() -> String {
        "data: [DONE]\n\n".to_string()
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": message})))
}

fn require_header<'a>(
    headers: &'a HeaderMap,
    name: &str,
) -> Result<&'a str, (StatusCode, Json<Value>)> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| unauthorized(&format!("missing required header: {name}")))
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<SseResponse, (StatusCode, Json<Value>)> {
    // All three header values must be present before anything else runs
    let key_id = require_header(&headers, KEY_IDENTIFIER_HEADER)?;
    let signature = require_header(&headers, SIGNATURE_HEADER)?;
    let token = require_header(&headers, TOKEN_HEADER)?.to_string();

    if !state.verifier.verify(&body, key_id, signature).await {
        tracing::warn!(key_id, "rejecting request with invalid signature");
        return Err(unauthorized("invalid signature"));
    }

    let request: ChatRequest = serde_json::from_slice(&body).map_err(|error| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("invalid request body: {error}")})),
        )
    })?;

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    let agent = Agent::new(state.completion.clone(), state.skills.clone());

    // Spawn task to handle streaming. Once the stream is open, failures can
    // no longer become status codes; they degrade to in-band text.
    tokio::spawn(async move {
        if tx.send(ProtocolFormatter::format_ack()).await.is_err() {
            return;
        }

        let (delta_tx, mut delta_rx) = mpsc::channel::<String>(100);
        let forwarder = {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(delta) = delta_rx.recv().await {
                    if tx.send(ProtocolFormatter::format_text(&delta)).await.is_err() {
                        break;
                    }
                }
            })
        };

        let result = agent.reply(&token, request.messages, delta_tx).await;
        // Let the forwarder drain every delta before any trailing frame
        let _ = forwarder.await;

        match result {
            Ok(()) => {}
            Err(AgentError::Disconnected) => {
                tracing::info!("client disconnected mid-reply");
            }
            Err(error) => {
                tracing::error!(%error, "agent reply failed");
                let notice = format!(
                    "\n\n⚠️ The assistant could not finish this reply: {error}\n"
                );
                let _ = tx.send(ProtocolFormatter::format_text(&notice)).await;
            }
        }

        let _ = tx.send(ProtocolFormatter::format_done()).await;
    });

    Ok(SseResponse::new(stream))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/agent", post(handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use base64::engine::general_purpose::STANDARD as B64;
    use base64::Engine;
    use http_body_util::BodyExt;
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::{Signature, SigningKey};
    use p256::pkcs8::{EncodePublicKey, LineEnding};
    use praxis::completion::{CompletionClient, CompletionConfig};
    use praxis::signature::SignatureVerifier;
    use praxis::skills::SkillRegistry;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_for(key_endpoint: String, completion_host: String) -> AppState {
        AppState {
            verifier: Arc::new(SignatureVerifier::new(key_endpoint)),
            skills: Arc::new(SkillRegistry::new()),
            completion: Arc::new(
                CompletionClient::new(CompletionConfig {
                    host: completion_host,
                    model: "gpt-4o".to_string(),
                })
                .unwrap(),
            ),
        }
    }

    fn signed_request(body: &str, signing_key: &SigningKey) -> Request<Body> {
        let signature: Signature = signing_key.sign(body.as_bytes());
        Request::post("/agent")
            .header(KEY_IDENTIFIER_HEADER, "key-1")
            .header(
                SIGNATURE_HEADER,
                B64.encode(signature.to_der().as_bytes()),
            )
            .header(TOKEN_HEADER, "platform-token")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn key_server(signing_key: &SigningKey) -> MockServer {
        let pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "public_keys": [
                    {"key_identifier": "key-1", "key": pem, "is_current": true}
                ]
            })))
            .mount(&server)
            .await;
        server
    }

    fn sse_body(frames: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_string(frames.to_string())
            .insert_header("content-type", "text/event-stream")
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized_without_verification() {
        let keys = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&keys)
            .await;

        let app = routes(state_for(keys.uri(), "http://unused".to_string()));
        let request = Request::post("/agent")
            .header(KEY_IDENTIFIER_HEADER, "key-1")
            .header(TOKEN_HEADER, "platform-token")
            // no signature header
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_signature_is_unauthorized() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let keys = key_server(&signing_key).await;
        let app = routes(state_for(keys.uri(), "http://unused".to_string()));

        // Signed by a different key than the one the platform publishes
        let other_key = SigningKey::random(&mut rand::thread_rng());
        let response = app
            .oneshot(signed_request(r#"{"messages":[]}"#, &other_key))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["error"], "invalid signature");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let keys = key_server(&signing_key).await;
        let app = routes(state_for(keys.uri(), "http://unused".to_string()));

        let response = app
            .oneshot(signed_request("not json", &signing_key))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_end_to_end_tool_call_reply() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let keys = key_server(&signing_key).await;

        let completion = MockServer::start().await;
        // First turn: the model asks for a Kafka topic check
        let tool_frames = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[",
            "{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"check_kafka_topic\",",
            "\"arguments\":\"{\\\"topic_name\\\":\\\"order-events\\\",\\\"config_source\\\":\\\"partitions: 6\\\"}\"",
            "}}]}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(sse_body(tool_frames))
            .up_to_n_times(1)
            .mount(&completion)
            .await;
        // Second turn: the final answer
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(sse_body(concat!(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Topic is configured correctly.\"}}]}\n\n",
                "data: [DONE]\n\n",
            )))
            .mount(&completion)
            .await;

        let app = routes(state_for(keys.uri(), completion.uri()));
        let body = r#"{"messages":[{"role":"user","content":"check order-events topic"}]}"#;
        let response = app
            .oneshot(signed_request(body, &signing_key))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        assert_eq!(response.headers()["x-accel-buffering"], "no");

        let frames = response.into_body().collect().await.unwrap().to_bytes();
        let frames = String::from_utf8(frames.to_vec()).unwrap();

        // Ack first, text deltas in the middle, the end marker last
        assert!(
            frames.starts_with(&ProtocolFormatter::format_ack()),
            "{frames}"
        );
        assert!(frames.contains("Topic is configured correctly."), "{frames}");
        assert!(frames.ends_with("data: [DONE]\n\n"), "{frames}");

        // The tool result went back upstream, not to the client
        assert!(!frames.contains("Kafka topic review"));
        let requests = completion.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
        let messages = second["messages"].as_array().unwrap();
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
        assert!(messages[2]["content"]
            .as_str()
            .unwrap()
            .contains("Kafka topic review"));
    }

    #[tokio::test]
    async fn test_upstream_failure_degrades_to_in_band_notice() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let keys = key_server(&signing_key).await;

        let completion = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&completion)
            .await;

        let app = routes(state_for(keys.uri(), completion.uri()));
        let body = r#"{"messages":[{"role":"user","content":"hello"}]}"#;
        let response = app
            .oneshot(signed_request(body, &signing_key))
            .await
            .unwrap();

        // The stream opened, so the failure is in-band, not a status code
        assert_eq!(response.status(), StatusCode::OK);
        let frames = response.into_body().collect().await.unwrap().to_bytes();
        let frames = String::from_utf8(frames.to_vec()).unwrap();
        assert!(frames.contains("could not finish this reply"), "{frames}");
        assert!(frames.contains("502"), "{frames}");
        assert!(frames.ends_with("data: [DONE]\n\n"), "{frames}");
    }
}
