// Router-level tests for the generation and frame endpoints. The OpenAI
// upstream is a mockito server; the frame verifier is a local stub.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use toolforge::ai::{OpenAiClient, StylePlanner};
use toolforge::config::{
    AppConfig, Config, FrameConfig, OpenAiConfig, PaymentConfig, ServerConfig,
    DEFAULT_PRICE_BASE_UNITS,
};
use toolforge::models::AppState;
use toolforge::payment::FulfillmentLedger;
use toolforge::routes::frame::{FrameAction, FrameActionPayload, FrameError, FrameVerifier};
use toolforge::types::VariantSet;

struct StubVerifier {
    button: Option<u32>,
}

#[async_trait]
impl FrameVerifier for StubVerifier {
    async fn verify(&self, _payload: &FrameActionPayload) -> Result<FrameAction, FrameError> {
        match self.button {
            Some(button_index) => Ok(FrameAction {
                button_index,
                fid: Some(42),
            }),
            None => Err(FrameError::InvalidSignature),
        }
    }
}

fn test_config(openai_base: &str) -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        },
        app: AppConfig {
            public_base_url: "https://forge.example".to_string(),
        },
        openai: OpenAiConfig {
            api_key: "test-key".to_string(),
            chat_model: "gpt-4".to_string(),
            image_model: "dall-e-3".to_string(),
            api_base: Some(openai_base.to_string()),
        },
        payment: PaymentConfig {
            network: "base".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            token_address: None,
            contract_address: None,
            wallet_private_key: None,
            price_base_units: DEFAULT_PRICE_BASE_UNITS,
            confirmation_timeout_secs: 5,
            poll_interval_ms: 10,
            variant_set: VariantSet::Standard,
        },
        frame: FrameConfig {
            hub_url: "http://localhost:2281".to_string(),
        },
    }
}

fn test_state(openai_base: &str, frame_button: Option<u32>) -> AppState {
    let config = test_config(openai_base);
    let openai = Arc::new(
        OpenAiClient::new("test-key", "gpt-4", "dall-e-3").with_base_url(openai_base),
    );
    let planner = Arc::new(StylePlanner::new(openai.clone(), VariantSet::Standard));
    AppState {
        config,
        openai,
        planner,
        ledger: Arc::new(FulfillmentLedger::new()),
        verifier: Arc::new(StubVerifier {
            button: frame_button,
        }),
        http: reqwest::Client::new(),
    }
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_prompt_is_a_client_error() {
    let server = mockito::Server::new_async().await;
    let app = toolforge::create_router(test_state(&server.url(), Some(1)));

    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            serde_json::json!({"imageType": "icon"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("prompt"));
}

#[tokio::test]
async fn whitespace_prompt_is_a_client_error() {
    let server = mockito::Server::new_async().await;
    let app = toolforge::create_router(test_state(&server.url(), Some(1)));

    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            serde_json::json!({"prompt": "   ", "imageType": "icon"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn over_length_prompt_is_a_client_error() {
    let server = mockito::Server::new_async().await;
    let app = toolforge::create_router(test_state(&server.url(), Some(1)));

    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            serde_json::json!({"prompt": "x".repeat(301), "imageType": "icon"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_image_type_makes_no_upstream_calls() {
    let mut server = mockito::Server::new_async().await;
    let chat = server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;
    let images = server
        .mock("POST", "/images/generations")
        .expect(0)
        .create_async()
        .await;

    let app = toolforge::create_router(test_state(&server.url(), Some(1)));
    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            serde_json::json!({"prompt": "a sunset over mountains", "imageType": "banner"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    chat.assert_async().await;
    images.assert_async().await;
}

#[tokio::test]
async fn variant_outside_configured_set_is_rejected() {
    let server = mockito::Server::new_async().await;
    // screenshot exists only in the extended set; this deployment is standard.
    let app = toolforge::create_router(test_state(&server.url(), Some(1)));
    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            serde_json::json!({"prompt": "a sunset over mountains", "imageType": "screenshot"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generation_succeeds_with_fallback_derivation() {
    let mut server = mockito::Server::new_async().await;
    // Both derivation calls fail; the endpoint must still produce an image
    // from the deterministic fallback prompts.
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body(r#"{"error":{"message":"boom"}}"#)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(r#"{"data":[{"b64_json":"aWNvbi1ieXRlcw=="}]}"#)
        .create_async()
        .await;

    let app = toolforge::create_router(test_state(&server.url(), Some(1)));
    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            serde_json::json!({"prompt": "a sunset over mountains", "imageType": "icon"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["image"]["type"], "icon");
    assert_eq!(body["image"]["base64"], "aWNvbi1ieXRlcw==");
    assert_eq!(body["image"]["originalPrompt"], "a sunset over mountains");
    assert!(body["image"]["projectTemplate"]
        .as_str()
        .unwrap()
        .contains("a sunset over mountains"));
    assert!(!body["image"]["optimizedPrompt"]
        .as_str()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn upstream_without_payload_is_a_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body(r#"{"error":{"message":"boom"}}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(r#"{"data":[{"revised_prompt":"nothing usable"}]}"#)
        .create_async()
        .await;

    let app = toolforge::create_router(test_state(&server.url(), Some(1)));
    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            serde_json::json!({"prompt": "a sunset over mountains", "imageType": "icon"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn frame_index_advertises_buttons() {
    let server = mockito::Server::new_async().await;
    let app = toolforge::create_router(test_state(&server.url(), Some(1)));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/frame")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("fc:frame:button:1"));
    assert!(html.contains("https://forge.example/api/frame/image"));
}

#[tokio::test]
async fn frame_image_is_cacheable_svg() {
    let server = mockito::Server::new_async().await;
    let app = toolforge::create_router(test_state(&server.url(), Some(1)));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/frame/image")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
}

#[tokio::test]
async fn frame_buttons_dispatch() {
    let server = mockito::Server::new_async().await;
    let payload = serde_json::json!({
        "untrustedData": {"buttonIndex": 1, "fid": 42},
        "trustedData": {"messageBytes": "0xdeadbeef"}
    });

    // Button 1: a second frame document.
    let app = toolforge::create_router(test_state(&server.url(), Some(1)));
    let response = app
        .oneshot(json_request("/api/frame", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Button 2: redirect to the site root.
    let app = toolforge::create_router(test_state(&server.url(), Some(2)));
    let response = app
        .oneshot(json_request("/api/frame", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://forge.example"
    );

    // Any other button: client error.
    let app = toolforge::create_router(test_state(&server.url(), Some(7)));
    let response = app
        .oneshot(json_request("/api/frame", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Invalid signature: unauthorized, regardless of button.
    let app = toolforge::create_router(test_state(&server.url(), None));
    let response = app
        .oneshot(json_request("/api/frame", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
