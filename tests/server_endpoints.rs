//! HTTP endpoint tests against an in-process server with scripted adapters.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use model_arena::catalog::Vendor;
use model_arena::gateway::{AdapterRegistry, ProviderAdapter, ProviderError};
use model_arena::pipeline::Prompt;
use model_arena::prompts::{EVALUATION_FORMAT_MARKER, RANKING_FORMAT_MARKER};
use model_arena::server::{build_router, AppState};

/// Adapter double that answers by prompt kind instead of hitting the network.
struct ScriptedAdapter {
    vendor: Vendor,
    generation: String,
    evaluation: String,
    ranking: String,
}

impl ScriptedAdapter {
    fn new(vendor: Vendor, generation: &str, evaluation: &str) -> Self {
        Self {
            vendor,
            generation: generation.to_string(),
            evaluation: evaluation.to_string(),
            ranking: r#"{"ranking":[2,0,1],"reasoning":"scripted"}"#.to_string(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    async fn generate(&self, _model_id: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        if prompt.text.contains(RANKING_FORMAT_MARKER) {
            Ok(self.ranking.clone())
        } else if prompt.text.contains(EVALUATION_FORMAT_MARKER) {
            Ok(self.evaluation.clone())
        } else {
            Ok(self.generation.clone())
        }
    }
}

const EVAL_ARRAY: &str = r#"[
    {"responseIndex": 0, "score": 5, "reasoning": "fine"},
    {"responseIndex": 1, "score": 7, "reasoning": "good"},
    {"responseIndex": 2, "score": 9, "reasoning": "great"},
    {"responseIndex": 3, "score": 3, "reasoning": "weak"}
]"#;

fn scripted_registry(evaluation: &str) -> AdapterRegistry {
    AdapterRegistry::new(
        Arc::new(ScriptedAdapter::new(Vendor::OpenAi, "openai answer", evaluation)),
        Arc::new(ScriptedAdapter::new(
            Vendor::Anthropic,
            "anthropic answer",
            evaluation,
        )),
        Arc::new(ScriptedAdapter::new(Vendor::Google, "google answer", evaluation)),
        Arc::new(ScriptedAdapter::new(Vendor::Cohere, "cohere answer", evaluation)),
    )
}

/// Bind an ephemeral port, serve the router on it, return the base URL.
async fn spawn_server(registry: AdapterRegistry) -> String {
    let state = Arc::new(AppState::new(registry));
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn model_ids() -> Value {
    json!(["gpt-4o", "claude-3-haiku-20240307", "gemini-1.5-flash", "command-r-plus"])
}

#[tokio::test]
async fn health_reports_ok() {
    let base = spawn_server(scripted_registry(EVAL_ARRAY)).await;
    let body: Value = reqwest::get(format!("{base}/api/v1/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn generate_preserves_order_and_skips_unknown_ids() {
    let base = spawn_server(scripted_registry(EVAL_ARRAY)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/generate"))
        .json(&json!({
            "prompt": { "text": "What is 2+2?" },
            "modelIds": ["gpt-4o", "llama-70b", "command-r-plus"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let responses = body["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["modelId"], "gpt-4o");
    assert_eq!(responses[0]["displayName"], "GPT-4o");
    assert_eq!(responses[0]["text"], "openai answer");
    assert!(responses[0]["createdAt"].as_i64().unwrap() > 0);
    assert_eq!(responses[1]["modelId"], "command-r-plus");
}

#[tokio::test]
async fn generate_rejects_empty_prompt() {
    let base = spawn_server(scripted_registry(EVAL_ARRAY)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/generate"))
        .json(&json!({ "prompt": { "text": "  " }, "modelIds": ["gpt-4o"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn evaluate_then_rank_round_trip() {
    let base = spawn_server(scripted_registry(EVAL_ARRAY)).await;
    let client = reqwest::Client::new();

    // Generate the four responses through the API first.
    let gen: Value = client
        .post(format!("{base}/api/v1/generate"))
        .json(&json!({ "prompt": { "text": "What is 2+2?" }, "modelIds": model_ids() }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let eval: Value = client
        .post(format!("{base}/api/v1/evaluate"))
        .json(&json!({
            "prompt": { "text": "What is 2+2?" },
            "responses": gen["responses"],
            "modelIds": model_ids(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(eval["evaluations"].as_array().unwrap().len(), 16);
    assert_eq!(
        eval["topThree"],
        json!(["gemini-1.5-flash", "claude-3-haiku-20240307", "gpt-4o"])
    );
    // topThreeResponses stay in generation order, not rank order.
    let top_responses = eval["topThreeResponses"].as_array().unwrap();
    assert_eq!(top_responses[0]["modelId"], "gpt-4o");
    assert_eq!(top_responses[2]["modelId"], "gemini-1.5-flash");

    // The evaluate payload feeds straight into rank.
    let rank: Value = client
        .post(format!("{base}/api/v1/rank"))
        .json(&json!({
            "prompt": { "text": "What is 2+2?" },
            "topThreeResponses": eval["topThreeResponses"],
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Scripted arbiter says [2, 0, 1] over generation order.
    assert_eq!(
        rank["ranking"],
        json!(["gemini-1.5-flash", "gpt-4o", "claude-3-haiku-20240307"])
    );
    assert_eq!(rank["reasoning"], "scripted");
}

#[tokio::test]
async fn evaluate_with_no_usable_scores_is_422() {
    let base = spawn_server(scripted_registry("I cannot score these.")).await;
    let client = reqwest::Client::new();

    let responses = json!([
        { "modelId": "gpt-4o", "displayName": "GPT-4o", "text": "four", "createdAt": 1 },
        { "modelId": "command-r-plus", "displayName": "Command R+", "text": "4", "createdAt": 2 }
    ]);

    let resp = client
        .post(format!("{base}/api/v1/evaluate"))
        .json(&json!({
            "prompt": { "text": "What is 2+2?" },
            "responses": responses,
            "modelIds": ["gpt-4o", "command-r-plus"],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "no_scored_models");
}

#[tokio::test]
async fn rank_requires_exactly_three_responses() {
    let base = spawn_server(scripted_registry(EVAL_ARRAY)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/rank"))
        .json(&json!({
            "prompt": { "text": "What is 2+2?" },
            "topThreeResponses": [
                { "modelId": "gpt-4o", "displayName": "GPT-4o", "text": "four", "createdAt": 1 }
            ],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}
