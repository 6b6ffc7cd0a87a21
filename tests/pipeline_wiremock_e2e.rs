//! End-to-end pipeline runs against wiremock-backed vendor APIs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use model_arena::gateway::{
    AdapterRegistry, AnthropicAdapter, CohereAdapter, GoogleAdapter, OpenAiAdapter,
};
use model_arena::pipeline::{
    generate_responses, PipelineController, PipelineError, PipelineStage, Prompt,
};
use model_arena::prompts::{EVALUATION_FORMAT_MARKER, RANKING_FORMAT_MARKER};

/// Scores handed out by every evaluator, by response index.
/// Generation order: gpt-4o, claude-3-haiku, gemini-1.5-flash, command-r-plus.
const EVAL_ARRAY: &str = r#"[
    {"responseIndex": 0, "score": 5, "reasoning": "fine"},
    {"responseIndex": 1, "score": 7, "reasoning": "good"},
    {"responseIndex": 2, "score": 9, "reasoning": "great"},
    {"responseIndex": 3, "score": 3, "reasoning": "weak"}
]"#;

fn body_text(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).to_string()
}

struct OpenAiStub;

impl Respond for OpenAiStub {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = body_text(request);
        let content = if body.contains(EVALUATION_FORMAT_MARKER) {
            EVAL_ARRAY.to_string()
        } else {
            "openai answer".to_string()
        };
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": content } }]
        }))
    }
}

struct AnthropicStub;

impl Respond for AnthropicStub {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = body_text(request);
        let content = if body.contains(EVALUATION_FORMAT_MARKER) {
            // Prose-wrapped: exercises the bracket-extraction fallback.
            format!("Here are my scores:\n{EVAL_ARRAY}")
        } else {
            "anthropic answer".to_string()
        };
        ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": content }]
        }))
    }
}

struct GoogleStub;

impl Respond for GoogleStub {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = body_text(request);
        let content = if body.contains(RANKING_FORMAT_MARKER) {
            r#"{"ranking": [2, 0, 1], "reasoning": "clear quality gap"}"#.to_string()
        } else if body.contains(EVALUATION_FORMAT_MARKER) {
            format!("```json\n{EVAL_ARRAY}\n```")
        } else {
            "google answer".to_string()
        };
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": content }] } }]
        }))
    }
}

struct CohereStub {
    fail: bool,
}

impl Respond for CohereStub {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if self.fail {
            return ResponseTemplate::new(500)
                .set_body_json(json!({ "message": "internal error" }));
        }
        let body = body_text(request);
        let content = if body.contains(EVALUATION_FORMAT_MARKER) {
            EVAL_ARRAY.to_string()
        } else {
            "cohere answer".to_string()
        };
        ResponseTemplate::new(200).set_body_json(json!({ "text": content }))
    }
}

async fn mock_registry(cohere_fails: bool) -> (MockServer, AdapterRegistry) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .respond_with(OpenAiStub)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/anthropic/messages"))
        .respond_with(AnthropicStub)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/google/models/.+:generateContent$"))
        .respond_with(GoogleStub)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cohere/chat"))
        .respond_with(CohereStub { fail: cohere_fails })
        .mount(&server)
        .await;

    let timeout = Duration::from_secs(5);
    let registry = AdapterRegistry::new(
        Arc::new(
            OpenAiAdapter::with_config("sk-test", format!("{}/openai", server.uri()), timeout)
                .unwrap(),
        ),
        Arc::new(
            AnthropicAdapter::with_config("sk-test", format!("{}/anthropic", server.uri()), timeout)
                .unwrap(),
        ),
        Arc::new(
            GoogleAdapter::with_config("sk-test", format!("{}/google", server.uri()), timeout)
                .unwrap(),
        ),
        Arc::new(
            CohereAdapter::with_config("sk-test", format!("{}/cohere", server.uri()), timeout)
                .unwrap(),
        ),
    );

    (server, registry)
}

fn selected_models() -> Vec<String> {
    vec![
        "gpt-4o".to_string(),
        "claude-3-haiku-20240307".to_string(),
        "gemini-1.5-flash".to_string(),
        "command-r-plus".to_string(),
    ]
}

#[tokio::test]
async fn full_pipeline_ranks_top_three() {
    let (_server, registry) = mock_registry(false).await;
    let controller = PipelineController::new(Arc::new(registry));

    let result = controller
        .run(Prompt::text_only("What is 2+2?"), selected_models(), None)
        .await
        .unwrap();

    // Responses preserve input order.
    let ids: Vec<&str> = result.responses.iter().map(|r| r.model_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "gpt-4o",
            "claude-3-haiku-20240307",
            "gemini-1.5-flash",
            "command-r-plus"
        ]
    );
    assert_eq!(result.responses[0].text, "openai answer");

    // All four evaluators produced four records each.
    assert_eq!(result.evaluations.len(), 16);

    // Top three by mean score, best mean first.
    assert_eq!(
        result.top_three,
        vec!["gemini-1.5-flash", "claude-3-haiku-20240307", "gpt-4o"]
    );

    // Arbiter ranking [2,0,1] is applied positionally over the selection set
    // (generation order: gpt-4o, claude, gemini).
    assert_eq!(
        result.ranking.ordered_model_ids,
        vec!["gemini-1.5-flash", "gpt-4o", "claude-3-haiku-20240307"]
    );
    assert_eq!(result.ranking.reasoning, "clear quality gap");
}

#[tokio::test]
async fn one_failing_vendor_degrades_without_sinking_the_run() {
    let (_server, registry) = mock_registry(true).await;
    let controller = PipelineController::new(Arc::new(registry));

    let result = controller
        .run(Prompt::text_only("What is 2+2?"), selected_models(), None)
        .await
        .unwrap();

    // Cohere's generation call failed: sentinel text, everyone else normal.
    assert_eq!(
        result.responses[3].text,
        "Error: Failed to generate response from Command R+"
    );
    assert_eq!(result.responses[0].text, "openai answer");

    // Cohere the evaluator contributed zero records; the other three each
    // scored all four responses.
    assert_eq!(result.evaluations.len(), 12);
    assert!(result
        .evaluations
        .iter()
        .all(|e| e.evaluator_model_id != "command-r-plus"));

    // Pipeline still completes with a full ranking.
    assert_eq!(result.ranking.ordered_model_ids.len(), 3);
}

#[tokio::test]
async fn unknown_model_ids_are_silently_skipped() {
    let (_server, registry) = mock_registry(false).await;
    let controller = PipelineController::new(Arc::new(registry));

    let mut models = selected_models();
    models.insert(1, "llama-70b".to_string());

    let result = controller
        .run(Prompt::text_only("What is 2+2?"), models, None)
        .await
        .unwrap();

    assert_eq!(result.responses.len(), 4);
    assert!(result.responses.iter().all(|r| r.model_id != "llama-70b"));
}

#[tokio::test]
async fn empty_prompt_rejected_before_any_call() {
    let (server, registry) = mock_registry(false).await;
    let controller = PipelineController::new(Arc::new(registry));

    let failure = controller
        .run(Prompt::text_only("   "), selected_models(), None)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Generating);
    assert!(matches!(failure.error, PipelineError::InvalidInput(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_flag_stops_the_run() {
    let (server, registry) = mock_registry(false).await;
    let controller = PipelineController::new(Arc::new(registry));

    let cancel = AtomicBool::new(false);
    cancel.store(true, Ordering::Relaxed);

    let failure = controller
        .run(
            Prompt::text_only("What is 2+2?"),
            selected_models(),
            Some(&cancel),
        )
        .await
        .unwrap_err();

    assert!(matches!(failure.error, PipelineError::Cancelled));
    assert!(failure.partial.responses.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_mid_generation_aborts_in_flight_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({
                    "choices": [{ "message": { "content": "slow answer" } }]
                })),
        )
        .mount(&server)
        .await;

    let timeout = Duration::from_secs(10);
    let registry = AdapterRegistry::new(
        Arc::new(
            OpenAiAdapter::with_config("sk-test", format!("{}/openai", server.uri()), timeout)
                .unwrap(),
        ),
        Arc::new(
            AnthropicAdapter::with_config("sk-test", format!("{}/anthropic", server.uri()), timeout)
                .unwrap(),
        ),
        Arc::new(
            GoogleAdapter::with_config("sk-test", format!("{}/google", server.uri()), timeout)
                .unwrap(),
        ),
        Arc::new(
            CohereAdapter::with_config("sk-test", format!("{}/cohere", server.uri()), timeout)
                .unwrap(),
        ),
    );
    let controller = PipelineController::new(Arc::new(registry));

    let cancel = Arc::new(AtomicBool::new(false));
    let setter = Arc::clone(&cancel);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        setter.store(true, Ordering::Relaxed);
    });

    let started = std::time::Instant::now();
    let failure = controller
        .run(
            Prompt::text_only("slow one"),
            vec!["gpt-4o".to_string()],
            Some(&*cancel),
        )
        .await
        .unwrap_err();

    // The in-flight call is dropped instead of running out its 3s delay.
    assert!(matches!(failure.error, PipelineError::Cancelled));
    assert_eq!(failure.stage, PipelineStage::Generating);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn image_prompt_stripped_for_non_vision_models() {
    let (server, registry) = mock_registry(false).await;

    let prompt = Prompt::with_images(
        "describe this",
        vec!["data:image/png;base64,AAAA".to_string()],
    );
    // gpt-4o supports vision, gpt-3.5-turbo does not.
    let responses = generate_responses(
        &registry,
        &prompt,
        &["gpt-4o".to_string(), "gpt-3.5-turbo".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(responses.len(), 2);

    let requests = server.received_requests().await.unwrap();
    let bodies: Vec<serde_json::Value> = requests
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();

    let vision = bodies.iter().find(|b| b["model"] == "gpt-4o").unwrap();
    let parts = vision["messages"][0]["content"].as_array().unwrap();
    assert!(parts.iter().any(|p| p["type"] == "image_url"));

    let text_only = bodies.iter().find(|b| b["model"] == "gpt-3.5-turbo").unwrap();
    assert_eq!(text_only["messages"][0]["content"], "describe this");
}
