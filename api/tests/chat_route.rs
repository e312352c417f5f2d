//! HTTP-level tests for the chat and health routes.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use ai_llm_service::error_handler::{Provider, ProviderError, ProviderErrorKind};
use ai_llm_service::{AiLlmError, ChatRequest};
use api::{AppState, router};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use contextor::{ChatPipeline, CompletionKind, CompletionService, ContextorConfig, TokenCounter};
use rag_store::{RagError, ScoredPassage, SearchService};
use tower::ServiceExt;

struct ScriptedCompletion {
    /// `None` makes the answer call fail at the provider.
    answer: Option<String>,
    answer_calls: AtomicUsize,
}

impl CompletionService for ScriptedCompletion {
    fn complete<'a>(
        &'a self,
        kind: CompletionKind,
        _req: ChatRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>> {
        let out = match kind {
            CompletionKind::Rewrite => Some(r#"{"search_query": "kitkat calories"}"#.to_string()),
            CompletionKind::Answer => {
                self.answer_calls.fetch_add(1, Ordering::SeqCst);
                self.answer.clone()
            }
        };
        Box::pin(async move {
            out.ok_or_else(|| {
                AiLlmError::from(ProviderError::new(
                    Provider::OpenAI,
                    ProviderErrorKind::EmptyChoices,
                ))
            })
        })
    }
}

#[derive(Default)]
struct StubSearch {
    fail: bool,
    fail_embed: bool,
}

impl SearchService for StubSearch {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        let fail = self.fail_embed;
        Box::pin(async move {
            if fail {
                return Err(RagError::Config(
                    "embedding deployment text-embedding-3-small not found".into(),
                ));
            }
            Ok(vec![0.0; 3])
        })
    }

    fn knn<'a>(
        &'a self,
        _vector: Vec<f32>,
        _top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, RagError>> + Send + 'a>> {
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                return Err(RagError::AzureSearch(
                    "HTTP 503: upstream index node-7 overloaded".into(),
                ));
            }
            Ok(vec![ScoredPassage::new(
                "KITKAT 4-Finger 45 g: 230 calories",
                "kitkat-4-finger",
                0.91,
            )])
        })
    }
}

fn app(answer: &str, fail_search: bool) -> (axum::Router, Arc<ScriptedCompletion>) {
    app_with(
        Some(answer),
        StubSearch {
            fail: fail_search,
            ..StubSearch::default()
        },
    )
}

fn app_with(answer: Option<&str>, search: StubSearch) -> (axum::Router, Arc<ScriptedCompletion>) {
    let completion = Arc::new(ScriptedCompletion {
        answer: answer.map(str::to_string),
        answer_calls: AtomicUsize::new(0),
    });
    let pipeline = ChatPipeline::with_counter(
        ContextorConfig::default(),
        TokenCounter::approximate(),
        completion.clone(),
        Arc::new(search),
    );
    let state = Arc::new(AppState::new(Arc::new(pipeline), None));
    (router(state), completion)
}

fn post_chat(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = ServiceExt::<Request<Body>>::oneshot(app, req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 100_000)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

const CARD: &str = r#"{"mainAnswer": "A KitKat 4-finger bar has 230 calories.",
    "productDetails": [{"name": "KITKAT 4-Finger (45 g)", "details": ["Calories: 230"]}]}"#;

#[tokio::test]
async fn greeting_returns_canned_answer() {
    let (app, completion) = app(CARD, false);
    let (status, json) = send(app, post_chat(r#"{"query": "hello"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"].as_str().unwrap().starts_with("Hello! I am an AI assistant"));
    assert_eq!(json["sources"], serde_json::json!([]));
    assert_eq!(completion.answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn catalog_question_returns_card_and_sources() {
    let (app, _) = app(CARD, false);
    let (status, json) = send(
        app,
        post_chat(r#"{"query": "how many calories in a KitKat bar"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["answer"]["mainAnswer"],
        "A KitKat 4-finger bar has 230 calories."
    );
    assert_eq!(json["answer"]["productDetails"][0]["details"][0], "Calories: 230");
    assert_eq!(json["sources"][0]["source"], "kitkat-4-finger");
    assert_eq!(json["sources"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_failure_is_bad_gateway_without_internals() {
    let (app, completion) = app(CARD, true);
    let (status, json) = send(app, post_chat(r#"{"query": "kitkat ingredients"}"#)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["detail"], "Failed to search documents");
    assert_eq!(json["code"], "SEARCH_FAILED");
    assert!(!json.to_string().contains("node-7"));
    assert_eq!(completion.answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_failure_is_bad_gateway() {
    let search = StubSearch {
        fail_embed: true,
        ..StubSearch::default()
    };
    let (app, completion) = app_with(Some(CARD), search);
    let (status, json) = send(app, post_chat(r#"{"query": "kitkat ingredients"}"#)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["detail"], "Failed to generate embeddings");
    assert_eq!(json["code"], "EMBEDDING_FAILED");
    assert!(!json.to_string().contains("text-embedding-3-small"));
    assert_eq!(completion.answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answer_call_failure_is_bad_gateway() {
    let (app, completion) = app_with(None, StubSearch::default());
    let (status, json) = send(app, post_chat(r#"{"query": "kitkat ingredients"}"#)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["detail"], "Failed to generate response");
    assert_eq!(json["code"], "COMPLETION_FAILED");
    assert!(!json.to_string().contains("OpenAI"));
    assert_eq!(completion.answer_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unparsable_answer_is_internal_error() {
    let (app, _) = app("Sorry, here is some prose.", false);
    let (status, json) = send(app, post_chat(r#"{"query": "kitkat ingredients"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "ANSWER_SCHEMA_ERROR");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (app, _) = app(CARD, false);
    let (status, json) = send(app, post_chat(r#"{"question": 1}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let (app, _) = app(CARD, false);
    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .header("x-request-id", "trace-42")
        .body(Body::from(r#"{"query": "hi"}"#))
        .unwrap();
    let resp = ServiceExt::<Request<Body>>::oneshot(app, req).await.unwrap();

    assert_eq!(resp.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn health_reports_budget() {
    let (app, _) = app(CARD, false);
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["context_budget"]["max_tokens"], 600);
    assert_eq!(json["providers"], serde_json::json!([]));
}
