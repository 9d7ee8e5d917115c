use serde_json::json;
use trilha::{
    config::OpenAiSettings,
    evaluate::{CompletionService, EvaluationError, openai::OpenAiService},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn service(api_base: &str) -> OpenAiService {
    let settings = OpenAiSettings::new("sk-test").with_api_base(api_base);
    OpenAiService::new(&settings, reqwest::Client::new())
}

fn completion(content: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
            "logprobs": null
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

#[tokio::test]
async fn request_is_deterministic_and_capped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "temperature": 0.0,
            "max_completion_tokens": 120,
            "n": 1,
            "messages": [{"role": "user", "content": "avalie"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(
            r#"{"ra": "1", "aluno": "Ana", "resultado": "Bom"}"#
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let reply = service(&server.uri()).complete("avalie").await.expect("reply");

    assert_eq!(reply, r#"{"ra": "1", "aluno": "Ana", "resultado": "Bom"}"#);
}

#[tokio::test]
async fn configured_model_and_cap_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_completion_tokens": 64
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!("ok"))))
        .expect(1)
        .mount(&server)
        .await;

    let settings = OpenAiSettings::new("sk-test")
        .with_api_base(server.uri())
        .with_model("gpt-4o-mini")
        .with_max_tokens(64);
    let service = OpenAiService::new(&settings, reqwest::Client::new());

    assert_eq!(service.model(), "gpt-4o-mini");
    assert_eq!(service.complete("avalie").await.expect("reply"), "ok");
}

#[tokio::test]
async fn missing_content_is_an_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(null))))
        .mount(&server)
        .await;

    let result = service(&server.uri()).complete("avalie").await;

    assert_eq!(result, Err(EvaluationError::EmptyResponse));
}

#[tokio::test]
async fn api_rejection_is_a_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    match service(&server.uri()).complete("avalie").await {
        Err(EvaluationError::Service(message)) => {
            assert_eq!(message, "Incorrect API key provided")
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let result = service(&format!("http://127.0.0.1:{port}")).complete("avalie").await;

    assert!(matches!(result, Err(EvaluationError::Transport(_))));
}
