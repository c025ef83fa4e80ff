use serde_json::json;
use serial_test::serial;
use solution_analyzer::{
    AnalysisConfig, AnalysisRequest, ProblemContext, ProviderErrorKind, ProviderFactory,
    ProviderId, RetryConfig,
};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn analysis_json(summary: &str) -> String {
    json!({
        "overallScore": 64,
        "aiConfidence": 55,
        "summary": summary,
        "evaluatedParameters": [],
        "feedback": { "strengths": [], "areasForImprovement": [], "suggestions": [] }
    })
    .to_string()
}

fn config_for(openai: &MockServer, claude: &MockServer) -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.primary_provider = ProviderId::OpenAI;
    config.fallback_provider = ProviderId::Claude;
    config.fallback_enabled = true;
    config.request_timeout_ms = 2_000;
    config.retry = RetryConfig {
        max_attempts: 2,
        retry_delay_base_ms: 5,
    };
    config.openai.api_key = Some("sk-test".to_string());
    config.openai.base_url = openai.uri();
    config.claude.api_key = Some("sk-ant-test".to_string());
    config.claude.base_url = claude.uri();
    config
}

async fn mount_claude_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": analysis_json("from claude") }]
        })))
        .mount(server)
        .await;
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new(ProblemContext::default(), "SELECT 1;")
}

#[tokio::test]
async fn test_overloaded_primary_falls_back_end_to_end() {
    let openai = MockServer::start().await;
    let claude = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&openai)
        .await;
    mount_claude_success(&claude).await;

    let factory = ProviderFactory::new(config_for(&openai, &claude));
    let provider = factory.get_primary_provider().unwrap();
    assert_eq!(provider.provider_name(), "openai-with-claude-fallback");

    let result = provider.analyze_comprehensively(request()).await.unwrap();
    assert_eq!(result.summary, "from claude");

    // The primary exhausts its own retries before the orchestrator steps in.
    assert_eq!(openai.received_requests().await.unwrap_or_default().len(), 2);

    let orchestrator = factory.get_orchestrator().unwrap().unwrap();
    let openai_metrics = orchestrator.metrics_for("openai").unwrap();
    let claude_metrics = orchestrator.metrics_for("claude").unwrap();
    assert_eq!(openai_metrics.failure_count, 1);
    assert_eq!(claude_metrics.success_count, 1);
    assert_eq!(claude_metrics.fallback_count, 1);
}

#[tokio::test]
async fn test_rejected_credentials_do_not_fall_back() {
    let openai = MockServer::start().await;
    let claude = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&openai)
        .await;
    mount_claude_success(&claude).await;

    let factory = ProviderFactory::new(config_for(&openai, &claude));
    let provider = factory.get_primary_provider().unwrap();
    let error = provider.analyze_comprehensively(request()).await.unwrap_err();

    assert_eq!(error.kind(), ProviderErrorKind::Authentication);
    assert_eq!(error.provider(), "openai");
    assert!(claude.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_both_backends_down_reports_primary_error() {
    let openai = MockServer::start().await;
    let claude = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&claude)
        .await;

    let factory = ProviderFactory::new(config_for(&openai, &claude));
    let provider = factory.get_primary_provider().unwrap();
    let error = provider.analyze_comprehensively(request()).await.unwrap_err();

    assert_eq!(error.kind(), ProviderErrorKind::ServiceError);
    assert_eq!(error.provider(), "openai");
}

#[tokio::test]
async fn test_health_survives_one_dead_backend() {
    let openai = MockServer::start().await;
    let claude = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&claude)
        .await;

    let factory = ProviderFactory::new(config_for(&openai, &claude));
    let provider = factory.get_primary_provider().unwrap();
    assert!(provider.is_healthy().await);
}

#[test]
fn test_factory_returns_same_instances() {
    let mut config = AnalysisConfig::default();
    config.openai.api_key = Some("sk-test".to_string());
    config.claude.api_key = Some("sk-ant-test".to_string());
    let factory = ProviderFactory::new(config);

    let first = factory.get_provider(ProviderId::Claude).unwrap();
    let second = factory.get_provider(ProviderId::Claude).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let composite_a = factory.get_primary_provider().unwrap();
    let composite_b = factory.get_primary_provider().unwrap();
    assert!(Arc::ptr_eq(&composite_a, &composite_b));
}

#[test]
fn test_concurrent_first_use_shares_one_instance() {
    let mut config = AnalysisConfig::default();
    config.openai.api_key = Some("sk-test".to_string());
    let factory = Arc::new(ProviderFactory::new(config));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let factory = Arc::clone(&factory);
            std::thread::spawn(move || factory.get_provider(ProviderId::OpenAI).unwrap())
        })
        .collect();
    let providers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for provider in &providers[1..] {
        assert!(Arc::ptr_eq(&providers[0], provider));
    }
}

#[test]
#[serial]
fn test_factory_from_environment() {
    // SAFETY: serialized with other environment-mutating tests.
    unsafe {
        std::env::set_var("ANALYSIS_PROVIDER", "claude");
        std::env::set_var("ANALYSIS_FALLBACK_ENABLED", "false");
        std::env::set_var("ANTHROPIC_API_KEY", "sk-ant-env");
    }

    let factory = ProviderFactory::from_env().unwrap();
    let provider = factory.get_primary_provider().unwrap();
    assert_eq!(provider.provider_name(), "claude");
    assert!(factory.get_orchestrator().unwrap().is_none());

    unsafe {
        std::env::remove_var("ANALYSIS_PROVIDER");
        std::env::remove_var("ANALYSIS_FALLBACK_ENABLED");
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
}

#[test]
#[serial]
fn test_invalid_provider_in_environment() {
    unsafe {
        std::env::set_var("ANALYSIS_PROVIDER", "mystery");
    }

    let error = match ProviderFactory::from_env() {
        Ok(_) => panic!("expected a configuration error"),
        Err(error) => error,
    };
    assert_eq!(error.kind(), ProviderErrorKind::Configuration);

    unsafe {
        std::env::remove_var("ANALYSIS_PROVIDER");
    }
}
