//! Behavior shared by every concrete provider.
//!
//! [`BaseProvider`] owns the pieces that must not differ between backends:
//! prompt assembly, response validation and the bounded retry loop. Concrete
//! providers embed one and route their network call through
//! [`BaseProvider::execute_with_retry`].

use crate::analysis::error::ProviderError;
use crate::analysis::types::{AnalysisRequest, AnalysisResult};
use crate::config::RetryConfig;
use serde_json::Value;
use std::fmt::Write as _;
use std::future::Future;
use tracing::{debug, warn};

/// Score bands embedded in every prompt.
pub const SCORING_RUBRIC: [(u32, u32, &str); 5] = [
    (90, 100, "Exceptional: complete, correct, idiomatic and well reasoned"),
    (75, 89, "Strong: meets all requirements with minor issues"),
    (60, 74, "Adequate: core requirements met, notable gaps remain"),
    (40, 59, "Weak: partially working, significant requirements missing"),
    (0, 39, "Insufficient: incorrect or largely incomplete"),
];

pub const FAIRNESS_POLICY: [&str; 4] = [
    "Do not favor or penalize any programming language, framework or style; judge only against the stated requirements.",
    "Every deduction must cite concrete evidence from the submitted solution.",
    "Award partial credit for requirements that are partially met.",
    "When information needed for a judgement is missing, lower aiConfidence instead of lowering the score.",
];

const RESPONSE_SHAPE: &str = r#"{
  "overallScore": <number 0-100>,
  "aiConfidence": <number 0-100>,
  "summary": "<non-empty string>",
  "evaluatedParameters": [
    { "name": "<parameter>", "score": <number 0-100>, "justification": "<string>" }
  ],
  "feedback": {
    "strengths": ["<string>"],
    "areasForImprovement": ["<string>"],
    "suggestions": ["<string>"]
  }
}"#;

#[derive(Debug, Clone)]
pub struct BaseProvider {
    provider_name: String,
    retry: RetryConfig,
}

impl BaseProvider {
    pub fn new(provider_name: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            provider_name: provider_name.into(),
            retry,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Render the full instruction block for one request.
    ///
    /// Output depends only on the request contents, so the same request always
    /// produces the same prompt.
    pub fn build_prompt(&self, request: &AnalysisRequest) -> String {
        let problem = &request.problem;
        let mut prompt = String::new();

        prompt.push_str(
            "You are an impartial reviewer evaluating a submitted solution to a programming problem.\n\n",
        );

        prompt.push_str("## Problem\n");
        let _ = writeln!(prompt, "Title: {}", problem.title);
        let _ = writeln!(prompt, "Difficulty: {}", problem.difficulty);
        if !problem.tags.is_empty() {
            let tags: Vec<&str> = problem.tags.iter().map(String::as_str).collect();
            let _ = writeln!(prompt, "Tags: {}", tags.join(", "));
        }
        let _ = writeln!(prompt, "Description:\n{}", problem.description);
        let _ = writeln!(prompt, "Expected outcome:\n{}\n", problem.expected_outcome);

        push_list(&mut prompt, "Functional requirements", &problem.functional_requirements);
        push_list(
            &mut prompt,
            "Non-functional requirements",
            &problem.non_functional_requirements,
        );
        push_list(&mut prompt, "Constraints", &problem.constraints);

        if !request.documents.is_empty() {
            prompt.push_str("## Reference material\n");
            for (index, document) in request.documents.iter().enumerate() {
                let _ = writeln!(prompt, "### Document {}\n{}\n", index + 1, document);
            }
        }

        if !request.parameters.is_empty() {
            prompt.push_str("## Technical parameters to score\n");
            for parameter in &request.parameters {
                match &parameter.description {
                    Some(description) => {
                        let _ = writeln!(prompt, "- {}: {}", parameter.name, description);
                    }
                    None => {
                        let _ = writeln!(prompt, "- {}", parameter.name);
                    }
                }
            }
            prompt.push('\n');
        }

        prompt.push_str("## Scoring rubric\n");
        for (low, high, label) in SCORING_RUBRIC {
            let _ = writeln!(prompt, "- {}-{}: {}", low, high, label);
        }
        prompt.push('\n');

        prompt.push_str("## Fairness policy\n");
        for rule in FAIRNESS_POLICY {
            let _ = writeln!(prompt, "- {}", rule);
        }
        prompt.push('\n');

        prompt.push_str("## Submitted solution\n```\n");
        prompt.push_str(&request.solution);
        if !request.solution.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push_str("```\n\n");

        prompt.push_str("## Response format\n");
        prompt.push_str(
            "Respond with a single JSON object and nothing else, using exactly this shape:\n",
        );
        prompt.push_str(RESPONSE_SHAPE);
        prompt.push('\n');

        prompt
    }

    /// Strip code fences from a raw model reply, parse it and validate the shape.
    pub fn parse_response(&self, raw: &str) -> Result<AnalysisResult, ProviderError> {
        let cleaned = strip_code_fences(raw);
        let payload: Value = serde_json::from_str(cleaned).map_err(|e| {
            ProviderError::parsing(
                &self.provider_name,
                format!("response is not valid JSON: {}", e),
            )
        })?;
        self.validate_response(payload)
    }

    /// Check a raw payload against the [`AnalysisResult`] shape.
    pub fn validate_response(&self, payload: Value) -> Result<AnalysisResult, ProviderError> {
        let fail = |message: String| ProviderError::parsing(&self.provider_name, message);

        let object = payload
            .as_object()
            .ok_or_else(|| fail("response must be a JSON object".to_string()))?;

        for field in [
            "overallScore",
            "aiConfidence",
            "summary",
            "evaluatedParameters",
            "feedback",
        ] {
            if !object.contains_key(field) {
                return Err(fail(format!("missing required field '{}'", field)));
            }
        }

        check_score(&object["overallScore"], "overallScore").map_err(fail)?;
        check_score(&object["aiConfidence"], "aiConfidence").map_err(fail)?;

        match object["summary"].as_str() {
            Some(summary) if !summary.trim().is_empty() => {}
            Some(_) => return Err(fail("summary must not be empty".to_string())),
            None => return Err(fail("summary must be a string".to_string())),
        }

        let parameters = object["evaluatedParameters"]
            .as_array()
            .ok_or_else(|| fail("evaluatedParameters must be an array".to_string()))?;
        for (index, parameter) in parameters.iter().enumerate() {
            check_score(&parameter["score"], &format!("evaluatedParameters[{}].score", index))
                .map_err(fail)?;
        }

        let feedback = object["feedback"]
            .as_object()
            .ok_or_else(|| fail("feedback must be an object".to_string()))?;
        for list in ["strengths", "areasForImprovement", "suggestions"] {
            match feedback.get(list) {
                Some(Value::Array(_)) => {}
                Some(_) => return Err(fail(format!("feedback.{} must be an array", list))),
                None => return Err(fail(format!("feedback.{} is missing", list))),
            }
        }

        serde_json::from_value(payload)
            .map_err(|e| fail(format!("response does not match analysis schema: {}", e)))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt ceiling is reached. The last error is returned unchanged.
    pub async fn execute_with_retry<T, F, Fut>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(provider = %self.provider_name, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt >= max_attempts || !error.is_retryable() {
                        warn!(
                            provider = %self.provider_name,
                            attempt,
                            kind = %error.kind(),
                            "Giving up: {}",
                            error
                        );
                        return Err(error);
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        provider = %self.provider_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable failure: {}",
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn push_list(prompt: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "## {}", heading);
    for item in items {
        let _ = writeln!(prompt, "- {}", item);
    }
    prompt.push('\n');
}

fn check_score(value: &Value, field: &str) -> Result<(), String> {
    let score = value
        .as_f64()
        .ok_or_else(|| format!("{} must be a number", field))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(format!("{} must be between 0 and 100, got {}", field, score));
    }
    Ok(())
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::error::ProviderErrorKind;
    use crate::analysis::types::{Difficulty, ProblemContext, TechnicalParameter};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn base() -> BaseProvider {
        BaseProvider::new(
            "test",
            RetryConfig {
                max_attempts: 2,
                retry_delay_base_ms: 1,
            },
        )
    }

    fn valid_payload() -> Value {
        json!({
            "overallScore": 72,
            "aiConfidence": 80,
            "summary": "ok",
            "evaluatedParameters": [
                { "name": "Correctness", "score": 90, "justification": "returns 1" }
            ],
            "feedback": {
                "strengths": ["clear"],
                "areasForImprovement": [],
                "suggestions": ["add tests"]
            }
        })
    }

    #[test]
    fn test_validation_accepts_valid_payload() {
        let result = base().validate_response(valid_payload()).unwrap();
        assert_eq!(result.overall_score, 72.0);
        assert_eq!(result.evaluated_parameters.len(), 1);
        assert_eq!(result.feedback.suggestions, vec!["add tests".to_string()]);
    }

    #[test]
    fn test_validation_rejects_missing_fields() {
        for field in [
            "overallScore",
            "aiConfidence",
            "summary",
            "evaluatedParameters",
            "feedback",
        ] {
            let mut payload = valid_payload();
            payload.as_object_mut().unwrap().remove(field);
            let error = base().validate_response(payload).unwrap_err();
            assert_eq!(error.kind(), ProviderErrorKind::ResponseParsing, "{field}");
            assert!(error.message().contains(field));
        }
    }

    #[test]
    fn test_validation_rejects_out_of_range_scores() {
        let mut payload = valid_payload();
        payload["overallScore"] = json!(101);
        assert!(base().validate_response(payload).is_err());

        let mut payload = valid_payload();
        payload["aiConfidence"] = json!(-1);
        assert!(base().validate_response(payload).is_err());

        let mut payload = valid_payload();
        payload["evaluatedParameters"][0]["score"] = json!(140);
        assert!(base().validate_response(payload).is_err());

        let mut payload = valid_payload();
        payload["overallScore"] = json!("72");
        assert!(base().validate_response(payload).is_err());
    }

    #[test]
    fn test_validation_rejects_non_array_lists() {
        let mut payload = valid_payload();
        payload["evaluatedParameters"] = json!({});
        assert!(base().validate_response(payload).is_err());

        for list in ["strengths", "areasForImprovement", "suggestions"] {
            let mut payload = valid_payload();
            payload["feedback"][list] = json!("not a list");
            let error = base().validate_response(payload).unwrap_err();
            assert!(!error.is_retryable());

            let mut payload = valid_payload();
            payload["feedback"].as_object_mut().unwrap().remove(list);
            assert!(base().validate_response(payload).is_err());
        }
    }

    #[test]
    fn test_validation_rejects_blank_summary() {
        let mut payload = valid_payload();
        payload["summary"] = json!("   ");
        assert!(base().validate_response(payload).is_err());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_response_handles_fenced_json() {
        let raw = format!("```json\n{}\n```", valid_payload());
        assert!(base().parse_response(&raw).is_ok());

        let error = base().parse_response("I cannot answer that").unwrap_err();
        assert_eq!(error.kind(), ProviderErrorKind::ResponseParsing);
    }

    #[test]
    fn test_prompt_is_deterministic_and_complete() {
        let problem = ProblemContext {
            title: "Constant".to_string(),
            description: "Return one".to_string(),
            expected_outcome: "1".to_string(),
            difficulty: Difficulty::Easy,
            tags: ["math".to_string(), "basics".to_string()].into_iter().collect(),
            functional_requirements: vec!["returns 1".to_string()],
            non_functional_requirements: vec!["O(1)".to_string()],
            constraints: vec!["no globals".to_string()],
        };
        let request = AnalysisRequest::new(problem, "function f(){return 1}")
            .with_documents(vec!["Style guide".to_string()])
            .with_parameters(vec![TechnicalParameter::new("Readability")]);

        let first = base().build_prompt(&request);
        let second = base().build_prompt(&request);
        assert_eq!(first, second);

        for expected in [
            "Difficulty: easy",
            "Tags: basics, math",
            "- returns 1",
            "- O(1)",
            "- no globals",
            "Style guide",
            "- Readability",
            "function f(){return 1}",
            "90-100",
            "0-39",
            "lower aiConfidence",
            "\"areasForImprovement\"",
        ] {
            assert!(first.contains(expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn test_retry_then_success_makes_two_calls() {
        let calls = AtomicU32::new(0);
        let result = base()
            .execute_with_retry(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 1 {
                        Err(ProviderError::from_status("test", 500, "Internal Server Error"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_makes_one_call() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = base()
            .execute_with_retry(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::from_status("test", 401, "bad key")) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ProviderErrorKind::Authentication);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = base()
            .execute_with_retry(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err(ProviderError::timeout("test", format!("attempt {}", attempt)))
                }
            })
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.kind(), ProviderErrorKind::Timeout);
        assert_eq!(error.message(), "attempt 2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
