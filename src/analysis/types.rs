use crate::analysis::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Analysis backends known to the factory registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    #[serde(rename = "openai")]
    OpenAI,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Claude => "claude",
            ProviderId::OpenAI => "openai",
        }
    }

    pub fn all() -> &'static [ProviderId] {
        &[ProviderId::Claude, ProviderId::OpenAI]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderId::Claude),
            "openai" | "gpt" => Ok(ProviderId::OpenAI),
            other => Err(ProviderError::configuration(
                "analysis",
                format!(
                    "analysis provider must be one of {{claude, openai}}, got '{}'",
                    other
                ),
            )),
        }
    }
}

/// Difficulty tier of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of the task a solution was submitted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProblemContext {
    pub title: String,
    pub description: String,
    pub expected_outcome: String,
    pub difficulty: Difficulty,
    pub tags: BTreeSet<String>,
    pub functional_requirements: Vec<String>,
    pub non_functional_requirements: Vec<String>,
    pub constraints: Vec<String>,
}

/// Named dimension the backend scores the solution against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TechnicalParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Everything a provider needs for one analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub id: Uuid,
    pub problem: ProblemContext,
    pub solution: String,
    pub documents: Vec<String>,
    pub parameters: Vec<TechnicalParameter>,
}

impl AnalysisRequest {
    pub fn new(problem: ProblemContext, solution: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem,
            solution: solution.into(),
            documents: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<TechnicalParameter>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedParameter {
    pub name: String,
    pub score: f64,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Validated output of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: f64,
    pub ai_confidence: f64,
    pub summary: String,
    pub evaluated_parameters: Vec<EvaluatedParameter>,
    pub feedback: Feedback,
}
