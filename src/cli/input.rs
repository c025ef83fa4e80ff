//! Loading analysis inputs from disk for the command line.

use crate::analysis::{AnalysisRequest, ProblemContext, TechnicalParameter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Solution file {0} is empty")]
    EmptySolution(PathBuf),
}

pub struct InputLoader;

impl InputLoader {
    /// Build an [`AnalysisRequest`] from the files named on the command line
    pub fn load_request(
        problem: &Path,
        solution: &Path,
        documents: &[PathBuf],
        parameters: Option<&Path>,
    ) -> Result<AnalysisRequest, InputError> {
        let problem: ProblemContext = Self::read_json(problem)?;

        let solution_text = Self::read_text(solution)?;
        if solution_text.trim().is_empty() {
            return Err(InputError::EmptySolution(solution.to_path_buf()));
        }

        let documents = documents
            .iter()
            .map(|path| Self::read_text(path))
            .collect::<Result<Vec<_>, _>>()?;

        let parameters: Vec<TechnicalParameter> = match parameters {
            Some(path) => Self::read_json(path)?,
            None => Vec::new(),
        };

        debug!(
            documents = documents.len(),
            parameters = parameters.len(),
            "Loaded analysis inputs"
        );

        Ok(AnalysisRequest::new(problem, solution_text)
            .with_documents(documents)
            .with_parameters(parameters))
    }

    fn read_text(path: &Path) -> Result<String, InputError> {
        fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, InputError> {
        let content = Self::read_text(path)?;
        serde_json::from_str(&content).map_err(|source| InputError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
