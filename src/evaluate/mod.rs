#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Chat-completion backend built on `async-openai`
pub mod openai;
/// Grading instruction construction
pub mod prompt;

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    constants::PROMPT_TRUNCATE,
    rubric::RubricRow,
    types::{Submission, Verdict},
};

/// Why a submission could not be evaluated. Every variant ends in the
/// fallback verdict; the split exists so callers and tests can tell them apart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The request never produced a response (network, timeout, TLS).
    #[error("Could not reach the model service: {0}")]
    Transport(String),
    /// The service answered with an error (quota, auth, bad request).
    #[error("Model service rejected the request: {0}")]
    Service(String),
    /// The service answered without any content.
    #[error("Model service returned an empty reply")]
    EmptyResponse,
    /// The reply did not match the expected JSON shape.
    #[error("Model reply was malformed ({reason}): {content}")]
    Malformed {
        /// what was wrong
        reason:  String,
        /// raw reply
        content: String,
    },
}

/// A language-model endpoint that turns one prompt into one reply.
pub trait CompletionService {
    /// Sends `prompt` as a single user message and returns the reply text.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, EvaluationError>>;
}

/// What the model said about a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// RA found in the submission.
    pub registration_id: Option<String>,
    /// Student name found in the submission.
    pub student_name:    Option<String>,
    /// Assigned label.
    pub verdict:         Verdict,
}

/// Result of evaluating a submission: either the model's assessment or the
/// fallback, with the reason it was needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The model replied with a valid assessment.
    Assessed(Assessment),
    /// The model could not be used; the verdict is [`Verdict::FALLBACK`].
    Fallback(EvaluationError),
}

impl Evaluation {
    /// Verdict to record.
    pub fn verdict(&self) -> Verdict {
        match self {
            Evaluation::Assessed(assessment) => assessment.verdict,
            Evaluation::Fallback(_) => Verdict::FALLBACK,
        }
    }

    /// RA, when the model found one.
    pub fn registration_id(&self) -> Option<&str> {
        match self {
            Evaluation::Assessed(assessment) => assessment.registration_id.as_deref(),
            Evaluation::Fallback(_) => None,
        }
    }

    /// Student name, when the model found one.
    pub fn student_name(&self) -> Option<&str> {
        match self {
            Evaluation::Assessed(assessment) => assessment.student_name.as_deref(),
            Evaluation::Fallback(_) => None,
        }
    }

    /// Whether the fallback verdict was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Evaluation::Fallback(_))
    }
}

/// Grades submission text against the active rubric.
pub struct Evaluator<C> {
    /// Backend used for every request.
    service:       C,
    /// Maximum submission characters embedded in the prompt.
    prompt_budget: usize,
}

impl<C: CompletionService> Evaluator<C> {
    /// Creates an evaluator over `service`.
    pub fn new(service: C) -> Self {
        Self {
            service,
            prompt_budget: PROMPT_TRUNCATE,
        }
    }

    /// Overrides how many characters of submission text reach the prompt.
    pub fn with_prompt_budget(mut self, budget: usize) -> Self {
        self.prompt_budget = budget;
        self
    }

    /// Returns the backend.
    pub fn service(&self) -> &C {
        &self.service
    }

    /// One request, no retry. Errors are returned as is.
    pub async fn try_evaluate(
        &self,
        text: &str,
        rubric: &RubricRow,
    ) -> Result<Assessment, EvaluationError> {
        let prompt = prompt::build_prompt(text, rubric, self.prompt_budget);
        let reply = self.service.complete(&prompt).await?;
        parse_assessment(&reply)
    }

    /// Evaluates `submission`, logging any failure and falling back to
    /// [`Verdict::FALLBACK`] so the batch can continue.
    pub async fn evaluate(&self, submission: &Submission, rubric: &RubricRow) -> Evaluation {
        match self.try_evaluate(&submission.text, rubric).await {
            Ok(assessment) => {
                tracing::info!("{} graded {}", submission.file_name, assessment.verdict);
                Evaluation::Assessed(assessment)
            }
            Err(err) => {
                tracing::warn!(
                    "Evaluation of {} failed, using {}: {err}",
                    submission.file_name,
                    Verdict::FALLBACK
                );
                Evaluation::Fallback(err)
            }
        }
    }
}

/// Validates a model reply.
///
/// The reply must contain a JSON object with the keys `ra`, `aluno` and
/// `resultado` (any case). Text around the object, such as a code fence, is
/// ignored. Blank `ra`/`aluno` values become `None`.
pub fn parse_assessment(reply: &str) -> Result<Assessment, EvaluationError> {
    let malformed = |reason: String| EvaluationError::Malformed {
        reason,
        content: reply.to_string(),
    };

    let start = reply
        .find('{')
        .ok_or_else(|| malformed("no JSON object".to_string()))?;
    let end = reply
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| malformed("no JSON object".to_string()))?;

    let object: serde_json::Map<String, Value> =
        serde_json::from_str(&reply[start..=end]).map_err(|e| malformed(e.to_string()))?;
    let fields: HashMap<String, Value> = object
        .into_iter()
        .map(|(key, value)| (key.trim().to_lowercase(), value))
        .collect();
    let field = |key: &str| {
        fields
            .get(key)
            .ok_or_else(|| malformed(format!("missing `{key}`")))
    };

    let verdict = match field("resultado")? {
        Value::String(label) => label
            .parse::<Verdict>()
            .map_err(|e| malformed(e.to_string()))?,
        other => return Err(malformed(format!("`resultado` is not text: {other}"))),
    };

    Ok(Assessment {
        registration_id: value_text(field("ra")?),
        student_name: value_text(field("aluno")?),
        verdict,
    })
}

/// Text of a JSON scalar, `None` for blanks, nulls and containers.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
