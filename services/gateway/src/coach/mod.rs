//! services/gateway/src/coach/mod.rs
//!
//! The coach pipeline: validate, build the prompt, call the provider,
//! repair the reply into JSON, then normalize it into the wire types the
//! journal client consumes. Handlers call the two entry points here and
//! never touch provider output directly.

pub mod extract;
pub mod prompt;
pub mod validate;

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use reading_journal_core::limits::{self, clamp_text};
use reading_journal_core::ports::ChatCompletionService;

use crate::error::GatewayError;
use validate::{GradeAnswer, ValidatedGenerate, ValidatedGrade};

//=========================================================================================
// Wire Response Types
//=========================================================================================

/// One generated study question, as returned to the journal client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub id: String,
    pub question: String,
    pub rubric: String,
}

/// One graded answer, as returned to the journal client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub question_id: String,
    pub score: i64,
    pub feedback: String,
    pub ideal_answer: String,
}

//=========================================================================================
// Entry Points
//=========================================================================================

pub async fn generate_questions(
    service: &dyn ChatCompletionService,
    input: &ValidatedGenerate,
) -> Result<Vec<GeneratedQuestion>, GatewayError> {
    let prompt = prompt::build_generate_prompt(input);
    let reply = service.complete(&prompt).await?;
    let value = parse_provider_json(&reply)?;
    normalize_questions(&value, input.count)
}

pub async fn grade_answers(
    service: &dyn ChatCompletionService,
    input: &ValidatedGrade,
) -> Result<Vec<GradeResult>, GatewayError> {
    let prompt = prompt::build_grade_prompt(input);
    let reply = service.complete(&prompt).await?;
    let value = parse_provider_json(&reply)?;
    normalize_grades(&value, &input.answers)
}

fn parse_provider_json(reply: &str) -> Result<Value, GatewayError> {
    extract::extract_json(reply).map_err(|err| GatewayError::Upstream {
        status: None,
        message: err.to_string(),
    })
}

//=========================================================================================
// Output Normalization
//=========================================================================================

/// Tidies a provider's question payload. Rows with blank question text are
/// dropped, text fields are clamped, ids are deduplicated (synthesizing a
/// `q<n>` id where the provider omitted or repeated one) and the set is
/// capped at the requested count.
fn normalize_questions(
    value: &Value,
    count: usize,
) -> Result<Vec<GeneratedQuestion>, GatewayError> {
    let rows = value
        .get("questions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut used_ids: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::new();
    for row in rows {
        if out.len() == count {
            break;
        }
        let question = row
            .get("question")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        if question.is_empty() {
            continue;
        }
        let id = match id_of(row) {
            Some(id) if !used_ids.contains(&id) => id,
            _ => synthesize_id(&used_ids, out.len() + 1),
        };
        used_ids.insert(id.clone());
        let rubric = row
            .get("rubric")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        out.push(GeneratedQuestion {
            id,
            question: clamp_text(question, limits::QUESTION_TEXT_MAX),
            rubric: clamp_text(rubric, limits::RUBRIC_MAX),
        });
    }

    if out.is_empty() {
        return Err(GatewayError::Upstream {
            status: None,
            message: "provider returned no usable questions".to_string(),
        });
    }
    Ok(out)
}

/// Keeps the first result row for each requested answer, in request order.
/// Rows naming a questionId that was never asked about are dropped.
fn normalize_grades(
    value: &Value,
    answers: &[GradeAnswer],
) -> Result<Vec<GradeResult>, GatewayError> {
    let rows = value
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut out = Vec::new();
    for answer in answers {
        let matching = rows.iter().find(|row| {
            row.get("questionId")
                .and_then(Value::as_str)
                .map(str::trim)
                == Some(answer.question_id.as_str())
        });
        let Some(row) = matching else {
            continue;
        };
        out.push(GradeResult {
            question_id: answer.question_id.clone(),
            score: score_of(row.get("score")),
            feedback: clamped_field(row, "feedback", limits::FEEDBACK_MAX),
            ideal_answer: clamped_field(row, "idealAnswer", limits::IDEAL_ANSWER_MAX),
        });
    }

    if out.is_empty() {
        return Err(GatewayError::Upstream {
            status: None,
            message: "provider returned no usable results".to_string(),
        });
    }
    Ok(out)
}

/// A provider id may arrive as a string or as a bare number.
fn id_of(row: &Value) -> Option<String> {
    let id = match row.get("id") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return None,
    };
    if id.is_empty() {
        None
    } else {
        Some(clamp_text(&id, limits::QUESTION_ID_MAX))
    }
}

fn synthesize_id(used: &BTreeSet<String>, start: usize) -> String {
    let mut n = start;
    loop {
        let candidate = format!("q{n}");
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Scores arrive as numbers when the provider behaves and as strings when
/// it does not. Anything unreadable is zero.
fn score_of(raw: Option<&Value>) -> i64 {
    let score = match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    limits::clamp_score(score)
}

fn clamped_field(row: &Value, key: &str, max: usize) -> String {
    let text = row
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    clamp_text(text, max)
}
