//! services/gateway/src/coach/validate.rs
//!
//! Turns untrusted request payloads into validated, clamped coach inputs.
//! Everything here runs before a provider is contacted; a request that
//! fails validation never costs an upstream call.

use serde::Deserialize;
use utoipa::ToSchema;

use reading_journal_core::domain::{Difficulty, QuestionStyle};
use reading_journal_core::limits::{self, clamp_text};

use crate::adapters::Provider;
use crate::config::Config;
use crate::error::GatewayError;

//=========================================================================================
// Wire Request Types
//=========================================================================================

/// Request payload for `POST /api/ai/generate-questions`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub book: Option<BookContext>,
    pub chapter: Option<ChapterContext>,
    pub count: Option<i64>,
    pub difficulty: Option<String>,
    pub style: Option<String>,
}

/// Request payload for `POST /api/ai/grade`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub book: Option<BookContext>,
    pub chapter: Option<ChapterContext>,
    pub answers: Option<Vec<AnswerItem>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookContext {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContext {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub takeaways: String,
    #[serde(default)]
    pub reflection: String,
}

/// One answer row of a grade request. Rows missing any field are
/// discarded rather than failing the whole request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub question_id: Option<String>,
    pub question: Option<String>,
    pub student_answer: Option<String>,
}

//=========================================================================================
// Validated Types
//=========================================================================================

/// The provider a validated request will be dispatched to. Cloud targets
/// always carry a resolved API key by the time this exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTarget {
    pub provider: Provider,
    pub model: String,
    /// Only meaningful for the local provider.
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Book and chapter context after clamping. Missing wire objects read as
/// all-empty context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoachContext {
    pub book_title: String,
    pub book_author: String,
    pub chapter_label: String,
    pub summary: String,
    pub takeaways: String,
    pub reflection: String,
}

#[derive(Debug)]
pub struct ValidatedGenerate {
    pub target: ProviderTarget,
    pub context: CoachContext,
    pub count: usize,
    pub difficulty: Difficulty,
    pub style: QuestionStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeAnswer {
    pub question_id: String,
    pub question: String,
    pub student_answer: String,
}

#[derive(Debug)]
pub struct ValidatedGrade {
    pub target: ProviderTarget,
    pub context: CoachContext,
    pub answers: Vec<GradeAnswer>,
}

//=========================================================================================
// Validation Entry Points
//=========================================================================================

pub fn validate_generate(
    request: GenerateQuestionsRequest,
    header_api_key: Option<String>,
    config: &Config,
) -> Result<ValidatedGenerate, GatewayError> {
    let target = resolve_target(
        request.provider.as_deref(),
        request.model.as_deref(),
        request.base_url.as_deref(),
        header_api_key,
        config,
    )?;
    let context = clamp_context(request.book, request.chapter);
    let count = request
        .count
        .unwrap_or(limits::QUESTION_COUNT_DEFAULT)
        .clamp(limits::QUESTION_COUNT_MIN, limits::QUESTION_COUNT_MAX) as usize;
    let difficulty = request
        .difficulty
        .as_deref()
        .map(Difficulty::parse_lenient)
        .unwrap_or_default();
    let style = request
        .style
        .as_deref()
        .map(QuestionStyle::parse_lenient)
        .unwrap_or_default();

    Ok(ValidatedGenerate {
        target,
        context,
        count,
        difficulty,
        style,
    })
}

pub fn validate_grade(
    request: GradeRequest,
    header_api_key: Option<String>,
    config: &Config,
) -> Result<ValidatedGrade, GatewayError> {
    let target = resolve_target(
        request.provider.as_deref(),
        request.model.as_deref(),
        request.base_url.as_deref(),
        header_api_key,
        config,
    )?;
    let context = clamp_context(request.book, request.chapter);
    let answers = validate_answers(request.answers.unwrap_or_default())?;

    Ok(ValidatedGrade {
        target,
        context,
        answers,
    })
}

//=========================================================================================
// Pieces
//=========================================================================================

fn resolve_target(
    provider: Option<&str>,
    model: Option<&str>,
    base_url: Option<&str>,
    header_api_key: Option<String>,
    config: &Config,
) -> Result<ProviderTarget, GatewayError> {
    let provider_raw = provider.map(str::trim).unwrap_or("");
    let provider = Provider::parse(provider_raw).ok_or_else(|| {
        GatewayError::InvalidRequest(format!(
            "provider must be one of 'local', 'openai' or 'anthropic', got '{provider_raw}'"
        ))
    })?;

    let model = resolve_model(model, provider, config)?;
    let base_url = match provider {
        Provider::Local => resolve_base_url(base_url, config)?,
        // The cloud adapters know their own endpoints.
        Provider::OpenAi | Provider::Anthropic => String::new(),
    };
    let api_key = resolve_api_key(provider, header_api_key, config)?;

    Ok(ProviderTarget {
        provider,
        model,
        base_url,
        api_key,
    })
}

/// A blank model resolves to the provider's configured default; anything
/// else must look like a model identifier.
fn resolve_model(
    raw: Option<&str>,
    provider: Provider,
    config: &Config,
) -> Result<String, GatewayError> {
    let trimmed = raw.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return Ok(match provider {
            Provider::Local => config.local_model.clone(),
            Provider::OpenAi => config.openai_model.clone(),
            Provider::Anthropic => config.anthropic_model.clone(),
        });
    }
    let well_formed = trimmed.chars().count() <= limits::MODEL_NAME_MAX
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | ':' | '-'));
    if !well_formed {
        return Err(GatewayError::InvalidRequest(format!(
            "model may only contain letters, digits, '.', '/', ':' and '-' (max {} chars)",
            limits::MODEL_NAME_MAX
        )));
    }
    Ok(trimmed.to_string())
}

/// The local provider's base URL: the request value wins over the
/// configured default, and either way it must be an http(s) URL.
fn resolve_base_url(raw: Option<&str>, config: &Config) -> Result<String, GatewayError> {
    let candidate = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&config.local_base_url);
    if candidate.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "missing baseUrl for the local provider".to_string(),
        ));
    }
    let parsed = reqwest::Url::parse(candidate).map_err(|_| {
        GatewayError::InvalidRequest("baseUrl must be a valid http or https URL".to_string())
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(GatewayError::InvalidRequest(
            "baseUrl must be a valid http or https URL".to_string(),
        ));
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

/// Cloud keys: the x-api-key header wins over the configured value.
/// A missing key is the caller's problem (400), not a server fault.
fn resolve_api_key(
    provider: Provider,
    header_api_key: Option<String>,
    config: &Config,
) -> Result<Option<String>, GatewayError> {
    let configured = match provider {
        Provider::Local => return Ok(None),
        Provider::OpenAi => config.openai_api_key.as_ref(),
        Provider::Anthropic => config.anthropic_api_key.as_ref(),
    };
    let key = header_api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| configured.cloned());
    match key {
        Some(key) => Ok(Some(key)),
        None => Err(GatewayError::InvalidRequest(format!(
            "missing API key for the {} provider",
            provider.id()
        ))),
    }
}

fn clamp_context(book: Option<BookContext>, chapter: Option<ChapterContext>) -> CoachContext {
    let book = book.unwrap_or_default();
    let chapter = chapter.unwrap_or_default();
    CoachContext {
        book_title: clamp_text(book.title.trim(), limits::BOOK_TITLE_MAX),
        book_author: clamp_text(book.author.trim(), limits::BOOK_AUTHOR_MAX),
        chapter_label: clamp_text(chapter.label.trim(), limits::CHAPTER_LABEL_MAX),
        summary: clamp_text(&chapter.summary, limits::CHAPTER_SUMMARY_MAX),
        takeaways: clamp_text(&chapter.takeaways, limits::CHAPTER_TAKEAWAYS_MAX),
        reflection: clamp_text(&chapter.reflection, limits::CHAPTER_REFLECTION_MAX),
    }
}

/// Incomplete rows are discarded (blank counts as missing), survivors are
/// clamped, the list is capped, and an empty result is a client error.
fn validate_answers(rows: Vec<AnswerItem>) -> Result<Vec<GradeAnswer>, GatewayError> {
    let mut answers = Vec::new();
    for row in rows {
        let Some(question_id) = nonblank(row.question_id) else {
            continue;
        };
        let Some(question) = nonblank(row.question) else {
            continue;
        };
        let Some(student_answer) = nonblank(row.student_answer) else {
            continue;
        };
        answers.push(GradeAnswer {
            question_id: clamp_text(&question_id, limits::QUESTION_ID_MAX),
            question: clamp_text(&question, limits::QA_QUESTION_MAX),
            student_answer: clamp_text(&student_answer, limits::QA_ANSWER_MAX),
        });
        if answers.len() == limits::ANSWERS_PER_REQUEST_MAX {
            break;
        }
    }
    if answers.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "answers must contain at least one complete row".to_string(),
        ));
    }
    Ok(answers)
}

fn nonblank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:8787".parse().unwrap(),
            log_level: tracing::Level::INFO,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            rate_limit_max_requests: 40,
            rate_limit_window: Duration::from_secs(60),
            openai_api_key: None,
            anthropic_api_key: Some("env-anthropic-key".to_string()),
            local_base_url: "http://127.0.0.1:11434".to_string(),
            local_model: "llama3.1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            anthropic_model: "claude-3-5-haiku-latest".to_string(),
        }
    }

    fn generate_request(provider: &str) -> GenerateQuestionsRequest {
        GenerateQuestionsRequest {
            provider: Some(provider.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_providers_are_rejected() {
        let err = validate_generate(generate_request("gemini"), None, &test_config()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert!(err.to_string().contains("gemini"));

        let err = validate_generate(
            GenerateQuestionsRequest::default(),
            None,
            &test_config(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn blank_model_resolves_to_the_provider_default() {
        let validated =
            validate_generate(generate_request("local"), None, &test_config()).unwrap();
        assert_eq!(validated.target.model, "llama3.1");

        let mut request = generate_request("anthropic");
        request.model = Some("   ".to_string());
        let validated = validate_generate(request, None, &test_config()).unwrap();
        assert_eq!(validated.target.model, "claude-3-5-haiku-latest");
    }

    #[test]
    fn model_names_are_checked_for_shape() {
        let mut request = generate_request("local");
        request.model = Some("llama3.1:8b-instruct".to_string());
        assert!(validate_generate(request, None, &test_config()).is_ok());

        let mut request = generate_request("local");
        request.model = Some("bad model name!".to_string());
        let err = validate_generate(request, None, &test_config()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));

        let mut request = generate_request("local");
        request.model = Some("x".repeat(limits::MODEL_NAME_MAX + 1));
        assert!(validate_generate(request, None, &test_config()).is_err());
    }

    #[test]
    fn local_base_url_overrides_and_is_validated() {
        // Missing baseUrl falls back to the configured default.
        let validated =
            validate_generate(generate_request("local"), None, &test_config()).unwrap();
        assert_eq!(validated.target.base_url, "http://127.0.0.1:11434");

        let mut request = generate_request("local");
        request.base_url = Some("http://192.168.1.20:11434/".to_string());
        let validated = validate_generate(request, None, &test_config()).unwrap();
        assert_eq!(validated.target.base_url, "http://192.168.1.20:11434");

        let mut request = generate_request("local");
        request.base_url = Some("ftp://192.168.1.20".to_string());
        assert!(validate_generate(request, None, &test_config()).is_err());

        let mut request = generate_request("local");
        request.base_url = Some("not a url".to_string());
        assert!(validate_generate(request, None, &test_config()).is_err());
    }

    #[test]
    fn cloud_keys_resolve_header_first() {
        // Header key wins over the configured one.
        let validated = validate_generate(
            generate_request("anthropic"),
            Some("header-key".to_string()),
            &test_config(),
        )
        .unwrap();
        assert_eq!(validated.target.api_key.as_deref(), Some("header-key"));

        // No header falls back to the env key.
        let validated =
            validate_generate(generate_request("anthropic"), None, &test_config()).unwrap();
        assert_eq!(
            validated.target.api_key.as_deref(),
            Some("env-anthropic-key")
        );

        // OpenAI has neither configured here: a client error, not a 500.
        let err = validate_generate(generate_request("openai"), None, &test_config()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));

        // The local provider needs no key at all.
        let validated =
            validate_generate(generate_request("local"), None, &test_config()).unwrap();
        assert_eq!(validated.target.api_key, None);
    }

    #[test]
    fn count_is_clamped_into_range() {
        let config = test_config();
        let mut request = generate_request("local");
        request.count = None;
        assert_eq!(validate_generate(request, None, &config).unwrap().count, 6);

        let mut request = generate_request("local");
        request.count = Some(50);
        assert_eq!(validate_generate(request, None, &config).unwrap().count, 15);

        let mut request = generate_request("local");
        request.count = Some(-2);
        assert_eq!(validate_generate(request, None, &config).unwrap().count, 1);
    }

    #[test]
    fn difficulty_and_style_parse_leniently() {
        let config = test_config();
        let mut request = generate_request("local");
        request.difficulty = Some("hard".to_string());
        request.style = Some("critical_thinking".to_string());
        let validated = validate_generate(request, None, &config).unwrap();
        assert_eq!(validated.difficulty, Difficulty::Hard);
        assert_eq!(validated.style, QuestionStyle::CriticalThinking);

        let mut request = generate_request("local");
        request.difficulty = Some("brutal".to_string());
        request.style = Some("freeform".to_string());
        let validated = validate_generate(request, None, &config).unwrap();
        assert_eq!(validated.difficulty, Difficulty::Mixed);
        assert_eq!(validated.style, QuestionStyle::Comprehension);
    }

    #[test]
    fn context_is_clamped_and_defaults_to_empty() {
        let config = test_config();
        let mut request = generate_request("local");
        request.book = Some(BookContext {
            title: format!("  {}  ", "t".repeat(limits::BOOK_TITLE_MAX + 10)),
            author: "Frank Herbert".to_string(),
        });
        let validated = validate_generate(request, None, &config).unwrap();
        assert_eq!(
            validated.context.book_title.chars().count(),
            limits::BOOK_TITLE_MAX
        );
        assert_eq!(validated.context.book_author, "Frank Herbert");
        // Chapter was absent entirely.
        assert_eq!(validated.context.chapter_label, "");
        assert_eq!(validated.context.summary, "");
    }

    #[test]
    fn grade_answers_are_filtered_clamped_and_capped() {
        let config = test_config();
        let mut rows: Vec<AnswerItem> = vec![
            AnswerItem {
                question_id: Some("q1".to_string()),
                question: Some("Why?".to_string()),
                student_answer: Some("  Because.  ".to_string()),
            },
            // Missing pieces: all three dropped silently.
            AnswerItem {
                question_id: Some("q2".to_string()),
                question: None,
                student_answer: Some("a".to_string()),
            },
            AnswerItem {
                question_id: Some("   ".to_string()),
                question: Some("?".to_string()),
                student_answer: Some("a".to_string()),
            },
            AnswerItem::default(),
        ];
        for i in 0..30 {
            rows.push(AnswerItem {
                question_id: Some(format!("extra-{i}")),
                question: Some("?".to_string()),
                student_answer: Some("a".to_string()),
            });
        }

        let request = GradeRequest {
            provider: Some("local".to_string()),
            answers: Some(rows),
            ..Default::default()
        };
        let validated = validate_grade(request, None, &config).unwrap();
        assert_eq!(validated.answers.len(), limits::ANSWERS_PER_REQUEST_MAX);
        assert_eq!(validated.answers[0].question_id, "q1");
        assert_eq!(validated.answers[0].student_answer, "Because.");
        assert_eq!(validated.answers[1].question_id, "extra-0");
    }

    #[test]
    fn a_grade_request_with_no_usable_answers_is_rejected() {
        let config = test_config();
        let request = GradeRequest {
            provider: Some("local".to_string()),
            answers: Some(vec![AnswerItem::default()]),
            ..Default::default()
        };
        let err = validate_grade(request, None, &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "answers must contain at least one complete row"
        );

        let request = GradeRequest {
            provider: Some("local".to_string()),
            answers: None,
            ..Default::default()
        };
        assert!(validate_grade(request, None, &config).is_err());
    }
}
