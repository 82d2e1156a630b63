//! crates/reading_journal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the reading journal.
//! These structs are independent of any storage backend; their serde shapes
//! are exactly what gets persisted inside the per-user journal blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reading status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    InProgress,
    Completed,
    Abandoned,
}

impl BookStatus {
    /// Parses a stored status string, falling back to the default on
    /// anything unrecognized.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "abandoned" => Self::Abandoned,
            _ => Self::default(),
        }
    }
}

/// A book the user is journaling about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A journaled chapter of a book. All free-text fields are kept clamped
/// to the limits in [`crate::limits`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterEntry {
    pub id: String,
    pub book_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub summary: String,
    pub takeaways: String,
    pub quotes: String,
    pub reflection: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChapterEntry {
    /// Human-readable label for this chapter, used in prompts and history.
    pub fn display_label(&self) -> String {
        if let Some(title) = &self.title {
            if !title.trim().is_empty() {
                return title.clone();
            }
        }
        match self.number {
            Some(n) => format!("Chapter {n}"),
            None => "Untitled chapter".to_string(),
        }
    }
}

/// A user-written question-and-answer pair attached to a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qa {
    pub id: String,
    pub chapter_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The closed set of history event kinds. Events with an unknown kind are
/// dropped when a journal blob is loaded, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventKind {
    BookAdded,
    BookUpdated,
    BookDeleted,
    BookCompleted,
    ChapterAdded,
    ChapterUpdated,
    ChapterDeleted,
    QaAdded,
    QaUpdated,
    QaDeleted,
    AiQuestionsGenerated,
    AiAnswersGraded,
}

impl HistoryEventKind {
    pub fn parse_strict(raw: &str) -> Option<Self> {
        match raw {
            "book_added" => Some(Self::BookAdded),
            "book_updated" => Some(Self::BookUpdated),
            "book_deleted" => Some(Self::BookDeleted),
            "book_completed" => Some(Self::BookCompleted),
            "chapter_added" => Some(Self::ChapterAdded),
            "chapter_updated" => Some(Self::ChapterUpdated),
            "chapter_deleted" => Some(Self::ChapterDeleted),
            "qa_added" => Some(Self::QaAdded),
            "qa_updated" => Some(Self::QaUpdated),
            "qa_deleted" => Some(Self::QaDeleted),
            "ai_questions_generated" => Some(Self::AiQuestionsGenerated),
            "ai_answers_graded" => Some(Self::AiAnswersGraded),
            _ => None,
        }
    }
}

/// One append-only activity log entry. Events may outlive the entities
/// they point at; the entity id fields are not re-validated on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HistoryEventKind,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qa_id: Option<String>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Requested difficulty for generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Mixed,
}

impl Difficulty {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            "mixed" => Self::Mixed,
            _ => Self::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Mixed => "mixed",
        }
    }
}

/// Requested style for generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStyle {
    #[default]
    Comprehension,
    CriticalThinking,
    Mixed,
}

impl QuestionStyle {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "comprehension" => Self::Comprehension,
            "critical_thinking" => Self::CriticalThinking,
            "mixed" => Self::Mixed,
            _ => Self::default(),
        }
    }
}

/// A coach-generated question stored against a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiGeneratedQuestion {
    pub id: String,
    pub chapter_id: String,
    pub question: String,
    pub rubric: String,
    pub difficulty: Difficulty,
    pub style: QuestionStyle,
    pub created_at: DateTime<Utc>,
}

/// One graded answer inside a feedback entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiGradeResult {
    pub question_id: String,
    pub question: String,
    pub student_answer: String,
    pub score: i64,
    pub feedback: String,
    pub ideal_answer: String,
}

/// One grading round: the results the coach returned for a chapter,
/// plus the recomputed average score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiFeedbackEntry {
    pub id: String,
    pub book_id: String,
    pub chapter_id: String,
    pub difficulty: Difficulty,
    pub style: QuestionStyle,
    pub average_score: i64,
    pub results: Vec<AiGradeResult>,
    pub created_at: DateTime<Utc>,
}

/// Everything the coach feature keeps per user. Draft answers are keyed
/// chapter id -> question id -> answer text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachState {
    pub generated_questions: Vec<AiGeneratedQuestion>,
    pub draft_answers: BTreeMap<String, BTreeMap<String, String>>,
    pub feedback_history: Vec<AiFeedbackEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_book_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_chapter_id: Option<String>,
}

/// The full journal document persisted per user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalData {
    pub books: Vec<Book>,
    pub chapters: Vec<ChapterEntry>,
    pub qas: Vec<Qa>,
    pub history: Vec<HistoryEvent>,
    pub coach: CoachState,
}

/// An entry in the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// UI color theme, stored per installation rather than per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "light" => Self::Light,
            "dark" => Self::Dark,
            _ => Self::default(),
        }
    }
}
