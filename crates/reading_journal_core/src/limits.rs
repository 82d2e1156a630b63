//! crates/reading_journal_core/src/limits.rs
//!
//! Field size limits shared by the journal store, the load-time normalizer
//! and the gateway's request validation. Limits are counted in characters,
//! not bytes, so clamping never splits a multi-byte character.

pub const BOOK_TITLE_MAX: usize = 300;
pub const BOOK_AUTHOR_MAX: usize = 300;
pub const BOOK_GENRE_MAX: usize = 120;
pub const BOOK_COVER_URL_MAX: usize = 2_000;

pub const CHAPTER_LABEL_MAX: usize = 300;
pub const CHAPTER_SUMMARY_MAX: usize = 7_000;
pub const CHAPTER_TAKEAWAYS_MAX: usize = 5_000;
pub const CHAPTER_QUOTES_MAX: usize = 5_000;
pub const CHAPTER_REFLECTION_MAX: usize = 5_000;

pub const QA_QUESTION_MAX: usize = 700;
pub const QA_ANSWER_MAX: usize = 10_000;

pub const HISTORY_LABEL_MAX: usize = 300;

pub const USER_NAME_MAX: usize = 120;

// Coach-side limits, applied both to provider output and to persisted
// coach artifacts.
pub const QUESTION_TEXT_MAX: usize = 500;
pub const QUESTION_ID_MAX: usize = 120;
pub const RUBRIC_MAX: usize = 2_000;
pub const FEEDBACK_MAX: usize = 2_000;
pub const IDEAL_ANSWER_MAX: usize = 2_000;
pub const MODEL_NAME_MAX: usize = 120;

pub const ANSWERS_PER_REQUEST_MAX: usize = 20;
pub const QUESTION_COUNT_MIN: i64 = 1;
pub const QUESTION_COUNT_MAX: i64 = 15;
pub const QUESTION_COUNT_DEFAULT: i64 = 6;

pub const FEEDBACK_HISTORY_MAX: usize = 500;

pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 100;

/// Truncates `raw` to at most `max` characters.
pub fn clamp_text(raw: &str, max: usize) -> String {
    if raw.chars().count() <= max {
        raw.to_string()
    } else {
        raw.chars().take(max).collect()
    }
}

/// Rounds a raw score to the nearest integer (half away from zero) and
/// clamps it into the 0..=100 range.
pub fn clamp_score(raw: f64) -> i64 {
    (raw.round() as i64).clamp(SCORE_MIN, SCORE_MAX)
}
