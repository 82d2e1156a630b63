//! crates/reading_journal_core/src/normalize.rs
//!
//! Turns an untrusted journal blob into well-formed `JournalData`.
//!
//! The normalizer is a pure function over raw JSON: wrong-typed fields are
//! treated as absent, entities that fail their parent checks are dropped,
//! text is clamped and scores are re-clamped. Running it twice gives the
//! same result as running it once, so anything it writes back is stable.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{
    AiFeedbackEntry, AiGeneratedQuestion, AiGradeResult, Book, BookStatus, ChapterEntry,
    CoachState, Difficulty, HistoryEvent, HistoryEventKind, JournalData, Qa, QuestionStyle,
};
use crate::limits::{self, clamp_score, clamp_text};

/// Normalizes a raw journal blob. Never fails: unreadable input collapses
/// to an empty journal.
pub fn normalize(raw: &Value) -> JournalData {
    let books: Vec<Book> = arr(raw, "books").iter().filter_map(book_from_value).collect();
    let book_ids: BTreeSet<String> = books.iter().map(|b| b.id.clone()).collect();

    let chapters: Vec<ChapterEntry> = arr(raw, "chapters")
        .iter()
        .filter_map(chapter_from_value)
        .filter(|c| book_ids.contains(&c.book_id))
        .collect();
    let chapter_ids: BTreeSet<String> = chapters.iter().map(|c| c.id.clone()).collect();

    let qas: Vec<Qa> = arr(raw, "qas")
        .iter()
        .filter_map(qa_from_value)
        .filter(|q| chapter_ids.contains(&q.chapter_id))
        .collect();

    // History events are kept even when the entities they mention are gone.
    let history: Vec<HistoryEvent> = arr(raw, "history")
        .iter()
        .filter_map(history_from_value)
        .collect();

    let coach = coach_from_value(raw.get("coach"), &book_ids, &chapter_ids);

    JournalData {
        books,
        chapters,
        qas,
        history,
        coach,
    }
}

//=========================================================================================
// Field Helpers
//=========================================================================================

fn arr<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Required id: a non-empty string after trimming, or the record is dropped.
fn id_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn text_field(value: &Value, key: &str, max: usize) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| clamp_text(s, max))
        .unwrap_or_default()
}

fn opt_text_field(value: &Value, key: &str, max: usize) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| clamp_text(s, max))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Required timestamp: unparseable or missing values fall back to the Unix
/// epoch so normalization stays deterministic.
fn timestamp_field(value: &Value, key: &str) -> DateTime<Utc> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn opt_timestamp_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
}

//=========================================================================================
// Entity Parsers
//=========================================================================================

fn book_from_value(value: &Value) -> Option<Book> {
    let id = id_field(value, "id")?;
    Some(Book {
        id,
        title: text_field(value, "title", limits::BOOK_TITLE_MAX),
        author: text_field(value, "author", limits::BOOK_AUTHOR_MAX),
        genre: opt_text_field(value, "genre", limits::BOOK_GENRE_MAX),
        cover_url: opt_text_field(value, "coverUrl", limits::BOOK_COVER_URL_MAX),
        started_at: opt_timestamp_field(value, "startedAt"),
        finished_at: opt_timestamp_field(value, "finishedAt"),
        status: value
            .get("status")
            .and_then(Value::as_str)
            .map(BookStatus::parse_lenient)
            .unwrap_or_default(),
        created_at: timestamp_field(value, "createdAt"),
        updated_at: timestamp_field(value, "updatedAt"),
    })
}

fn chapter_from_value(value: &Value) -> Option<ChapterEntry> {
    let id = id_field(value, "id")?;
    let book_id = id_field(value, "bookId")?;
    Some(ChapterEntry {
        id,
        book_id,
        number: value
            .get("number")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        title: opt_text_field(value, "title", limits::CHAPTER_LABEL_MAX),
        completed_at: opt_timestamp_field(value, "completedAt"),
        summary: text_field(value, "summary", limits::CHAPTER_SUMMARY_MAX),
        takeaways: text_field(value, "takeaways", limits::CHAPTER_TAKEAWAYS_MAX),
        quotes: text_field(value, "quotes", limits::CHAPTER_QUOTES_MAX),
        reflection: text_field(value, "reflection", limits::CHAPTER_REFLECTION_MAX),
        created_at: timestamp_field(value, "createdAt"),
        updated_at: timestamp_field(value, "updatedAt"),
    })
}

fn qa_from_value(value: &Value) -> Option<Qa> {
    let id = id_field(value, "id")?;
    let chapter_id = id_field(value, "chapterId")?;
    Some(Qa {
        id,
        chapter_id,
        question: text_field(value, "question", limits::QA_QUESTION_MAX),
        answer: text_field(value, "answer", limits::QA_ANSWER_MAX),
        created_at: timestamp_field(value, "createdAt"),
        updated_at: timestamp_field(value, "updatedAt"),
    })
}

fn history_from_value(value: &Value) -> Option<HistoryEvent> {
    let id = id_field(value, "id")?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(HistoryEventKind::parse_strict)?;
    let metadata = value.get("metadata").and_then(Value::as_object).map(|map| {
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect::<BTreeMap<String, String>>()
    });
    Some(HistoryEvent {
        id,
        kind,
        timestamp: timestamp_field(value, "timestamp"),
        user_id: string_field(value, "userId").unwrap_or_default(),
        book_id: id_field(value, "bookId"),
        chapter_id: id_field(value, "chapterId"),
        qa_id: id_field(value, "qaId"),
        label: text_field(value, "label", limits::HISTORY_LABEL_MAX),
        metadata,
    })
}

//=========================================================================================
// Coach State
//=========================================================================================

fn coach_from_value(
    raw: Option<&Value>,
    book_ids: &BTreeSet<String>,
    chapter_ids: &BTreeSet<String>,
) -> CoachState {
    let Some(raw) = raw else {
        return CoachState::default();
    };

    let generated_questions: Vec<AiGeneratedQuestion> = arr(raw, "generatedQuestions")
        .iter()
        .filter_map(generated_question_from_value)
        .filter(|q| chapter_ids.contains(&q.chapter_id))
        .collect();

    // Draft answers must point at a question that still exists for the
    // same chapter.
    let question_keys: BTreeSet<(String, String)> = generated_questions
        .iter()
        .map(|q| (q.chapter_id.clone(), q.id.clone()))
        .collect();

    let mut draft_answers: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    if let Some(per_chapter) = raw.get("draftAnswers").and_then(Value::as_object) {
        for (chapter_id, questions) in per_chapter {
            if !chapter_ids.contains(chapter_id) {
                continue;
            }
            let Some(questions) = questions.as_object() else {
                continue;
            };
            for (question_id, answer) in questions {
                if !question_keys.contains(&(chapter_id.clone(), question_id.clone())) {
                    continue;
                }
                let Some(answer) = answer.as_str() else {
                    continue;
                };
                if answer.trim().is_empty() {
                    continue;
                }
                draft_answers
                    .entry(chapter_id.clone())
                    .or_default()
                    .insert(
                        question_id.clone(),
                        clamp_text(answer, limits::QA_ANSWER_MAX),
                    );
            }
        }
    }

    let mut feedback_history: Vec<AiFeedbackEntry> = arr(raw, "feedbackHistory")
        .iter()
        .filter_map(|v| feedback_from_value(v, book_ids, chapter_ids))
        .collect();
    if feedback_history.len() > limits::FEEDBACK_HISTORY_MAX {
        let excess = feedback_history.len() - limits::FEEDBACK_HISTORY_MAX;
        feedback_history.drain(..excess);
    }

    let selected_book_id =
        id_field(raw, "selectedBookId").filter(|id| book_ids.contains(id));
    let selected_chapter_id =
        id_field(raw, "selectedChapterId").filter(|id| chapter_ids.contains(id));

    CoachState {
        generated_questions,
        draft_answers,
        feedback_history,
        selected_book_id,
        selected_chapter_id,
    }
}

fn generated_question_from_value(value: &Value) -> Option<AiGeneratedQuestion> {
    let id = id_field(value, "id")?;
    let chapter_id = id_field(value, "chapterId")?;
    Some(AiGeneratedQuestion {
        id,
        chapter_id,
        question: text_field(value, "question", limits::QUESTION_TEXT_MAX),
        rubric: text_field(value, "rubric", limits::RUBRIC_MAX),
        difficulty: value
            .get("difficulty")
            .and_then(Value::as_str)
            .map(Difficulty::parse_lenient)
            .unwrap_or_default(),
        style: value
            .get("style")
            .and_then(Value::as_str)
            .map(QuestionStyle::parse_lenient)
            .unwrap_or_default(),
        created_at: timestamp_field(value, "createdAt"),
    })
}

fn grade_result_from_value(value: &Value) -> Option<AiGradeResult> {
    // The three request-echo fields must be present as strings or the row
    // is dropped.
    let question_id = string_field(value, "questionId")?;
    let question = string_field(value, "question")?;
    let student_answer = string_field(value, "studentAnswer")?;
    Some(AiGradeResult {
        question_id: clamp_text(&question_id, limits::QUESTION_ID_MAX),
        question: clamp_text(&question, limits::QA_QUESTION_MAX),
        student_answer: clamp_text(&student_answer, limits::QA_ANSWER_MAX),
        score: value
            .get("score")
            .and_then(Value::as_f64)
            .map(clamp_score)
            .unwrap_or(0),
        feedback: text_field(value, "feedback", limits::FEEDBACK_MAX),
        ideal_answer: text_field(value, "idealAnswer", limits::IDEAL_ANSWER_MAX),
    })
}

fn feedback_from_value(
    value: &Value,
    book_ids: &BTreeSet<String>,
    chapter_ids: &BTreeSet<String>,
) -> Option<AiFeedbackEntry> {
    let id = id_field(value, "id")?;
    let book_id = id_field(value, "bookId")?;
    let chapter_id = id_field(value, "chapterId")?;
    if !book_ids.contains(&book_id) || !chapter_ids.contains(&chapter_id) {
        return None;
    }
    let results: Vec<AiGradeResult> = arr(value, "results")
        .iter()
        .filter_map(grade_result_from_value)
        .collect();
    if results.is_empty() {
        return None;
    }
    let average_score = average_score(&results);
    Some(AiFeedbackEntry {
        id,
        book_id,
        chapter_id,
        difficulty: value
            .get("difficulty")
            .and_then(Value::as_str)
            .map(Difficulty::parse_lenient)
            .unwrap_or_default(),
        style: value
            .get("style")
            .and_then(Value::as_str)
            .map(QuestionStyle::parse_lenient)
            .unwrap_or_default(),
        average_score,
        results,
        created_at: timestamp_field(value, "createdAt"),
    })
}

/// Average score is always recomputed from the rows, never trusted from
/// the blob. Callers guarantee `results` is non-empty.
pub(crate) fn average_score(results: &[AiGradeResult]) -> i64 {
    let sum: i64 = results.iter().map(|r| r.score).sum();
    (sum as f64 / results.len() as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob_with_chapter() -> Value {
        json!({
            "books": [
                { "id": "b1", "title": "Dune", "author": "Frank Herbert",
                  "status": "in_progress",
                  "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z" }
            ],
            "chapters": [
                { "id": "c1", "bookId": "b1", "number": 1, "summary": "Arrakis.",
                  "takeaways": "", "quotes": "", "reflection": "",
                  "createdAt": "2024-01-02T00:00:00Z", "updatedAt": "2024-01-02T00:00:00Z" }
            ]
        })
    }

    #[test]
    fn garbage_blobs_collapse_to_empty_journals() {
        assert_eq!(normalize(&Value::Null), JournalData::default());
        assert_eq!(normalize(&json!("not an object")), JournalData::default());
        assert_eq!(normalize(&json!(42)), JournalData::default());
        assert_eq!(
            normalize(&json!({ "books": 42, "chapters": "nope" })),
            JournalData::default()
        );
    }

    #[test]
    fn records_without_ids_are_dropped() {
        let data = normalize(&json!({
            "books": [
                { "title": "No id" },
                { "id": "   ", "title": "Blank id" },
                { "id": "b1", "title": "Kept" }
            ]
        }));
        assert_eq!(data.books.len(), 1);
        assert_eq!(data.books[0].id, "b1");
    }

    #[test]
    fn wrong_typed_fields_become_defaults() {
        let data = normalize(&json!({
            "books": [
                { "id": "b1", "title": 42, "author": null, "genre": ["fiction"],
                  "status": "paused", "createdAt": 123 }
            ]
        }));
        let book = &data.books[0];
        assert_eq!(book.title, "");
        assert_eq!(book.author, "");
        assert_eq!(book.genre, None);
        assert_eq!(book.status, BookStatus::InProgress);
        assert_eq!(book.created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn oversized_text_is_clamped() {
        let long_title = "x".repeat(limits::BOOK_TITLE_MAX + 50);
        let data = normalize(&json!({
            "books": [{ "id": "b1", "title": long_title }]
        }));
        assert_eq!(data.books[0].title.chars().count(), limits::BOOK_TITLE_MAX);
    }

    #[test]
    fn orphaned_chapters_and_qas_are_dropped() {
        let data = normalize(&json!({
            "books": [{ "id": "b1", "title": "Kept" }],
            "chapters": [
                { "id": "c1", "bookId": "b1" },
                { "id": "c2", "bookId": "ghost" }
            ],
            "qas": [
                { "id": "q1", "chapterId": "c1", "question": "?", "answer": "!" },
                { "id": "q2", "chapterId": "c2", "question": "?", "answer": "!" },
                { "id": "q3", "chapterId": "missing", "question": "?", "answer": "!" }
            ]
        }));
        assert_eq!(data.chapters.len(), 1);
        assert_eq!(data.qas.len(), 1);
        assert_eq!(data.qas[0].id, "q1");
    }

    #[test]
    fn unknown_history_kinds_are_dropped() {
        let data = normalize(&json!({
            "history": [
                { "id": "h1", "type": "book_added", "userId": "u1", "label": "Dune",
                  "timestamp": "2024-01-01T00:00:00Z" },
                { "id": "h2", "type": "book_exploded", "userId": "u1", "label": "?" },
                { "id": "h3", "userId": "u1", "label": "no kind" }
            ]
        }));
        assert_eq!(data.history.len(), 1);
        assert_eq!(data.history[0].kind, HistoryEventKind::BookAdded);
    }

    #[test]
    fn history_survives_entity_deletion() {
        // Events pointing at entities that no longer exist are kept.
        let data = normalize(&json!({
            "history": [
                { "id": "h1", "type": "book_deleted", "userId": "u1",
                  "bookId": "gone", "label": "Dune",
                  "timestamp": "2024-01-01T00:00:00Z" }
            ]
        }));
        assert_eq!(data.history.len(), 1);
        assert_eq!(data.history[0].book_id.as_deref(), Some("gone"));
    }

    #[test]
    fn coach_questions_need_a_live_chapter() {
        let mut blob = blob_with_chapter();
        blob["coach"] = json!({
            "generatedQuestions": [
                { "id": "g1", "chapterId": "c1", "question": "Why?", "rubric": "r" },
                { "id": "g2", "chapterId": "ghost", "question": "Why?", "rubric": "r" }
            ]
        });
        let data = normalize(&blob);
        assert_eq!(data.coach.generated_questions.len(), 1);
        assert_eq!(data.coach.generated_questions[0].id, "g1");
    }

    #[test]
    fn draft_answers_need_chapter_and_question() {
        let mut blob = blob_with_chapter();
        blob["coach"] = json!({
            "generatedQuestions": [
                { "id": "g1", "chapterId": "c1", "question": "Why?", "rubric": "r" }
            ],
            "draftAnswers": {
                "c1": { "g1": "my answer", "gX": "no such question", "g2": "   " },
                "ghost": { "g1": "chapter is gone" }
            }
        });
        let data = normalize(&blob);
        assert_eq!(data.coach.draft_answers.len(), 1);
        let c1 = &data.coach.draft_answers["c1"];
        assert_eq!(c1.len(), 1);
        assert_eq!(c1["g1"], "my answer");
    }

    #[test]
    fn feedback_scores_are_reclamped_and_averaged() {
        let mut blob = blob_with_chapter();
        blob["coach"] = json!({
            "feedbackHistory": [
                { "id": "f1", "bookId": "b1", "chapterId": "c1",
                  "results": [
                    { "questionId": "g1", "question": "?", "studentAnswer": "a",
                      "score": 150, "feedback": "", "idealAnswer": "" },
                    { "questionId": "g2", "question": "?", "studentAnswer": "a",
                      "score": "abc", "feedback": "", "idealAnswer": "" }
                  ],
                  "averageScore": 9999 }
            ]
        });
        let data = normalize(&blob);
        let entry = &data.coach.feedback_history[0];
        assert_eq!(entry.results[0].score, 100);
        assert_eq!(entry.results[1].score, 0);
        // (100 + 0) / 2, recomputed rather than trusted.
        assert_eq!(entry.average_score, 50);
    }

    #[test]
    fn feedback_rows_missing_echo_fields_are_dropped() {
        let mut blob = blob_with_chapter();
        blob["coach"] = json!({
            "feedbackHistory": [
                { "id": "f1", "bookId": "b1", "chapterId": "c1",
                  "results": [
                    { "questionId": "g1", "question": "?", "score": 80 }
                  ] },
                { "id": "f2", "bookId": "b1", "chapterId": "c1",
                  "results": [
                    { "questionId": "g1", "question": "?", "studentAnswer": "a", "score": 80 }
                  ] }
            ]
        });
        let data = normalize(&blob);
        // f1's only row lacks studentAnswer, so the whole entry goes.
        assert_eq!(data.coach.feedback_history.len(), 1);
        assert_eq!(data.coach.feedback_history[0].id, "f2");
    }

    #[test]
    fn feedback_history_keeps_the_most_recent_entries() {
        let mut blob = blob_with_chapter();
        let entries: Vec<Value> = (0..limits::FEEDBACK_HISTORY_MAX + 3)
            .map(|i| {
                json!({ "id": format!("f{i}"), "bookId": "b1", "chapterId": "c1",
                        "results": [
                            { "questionId": "g1", "question": "?", "studentAnswer": "a", "score": 50 }
                        ] })
            })
            .collect();
        blob["coach"] = json!({ "feedbackHistory": entries });
        let data = normalize(&blob);
        assert_eq!(
            data.coach.feedback_history.len(),
            limits::FEEDBACK_HISTORY_MAX
        );
        // The oldest three (front of the list) were dropped.
        assert_eq!(data.coach.feedback_history[0].id, "f3");
    }

    #[test]
    fn stale_selection_pointers_are_cleared() {
        let mut blob = blob_with_chapter();
        blob["coach"] = json!({
            "selectedBookId": "b1",
            "selectedChapterId": "ghost"
        });
        let data = normalize(&blob);
        assert_eq!(data.coach.selected_book_id.as_deref(), Some("b1"));
        assert_eq!(data.coach.selected_chapter_id, None);
    }

    #[test]
    fn unknown_difficulty_and_style_fall_back_to_defaults() {
        let mut blob = blob_with_chapter();
        blob["coach"] = json!({
            "generatedQuestions": [
                { "id": "g1", "chapterId": "c1", "question": "Why?", "rubric": "r",
                  "difficulty": "impossible", "style": "socratic" }
            ]
        });
        let data = normalize(&blob);
        let q = &data.coach.generated_questions[0];
        assert_eq!(q.difficulty, Difficulty::Mixed);
        assert_eq!(q.style, QuestionStyle::Comprehension);
    }

    #[test]
    fn normalize_is_idempotent() {
        let blob = json!({
            "books": [
                { "id": "b1", "title": "Dune", "author": "Frank Herbert",
                  "genre": 42, "status": "completed",
                  "startedAt": "garbage",
                  "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "bad" }
            ],
            "chapters": [
                { "id": "c1", "bookId": "b1", "number": 3.7, "summary": "Arrakis." },
                { "id": "c2", "bookId": "ghost" }
            ],
            "qas": [
                { "id": "q1", "chapterId": "c1", "question": "?", "answer": "!" }
            ],
            "history": [
                { "id": "h1", "type": "chapter_added", "userId": "u1", "label": "Ch 3",
                  "timestamp": "2024-01-03T00:00:00Z" },
                { "id": "h2", "type": "mystery", "userId": "u1", "label": "?" }
            ],
            "coach": {
                "generatedQuestions": [
                    { "id": "g1", "chapterId": "c1", "question": "Why?", "rubric": "r" }
                ],
                "draftAnswers": { "c1": { "g1": "draft" } },
                "feedbackHistory": [
                    { "id": "f1", "bookId": "b1", "chapterId": "c1",
                      "results": [
                        { "questionId": "g1", "question": "?", "studentAnswer": "a",
                          "score": 101.2 }
                      ] }
                ],
                "selectedBookId": "b1",
                "selectedChapterId": "c2"
            }
        });
        let once = normalize(&blob);
        let round_tripped = serde_json::to_value(&once).unwrap();
        let twice = normalize(&round_tripped);
        assert_eq!(once, twice);
    }
}
