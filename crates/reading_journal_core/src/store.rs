//! crates/reading_journal_core/src/store.rs
//!
//! The journal store: all reads and writes of the per-user journal blob,
//! the user directory, the active-user pointer and the theme preference,
//! on top of any `KeyValueStore` backend.
//!
//! Every mutation is a single state replacement: load the blob, run it
//! through `normalize`, apply the change, write the whole blob back. An
//! operation that fails its parent check returns `NotFound` and writes
//! nothing.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::{
    AiFeedbackEntry, AiGeneratedQuestion, AiGradeResult, Book, BookStatus, ChapterEntry,
    Difficulty, HistoryEvent, HistoryEventKind, JournalData, Qa, QuestionStyle, Theme,
    UserProfile,
};
use crate::limits::{self, clamp_text};
use crate::normalize::{average_score, normalize};
use crate::ports::{KeyValueStore, PortError, PortResult};

pub const DEFAULT_NAMESPACE: &str = "reading-journal";

//=========================================================================================
// Input Types
//=========================================================================================

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Partial update for a book. `None` fields are left untouched; blank
/// strings clear the optional text fields.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
    pub status: Option<BookStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewChapter {
    pub book_id: String,
    pub number: Option<u32>,
    pub title: Option<String>,
    pub summary: String,
    pub takeaways: String,
    pub quotes: String,
    pub reflection: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ChapterPatch {
    pub number: Option<u32>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub takeaways: Option<String>,
    pub quotes: Option<String>,
    pub reflection: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewQa {
    pub chapter_id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default)]
pub struct QaPatch {
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// A generated question as it comes back from the gateway, before the
/// store stamps chapter linkage and timestamps onto it.
#[derive(Debug, Clone)]
pub struct QuestionDraft {
    pub id: String,
    pub question: String,
    pub rubric: String,
}

//=========================================================================================
// The Store
//=========================================================================================

pub struct JournalStore<S: KeyValueStore> {
    kv: S,
    namespace: String,
}

impl<S: KeyValueStore> JournalStore<S> {
    pub fn new(kv: S) -> Self {
        Self::with_namespace(kv, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(kv: S, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
        }
    }

    fn users_key(&self) -> String {
        format!("{}:users", self.namespace)
    }

    fn session_key(&self) -> String {
        format!("{}:session", self.namespace)
    }

    fn theme_key(&self) -> String {
        format!("{}:theme", self.namespace)
    }

    fn data_key(&self, user_id: &str) -> String {
        format!("{}:data:{}", self.namespace, user_id)
    }

    // --- User Directory & Session ---

    /// Lists the user directory. A corrupt directory blob reads as empty.
    pub fn list_users(&self) -> PortResult<Vec<UserProfile>> {
        let raw = self.kv.get(&self.users_key())?;
        Ok(raw
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default())
    }

    pub fn create_user(&self, display_name: &str) -> PortResult<UserProfile> {
        let mut users = self.list_users()?;
        let profile = UserProfile {
            id: new_id(),
            display_name: clamp_text(display_name.trim(), limits::USER_NAME_MAX),
            created_at: Utc::now(),
        };
        users.push(profile.clone());
        self.kv.set(&self.users_key(), &to_json(&users)?)?;
        Ok(profile)
    }

    pub fn set_active_user(&self, user_id: &str) -> PortResult<()> {
        let users = self.list_users()?;
        if !users.iter().any(|u| u.id == user_id) {
            return Err(PortError::NotFound(format!("User {user_id} not found")));
        }
        self.kv.set(&self.session_key(), &to_json(&user_id)?)
    }

    /// Resolves the active-user pointer against the directory; a stale
    /// pointer reads as no active user.
    pub fn active_user(&self) -> PortResult<Option<UserProfile>> {
        let Some(raw) = self.kv.get(&self.session_key())? else {
            return Ok(None);
        };
        let Ok(user_id) = serde_json::from_str::<String>(&raw) else {
            return Ok(None);
        };
        Ok(self.list_users()?.into_iter().find(|u| u.id == user_id))
    }

    pub fn clear_active_user(&self) -> PortResult<()> {
        self.kv.remove(&self.session_key())
    }

    pub fn theme(&self) -> PortResult<Theme> {
        let Some(raw) = self.kv.get(&self.theme_key())? else {
            return Ok(Theme::default());
        };
        Ok(serde_json::from_str::<String>(&raw)
            .map(|s| Theme::parse_lenient(&s))
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> PortResult<()> {
        self.kv.set(&self.theme_key(), &to_json(&theme)?)
    }

    // --- Journal Data ---

    /// Loads and normalizes a user's journal. Missing or unparseable blobs
    /// read as an empty journal.
    pub fn load(&self, user_id: &str) -> PortResult<JournalData> {
        let raw = self.kv.get(&self.data_key(user_id))?;
        Ok(match raw {
            Some(text) => {
                let value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
                normalize(&value)
            }
            None => JournalData::default(),
        })
    }

    fn save(&self, user_id: &str, data: &JournalData) -> PortResult<()> {
        self.kv.set(&self.data_key(user_id), &to_json(data)?)
    }

    fn mutate<T>(
        &self,
        user_id: &str,
        op: impl FnOnce(&mut JournalData) -> PortResult<T>,
    ) -> PortResult<T> {
        let mut data = self.load(user_id)?;
        let out = op(&mut data)?;
        self.save(user_id, &data)?;
        Ok(out)
    }

    pub fn history(&self, user_id: &str) -> PortResult<Vec<HistoryEvent>> {
        Ok(self.load(user_id)?.history)
    }

    // --- Books ---

    pub fn add_book(&self, user_id: &str, new: NewBook) -> PortResult<Book> {
        self.mutate(user_id, |data| {
            let now = Utc::now();
            let book = Book {
                id: new_id(),
                title: clamp_text(new.title.trim(), limits::BOOK_TITLE_MAX),
                author: clamp_text(new.author.trim(), limits::BOOK_AUTHOR_MAX),
                genre: normalize_opt_text(new.genre, limits::BOOK_GENRE_MAX),
                cover_url: normalize_opt_text(new.cover_url, limits::BOOK_COVER_URL_MAX),
                started_at: new.started_at,
                finished_at: None,
                status: BookStatus::InProgress,
                created_at: now,
                updated_at: now,
            };
            data.books.push(book.clone());
            append_event(
                data,
                user_id,
                HistoryEventKind::BookAdded,
                Some(&book.id),
                None,
                None,
                &book.title,
            );
            Ok(book)
        })
    }

    pub fn update_book(&self, user_id: &str, book_id: &str, patch: BookPatch) -> PortResult<Book> {
        self.mutate(user_id, |data| {
            let now = Utc::now();
            let book = data
                .books
                .iter_mut()
                .find(|b| b.id == book_id)
                .ok_or_else(|| PortError::NotFound(format!("Book {book_id} not found")))?;

            let was_completed = book.status == BookStatus::Completed;
            if let Some(title) = patch.title {
                book.title = clamp_text(title.trim(), limits::BOOK_TITLE_MAX);
            }
            if let Some(author) = patch.author {
                book.author = clamp_text(author.trim(), limits::BOOK_AUTHOR_MAX);
            }
            if let Some(genre) = patch.genre {
                book.genre = normalize_opt_text(Some(genre), limits::BOOK_GENRE_MAX);
            }
            if let Some(cover_url) = patch.cover_url {
                book.cover_url = normalize_opt_text(Some(cover_url), limits::BOOK_COVER_URL_MAX);
            }
            if let Some(started_at) = patch.started_at {
                book.started_at = Some(started_at);
            }
            if let Some(finished_at) = patch.finished_at {
                book.finished_at = Some(finished_at);
            }
            if let Some(status) = patch.status {
                book.status = status;
            }

            let completed_now = book.status == BookStatus::Completed && !was_completed;
            if completed_now && book.finished_at.is_none() {
                book.finished_at = Some(now);
            }
            book.updated_at = now;
            let snapshot = book.clone();

            let kind = if completed_now {
                HistoryEventKind::BookCompleted
            } else {
                HistoryEventKind::BookUpdated
            };
            append_event(
                data,
                user_id,
                kind,
                Some(book_id),
                None,
                None,
                &snapshot.title,
            );
            Ok(snapshot)
        })
    }

    /// Deletes a book and everything hanging off it: its chapters, those
    /// chapters' QAs, generated questions, draft answers, feedback entries
    /// and any selection pointer, in one state replacement. Emits a single
    /// book_deleted event.
    pub fn delete_book(&self, user_id: &str, book_id: &str) -> PortResult<()> {
        self.mutate(user_id, |data| {
            let position = data
                .books
                .iter()
                .position(|b| b.id == book_id)
                .ok_or_else(|| PortError::NotFound(format!("Book {book_id} not found")))?;
            let removed = data.books.remove(position);

            let dead_chapters: BTreeSet<String> = data
                .chapters
                .iter()
                .filter(|c| c.book_id == book_id)
                .map(|c| c.id.clone())
                .collect();
            data.chapters.retain(|c| c.book_id != book_id);
            data.qas.retain(|q| !dead_chapters.contains(&q.chapter_id));

            let coach = &mut data.coach;
            coach
                .generated_questions
                .retain(|q| !dead_chapters.contains(&q.chapter_id));
            for chapter_id in &dead_chapters {
                coach.draft_answers.remove(chapter_id);
            }
            coach
                .feedback_history
                .retain(|f| f.book_id != book_id && !dead_chapters.contains(&f.chapter_id));
            if coach.selected_book_id.as_deref() == Some(book_id) {
                coach.selected_book_id = None;
            }
            if coach
                .selected_chapter_id
                .as_ref()
                .is_some_and(|id| dead_chapters.contains(id))
            {
                coach.selected_chapter_id = None;
            }

            append_event(
                data,
                user_id,
                HistoryEventKind::BookDeleted,
                Some(book_id),
                None,
                None,
                &removed.title,
            );
            Ok(())
        })
    }

    // --- Chapters ---

    pub fn add_chapter(&self, user_id: &str, new: NewChapter) -> PortResult<ChapterEntry> {
        self.mutate(user_id, |data| {
            if !data.books.iter().any(|b| b.id == new.book_id) {
                return Err(PortError::NotFound(format!(
                    "Book {} not found",
                    new.book_id
                )));
            }
            let now = Utc::now();
            let chapter = ChapterEntry {
                id: new_id(),
                book_id: new.book_id,
                number: new.number,
                title: normalize_opt_text(new.title, limits::CHAPTER_LABEL_MAX),
                completed_at: new.completed_at,
                summary: clamp_text(&new.summary, limits::CHAPTER_SUMMARY_MAX),
                takeaways: clamp_text(&new.takeaways, limits::CHAPTER_TAKEAWAYS_MAX),
                quotes: clamp_text(&new.quotes, limits::CHAPTER_QUOTES_MAX),
                reflection: clamp_text(&new.reflection, limits::CHAPTER_REFLECTION_MAX),
                created_at: now,
                updated_at: now,
            };
            data.chapters.push(chapter.clone());
            append_event(
                data,
                user_id,
                HistoryEventKind::ChapterAdded,
                Some(&chapter.book_id),
                Some(&chapter.id),
                None,
                &chapter.display_label(),
            );
            Ok(chapter)
        })
    }

    pub fn update_chapter(
        &self,
        user_id: &str,
        chapter_id: &str,
        patch: ChapterPatch,
    ) -> PortResult<ChapterEntry> {
        self.mutate(user_id, |data| {
            let chapter = data
                .chapters
                .iter_mut()
                .find(|c| c.id == chapter_id)
                .ok_or_else(|| PortError::NotFound(format!("Chapter {chapter_id} not found")))?;

            if let Some(number) = patch.number {
                chapter.number = Some(number);
            }
            if let Some(title) = patch.title {
                chapter.title = normalize_opt_text(Some(title), limits::CHAPTER_LABEL_MAX);
            }
            if let Some(summary) = patch.summary {
                chapter.summary = clamp_text(&summary, limits::CHAPTER_SUMMARY_MAX);
            }
            if let Some(takeaways) = patch.takeaways {
                chapter.takeaways = clamp_text(&takeaways, limits::CHAPTER_TAKEAWAYS_MAX);
            }
            if let Some(quotes) = patch.quotes {
                chapter.quotes = clamp_text(&quotes, limits::CHAPTER_QUOTES_MAX);
            }
            if let Some(reflection) = patch.reflection {
                chapter.reflection = clamp_text(&reflection, limits::CHAPTER_REFLECTION_MAX);
            }
            if let Some(completed_at) = patch.completed_at {
                chapter.completed_at = Some(completed_at);
            }
            chapter.updated_at = Utc::now();
            let snapshot = chapter.clone();

            append_event(
                data,
                user_id,
                HistoryEventKind::ChapterUpdated,
                Some(&snapshot.book_id),
                Some(chapter_id),
                None,
                &snapshot.display_label(),
            );
            Ok(snapshot)
        })
    }

    /// Deletes a chapter, its QAs and its coach artifacts. Emits a single
    /// chapter_deleted event.
    pub fn delete_chapter(&self, user_id: &str, chapter_id: &str) -> PortResult<()> {
        self.mutate(user_id, |data| {
            let position = data
                .chapters
                .iter()
                .position(|c| c.id == chapter_id)
                .ok_or_else(|| PortError::NotFound(format!("Chapter {chapter_id} not found")))?;
            let removed = data.chapters.remove(position);

            data.qas.retain(|q| q.chapter_id != chapter_id);

            let coach = &mut data.coach;
            coach
                .generated_questions
                .retain(|q| q.chapter_id != chapter_id);
            coach.draft_answers.remove(chapter_id);
            coach.feedback_history.retain(|f| f.chapter_id != chapter_id);
            if coach.selected_chapter_id.as_deref() == Some(chapter_id) {
                coach.selected_chapter_id = None;
            }

            append_event(
                data,
                user_id,
                HistoryEventKind::ChapterDeleted,
                Some(&removed.book_id),
                Some(chapter_id),
                None,
                &removed.display_label(),
            );
            Ok(())
        })
    }

    // --- QAs ---

    pub fn add_qa(&self, user_id: &str, new: NewQa) -> PortResult<Qa> {
        self.mutate(user_id, |data| {
            let book_id = data
                .chapters
                .iter()
                .find(|c| c.id == new.chapter_id)
                .map(|c| c.book_id.clone())
                .ok_or_else(|| {
                    PortError::NotFound(format!("Chapter {} not found", new.chapter_id))
                })?;
            let now = Utc::now();
            let qa = Qa {
                id: new_id(),
                chapter_id: new.chapter_id,
                question: clamp_text(new.question.trim(), limits::QA_QUESTION_MAX),
                answer: clamp_text(&new.answer, limits::QA_ANSWER_MAX),
                created_at: now,
                updated_at: now,
            };
            data.qas.push(qa.clone());
            append_event(
                data,
                user_id,
                HistoryEventKind::QaAdded,
                Some(&book_id),
                Some(&qa.chapter_id),
                Some(&qa.id),
                &qa.question,
            );
            Ok(qa)
        })
    }

    pub fn update_qa(&self, user_id: &str, qa_id: &str, patch: QaPatch) -> PortResult<Qa> {
        self.mutate(user_id, |data| {
            let qa = data
                .qas
                .iter_mut()
                .find(|q| q.id == qa_id)
                .ok_or_else(|| PortError::NotFound(format!("QA {qa_id} not found")))?;

            if let Some(question) = patch.question {
                qa.question = clamp_text(question.trim(), limits::QA_QUESTION_MAX);
            }
            if let Some(answer) = patch.answer {
                qa.answer = clamp_text(&answer, limits::QA_ANSWER_MAX);
            }
            qa.updated_at = Utc::now();
            let snapshot = qa.clone();

            let book_id = data
                .chapters
                .iter()
                .find(|c| c.id == snapshot.chapter_id)
                .map(|c| c.book_id.clone());
            append_event(
                data,
                user_id,
                HistoryEventKind::QaUpdated,
                book_id.as_deref(),
                Some(&snapshot.chapter_id),
                Some(qa_id),
                &snapshot.question,
            );
            Ok(snapshot)
        })
    }

    pub fn delete_qa(&self, user_id: &str, qa_id: &str) -> PortResult<()> {
        self.mutate(user_id, |data| {
            let position = data
                .qas
                .iter()
                .position(|q| q.id == qa_id)
                .ok_or_else(|| PortError::NotFound(format!("QA {qa_id} not found")))?;
            let removed = data.qas.remove(position);

            let book_id = data
                .chapters
                .iter()
                .find(|c| c.id == removed.chapter_id)
                .map(|c| c.book_id.clone());
            append_event(
                data,
                user_id,
                HistoryEventKind::QaDeleted,
                book_id.as_deref(),
                Some(&removed.chapter_id),
                Some(qa_id),
                &removed.question,
            );
            Ok(())
        })
    }

    // --- Coach Artifacts ---

    /// Replaces the chapter's generated-question set. Drafts written
    /// against the replaced set are cleared at the same time.
    pub fn save_generated_questions(
        &self,
        user_id: &str,
        chapter_id: &str,
        difficulty: Difficulty,
        style: QuestionStyle,
        drafts: Vec<QuestionDraft>,
    ) -> PortResult<Vec<AiGeneratedQuestion>> {
        self.mutate(user_id, |data| {
            let (book_id, label) = data
                .chapters
                .iter()
                .find(|c| c.id == chapter_id)
                .map(|c| (c.book_id.clone(), c.display_label()))
                .ok_or_else(|| PortError::NotFound(format!("Chapter {chapter_id} not found")))?;

            let now = Utc::now();
            let fresh: Vec<AiGeneratedQuestion> = drafts
                .into_iter()
                .filter(|d| !d.id.trim().is_empty() && !d.question.trim().is_empty())
                .map(|d| AiGeneratedQuestion {
                    id: clamp_text(d.id.trim(), limits::QUESTION_ID_MAX),
                    chapter_id: chapter_id.to_string(),
                    question: clamp_text(d.question.trim(), limits::QUESTION_TEXT_MAX),
                    rubric: clamp_text(&d.rubric, limits::RUBRIC_MAX),
                    difficulty,
                    style,
                    created_at: now,
                })
                .collect();

            data.coach
                .generated_questions
                .retain(|q| q.chapter_id != chapter_id);
            data.coach.generated_questions.extend(fresh.iter().cloned());
            // A new question set invalidates drafts written against the old one.
            data.coach.draft_answers.remove(chapter_id);

            append_event(
                data,
                user_id,
                HistoryEventKind::AiQuestionsGenerated,
                Some(&book_id),
                Some(chapter_id),
                None,
                &format!("Generated {} questions for {label}", fresh.len()),
            );
            Ok(fresh)
        })
    }

    /// Saves one draft answer. A blank answer removes the stored draft
    /// instead of keeping empty text around.
    pub fn save_draft_answer(
        &self,
        user_id: &str,
        chapter_id: &str,
        question_id: &str,
        answer: &str,
    ) -> PortResult<()> {
        self.mutate(user_id, |data| {
            let question_exists = data
                .coach
                .generated_questions
                .iter()
                .any(|q| q.chapter_id == chapter_id && q.id == question_id);
            if !question_exists {
                return Err(PortError::NotFound(format!(
                    "Question {question_id} not found for chapter {chapter_id}"
                )));
            }

            if answer.trim().is_empty() {
                let emptied = match data.coach.draft_answers.get_mut(chapter_id) {
                    Some(drafts) => {
                        drafts.remove(question_id);
                        drafts.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    data.coach.draft_answers.remove(chapter_id);
                }
            } else {
                data.coach
                    .draft_answers
                    .entry(chapter_id.to_string())
                    .or_default()
                    .insert(
                        question_id.to_string(),
                        clamp_text(answer, limits::QA_ANSWER_MAX),
                    );
            }
            Ok(())
        })
    }

    pub fn clear_draft_answers(&self, user_id: &str, chapter_id: &str) -> PortResult<()> {
        self.mutate(user_id, |data| {
            data.coach.draft_answers.remove(chapter_id);
            Ok(())
        })
    }

    /// Appends one grading round. Scores are re-clamped and the average is
    /// computed here, never taken from the caller.
    pub fn record_feedback(
        &self,
        user_id: &str,
        book_id: &str,
        chapter_id: &str,
        difficulty: Difficulty,
        style: QuestionStyle,
        results: Vec<AiGradeResult>,
    ) -> PortResult<AiFeedbackEntry> {
        self.mutate(user_id, |data| {
            if !data.books.iter().any(|b| b.id == book_id) {
                return Err(PortError::NotFound(format!("Book {book_id} not found")));
            }
            let label = data
                .chapters
                .iter()
                .find(|c| c.id == chapter_id && c.book_id == book_id)
                .map(ChapterEntry::display_label)
                .ok_or_else(|| {
                    PortError::NotFound(format!(
                        "Chapter {chapter_id} not found for book {book_id}"
                    ))
                })?;
            if results.is_empty() {
                return Err(PortError::Unexpected(
                    "feedback must contain at least one grade result".to_string(),
                ));
            }

            let results: Vec<AiGradeResult> = results
                .into_iter()
                .map(|r| AiGradeResult {
                    question_id: clamp_text(r.question_id.trim(), limits::QUESTION_ID_MAX),
                    question: clamp_text(&r.question, limits::QA_QUESTION_MAX),
                    student_answer: clamp_text(&r.student_answer, limits::QA_ANSWER_MAX),
                    score: r.score.clamp(limits::SCORE_MIN, limits::SCORE_MAX),
                    feedback: clamp_text(&r.feedback, limits::FEEDBACK_MAX),
                    ideal_answer: clamp_text(&r.ideal_answer, limits::IDEAL_ANSWER_MAX),
                })
                .collect();

            let entry = AiFeedbackEntry {
                id: new_id(),
                book_id: book_id.to_string(),
                chapter_id: chapter_id.to_string(),
                difficulty,
                style,
                average_score: average_score(&results),
                results,
                created_at: Utc::now(),
            };
            data.coach.feedback_history.push(entry.clone());
            if data.coach.feedback_history.len() > limits::FEEDBACK_HISTORY_MAX {
                let excess = data.coach.feedback_history.len() - limits::FEEDBACK_HISTORY_MAX;
                data.coach.feedback_history.drain(..excess);
            }

            append_event(
                data,
                user_id,
                HistoryEventKind::AiAnswersGraded,
                Some(book_id),
                Some(chapter_id),
                None,
                &format!("Graded {} answers for {label}", entry.results.len()),
            );
            Ok(entry)
        })
    }

    pub fn select_coach_target(
        &self,
        user_id: &str,
        book_id: &str,
        chapter_id: Option<&str>,
    ) -> PortResult<()> {
        self.mutate(user_id, |data| {
            if !data.books.iter().any(|b| b.id == book_id) {
                return Err(PortError::NotFound(format!("Book {book_id} not found")));
            }
            if let Some(chapter_id) = chapter_id {
                let belongs = data
                    .chapters
                    .iter()
                    .any(|c| c.id == chapter_id && c.book_id == book_id);
                if !belongs {
                    return Err(PortError::NotFound(format!(
                        "Chapter {chapter_id} not found for book {book_id}"
                    )));
                }
            }
            data.coach.selected_book_id = Some(book_id.to_string());
            data.coach.selected_chapter_id = chapter_id.map(str::to_string);
            Ok(())
        })
    }

    pub fn clear_coach_selection(&self, user_id: &str) -> PortResult<()> {
        self.mutate(user_id, |data| {
            data.coach.selected_book_id = None;
            data.coach.selected_chapter_id = None;
            Ok(())
        })
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn to_json<T: serde::Serialize>(value: &T) -> PortResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PortError::Unexpected(format!("failed to serialize journal data: {e}")))
}

// Trims and clamps an optional single-line field; blank input clears it.
fn normalize_opt_text(raw: Option<String>, max: usize) -> Option<String> {
    raw.map(|s| clamp_text(s.trim(), max))
        .filter(|s| !s.is_empty())
}

#[allow(clippy::too_many_arguments)]
fn append_event(
    data: &mut JournalData,
    user_id: &str,
    kind: HistoryEventKind,
    book_id: Option<&str>,
    chapter_id: Option<&str>,
    qa_id: Option<&str>,
    label: &str,
) {
    data.history.push(HistoryEvent {
        id: new_id(),
        kind,
        timestamp: Utc::now(),
        user_id: user_id.to_string(),
        book_id: book_id.map(str::to_string),
        chapter_id: chapter_id.map(str::to_string),
        qa_id: qa_id.map(str::to_string),
        label: clamp_text(label, limits::HISTORY_LABEL_MAX),
        metadata: None,
    });
}
