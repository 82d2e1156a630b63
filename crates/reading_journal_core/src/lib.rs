pub mod domain;
pub mod kv;
pub mod limits;
pub mod normalize;
pub mod ports;
pub mod session;
pub mod store;

pub use domain::{
    AiFeedbackEntry, AiGeneratedQuestion, AiGradeResult, Book, BookStatus, ChapterEntry,
    CoachState, Difficulty, HistoryEvent, HistoryEventKind, JournalData, Qa, QuestionStyle, Theme,
    UserProfile,
};
pub use kv::{FileKeyValueStore, MemoryKeyValueStore};
pub use normalize::normalize;
pub use ports::{ChatCompletionService, ChatPrompt, KeyValueStore, PortError, PortResult};
pub use session::{CoachActivity, CoachBusy, CoachSession};
pub use store::{
    BookPatch, ChapterPatch, JournalStore, NewBook, NewChapter, NewQa, QaPatch, QuestionDraft,
};
