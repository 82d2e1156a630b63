//! crates/reading_journal_core/src/session.rs
//!
//! Tracks what the coach is currently doing for one client session, so a
//! second request cannot start while one is in flight.

/// What the coach is busy with, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoachActivity {
    #[default]
    Idle,
    GeneratingQuestions,
    GradingAnswers,
}

#[derive(Debug, thiserror::Error)]
#[error("a coach request is already in flight")]
pub struct CoachBusy;

/// Single-flight state machine for the coach. A failed request must call
/// [`CoachSession::fail`] so the session returns to idle and keeps the
/// error text for display.
#[derive(Debug, Default)]
pub struct CoachSession {
    activity: CoachActivity,
    last_error: Option<String>,
}

impl CoachSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity(&self) -> CoachActivity {
        self.activity
    }

    pub fn is_idle(&self) -> bool {
        self.activity == CoachActivity::Idle
    }

    /// The error message from the most recent failed request, cleared by
    /// the next successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin_generating(&mut self) -> Result<(), CoachBusy> {
        self.begin(CoachActivity::GeneratingQuestions)
    }

    pub fn begin_grading(&mut self) -> Result<(), CoachBusy> {
        self.begin(CoachActivity::GradingAnswers)
    }

    fn begin(&mut self, activity: CoachActivity) -> Result<(), CoachBusy> {
        if !self.is_idle() {
            return Err(CoachBusy);
        }
        self.activity = activity;
        Ok(())
    }

    /// Marks the in-flight request as finished successfully.
    pub fn complete(&mut self) {
        self.activity = CoachActivity::Idle;
        self.last_error = None;
    }

    /// Marks the in-flight request as failed. The session is usable again
    /// immediately; only the message is kept.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.activity = CoachActivity::Idle;
        self.last_error = Some(message.into());
    }
}
