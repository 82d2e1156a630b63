//! services/gateway/src/coach/prompt.rs
//!
//! Prompt templates for the two coach operations. Building a prompt is a
//! pure function of the validated input, so the same request always sends
//! the same text upstream.

const GENERATE_SYSTEM_INSTRUCTIONS: &str = r#"You are a reading coach helping a reader study one chapter of a book.

You will receive the book, the chapter, and the reader's own notes about it
(summary, key takeaways, reflection). From that material you write study
questions the reader can answer from memory.

Rules for the questions:
- Ask about the chapter's actual content. Prefer the reader's notes; use
  general knowledge of the book only to fill small gaps.
- Every question must be answerable in a few sentences of prose.
- Match the requested difficulty. "mixed" means: vary difficulty across the set.
- Match the requested style. "comprehension" questions check recall and
  understanding; "critical thinking" questions ask the reader to analyze,
  evaluate or connect ideas; "mixed" alternates between the two.
- Give each question a short stable id (q1, q2, ...).
- Write a one-or-two sentence rubric describing what a strong answer covers.

Output format:
Respond with ONLY a JSON object, no prose before or after it, shaped EXACTLY like:
{"questions":[{"id":"q1","question":"...","rubric":"..."}]}

IMPORTANT:
- Do NOT wrap the JSON in markdown fences.
- Do NOT include trailing commas or comments.
- The "questions" array must contain exactly the requested number of questions."#;

const GENERATE_USER_TEMPLATE: &str = r#"Write exactly {count} study questions about this chapter.
Difficulty: {difficulty}.
Style: {style}.

BOOK:
{book}

CHAPTER:
{chapter}

CHAPTER SUMMARY:
{summary}

KEY TAKEAWAYS:
{takeaways}

READER REFLECTION:
{reflection}

Remember: respond with ONLY the JSON object described in your instructions."#;

const GRADE_SYSTEM_INSTRUCTIONS: &str = r#"You are a reading coach grading a reader's written answers to study
questions about one chapter of a book.

You will receive the book, the chapter, the reader's chapter summary and key
takeaways, and a numbered list of answers. Each entry carries a questionId,
the question, and the reader's answer.

Rules for grading:
- Score each answer from 0 to 100 (integer). 0 means no credit, 100 means a
  complete, accurate answer.
- Judge against the chapter content and the reader's own notes, not against
  trivia the chapter never covered.
- Write feedback in second person ("you"), two to four sentences: what the
  answer got right, then what it missed.
- Write an ideal answer: a model response in a few sentences.
- Return one result per answer, carrying the SAME questionId you were given.

Output format:
Respond with ONLY a JSON object, no prose before or after it, shaped EXACTLY like:
{"results":[{"questionId":"q1","score":85,"feedback":"...","idealAnswer":"..."}]}

IMPORTANT:
- Do NOT wrap the JSON in markdown fences.
- Do NOT skip any answer.
- "score" must be a bare number, not a string."#;

const GRADE_USER_TEMPLATE: &str = r#"BOOK:
{book}

CHAPTER:
{chapter}

CHAPTER SUMMARY:
{summary}

KEY TAKEAWAYS:
{takeaways}

ANSWERS TO GRADE:
{answers}

Grade every answer listed above.
Remember: respond with ONLY the JSON object described in your instructions."#;

use reading_journal_core::domain::QuestionStyle;
use reading_journal_core::ports::ChatPrompt;

use crate::coach::validate::{CoachContext, GradeAnswer, ValidatedGenerate, ValidatedGrade};

/// Both coach operations want mostly-faithful extraction, not creativity.
pub const COACH_TEMPERATURE: f32 = 0.2;

pub fn build_generate_prompt(input: &ValidatedGenerate) -> ChatPrompt {
    let user = GENERATE_USER_TEMPLATE
        .replace("{count}", &input.count.to_string())
        .replace("{difficulty}", input.difficulty.as_str())
        .replace("{style}", style_label(input.style))
        .replace("{book}", &book_line(&input.context))
        .replace("{chapter}", section(&input.context.chapter_label))
        .replace("{summary}", section(&input.context.summary))
        .replace("{takeaways}", section(&input.context.takeaways))
        .replace("{reflection}", section(&input.context.reflection));

    ChatPrompt {
        system: GENERATE_SYSTEM_INSTRUCTIONS.to_string(),
        user,
        temperature: COACH_TEMPERATURE,
    }
}

pub fn build_grade_prompt(input: &ValidatedGrade) -> ChatPrompt {
    let user = GRADE_USER_TEMPLATE
        .replace("{book}", &book_line(&input.context))
        .replace("{chapter}", section(&input.context.chapter_label))
        .replace("{summary}", section(&input.context.summary))
        .replace("{takeaways}", section(&input.context.takeaways))
        .replace("{answers}", &render_answers(&input.answers));

    ChatPrompt {
        system: GRADE_SYSTEM_INSTRUCTIONS.to_string(),
        user,
        temperature: COACH_TEMPERATURE,
    }
}

fn style_label(style: QuestionStyle) -> &'static str {
    match style {
        QuestionStyle::Comprehension => "comprehension",
        QuestionStyle::CriticalThinking => "critical thinking",
        QuestionStyle::Mixed => "mixed",
    }
}

fn section(text: &str) -> &str {
    if text.is_empty() {
        "(not provided)"
    } else {
        text
    }
}

fn book_line(context: &CoachContext) -> String {
    if context.book_title.is_empty() {
        "(not provided)".to_string()
    } else if context.book_author.is_empty() {
        context.book_title.clone()
    } else {
        format!("{} by {}", context.book_title, context.book_author)
    }
}

fn render_answers(answers: &[GradeAnswer]) -> String {
    let mut out = String::new();
    for (i, answer) in answers.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "{index}) questionId: {id}\n   QUESTION: {question}\n   STUDENT ANSWER: {answer}",
            index = i + 1,
            id = answer.question_id,
            question = answer.question,
            answer = answer.student_answer
        ));
    }
    out
}
