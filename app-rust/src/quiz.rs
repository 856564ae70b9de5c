use crate::{HistoryKind, QuizQuestion, StudyError, StudyResult, UserSession};
use std::collections::BTreeMap;
use study_buddy_sdk::{CompletionError, LanguageModelInput, Message, Part};
use tracing::info;

pub const QUESTIONS_PER_QUIZ: usize = 5;
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Seconds allowed per question before it counts as a wrong answer.
pub const SECONDS_PER_QUESTION: u32 = 15;

/// Study time credited for a finished quiz, in hours.
const QUIZ_STUDY_HOURS: f64 = 0.25;

const SYSTEM_PROMPT: &str =
    "You are a JSON quiz generator. Response must be ONLY raw JSON array. No conversational text.";

/// Reject questions the quiz cannot present.
pub fn validate_questions(questions: &[QuizQuestion]) -> Result<(), CompletionError> {
    if questions.is_empty() {
        return Err(CompletionError::MalformedOutput(
            "quiz has no questions".to_string(),
        ));
    }
    for question in questions {
        if question.options.len() != OPTIONS_PER_QUESTION {
            return Err(CompletionError::MalformedOutput(format!(
                "question {} has {} options, expected {OPTIONS_PER_QUESTION}",
                question.id,
                question.options.len()
            )));
        }
        if question.correct >= OPTIONS_PER_QUESTION {
            return Err(CompletionError::MalformedOutput(format!(
                "question {} marks option {} as correct",
                question.id, question.correct
            )));
        }
    }
    Ok(())
}

/// What happened to the question that was just closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// `None` when the time ran out.
    pub chosen: Option<usize>,
    pub correct: usize,
    pub is_correct: bool,
}

/// A quiz being played: one question at a time against a per-question clock.
#[derive(Debug, Clone)]
pub struct QuizSession {
    topic: String,
    questions: Vec<QuizQuestion>,
    current: usize,
    score: usize,
    seconds_left: u32,
}

impl QuizSession {
    pub fn new(topic: impl Into<String>, questions: Vec<QuizQuestion>) -> StudyResult<Self> {
        validate_questions(&questions)?;
        Ok(Self {
            topic: topic.into(),
            questions,
            current: 0,
            score: 0,
            seconds_left: SECONDS_PER_QUESTION,
        })
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// The open question, `None` once the quiz is over.
    #[must_use]
    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Score as a rounded percentage.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        crate::flashcards::mastery_percentage(self.score, self.total()).unwrap_or(0)
    }

    /// Answer the open question. `None` is a timeout and never scores.
    pub fn answer(&mut self, choice: Option<usize>) -> Option<AnswerOutcome> {
        let question = self.current()?;
        let correct = question.correct;
        let is_correct = choice == Some(correct);

        if is_correct {
            self.score += 1;
        }
        self.current += 1;
        self.seconds_left = SECONDS_PER_QUESTION;

        Some(AnswerOutcome {
            chosen: choice,
            correct,
            is_correct,
        })
    }

    /// Advance the clock. Running out of time answers the question with
    /// `None`.
    pub fn tick(&mut self, seconds: u32) -> Option<AnswerOutcome> {
        if self.is_finished() {
            return None;
        }
        self.seconds_left = self.seconds_left.saturating_sub(seconds);
        if self.seconds_left == 0 {
            self.answer(None)
        } else {
            None
        }
    }
}

pub struct QuizService<'a> {
    session: &'a UserSession,
}

impl<'a> QuizService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    /// Ask the AI for [`QUESTIONS_PER_QUIZ`] multiple-choice questions.
    pub async fn generate(&self, topic: &str) -> StudyResult<Vec<QuizQuestion>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(StudyError::validation("Please enter a topic."));
        }

        info!(topic, "generating quiz");
        let questions: Vec<QuizQuestion> = self
            .session
            .ai()
            .generate_json_array(generation_input(topic))
            .await?;
        validate_questions(&questions)?;
        Ok(questions)
    }

    pub async fn start(&self, topic: &str) -> StudyResult<QuizSession> {
        let questions = self.generate(topic).await?;
        QuizSession::new(topic.trim(), questions)
    }

    /// Log a finished quiz in analytics and history.
    pub async fn record_result(&self, quiz: &QuizSession) -> StudyResult<()> {
        if !quiz.is_finished() {
            return Err(StudyError::validation("The quiz is not finished yet."));
        }

        let score = u32::try_from(quiz.score()).unwrap_or(u32::MAX);
        let total = u32::try_from(quiz.total()).unwrap_or(u32::MAX);

        self.session.analytics().log_quiz(score, total).await?;
        self.session
            .history()
            .add(
                HistoryKind::Quiz,
                format!("Completed {} Quiz", quiz.topic()),
                BTreeMap::from([("score".to_string(), format!("{score}/{total}"))]),
            )
            .await?;
        self.session
            .analytics()
            .add_study_time(QUIZ_STUDY_HOURS)
            .await?;

        info!(topic = quiz.topic(), score, total, "quiz recorded");
        Ok(())
    }
}

fn generation_input(topic: &str) -> LanguageModelInput {
    let prompt = format!(
        "Generate {QUESTIONS_PER_QUIZ} multiple-choice questions for a quiz on the topic: \"{topic}\".

Return STRICTLY a valid JSON array of objects.
Each object must have:
- \"id\": number
- \"text\": string (the question)
- \"options\": array of 4 strings
- \"correct\": number (0-3, index of the correct option)

Example format: [{{\"id\": 1, \"text\": \"Q\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correct\": 0}}]"
    );

    LanguageModelInput {
        system_prompt: Some(SYSTEM_PROMPT.to_string()),
        messages: vec![Message::user(vec![Part::text(prompt)])],
        ..LanguageModelInput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u32, options: usize, correct: usize) -> QuizQuestion {
        QuizQuestion {
            id,
            text: format!("Question {id}"),
            options: (0..options).map(|index| format!("Option {index}")).collect(),
            correct,
        }
    }

    fn quiz() -> QuizSession {
        QuizSession::new("Biology", vec![question(1, 4, 0), question(2, 4, 2), question(3, 4, 3)])
            .unwrap()
    }

    #[test]
    fn rejects_three_options_and_out_of_range_answers() {
        assert!(validate_questions(&[question(1, 3, 0)]).is_err());
        assert!(validate_questions(&[question(1, 4, 4)]).is_err());
        assert!(validate_questions(&[]).is_err());
        assert!(validate_questions(&[question(1, 4, 3)]).is_ok());
    }

    #[test]
    fn answers_score_and_advance() {
        let mut quiz = quiz();

        let outcome = quiz.answer(Some(0)).unwrap();
        assert!(outcome.is_correct);
        let outcome = quiz.answer(Some(1)).unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.correct, 2);

        assert_eq!(quiz.current_index(), 2);
        assert_eq!(quiz.score(), 1);
        assert!(!quiz.is_finished());

        quiz.answer(Some(3));
        assert!(quiz.is_finished());
        assert_eq!(quiz.score(), 2);
        assert_eq!(quiz.percentage(), 67);
        assert!(quiz.answer(Some(0)).is_none());
    }

    #[test]
    fn timeout_counts_as_wrong_and_resets_clock() {
        let mut quiz = quiz();

        assert!(quiz.tick(10).is_none());
        assert_eq!(quiz.seconds_left(), 5);

        let outcome = quiz.tick(5).unwrap();
        assert_eq!(outcome.chosen, None);
        assert!(!outcome.is_correct);
        assert_eq!(quiz.current_index(), 1);
        assert_eq!(quiz.seconds_left(), SECONDS_PER_QUESTION);
        assert_eq!(quiz.score(), 0);
    }

    #[test]
    fn timeout_on_correct_index_zero_does_not_score() {
        let mut quiz = quiz();
        // the first question's answer is option 0
        let outcome = quiz.answer(None).unwrap();
        assert!(!outcome.is_correct);
    }
}
