//! Prompt text for lesson generation and quiz grading.
//!
//! [`generation_messages`] builds the `(system, user)` pair for a module
//! title; when the target language is not English a directive is appended
//! so that every string in the reply is written in that language.
//! [`evaluation_messages`] builds the grading pair from the section text and
//! the learner's responses.

use crate::model::InputType;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Content policy for generated modules.
pub const GENERATION_SYSTEM_INSTRUCTION: &str = "\
You are a Socratic tutor who writes short, memorable lessons. Guide the learner
to discover each idea through questions instead of stating facts outright.

Module structure:
- Exactly 5 sections, each about 150-200 words (roughly one minute of reading).
- Every section follows: Hook (a provocative question or relatable scenario),
  Exploration (walk through the concept with questions and everyday analogies),
  Core Insight (the memorable takeaway), Connection (a real-world link or a
  bridge to the next section).
- Speak directly to the learner as \"you\". Address common misconceptions.

Description: under 50 words, stating what the learner will understand and why
it matters. Topic: a broad category. Difficulty: infer beginner, intermediate
or advanced from the title and pitch the scaffolding accordingly.

Quizzes: every section has exactly 3 questions, in this order.
1. input_type \"voice\": an open-ended question asking the learner to explain
   the idea in their own words. options and correct_answer are null.
2. input_type \"multiple_choice\": tests the current section's core concept.
   Distractors are plausible misconceptions.
3. input_type \"multiple_choice\": spaced repetition.
   - Section 1: another question on the current section.
   - Section 2: a callback to section 1.
   - Section 3: a callback to section 1 or 2.
   - Section 4: a callback to section 2 or 3.
   - Section 5: a synthesis question combining several earlier sections.
Multiple-choice questions have exactly 4 options of under 10 words, and
correct_answer must match one option exactly.

Use zero-based order_index values for sections and questions. Keep text clean
and avoid characters that could break JSON.";

/// The language every module is written in unless the caller asks otherwise.
pub const DEFAULT_LANGUAGE: &str = "English";

/// `true` when `language` needs no extra output-language directive.
pub fn is_default_language(language: &str) -> bool {
    let l = language.trim();
    l.is_empty() || l.eq_ignore_ascii_case(DEFAULT_LANGUAGE) || l.eq_ignore_ascii_case("en")
}

/// Build the `(system, user)` pair for generating a module titled `title`.
///
/// ```rust
/// use tutor_talk::llm::prompt::generation_messages;
///
/// let (system, user) = generation_messages("Tides", "Spanish");
/// assert!(system.contains("Spanish"));
/// assert!(user.contains("\"Tides\""));
/// ```
pub fn generation_messages(title: &str, language: &str) -> (String, String) {
    let mut system = String::with_capacity(GENERATION_SYSTEM_INSTRUCTION.len() + 256);
    system.push_str(GENERATION_SYSTEM_INSTRUCTION);

    if !is_default_language(language) {
        system.push_str(&format!(
            "\n\nLANGUAGE: Write ALL output in {language}. This includes the description, \
             topic, section titles, section content, quiz titles, questions, options and \
             correct answers. Do not mix in English."
        ));
    }

    let user = format!("Create a learning module titled: \"{title}\"");
    (system, user)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Grading rubric for open-ended answers.
pub const EVALUATION_SYSTEM_INSTRUCTION: &str = "\
You grade quiz answers for a learning platform. Judge conceptual understanding,
not exact wording, and accept any valid way of expressing an idea.

For voice and text answers weigh:
1. Conceptual accuracy: does the response show the idea is understood?
2. Completeness: are the key concepts addressed?
3. Clarity: is the explanation coherent?

Scoring bands:
- 90-100: excellent, all key concepts accurate
- 70-89: good, minor gaps or imprecision
- 50-69: partial, significant gaps but some correct elements
- 30-49: limited, mostly incorrect with some awareness
- 0-29: no demonstrated understanding

Feedback: 2-3 sentences. Name something done well and, if useful, one thing
to improve. Stay encouraging.";

/// One question as presented to the grader.
#[derive(Debug, Clone)]
pub struct QuestionForGrading<'a> {
    pub id: &'a str,
    pub question_text: &'a str,
    pub input_type: InputType,
    pub correct_answer: Option<&'a str>,
    pub user_response: &'a str,
}

impl QuestionForGrading<'_> {
    /// Local correctness for multiple-choice questions; `None` otherwise.
    pub fn precomputed(&self) -> Option<bool> {
        match self.input_type {
            InputType::MultipleChoice => Some(self.correct_answer == Some(self.user_response)),
            InputType::Text | InputType::Voice => None,
        }
    }
}

/// Build the `(system, user)` pair for grading `questions` against the
/// section they belong to.
pub fn evaluation_messages(
    section_title: &str,
    section_content: &str,
    questions: &[QuestionForGrading<'_>],
) -> (String, String) {
    let blocks: Vec<String> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| match q.precomputed() {
            Some(correct) => format!(
                "Question {n} (Multiple Choice) [ID: {id}]:\n\
                 Question: {text}\n\
                 Correct Answer: {answer}\n\
                 Student Response: {resp}\n\
                 Pre-evaluated: {verdict}",
                n = i + 1,
                id = q.id,
                text = q.question_text,
                answer = q.correct_answer.unwrap_or_default(),
                resp = q.user_response,
                verdict = if correct { "CORRECT" } else { "INCORRECT" },
            ),
            None => format!(
                "Question {n} ({kind}) [ID: {id}]:\n\
                 Question: {text}\n\
                 Student Response: {resp}",
                n = i + 1,
                kind = if q.input_type == InputType::Voice {
                    "Voice Response"
                } else {
                    "Text Response"
                },
                id = q.id,
                text = q.question_text,
                resp = q.user_response,
            ),
        })
        .collect();

    let user = format!(
        "## Learning Context\n\
         Section Title: {section_title}\n\
         Section Content:\n{section_content}\n\n\
         ## Quiz Responses to Evaluate\n{questions}\n\n\
         ## Instructions\n\
         1. Multiple choice correctness is pre-determined: score 100 if CORRECT, 0 if INCORRECT.\n\
         2. Grade voice/text responses against the learning content above.\n\
         3. overall_score is the average of all question scores.\n\
         4. Return one entry in question_evaluations per question, using its ID.\n\
         5. Give brief, encouraging feedback (2-3 sentences).",
        questions = blocks.join("\n\n"),
    );

    (EVALUATION_SYSTEM_INSTRUCTION.to_string(), user)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_gets_no_language_directive() {
        let (system, _) = generation_messages("Tides", "English");
        assert!(!system.contains("LANGUAGE:"));
        let (system, _) = generation_messages("Tides", "en");
        assert!(!system.contains("LANGUAGE:"));
    }

    #[test]
    fn other_language_gets_directive() {
        let (system, _) = generation_messages("Mareas", "Español");
        assert!(system.contains("LANGUAGE: Write ALL output in Español"));
    }

    #[test]
    fn system_prompt_encodes_callback_rule() {
        assert!(GENERATION_SYSTEM_INSTRUCTION.contains("Exactly 5 sections"));
        assert!(GENERATION_SYSTEM_INSTRUCTION.contains("Section 4: a callback to section 2 or 3"));
        assert!(GENERATION_SYSTEM_INSTRUCTION.contains("Section 5: a synthesis"));
    }

    #[test]
    fn evaluation_prompt_marks_multiple_choice_verdicts() {
        let questions = [
            QuestionForGrading {
                id: "mc-1",
                question_text: "Pick one",
                input_type: InputType::MultipleChoice,
                correct_answer: Some("B"),
                user_response: "A",
            },
            QuestionForGrading {
                id: "v-1",
                question_text: "Explain",
                input_type: InputType::Voice,
                correct_answer: None,
                user_response: "Because light",
            },
        ];
        let (system, user) = evaluation_messages("Light", "Plants use light.", &questions);

        assert!(system.contains("90-100"));
        assert!(user.contains("Section Content:\nPlants use light."));
        assert!(user.contains("[ID: mc-1]"));
        assert!(user.contains("Pre-evaluated: INCORRECT"));
        assert!(user.contains("Question 2 (Voice Response) [ID: v-1]"));
        assert!(!user.contains("Correct Answer: \n"));
    }

    #[test]
    fn precomputed_only_for_multiple_choice() {
        let mut q = QuestionForGrading {
            id: "x",
            question_text: "?",
            input_type: InputType::MultipleChoice,
            correct_answer: Some("yes"),
            user_response: "yes",
        };
        assert_eq!(q.precomputed(), Some(true));
        q.input_type = InputType::Text;
        assert_eq!(q.precomputed(), None);
    }
}
