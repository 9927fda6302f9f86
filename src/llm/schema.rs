//! JSON schemas for structured output, and the typed replies they describe.
//!
//! Both schemas are sent in strict mode, so every property is listed under
//! `required` and optional values are modelled as `["<type>", "null"]`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::quiz::check_question_shape;
use crate::model::{Difficulty, InputType};

/// Sections per generated module.
pub const SECTIONS_PER_MODULE: usize = 5;
/// Questions per section quiz.
pub const QUESTIONS_PER_QUIZ: usize = 3;

// ---------------------------------------------------------------------------
// ResponseSchema
// ---------------------------------------------------------------------------

/// A named JSON schema pinned to a structured-output request.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl ResponseSchema {
    /// The `response_format` object for a chat-completions request.
    pub fn response_format(&self) -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": self.name,
                "strict": true,
                "schema": self.schema
            }
        })
    }
}

/// Schema for a generated module: description, topic, difficulty and exactly
/// five sections, each with a three-question quiz.
pub fn module_generation_schema() -> ResponseSchema {
    let question = json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["question_text", "input_type", "options", "correct_answer", "order_index"],
        "properties": {
            "question_text": {
                "type": "string",
                "description": "Q1 (voice): open-ended reflection. Q2 (multiple_choice): current section concept. Q3 (multiple_choice): spaced-repetition callback or synthesis."
            },
            "input_type": { "type": "string", "enum": ["text", "voice", "multiple_choice"] },
            "options": {
                "type": ["array", "null"],
                "items": { "type": "string" },
                "description": "multiple_choice only: exactly 4 short options (under 10 words). null otherwise."
            },
            "correct_answer": {
                "type": ["string", "null"],
                "description": "multiple_choice only: must equal one of the options exactly. null otherwise."
            },
            "order_index": { "type": "integer", "description": "Zero-based question position" }
        }
    });

    let section = json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["title", "content", "order_index", "quiz"],
        "properties": {
            "title": { "type": "string" },
            "content": {
                "type": "string",
                "description": "Socratic lesson text, 150-200 words: hook, exploration, core insight, real-world connection."
            },
            "order_index": { "type": "integer", "description": "Zero-based section position" },
            "quiz": {
                "type": "object",
                "additionalProperties": false,
                "required": ["title", "questions"],
                "properties": {
                    "title": { "type": "string", "description": "Usually \"Section N Quiz\"" },
                    "questions": {
                        "type": "array",
                        "minItems": QUESTIONS_PER_QUIZ,
                        "maxItems": QUESTIONS_PER_QUIZ,
                        "items": question
                    }
                }
            }
        }
    });

    ResponseSchema {
        name: "module_generation",
        schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["description", "topic", "difficulty", "sections"],
            "properties": {
                "description": {
                    "type": "string",
                    "description": "Under 50 words: what the learner will understand and why it matters."
                },
                "topic": {
                    "type": "string",
                    "description": "Broad category, e.g. \"Science\", \"History\", \"Language\"."
                },
                "difficulty": { "type": "string", "enum": ["beginner", "intermediate", "advanced"] },
                "sections": {
                    "type": "array",
                    "minItems": SECTIONS_PER_MODULE,
                    "maxItems": SECTIONS_PER_MODULE,
                    "items": section
                }
            }
        }),
    }
}

/// Schema for a grading reply: per-question correctness, an overall 0–100
/// score and short feedback.
pub fn quiz_evaluation_schema() -> ResponseSchema {
    ResponseSchema {
        name: "quiz_evaluation",
        schema: json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["question_evaluations", "overall_score", "feedback"],
            "properties": {
                "question_evaluations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["question_id", "is_correct"],
                        "properties": {
                            "question_id": { "type": "string" },
                            "is_correct": { "type": "boolean" }
                        }
                    }
                },
                "overall_score": { "type": "number", "description": "0-100" },
                "feedback": { "type": "string", "description": "2-3 encouraging sentences" }
            }
        }),
    }
}

// ---------------------------------------------------------------------------
// Generation reply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub input_type: InputType,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    pub order_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub title: String,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub title: String,
    pub content: String,
    pub order_index: u32,
    pub quiz: GeneratedQuiz,
}

/// An in-memory lesson tree as produced by the model, before persistence.
/// Question identifiers are assigned later, at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLesson {
    pub description: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub sections: Vec<GeneratedSection>,
}

impl GeneratedLesson {
    /// Parse a model reply and check its shape.
    ///
    /// Empty option lists and blank correct answers on open-ended questions
    /// are normalised to `None` before validation.
    pub fn parse(json: &str) -> Result<Self, String> {
        let mut lesson: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        lesson.normalize();
        lesson.validate()?;
        Ok(lesson)
    }

    fn normalize(&mut self) {
        for section in &mut self.sections {
            for q in &mut section.quiz.questions {
                if q.input_type.is_open_ended() {
                    if q.options.as_ref().is_some_and(|o| o.is_empty()) {
                        q.options = None;
                    }
                    if q.correct_answer.as_ref().is_some_and(|a| a.trim().is_empty()) {
                        q.correct_answer = None;
                    }
                }
            }
        }
    }

    /// Check section and question counts, contiguous order indexes and the
    /// multiple-choice shape of every question.
    pub fn validate(&self) -> Result<(), String> {
        if self.sections.len() != SECTIONS_PER_MODULE {
            return Err(format!(
                "expected {SECTIONS_PER_MODULE} sections, got {}",
                self.sections.len()
            ));
        }

        let mut section_indexes: Vec<u32> = self.sections.iter().map(|s| s.order_index).collect();
        section_indexes.sort_unstable();
        if section_indexes != (0..SECTIONS_PER_MODULE as u32).collect::<Vec<_>>() {
            return Err(format!(
                "section order_index values must be 0..{SECTIONS_PER_MODULE}, got {section_indexes:?}"
            ));
        }

        for section in &self.sections {
            if section.content.trim().is_empty() {
                return Err(format!("section {} has no content", section.order_index));
            }
            let questions = &section.quiz.questions;
            if questions.len() != QUESTIONS_PER_QUIZ {
                return Err(format!(
                    "section {} quiz has {} questions, expected {QUESTIONS_PER_QUIZ}",
                    section.order_index,
                    questions.len()
                ));
            }
            let mut q_indexes: Vec<u32> = questions.iter().map(|q| q.order_index).collect();
            q_indexes.sort_unstable();
            if q_indexes != (0..QUESTIONS_PER_QUIZ as u32).collect::<Vec<_>>() {
                return Err(format!(
                    "section {} question order_index values must be 0..{QUESTIONS_PER_QUIZ}, got {q_indexes:?}",
                    section.order_index
                ));
            }
            for q in questions {
                check_question(q)
                    .map_err(|e| format!("section {}: {e}", section.order_index))?;
            }
        }
        Ok(())
    }

    /// Sections sorted by `order_index`.
    pub fn ordered_sections(&self) -> Vec<&GeneratedSection> {
        let mut sections: Vec<&GeneratedSection> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.order_index);
        sections
    }
}

fn check_question(q: &GeneratedQuestion) -> Result<(), String> {
    check_question_shape(
        q.order_index,
        q.input_type,
        q.options.as_deref(),
        q.correct_answer.as_deref(),
    )
}

// ---------------------------------------------------------------------------
// Evaluation reply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEvaluation {
    pub question_id: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizEvaluationReply {
    pub question_evaluations: Vec<QuestionEvaluation>,
    pub overall_score: f64,
    pub feedback: String,
}

// ---------------------------------------------------------------------------
// Fixtures (test-only)
// ---------------------------------------------------------------------------

/// A well-formed five-section generation reply.
#[cfg(test)]
pub fn sample_lesson_json() -> String {
    let sections: Vec<Value> = (0..SECTIONS_PER_MODULE)
        .map(|i| {
            json!({
                "title": format!("Part {}", i + 1),
                "content": format!("Have you ever wondered about part {}? Let's explore.", i + 1),
                "order_index": i,
                "quiz": {
                    "title": format!("Section {} Quiz", i + 1),
                    "questions": [
                        {
                            "question_text": "Explain the idea in your own words.",
                            "input_type": "voice",
                            "options": null,
                            "correct_answer": null,
                            "order_index": 0
                        },
                        {
                            "question_text": "Which statement is true?",
                            "input_type": "multiple_choice",
                            "options": ["Light", "Sound", "Heat", "Wind"],
                            "correct_answer": "Light",
                            "order_index": 1
                        },
                        {
                            "question_text": "What did an earlier section show?",
                            "input_type": "multiple_choice",
                            "options": ["Water", "Sugar", "Salt", "Sand"],
                            "correct_answer": "Sugar",
                            "order_index": 2
                        }
                    ]
                }
            })
        })
        .collect();

    json!({
        "description": "Learn how plants turn light into food.",
        "topic": "Science",
        "difficulty": "beginner",
        "sections": sections
    })
    .to_string()
}
