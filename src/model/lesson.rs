//! Module and Section records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::Quiz;

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Difficulty tier inferred by the content generator from the module title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// A generated lesson unit.  Created unpublished; deleting it removes every
/// section and quiz that belongs to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub difficulty: Difficulty,
    /// Language the content (and narration) is produced in.
    pub language: String,
    pub estimated_duration_mins: u32,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// One page of lesson content.
///
/// `order_index` is zero-based and unique within `module_id`.  `audio_url` is
/// filled in after persistence by the audio stage and may legitimately stay
/// `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub content: String,
    pub order_index: u32,
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ModuleBundle
// ---------------------------------------------------------------------------

/// A module together with its sections and quizzes, as returned to callers
/// after a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleBundle {
    pub module: Module,
    pub sections: Vec<Section>,
    pub quizzes: Vec<Quiz>,
}

impl ModuleBundle {
    /// The quiz attached to `section_id`, if any.
    pub fn quiz_for(&self, section_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.section_id == section_id)
    }

    /// Number of sections that carry narrated audio.
    pub fn sections_with_audio(&self) -> usize {
        self.sections.iter().filter(|s| s.audio_url.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_serialises_lowercase() {
        let json = serde_json::to_string(&Difficulty::Intermediate).unwrap();
        assert_eq!(json, "\"intermediate\"");
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Advanced".parse::<Difficulty>(), Ok(Difficulty::Advanced));
        assert_eq!(" beginner ".parse::<Difficulty>(), Ok(Difficulty::Beginner));
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_display_matches_as_str() {
        for d in [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Advanced] {
            assert_eq!(d.to_string(), d.as_str());
        }
    }
}
