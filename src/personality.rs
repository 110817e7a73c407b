//! Fixed personality presets
//!
//! A personality selects the system instruction sent to the generation API.
//! The set is closed: the selector in the UI offers exactly these four.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of a personality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityId {
    #[default]
    GeneralAssistant,
    StudyBuddy,
    FitnessCoach,
    GamingHelper,
}

impl PersonalityId {
    /// Every preset, in selector order
    pub const ALL: [Self; 4] = [
        Self::GeneralAssistant,
        Self::StudyBuddy,
        Self::FitnessCoach,
        Self::GamingHelper,
    ];

    /// Wire identifier (matches the serde representation)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GeneralAssistant => "general_assistant",
            Self::StudyBuddy => "study_buddy",
            Self::FitnessCoach => "fitness_coach",
            Self::GamingHelper => "gaming_helper",
        }
    }

    /// Parse a wire identifier or a display name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns `PersonalityNotFound` if nothing matches
    pub fn parse(value: &str) -> Result<Self> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|id| {
                id.as_str().eq_ignore_ascii_case(needle)
                    || id.personality().name.eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| Error::PersonalityNotFound(value.to_string()))
    }

    /// Resolve to the static preset
    #[must_use]
    pub const fn personality(self) -> &'static Personality {
        match self {
            Self::GeneralAssistant => &PERSONALITIES[0],
            Self::StudyBuddy => &PERSONALITIES[1],
            Self::FitnessCoach => &PERSONALITIES[2],
            Self::GamingHelper => &PERSONALITIES[3],
        }
    }
}

impl std::fmt::Display for PersonalityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named system-instruction preset
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Personality {
    pub id: PersonalityId,
    pub name: &'static str,
    /// System instruction sent with every generation call
    pub instruction: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// The preset table
pub static PERSONALITIES: [Personality; 4] = [
    Personality {
        id: PersonalityId::GeneralAssistant,
        name: "General Assistant",
        instruction: "You are a helpful and friendly AI assistant. Provide clear, accurate, and helpful responses to any questions or tasks.",
        icon: "🤖",
        description: "A versatile AI helper for all your questions",
    },
    Personality {
        id: PersonalityId::StudyBuddy,
        name: "Study Buddy",
        instruction: "You are a patient and encouraging study companion. Help users learn by explaining concepts clearly, providing examples, and asking questions to check understanding. Break down complex topics into digestible parts.",
        icon: "📚",
        description: "Your patient learning companion",
    },
    Personality {
        id: PersonalityId::FitnessCoach,
        name: "Fitness Coach",
        instruction: "You are an enthusiastic and motivating fitness coach. Provide workout advice, nutrition tips, and encouragement. Focus on health, safety, and sustainable fitness habits. Always remind users to consult healthcare professionals for medical concerns.",
        icon: "💪",
        description: "Your motivating fitness partner",
    },
    Personality {
        id: PersonalityId::GamingHelper,
        name: "Gaming Helper",
        instruction: "You are an experienced gaming enthusiast. Help with game strategies, tips, walkthroughs, and recommendations. Be excited about gaming while providing practical advice.",
        icon: "🎮",
        description: "Your gaming strategy advisor",
    },
];
