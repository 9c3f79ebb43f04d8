//! Mascot mood and the message shown next to it.

mod engine;
mod message;

pub use engine::{mascot_state, MORNING_END, DAYTIME_END};
pub use message::MessageState;

use serde::{Deserialize, Serialize};

/// Derived mood driving the mascot animation and tone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MascotState {
    Happy,
    #[default]
    Neutral,
    Angry,
    Encouraging,
    ExtremelyHappy,
    Special,
}

impl MascotState {
    pub const ALL: [MascotState; 6] = [
        MascotState::Happy,
        MascotState::Neutral,
        MascotState::Angry,
        MascotState::Encouraging,
        MascotState::ExtremelyHappy,
        MascotState::Special,
    ];

    /// Persisted name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MascotState::Happy => "HAPPY",
            MascotState::Neutral => "NEUTRAL",
            MascotState::Angry => "ANGRY",
            MascotState::Encouraging => "ENCOURAGING",
            MascotState::ExtremelyHappy => "EXTREMELY_HAPPY",
            MascotState::Special => "SPECIAL",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Decode a persisted name. Anything unknown is treated as `Neutral`.
    pub fn decode_or_default(name: Option<&str>) -> Self {
        match name.and_then(Self::from_name) {
            Some(state) => state,
            None => {
                if let Some(bad) = name {
                    tracing::warn!(value = bad, "discarding unknown mascot state");
                }
                MascotState::Neutral
            }
        }
    }

    /// Animation asset the UI should play for this mood.
    pub fn animation(&self) -> &'static str {
        match self {
            MascotState::Happy => "happy_pet",
            MascotState::Neutral => "neutral_pet",
            MascotState::Angry => "angry_pet",
            MascotState::Encouraging => "encouraging_pet",
            MascotState::ExtremelyHappy => "extremely_happy_pet",
            MascotState::Special => "special_pet",
        }
    }
}

impl std::fmt::Display for MascotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
