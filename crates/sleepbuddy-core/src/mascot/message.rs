use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The line shown next to the mascot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    #[default]
    Default,
    ThirtyDayStreak,
    TargetStreak,
    GoalMet,
    GoalNotMet,
    ForgotToStop,
}

const THIRTY_DAY: &[&str] = &[
    "You're on fire! 30 days of consistent sleep. Your dog is throwing a little celebration in your honor.",
];

const TARGET: &[&str] = &[
    "Wow! You've hit your streak target. Your dog thinks you're the best sleeper ever! Keep it up!",
];

const GOAL_MET: &[&str] = &[
    "Look at that happy dog! You're crushing it. Keep up the great work!",
    "You did it! Another great night of sleep. Your dog is proud!",
    "Every night of good sleep is a step towards a healthier you!",
    "Each good night's rest is fueling your best self!",
    "Sweet dreams lead to brighter days! You're making fantastic progress!",
];

const GOAL_NOT_MET: &[&str] = &[
    "Your dog is disappointed... let's get back on track tonight!",
    "Let's try again tonight. Don't let the dog stay grumpy.",
];

const FORGOT_TO_STOP: &[&str] = &[
    "Looks like tracking was never stopped, so the dog is grumpy and the streak is reset. Don't forget to stop tracking when you wake up!",
];

const DEFAULT: &[&str] = &[
    "Keep up the good work! You're building great sleep habits!",
    "Prioritizing your sleep is one of the best things you can do for yourself.",
    "Reach 30 good nights in a row to unlock a special surprise for your dog!",
    "Every night counts. Rest well and wake up refreshed!",
    "Your future self will thank you for tonight's good sleep!",
    "Great sleep leads to great days!",
    "Early nights, brighter mornings. You're on the right track!",
];

impl MessageState {
    fn catalog(&self) -> &'static [&'static str] {
        match self {
            MessageState::Default => DEFAULT,
            MessageState::ThirtyDayStreak => THIRTY_DAY,
            MessageState::TargetStreak => TARGET,
            MessageState::GoalMet => GOAL_MET,
            MessageState::GoalNotMet => GOAL_NOT_MET,
            MessageState::ForgotToStop => FORGOT_TO_STOP,
        }
    }

    /// Pick one text for this message.
    pub fn text<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        self.catalog().choose(rng).copied().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageState::Default => "default",
            MessageState::ThirtyDayStreak => "thirty_day_streak",
            MessageState::TargetStreak => "target_streak",
            MessageState::GoalMet => "goal_met",
            MessageState::GoalNotMet => "goal_not_met",
            MessageState::ForgotToStop => "forgot_to_stop",
        }
    }

    /// Decode a persisted name, falling back to `Default`.
    pub fn decode_or_default(name: Option<&str>) -> Self {
        const ALL: [MessageState; 6] = [
            MessageState::Default,
            MessageState::ThirtyDayStreak,
            MessageState::TargetStreak,
            MessageState::GoalMet,
            MessageState::GoalNotMet,
            MessageState::ForgotToStop,
        ];
        name.and_then(|n| ALL.into_iter().find(|m| m.as_str() == n))
            .unwrap_or_default()
    }
}
