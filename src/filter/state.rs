use serde::{Deserialize, Serialize};

/// Filter lifecycle states as the host media framework defines them.
///
/// Transitions between any pair are valid and each call is idempotent with
/// respect to its target state; hosts may skip `Paused` entirely. Deviating
/// from the three-state any-to-any model is the classic way to get a plugin
/// rejected outright, so it is implemented literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LifecycleState {
    #[default]
    Stopped,
    Paused,
    Running,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Paused => "Paused",
            Self::Running => "Running",
        }
    }
}
