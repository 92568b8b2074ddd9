//! End-to-end scenarios for the master/slave pair.

use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// GT-001: Lossless link, two raise gestures
    SteadyDraw,

    /// GT-002: 30% datagram loss
    LossyLink,

    /// GT-003: Recorded file with junk round delimiters
    ReplayJunk,

    /// GT-004: Capture never connects, link partitioned
    Starvation,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SteadyDraw,
            ScenarioId::LossyLink,
            ScenarioId::ReplayJunk,
            ScenarioId::Starvation,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SteadyDraw => "steady_draw",
            ScenarioId::LossyLink => "lossy_link",
            ScenarioId::ReplayJunk => "replay_junk",
            ScenarioId::Starvation => "starvation",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SteadyDraw => "Four objects, trigger raised twice, every datagram delivered",
            ScenarioId::LossyLink => "Same performance over a link dropping 30% of datagrams",
            ScenarioId::ReplayJunk => "Replay of recorded rounds separated by junk lines, delimited ticks",
            ScenarioId::Starvation => "Capture device never connects and nothing reaches the slave",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady_draw" | "steadydraw" | "gt-001" => Ok(ScenarioId::SteadyDraw),
            "lossy_link" | "lossylink" | "gt-002" => Ok(ScenarioId::LossyLink),
            "replay_junk" | "replayjunk" | "gt-003" => Ok(ScenarioId::ReplayJunk),
            "starvation" | "gt-004" => Ok(ScenarioId::Starvation),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
