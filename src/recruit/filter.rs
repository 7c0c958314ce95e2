use crate::recruit::killboard::KillStats;

/// Minimum kill statistics a member must show to be kept
///
/// Each threshold applies on its own when set. Missing statistics count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    /// Ships destroyed must be at least this many
    pub min_destroyed_ships: Option<u64>,

    /// Efficiency must be strictly greater than this percentage
    pub min_efficiency: Option<f64>,
}

impl Thresholds {
    /// Builds thresholds from user input; zero means no threshold
    pub fn new(min_destroyed_ships: Option<u64>, min_efficiency: Option<f64>) -> Self {
        Self {
            min_destroyed_ships: min_destroyed_ships.filter(|n| *n > 0),
            min_efficiency: min_efficiency.filter(|n| *n > 0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_destroyed_ships.is_none() && self.min_efficiency.is_none()
    }

    pub fn admits(&self, stats: &KillStats) -> bool {
        let kills_ok = self
            .min_destroyed_ships
            .map_or(true, |min| stats.destroyed_ships.unwrap_or(0) >= min);
        let efficiency_ok = self
            .min_efficiency
            .map_or(true, |min| stats.efficiency.unwrap_or(0.0) > min);
        kills_ok && efficiency_ok
    }
}
