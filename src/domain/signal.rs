//! Scored trade signals and their tiers.

use crate::domain::regime::Regime;
use crate::domain::sector::Sector;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Tier1,
    Tier2,
    BelowThreshold,
}

/// Score cut points for [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub tier1_min: f64,
    pub tier2_min: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            tier1_min: 0.9,
            tier2_min: 0.8,
        }
    }
}

impl Tier {
    pub fn from_score(score: f64, thresholds: &TierThresholds) -> Self {
        if score >= thresholds.tier1_min {
            Tier::Tier1
        } else if score >= thresholds.tier2_min {
            Tier::Tier2
        } else {
            Tier::BelowThreshold
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Tier1 => "Tier 1",
            Tier::Tier2 => "Tier 2",
            Tier::BelowThreshold => "Below Threshold",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A long candidate produced by the scorer.
///
/// `priority` and `is_midcap` are filled in by the balancer; everything else
/// is fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub score: f64,
    pub tier: Tier,
    pub sector: Sector,
    pub sector_regime: Regime,
    pub market_regime: Regime,
    pub price: f64,
    pub volume: f64,
    pub priority: f64,
    pub is_midcap: bool,
}

impl Signal {
    /// Latest close times volume.
    pub fn notional(&self) -> f64 {
        self.price * self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_cut_points_are_inclusive() {
        let t = TierThresholds::default();
        assert_eq!(Tier::from_score(0.9, &t), Tier::Tier1);
        assert_eq!(Tier::from_score(0.8999, &t), Tier::Tier2);
        assert_eq!(Tier::from_score(0.8, &t), Tier::Tier2);
        assert_eq!(Tier::from_score(0.75, &t), Tier::BelowThreshold);
    }

    #[test]
    fn tier_labels() {
        assert_eq!(Tier::Tier1.to_string(), "Tier 1");
        assert_eq!(Tier::BelowThreshold.to_string(), "Below Threshold");
    }
}
