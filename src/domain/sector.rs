//! Sector classification, proxy ETFs and sector weights.

use crate::domain::sector_table::DEFAULT_SECTOR_TABLE;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sector {
    Technology,
    Financials,
    Healthcare,
    Energy,
    Industrials,
    ConsumerDiscretionary,
    ConsumerStaples,
    Materials,
    Utilities,
    RealEstate,
    CommunicationServices,
    Unknown,
}

impl Sector {
    /// Every sector with a proxy ETF, in proxy lookup order.
    pub const TRADED: [Sector; 11] = [
        Sector::Technology,
        Sector::Financials,
        Sector::Healthcare,
        Sector::Energy,
        Sector::Industrials,
        Sector::ConsumerDiscretionary,
        Sector::ConsumerStaples,
        Sector::Materials,
        Sector::Utilities,
        Sector::RealEstate,
        Sector::CommunicationServices,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sector::Technology => "Technology",
            Sector::Financials => "Financials",
            Sector::Healthcare => "Healthcare",
            Sector::Energy => "Energy",
            Sector::Industrials => "Industrials",
            Sector::ConsumerDiscretionary => "Consumer Discretionary",
            Sector::ConsumerStaples => "Consumer Staples",
            Sector::Materials => "Materials",
            Sector::Utilities => "Utilities",
            Sector::RealEstate => "Real Estate",
            Sector::CommunicationServices => "Communication Services",
            Sector::Unknown => "Unknown",
        }
    }

    /// Ticker of the ETF used as a stand-in for the sector.
    pub fn proxy_etf(self) -> Option<&'static str> {
        match self {
            Sector::Technology => Some("XLK"),
            Sector::Financials => Some("XLF"),
            Sector::Healthcare => Some("XLV"),
            Sector::Energy => Some("XLE"),
            Sector::Industrials => Some("XLI"),
            Sector::ConsumerDiscretionary => Some("XLY"),
            Sector::ConsumerStaples => Some("XLP"),
            Sector::Materials => Some("XLB"),
            Sector::Utilities => Some("XLU"),
            Sector::RealEstate => Some("XLRE"),
            Sector::CommunicationServices => Some("XLC"),
            Sector::Unknown => None,
        }
    }

    /// Default weight applied to signal priority and position size.
    pub fn default_weight(self) -> f64 {
        match self {
            Sector::CommunicationServices => 2.0,
            Sector::Industrials => 1.8,
            Sector::Technology | Sector::Utilities => 1.5,
            Sector::Financials | Sector::Healthcare => 1.4,
            Sector::ConsumerDiscretionary => 1.3,
            Sector::Materials => 1.2,
            Sector::Energy | Sector::ConsumerStaples => 1.1,
            Sector::RealEstate => 0.8,
            Sector::Unknown => 1.0,
        }
    }

    /// Config-friendly key, e.g. `consumer_discretionary`.
    pub fn key(self) -> String {
        self.name().to_lowercase().replace(' ', "_")
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sector {
    type Err = String;

    /// Accepts the display name, the snake_case key or the proxy ticker.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace(['_', '-'], " ");
        Sector::TRADED
            .iter()
            .chain(std::iter::once(&Sector::Unknown))
            .copied()
            .find(|sector| {
                sector.name().to_lowercase() == needle
                    || sector
                        .proxy_etf()
                        .is_some_and(|etf| etf.eq_ignore_ascii_case(s.trim()))
            })
            .ok_or_else(|| format!("unknown sector '{}'", s))
    }
}

/// Symbol to sector lookup with an `Unknown` fallback.
#[derive(Debug, Clone)]
pub struct SectorMap {
    lookup: HashMap<String, Sector>,
}

impl Default for SectorMap {
    fn default() -> Self {
        Self::from_table(DEFAULT_SECTOR_TABLE)
    }
}

impl SectorMap {
    pub fn from_table(table: &[(Sector, &[&str])]) -> Self {
        let mut lookup = HashMap::new();
        for (sector, symbols) in table {
            for symbol in *symbols {
                lookup.entry(symbol.to_string()).or_insert(*sector);
            }
        }
        Self { lookup }
    }

    pub fn with_override(mut self, symbol: &str, sector: Sector) -> Self {
        self.lookup.insert(symbol.trim().to_uppercase(), sector);
        self
    }

    pub fn sector_of(&self, symbol: &str) -> Sector {
        self.lookup
            .get(&symbol.trim().to_uppercase())
            .copied()
            .unwrap_or(Sector::Unknown)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// Per-sector multipliers, falling back to [`Sector::default_weight`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorWeights {
    overrides: HashMap<Sector, f64>,
}

impl SectorWeights {
    pub fn with_weight(mut self, sector: Sector, weight: f64) -> Self {
        self.overrides.insert(sector, weight);
        self
    }

    pub fn weight(&self, sector: Sector) -> f64 {
        self.overrides
            .get(&sector)
            .copied()
            .unwrap_or_else(|| sector.default_weight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_listed_sector_wins() {
        let map = SectorMap::default();
        // AMZN is listed under both Technology and Consumer Discretionary
        assert_eq!(map.sector_of("AMZN"), Sector::Technology);
        assert_eq!(map.sector_of("GOOGL"), Sector::Technology);
        assert_eq!(map.sector_of("VZ"), Sector::CommunicationServices);
    }

    #[test]
    fn unmapped_symbol_is_unknown() {
        let map = SectorMap::default();
        assert_eq!(map.sector_of("ZZZZ"), Sector::Unknown);
        assert_eq!(map.sector_of(""), Sector::Unknown);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(SectorMap::default().sector_of("jpm"), Sector::Financials);
    }

    #[test]
    fn override_replaces_table_entry() {
        let map = SectorMap::default().with_override("amzn", Sector::ConsumerDiscretionary);
        assert_eq!(map.sector_of("AMZN"), Sector::ConsumerDiscretionary);
    }

    #[test]
    fn every_traded_sector_has_a_proxy() {
        for sector in Sector::TRADED {
            assert!(sector.proxy_etf().is_some(), "{} has no proxy", sector);
        }
        assert_eq!(Sector::Unknown.proxy_etf(), None);
    }

    #[test]
    fn parses_names_keys_and_tickers() {
        assert_eq!("Real Estate".parse::<Sector>().unwrap(), Sector::RealEstate);
        assert_eq!(
            "consumer_discretionary".parse::<Sector>().unwrap(),
            Sector::ConsumerDiscretionary
        );
        assert_eq!("xlk".parse::<Sector>().unwrap(), Sector::Technology);
        assert!("Crypto".parse::<Sector>().is_err());
    }

    #[test]
    fn weights_fall_back_to_defaults() {
        let weights = SectorWeights::default().with_weight(Sector::Energy, 0.5);
        assert!((weights.weight(Sector::Energy) - 0.5).abs() < f64::EPSILON);
        assert!((weights.weight(Sector::CommunicationServices) - 2.0).abs() < f64::EPSILON);
        assert!((weights.weight(Sector::Unknown) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn key_is_snake_case() {
        assert_eq!(Sector::CommunicationServices.key(), "communication_services");
    }
}
