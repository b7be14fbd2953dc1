//! Scientific Domain Contract
//!
//! The fixed set of domains an investigation can be routed to. The order of
//! [`Domain::ALL`] is the tie-break priority used by the classifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scientific domain of an investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Physics,
    Chemistry,
    Biology,
    Environmental,
    Engineering,
    Medicine,
}

impl Domain {
    /// All domains, highest priority first.
    pub const ALL: [Domain; 6] = [
        Domain::Physics,
        Domain::Chemistry,
        Domain::Biology,
        Domain::Environmental,
        Domain::Engineering,
        Domain::Medicine,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Physics => "physics",
            Self::Chemistry => "chemistry",
            Self::Biology => "biology",
            Self::Environmental => "environmental",
            Self::Engineering => "engineering",
            Self::Medicine => "medicine",
        }
    }

    /// Tie-break rank; lower wins.
    pub fn priority(&self) -> usize {
        Self::ALL
            .iter()
            .position(|d| d == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Short phrase describing the body of theory behind the domain.
    pub fn theoretical_context(&self) -> &'static str {
        match self {
            Self::Physics => "physical principles and mathematical relationships",
            Self::Chemistry => "chemical kinetics and thermodynamic principles",
            Self::Biology => "biological processes and ecological relationships",
            Self::Environmental => "environmental interactions and sustainability factors",
            Self::Engineering => "material behaviour and design constraints",
            Self::Medicine => "pharmacological and physiological relationships",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown domain name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == normalized)
            .ok_or(UnknownDomain(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(Domain::Physics.priority() < Domain::Chemistry.priority());
        assert!(Domain::Engineering.priority() < Domain::Medicine.priority());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Chemistry".parse::<Domain>().unwrap(), Domain::Chemistry);
        assert_eq!(Domain::Environmental.to_string(), "environmental");
        assert!("astrology".parse::<Domain>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Domain::Medicine).unwrap();
        assert_eq!(json, "\"medicine\"");
    }
}
