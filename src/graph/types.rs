//! Core types for the stargate graph.
//!
//! Defines system identities, security classification, and the data
//! stored on graph nodes (systems) and edges (stargates).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, store-assigned identity of a solar system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(pub u64);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constellation identity. Constellations are the cluster key used to
/// batch neighborhood loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstellationId(pub u64);

impl fmt::Display for ConstellationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u64);

/// Identity of a planet (the resource-bearing satellite of a system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanetId(pub u64);

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map position, already projected to 2-D. Only consumed by renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Coarse security classification of a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityClass {
    /// Security >= 0.45 (displayed as 0.5 and above).
    High,
    /// Positive security below the highsec threshold.
    Low,
    /// Security <= 0.0.
    Null,
}

impl SecurityClass {
    pub const HIGHSEC_THRESHOLD: f64 = 0.45;

    pub fn from_security(security: f64) -> Self {
        if security >= Self::HIGHSEC_THRESHOLD {
            SecurityClass::High
        } else if security > 0.0 {
            SecurityClass::Low
        } else {
            SecurityClass::Null
        }
    }
}

impl fmt::Display for SecurityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityClass::High => write!(f, "highsec"),
            SecurityClass::Low => write!(f, "lowsec"),
            SecurityClass::Null => write!(f, "nullsec"),
        }
    }
}

/// Upper bounds of the display bands, from the safest band (0) downwards.
const SECURITY_BANDS: [f64; 10] = [1.0, 0.9, 0.7, 0.5, 0.3, 0.1, -0.1, -0.3, -0.5, -0.7];

/// Map a security value onto the 0..=10 display band used by map renderers.
/// Band 0 is the safest, 10 the most dangerous.
pub fn security_band(security: f64) -> u8 {
    SECURITY_BANDS
        .iter()
        .position(|&threshold| security > threshold)
        .map(|band| band as u8)
        .unwrap_or(10)
}

/// Data stored in a graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemNode {
    pub id: SystemId,
    /// Unique system name (e.g., "Jita").
    pub name: String,
    pub security: f64,
    pub position: Position,
    pub constellation: ConstellationId,
    pub region: RegionId,
    /// Whether this system seeds the entry-flow analysis.
    pub is_entry: bool,
}

impl SystemNode {
    pub fn security_class(&self) -> SecurityClass {
        SecurityClass::from_security(self.security)
    }

    /// Systems taking part in the entry-flow analysis: nullsec systems
    /// (strictly negative security) and the entries themselves.
    pub fn in_flow_universe(&self) -> bool {
        self.is_entry || self.security < 0.0
    }
}

/// Data stored on a graph edge. Stargates carry no weight; every jump
/// costs one hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stargate;

/// How heavily an edge is used by retained entry routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteLoad {
    /// At most one system routes over the edge.
    Idle,
    Low,
    Medium,
    High,
}

impl RouteLoad {
    pub fn from_traffic(traffic: u32) -> Self {
        match traffic {
            t if t > 25 => RouteLoad::High,
            t if t > 10 => RouteLoad::Medium,
            t if t > 1 => RouteLoad::Low,
            _ => RouteLoad::Idle,
        }
    }
}

/// Richness grade of a planetary resource. Serialized in snake case,
/// parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Richness {
    Poor,
    Medium,
    Rich,
    Perfect,
}

impl FromStr for Richness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poor" => Ok(Richness::Poor),
            "medium" => Ok(Richness::Medium),
            "rich" => Ok(Richness::Rich),
            "perfect" => Ok(Richness::Perfect),
            other => Err(format!("unknown richness '{}'", other)),
        }
    }
}

impl TryFrom<String> for Richness {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Richness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Richness::Poor => write!(f, "poor"),
            Richness::Medium => write!(f, "medium"),
            Richness::Rich => write!(f, "rich"),
            Richness::Perfect => write!(f, "perfect"),
        }
    }
}

/// Allowed security window for route search. `min` is exclusive and `max`
/// inclusive, matching how the map tooling filters gate destinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SecurityBounds {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn allows(&self, security: f64) -> bool {
        if let Some(min) = self.min {
            if security <= min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if security > max {
                return false;
            }
        }
        true
    }
}
