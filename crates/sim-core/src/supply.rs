//! Supply-chain model owned by each team: supplier roster, active
//! disruptions and the derived vulnerability picture.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique supplier identifier within a team's roster.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub String);

impl fmt::Display for SupplierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sourcing and trade region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    NorthAmerica,
    SouthAmerica,
    Europe,
    EastAsia,
    SouthAsia,
    Africa,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Europe,
        Region::EastAsia,
        Region::SouthAsia,
        Region::Africa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "north_america",
            Region::SouthAmerica => "south_america",
            Region::Europe => "europe",
            Region::EastAsia => "east_asia",
            Region::SouthAsia => "south_asia",
            Region::Africa => "africa",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component family bought from suppliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Display,
    Processor,
    Memory,
    Battery,
    Camera,
    Chassis,
}

impl Material {
    pub const ALL: [Material; 6] = [
        Material::Display,
        Material::Processor,
        Material::Memory,
        Material::Battery,
        Material::Camera,
        Material::Chassis,
    ];
}

/// Supplier tier: tier 1 ships finished modules, tier 3 raw parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierTier {
    Tier1,
    Tier2,
    Tier3,
}

/// A supplier in a team's roster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub tier: SupplierTier,
    pub region: Region,
    pub material: Material,
    /// Delivery reliability in [0,1].
    pub reliability: f64,
    /// Component quality on 0–100.
    pub quality: f64,
    /// Labour and environmental practices on 0–100.
    pub ethics: f64,
    /// Units per round the supplier can deliver.
    pub capacity: u64,
    /// Cost per unit of output sourced from this supplier.
    pub unit_cost: Decimal,
    /// Relationship strength on 0–100. Persists across rounds.
    pub relationship: f64,
    /// Share of the team's sourcing volume placed with this supplier, in [0,1].
    pub volume_share: f64,
}

impl Supplier {
    /// Whether the supplier currently receives any volume.
    pub fn in_use(&self) -> bool {
        self.volume_share > 0.0
    }
}

/// Kind of supply disruption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionKind {
    NaturalDisaster,
    SupplierFailure,
    Logistics,
    TradeWar,
    Pandemic,
}

impl DisruptionKind {
    pub const ALL: [DisruptionKind; 5] = [
        DisruptionKind::NaturalDisaster,
        DisruptionKind::SupplierFailure,
        DisruptionKind::Logistics,
        DisruptionKind::TradeWar,
        DisruptionKind::Pandemic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisruptionKind::NaturalDisaster => "natural_disaster",
            DisruptionKind::SupplierFailure => "supplier_failure",
            DisruptionKind::Logistics => "logistics",
            DisruptionKind::TradeWar => "trade_war",
            DisruptionKind::Pandemic => "pandemic",
        }
    }
}

/// An active, time-boxed disruption.
///
/// Lifecycle: rolled (active, `rounds_remaining = duration`), decremented once
/// per round advance, removed when `rounds_remaining` reaches zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Disruption {
    pub id: String,
    pub kind: DisruptionKind,
    pub regions: Vec<Region>,
    /// Severity in [0,1].
    pub severity: f64,
    pub duration: u32,
    pub rounds_remaining: u32,
    /// Round in which the disruption started.
    pub started_round: u32,
}

impl Disruption {
    pub fn affects(&self, region: Region) -> bool {
        self.regions.contains(&region)
    }
}

/// Structural weakness flagged in a supply chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityKind {
    Concentration,
    Geographic,
    Quality,
    Ethical,
    Capacity,
}

/// Severity tier, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub kind: VulnerabilityKind,
    pub severity: Severity,
    pub mitigation_cost: Decimal,
    pub description: String,
}

/// Per-team supply-chain state.
///
/// Only supplier relationship strength evolves smoothly round to round; the
/// analytic fields are recomputed by the supply engine every round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainState {
    pub suppliers: Vec<Supplier>,
    pub disruptions: Vec<Disruption>,
    pub vulnerabilities: Vec<Vulnerability>,
    /// Share of volume placed with the top supplier.
    pub concentration: f64,
    /// Regions in use / all regions.
    pub geographic_diversity: f64,
    /// Units per round deliverable after disruptions and buffer.
    pub effective_capacity: u64,
    pub cost_multiplier: f64,
    /// Relationship-weighted component quality after disruption penalties.
    pub quality_impact: f64,
    /// Safety-stock buffer as a fraction of capacity.
    pub safety_stock: f64,
    /// Monotonic counter for disruption ids.
    pub next_disruption_seq: u64,
}

impl SupplyChainState {
    pub fn supplier(&self, id: &SupplierId) -> Option<&Supplier> {
        self.suppliers.iter().find(|s| &s.id == id)
    }

    pub fn supplier_mut(&mut self, id: &SupplierId) -> Option<&mut Supplier> {
        self.suppliers.iter_mut().find(|s| &s.id == id)
    }

    pub fn total_volume(&self) -> f64 {
        self.suppliers.iter().map(|s| s.volume_share.max(0.0)).sum()
    }
}
