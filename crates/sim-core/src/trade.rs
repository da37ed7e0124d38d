//! Global trade regime: tariffs, trade agreements and geopolitical events.

use crate::supply::{Material, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Directed shipping route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeRoute {
    pub origin: Region,
    pub destination: Region,
}

impl TradeRoute {
    pub fn new(origin: Region, destination: Region) -> Self {
        Self {
            origin,
            destination,
        }
    }

    pub fn touches(&self, region: Region) -> bool {
        self.origin == region || self.destination == region
    }
}

/// Which materials a tariff applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialScope {
    #[default]
    All,
    Only(Material),
}

impl MaterialScope {
    pub fn covers(&self, material: Material) -> bool {
        match self {
            MaterialScope::All => true,
            MaterialScope::Only(m) => *m == material,
        }
    }
}

/// A time-boxed surcharge on a route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub id: String,
    pub name: String,
    pub route: TradeRoute,
    #[serde(default)]
    pub materials: MaterialScope,
    /// Surcharge as a fraction of material cost (0.25 = 25%).
    pub rate: f64,
    pub effective_round: u32,
    /// First round in which the tariff no longer applies; `None` = open-ended.
    #[serde(default)]
    pub expiry_round: Option<u32>,
    /// Heuristic volatility in [0,1], drives the forecast.
    #[serde(default)]
    pub volatility: f64,
}

impl Tariff {
    pub fn active_in(&self, round: u32) -> bool {
        self.effective_round <= round && self.expiry_round.map_or(true, |end| round < end)
    }

    pub fn applies(&self, route: TradeRoute, material: Material, round: u32) -> bool {
        self.route == route && self.materials.covers(material) && self.active_in(round)
    }
}

/// A bloc agreement reducing tariffs on routes between its members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeAgreement {
    pub id: String,
    pub name: String,
    pub members: Vec<Region>,
    /// Fractional reduction in [0,1] applied multiplicatively.
    pub reduction: f64,
    #[serde(default)]
    pub expiry_round: Option<u32>,
}

impl TradeAgreement {
    pub fn covers(&self, route: TradeRoute, round: u32) -> bool {
        self.members.contains(&route.origin)
            && self.members.contains(&route.destination)
            && self.expiry_round.map_or(true, |end| round < end)
    }
}

/// Kind of geopolitical event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeopoliticalKind {
    Sanctions,
    BorderDispute,
    Election,
    TradeSummit,
    CurrencyCrisis,
    Embargo,
}

impl GeopoliticalKind {
    /// Whether the event eases trade instead of restricting it.
    pub fn is_relief(&self) -> bool {
        matches!(self, GeopoliticalKind::TradeSummit)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeopoliticalEvent {
    pub id: String,
    pub kind: GeopoliticalKind,
    pub name: String,
    pub regions: Vec<Region>,
    /// Severity in [0,1].
    pub severity: f64,
    pub rounds_remaining: u32,
    pub started_round: u32,
}

/// Regional stance towards trade; biases the tariff forecast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStance {
    FreeTrade,
    #[default]
    Neutral,
    Protectionist,
}

/// Versioned snapshot of the global trade regime for one round.
///
/// Shared across teams; advanced once per round before any team-specific
/// calculation and then read-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffState {
    /// Round this snapshot belongs to.
    pub version: u32,
    pub tariffs: Vec<Tariff>,
    pub agreements: Vec<TradeAgreement>,
    pub events: Vec<GeopoliticalEvent>,
    pub stances: BTreeMap<Region, PolicyStance>,
    /// Scripted template id -> last round it fired.
    pub fired_templates: BTreeMap<String, u32>,
    /// Monotonic counter for generated ids.
    pub next_seq: u64,
}

impl TariffState {
    pub fn stance(&self, region: Region) -> PolicyStance {
        self.stances.get(&region).copied().unwrap_or_default()
    }

    pub fn next_id(&mut self, prefix: &str) -> String {
        self.next_seq += 1;
        format!("{prefix}-{}", self.next_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tariff(rate: f64, effective: u32, expiry: Option<u32>) -> Tariff {
        Tariff {
            id: "t".into(),
            name: "t".into(),
            route: TradeRoute::new(Region::EastAsia, Region::NorthAmerica),
            materials: MaterialScope::Only(Material::Processor),
            rate,
            effective_round: effective,
            expiry_round: expiry,
            volatility: 0.1,
        }
    }

    #[test]
    fn tariff_window_is_half_open() {
        let t = tariff(0.1, 2, Some(5));
        assert!(!t.active_in(1));
        assert!(t.active_in(2));
        assert!(t.active_in(4));
        assert!(!t.active_in(5));
    }

    #[test]
    fn tariff_matches_route_and_material() {
        let t = tariff(0.1, 0, None);
        let route = TradeRoute::new(Region::EastAsia, Region::NorthAmerica);
        assert!(t.applies(route, Material::Processor, 3));
        assert!(!t.applies(route, Material::Battery, 3));
        let reverse = TradeRoute::new(Region::NorthAmerica, Region::EastAsia);
        assert!(!t.applies(reverse, Material::Processor, 3));
    }

    #[test]
    fn agreement_requires_both_members() {
        let a = TradeAgreement {
            id: "a".into(),
            name: "a".into(),
            members: vec![Region::Europe, Region::Africa],
            reduction: 0.5,
            expiry_round: None,
        };
        assert!(a.covers(TradeRoute::new(Region::Africa, Region::Europe), 1));
        assert!(!a.covers(TradeRoute::new(Region::EastAsia, Region::Europe), 1));
    }
}
