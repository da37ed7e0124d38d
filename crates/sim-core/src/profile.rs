//! Game configuration profile.
//!
//! A profile is loaded once per game from YAML. Every section falls back to
//! the standard values, so a file only needs to name what it overrides.
//! Loading validates the whole profile; an invalid profile is a fatal error.

use crate::decisions::Channel;
use crate::market::{
    EconomicPhase, FeatureVector, MarketState, Segment, SegmentMarket, SegmentProfile,
    SegmentWeights,
};
use crate::supply::{
    DisruptionKind, Material, Region, Supplier, SupplierId, SupplierTier, SupplyChainState,
    VulnerabilityKind,
};
use crate::team::{Factory, Product, ProductStatus, TeamCounters, TeamId, TeamState, Workforce};
use crate::trade::{
    GeopoliticalKind, MaterialScope, PolicyStance, Tariff, TariffState, TradeAgreement, TradeRoute,
};
use crate::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Difficulty level of a game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

/// Errors produced while loading a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to parse profile: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read profile from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid profile: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub segment: Segment,
    pub quality: f64,
    pub features: FeatureVector,
    pub price: Decimal,
    pub unit_cost: Decimal,
}

/// Conditions every team starts the game with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingConditions {
    pub cash: Decimal,
    pub brand_value: f64,
    pub esg_score: f64,
    pub workforce: Workforce,
    pub factories: Vec<Factory>,
    pub products: Vec<ProductSeed>,
    pub suppliers: Vec<Supplier>,
    pub safety_stock: f64,
}

impl Default for StartingConditions {
    fn default() -> Self {
        let supplier = |id: &str,
                        name: &str,
                        tier: SupplierTier,
                        region: Region,
                        material: Material,
                        (reliability, quality, ethics): (f64, f64, f64),
                        capacity: u64,
                        unit_cost: i64,
                        volume_share: f64| Supplier {
            id: SupplierId(id.to_string()),
            name: name.to_string(),
            tier,
            region,
            material,
            reliability,
            quality,
            ethics,
            capacity,
            unit_cost: Decimal::new(unit_cost, 0),
            relationship: 50.0,
            volume_share,
        };
        Self {
            cash: Decimal::new(5_000_000, 0),
            brand_value: 0.3,
            esg_score: 500.0,
            workforce: Workforce {
                headcount: 200,
                morale: 60.0,
                efficiency: 60.0,
                turnover_rate: 0.08,
                salary_index: 1.0,
            },
            factories: vec![
                Factory {
                    id: "plant-1".into(),
                    region: Region::EastAsia,
                    efficiency: 0.75,
                    capacity: 40_000,
                    defect_rate: 0.04,
                },
                Factory {
                    id: "plant-2".into(),
                    region: Region::SouthAsia,
                    efficiency: 0.70,
                    capacity: 30_000,
                    defect_rate: 0.05,
                },
            ],
            products: vec![
                ProductSeed {
                    name: "Core".into(),
                    segment: Segment::General,
                    quality: 55.0,
                    features: FeatureVector::uniform(50.0),
                    price: Decimal::new(420, 0),
                    unit_cost: Decimal::new(90, 0),
                },
                ProductSeed {
                    name: "Lite".into(),
                    segment: Segment::Budget,
                    quality: 45.0,
                    features: FeatureVector {
                        battery: 60.0,
                        durability: 55.0,
                        ..FeatureVector::uniform(35.0)
                    },
                    price: Decimal::new(170, 0),
                    unit_cost: Decimal::new(40, 0),
                },
            ],
            suppliers: vec![
                supplier(
                    "shenzhen-display",
                    "Shenzhen Display Works",
                    SupplierTier::Tier1,
                    Region::EastAsia,
                    Material::Display,
                    (0.92, 78.0, 55.0),
                    60_000,
                    42,
                    0.45,
                ),
                supplier(
                    "hsinchu-silicon",
                    "Hsinchu Silicon",
                    SupplierTier::Tier1,
                    Region::EastAsia,
                    Material::Processor,
                    (0.95, 88.0, 70.0),
                    50_000,
                    65,
                    0.30,
                ),
                supplier(
                    "pune-casings",
                    "Pune Casings",
                    SupplierTier::Tier2,
                    Region::SouthAsia,
                    Material::Chassis,
                    (0.85, 70.0, 62.0),
                    40_000,
                    18,
                    0.15,
                ),
                supplier(
                    "monterrey-cells",
                    "Monterrey Cells",
                    SupplierTier::Tier2,
                    Region::NorthAmerica,
                    Material::Battery,
                    (0.88, 74.0, 80.0),
                    30_000,
                    24,
                    0.10,
                ),
            ],
            safety_stock: 0.05,
        }
    }
}

/// Scoring and softmax parameters for segment allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Softmax temperature on the 0–100 score scale. Lower favours the leader.
    pub temperature: f64,
    /// Fraction below the price floor tolerated without penalty.
    pub underprice_threshold: f64,
    /// Maximum score points lost to under-floor pricing.
    pub underprice_penalty_cap: f64,
    /// Spend that buys one point (0.01) of segment awareness.
    pub awareness_spend_per_point: Decimal,
    /// Cap on the awareness bonus added to brand value in a segment.
    pub max_awareness_bonus: f64,
    /// Weight of supplier quality in effective product quality.
    pub supply_quality_weight: f64,
    pub channel_effectiveness: BTreeMap<Channel, f64>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            temperature: 8.0,
            underprice_threshold: 0.10,
            underprice_penalty_cap: 25.0,
            awareness_spend_per_point: Decimal::new(25_000, 0),
            max_awareness_bonus: 0.15,
            supply_quality_weight: 0.2,
            channel_effectiveness: BTreeMap::from([
                (Channel::Digital, 1.2),
                (Channel::Television, 1.0),
                (Channel::Retail, 0.9),
                (Channel::Sponsorship, 0.8),
            ]),
        }
    }
}

/// ESG score bands. Above `high` the brand improves, below `mid` it erodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsgThresholds {
    pub mid: f64,
    pub high: f64,
    pub brand_bonus: f64,
    pub brand_penalty: f64,
}

impl Default for EsgThresholds {
    fn default() -> Self {
        Self {
            mid: 400.0,
            high: 700.0,
            brand_bonus: 0.01,
            brand_penalty: 0.01,
        }
    }
}

/// Macro parameters of one economic phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseProfile {
    pub demand_multiplier: f64,
    /// Inflation per round.
    pub inflation: f64,
    /// Interest per round on debt.
    pub interest_rate: f64,
    /// Probability of moving to each phase next round. Must sum to 1.
    pub transitions: BTreeMap<EconomicPhase, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub initial_phase: EconomicPhase,
    pub phases: BTreeMap<EconomicPhase, PhaseProfile>,
    /// Uniform jitter applied to the demand multiplier, in [0,1).
    pub demand_jitter: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        use EconomicPhase::*;
        let phase = |demand_multiplier: f64,
                     inflation: f64,
                     interest_rate: f64,
                     transitions: &[(EconomicPhase, f64)]| {
            PhaseProfile {
                demand_multiplier,
                inflation,
                interest_rate,
                transitions: transitions.iter().copied().collect(),
            }
        };
        Self {
            initial_phase: Expansion,
            phases: BTreeMap::from([
                (Recession, phase(0.85, 0.002, 0.010, &[(Recession, 0.5), (Recovery, 0.5)])),
                (
                    Recovery,
                    phase(0.97, 0.006, 0.012, &[(Recession, 0.1), (Recovery, 0.4), (Expansion, 0.5)]),
                ),
                (
                    Expansion,
                    phase(1.05, 0.010, 0.015, &[(Recession, 0.15), (Expansion, 0.6), (Boom, 0.25)]),
                ),
                (
                    Boom,
                    phase(1.15, 0.020, 0.020, &[(Recession, 0.3), (Expansion, 0.3), (Boom, 0.4)]),
                ),
            ]),
            demand_jitter: 0.03,
        }
    }
}

/// Base behaviour of one disruption kind before difficulty scaling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisruptionProfile {
    pub base_probability: f64,
    pub severity_min: f64,
    pub severity_max: f64,
    pub duration_min: u32,
    pub duration_max: u32,
    /// Proportional cost increase at severity 1 with full exposure.
    pub cost_impact: f64,
}

/// Difficulty multipliers for disruptions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisruptionScaling {
    pub frequency: f64,
    pub severity: f64,
    /// Multiplies durations; above 1 means slower recovery.
    pub recovery: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityThresholds {
    pub concentration_high: f64,
    pub concentration_critical: f64,
    pub diversity_min: f64,
    pub quality_min: f64,
    pub ethics_min: f64,
    /// Minimum effective capacity in units per round.
    pub capacity_floor: u64,
}

impl Default for VulnerabilityThresholds {
    fn default() -> Self {
        Self {
            concentration_high: 0.5,
            concentration_critical: 0.7,
            diversity_min: 0.3,
            quality_min: 60.0,
            ethics_min: 50.0,
            capacity_floor: 50_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyConfig {
    pub disruptions: BTreeMap<DisruptionKind, DisruptionProfile>,
    pub scaling: BTreeMap<Difficulty, DisruptionScaling>,
    pub thresholds: VulnerabilityThresholds,
    pub mitigation_costs: BTreeMap<VulnerabilityKind, Decimal>,
    pub cost_multiplier_ceiling: f64,
    pub concentration_premium: f64,
    pub diversity_premium: f64,
    /// Quality points lost per unit of disruption severity.
    pub disruption_quality_penalty: f64,
    /// Relationship points lost per round without investment.
    pub relationship_decay: f64,
    /// Relationship points lost per round while the supplier's region is disrupted.
    pub disruption_relationship_hit: f64,
    /// Spend that buys one relationship point.
    pub relationship_spend_per_point: Decimal,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        use DisruptionKind::*;
        let d = |base_probability: f64,
                 (severity_min, severity_max): (f64, f64),
                 (duration_min, duration_max): (u32, u32),
                 cost_impact: f64| {
            DisruptionProfile {
                base_probability,
                severity_min,
                severity_max,
                duration_min,
                duration_max,
                cost_impact,
            }
        };
        let s = |frequency: f64, severity: f64, recovery: f64| DisruptionScaling {
            frequency,
            severity,
            recovery,
        };
        Self {
            disruptions: BTreeMap::from([
                (NaturalDisaster, d(0.04, (0.2, 0.6), (1, 3), 0.30)),
                (SupplierFailure, d(0.05, (0.5, 1.0), (1, 2), 0.20)),
                (Logistics, d(0.08, (0.1, 0.4), (1, 2), 0.15)),
                (TradeWar, d(0.03, (0.2, 0.5), (2, 4), 0.25)),
                (Pandemic, d(0.01, (0.3, 0.7), (3, 5), 0.40)),
            ]),
            scaling: BTreeMap::from([
                (Difficulty::Easy, s(0.5, 0.7, 0.8)),
                (Difficulty::Normal, s(1.0, 1.0, 1.0)),
                (Difficulty::Hard, s(1.5, 1.2, 1.2)),
                (Difficulty::Expert, s(2.0, 1.4, 1.5)),
            ]),
            thresholds: VulnerabilityThresholds::default(),
            mitigation_costs: BTreeMap::from([
                (VulnerabilityKind::Concentration, Decimal::new(400_000, 0)),
                (VulnerabilityKind::Geographic, Decimal::new(300_000, 0)),
                (VulnerabilityKind::Quality, Decimal::new(250_000, 0)),
                (VulnerabilityKind::Ethical, Decimal::new(200_000, 0)),
                (VulnerabilityKind::Capacity, Decimal::new(500_000, 0)),
            ]),
            cost_multiplier_ceiling: 5.0,
            concentration_premium: 0.10,
            diversity_premium: 0.10,
            disruption_quality_penalty: 10.0,
            relationship_decay: 1.0,
            disruption_relationship_hit: 3.0,
            relationship_spend_per_point: Decimal::new(10_000, 0),
        }
    }
}

/// Condition on the players' aggregate state that gates a scripted event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerCondition {
    /// Some team holds more than `threshold` of any segment.
    LeaderShareAbove { threshold: f64 },
    /// Mean ESG score across teams below `threshold`.
    AverageEsgBelow { threshold: f64 },
    /// Combined revenue of all teams last round above `threshold`.
    TotalRevenueAbove { threshold: Decimal },
}

/// What a scripted trade event does when it fires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateEffect {
    /// Install a new time-boxed tariff on the route.
    Escalation {
        rate: f64,
        duration: u32,
        #[serde(default)]
        materials: MaterialScope,
        #[serde(default)]
        volatility: f64,
    },
    /// Scale existing tariffs on the route by `1 - factor`.
    Relief { factor: f64 },
}

/// Scripted trade event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeEventTemplate {
    pub id: String,
    pub name: String,
    pub route: TradeRoute,
    pub effect: TemplateEffect,
    pub first_round: u32,
    pub last_round: u32,
    pub probability: f64,
    /// Severity in [0,1]; templates above the difficulty cap never fire.
    pub severity: f64,
    /// Rounds before the template may fire again.
    pub cooldown: u32,
    #[serde(default)]
    pub condition: Option<PlayerCondition>,
}

/// Pool entry for unscripted geopolitical events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeopoliticalTemplate {
    pub kind: GeopoliticalKind,
    pub name: String,
    pub severity_min: f64,
    pub severity_max: f64,
    pub duration_min: u32,
    pub duration_max: u32,
    /// Tariff installed on routes into the affected regions, scaled by severity.
    /// For relief kinds this is the agreement reduction instead.
    pub rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTariff {
    pub route: TradeRoute,
    #[serde(default)]
    pub materials: MaterialScope,
    pub rate: f64,
    pub duration: u32,
    #[serde(default)]
    pub volatility: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub kind: GeopoliticalKind,
    pub name: String,
    pub regions: Vec<Region>,
    pub severity: f64,
    pub duration: u32,
}

/// Bundle of correlated tariffs and events injected together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeScenario {
    pub id: String,
    pub name: String,
    pub tariffs: Vec<ScenarioTariff>,
    pub events: Vec<ScenarioEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    pub tariffs: Vec<Tariff>,
    pub agreements: Vec<TradeAgreement>,
    pub stances: BTreeMap<Region, PolicyStance>,
    pub templates: Vec<TradeEventTemplate>,
    pub geopolitical_chance: f64,
    pub geopolitical_pool: Vec<GeopoliticalTemplate>,
    pub scenario_chance: f64,
    pub scenarios: Vec<TradeScenario>,
    /// Highest scripted-event severity allowed per difficulty.
    pub max_event_severity: BTreeMap<Difficulty, f64>,
    pub default_volatility: f64,
    /// Rate change per round used by the forecast.
    pub forecast_step: f64,
    /// Confidence lost per forecast round.
    pub forecast_confidence_decay: f64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        use Region::*;
        let route = TradeRoute::new;
        Self {
            tariffs: vec![
                Tariff {
                    id: "base-ea-na".into(),
                    name: "Electronics duty".into(),
                    route: route(EastAsia, NorthAmerica),
                    materials: MaterialScope::All,
                    rate: 0.10,
                    effective_round: 0,
                    expiry_round: None,
                    volatility: 0.2,
                },
                Tariff {
                    id: "base-ea-eu".into(),
                    name: "Component levy".into(),
                    route: route(EastAsia, Europe),
                    materials: MaterialScope::Only(Material::Processor),
                    rate: 0.06,
                    effective_round: 0,
                    expiry_round: None,
                    volatility: 0.1,
                },
                Tariff {
                    id: "base-sa-na".into(),
                    name: "Assembly duty".into(),
                    route: route(SouthAsia, NorthAmerica),
                    materials: MaterialScope::All,
                    rate: 0.05,
                    effective_round: 0,
                    expiry_round: None,
                    volatility: 0.15,
                },
            ],
            agreements: vec![TradeAgreement {
                id: "americas-pact".into(),
                name: "Americas Pact".into(),
                members: vec![NorthAmerica, SouthAmerica],
                reduction: 0.5,
                expiry_round: None,
            }],
            stances: BTreeMap::from([
                (NorthAmerica, PolicyStance::Protectionist),
                (Europe, PolicyStance::FreeTrade),
                (EastAsia, PolicyStance::Neutral),
                (SouthAsia, PolicyStance::Neutral),
                (SouthAmerica, PolicyStance::FreeTrade),
                (Africa, PolicyStance::Neutral),
            ]),
            templates: vec![
                TradeEventTemplate {
                    id: "chip-tariff-escalation".into(),
                    name: "Semiconductor tariff escalation".into(),
                    route: route(EastAsia, NorthAmerica),
                    effect: TemplateEffect::Escalation {
                        rate: 0.15,
                        duration: 4,
                        materials: MaterialScope::Only(Material::Processor),
                        volatility: 0.3,
                    },
                    first_round: 3,
                    last_round: 12,
                    probability: 0.25,
                    severity: 0.6,
                    cooldown: 6,
                    condition: None,
                },
                TradeEventTemplate {
                    id: "antitrust-retaliation".into(),
                    name: "Retaliation against a dominant vendor".into(),
                    route: route(NorthAmerica, Europe),
                    effect: TemplateEffect::Escalation {
                        rate: 0.12,
                        duration: 3,
                        materials: MaterialScope::All,
                        volatility: 0.25,
                    },
                    first_round: 2,
                    last_round: 20,
                    probability: 0.5,
                    severity: 0.5,
                    cooldown: 5,
                    condition: Some(PlayerCondition::LeaderShareAbove { threshold: 0.6 }),
                },
                TradeEventTemplate {
                    id: "green-tariff".into(),
                    name: "Carbon border adjustment".into(),
                    route: route(SouthAsia, Europe),
                    effect: TemplateEffect::Escalation {
                        rate: 0.08,
                        duration: 5,
                        materials: MaterialScope::All,
                        volatility: 0.1,
                    },
                    first_round: 4,
                    last_round: 20,
                    probability: 0.4,
                    severity: 0.3,
                    cooldown: 8,
                    condition: Some(PlayerCondition::AverageEsgBelow { threshold: 450.0 }),
                },
                TradeEventTemplate {
                    id: "pacific-relief".into(),
                    name: "Pacific tariff truce".into(),
                    route: route(EastAsia, NorthAmerica),
                    effect: TemplateEffect::Relief { factor: 0.5 },
                    first_round: 6,
                    last_round: 20,
                    probability: 0.2,
                    severity: 0.2,
                    cooldown: 6,
                    condition: None,
                },
                TradeEventTemplate {
                    id: "luxury-import-duty".into(),
                    name: "Luxury import duty".into(),
                    route: route(EastAsia, Europe),
                    effect: TemplateEffect::Escalation {
                        rate: 0.10,
                        duration: 3,
                        materials: MaterialScope::Only(Material::Display),
                        volatility: 0.2,
                    },
                    first_round: 5,
                    last_round: 16,
                    probability: 0.3,
                    severity: 0.8,
                    cooldown: 6,
                    condition: Some(PlayerCondition::TotalRevenueAbove {
                        threshold: Decimal::new(100_000_000, 0),
                    }),
                },
            ],
            geopolitical_chance: 0.05,
            geopolitical_pool: vec![
                GeopoliticalTemplate {
                    kind: GeopoliticalKind::Sanctions,
                    name: "Export sanctions".into(),
                    severity_min: 0.3,
                    severity_max: 0.8,
                    duration_min: 2,
                    duration_max: 4,
                    rate: 0.20,
                },
                GeopoliticalTemplate {
                    kind: GeopoliticalKind::BorderDispute,
                    name: "Border dispute".into(),
                    severity_min: 0.2,
                    severity_max: 0.6,
                    duration_min: 1,
                    duration_max: 3,
                    rate: 0.10,
                },
                GeopoliticalTemplate {
                    kind: GeopoliticalKind::Election,
                    name: "Contested election".into(),
                    severity_min: 0.1,
                    severity_max: 0.4,
                    duration_min: 1,
                    duration_max: 2,
                    rate: 0.05,
                },
                GeopoliticalTemplate {
                    kind: GeopoliticalKind::TradeSummit,
                    name: "Trade summit".into(),
                    severity_min: 0.2,
                    severity_max: 0.5,
                    duration_min: 2,
                    duration_max: 4,
                    rate: 0.40,
                },
                GeopoliticalTemplate {
                    kind: GeopoliticalKind::CurrencyCrisis,
                    name: "Currency crisis".into(),
                    severity_min: 0.3,
                    severity_max: 0.7,
                    duration_min: 1,
                    duration_max: 3,
                    rate: 0.08,
                },
            ],
            scenario_chance: 0.02,
            scenarios: vec![TradeScenario {
                id: "pacific-trade-war".into(),
                name: "Pacific trade war".into(),
                tariffs: vec![
                    ScenarioTariff {
                        route: route(EastAsia, NorthAmerica),
                        materials: MaterialScope::All,
                        rate: 0.25,
                        duration: 4,
                        volatility: 0.4,
                    },
                    ScenarioTariff {
                        route: route(NorthAmerica, EastAsia),
                        materials: MaterialScope::All,
                        rate: 0.25,
                        duration: 4,
                        volatility: 0.4,
                    },
                ],
                events: vec![ScenarioEvent {
                    kind: GeopoliticalKind::Embargo,
                    name: "Technology embargo".into(),
                    regions: vec![EastAsia, NorthAmerica],
                    severity: 0.7,
                    duration: 4,
                }],
            }],
            max_event_severity: BTreeMap::from([
                (Difficulty::Easy, 0.4),
                (Difficulty::Normal, 0.7),
                (Difficulty::Hard, 0.9),
                (Difficulty::Expert, 1.0),
            ]),
            default_volatility: 0.1,
            forecast_step: 0.02,
            forecast_confidence_decay: 0.1,
        }
    }
}

/// Catch-up and leader-penalty settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub enabled: bool,
    /// Relative gap (0–1) beyond which an adjustment starts.
    pub threshold: f64,
    pub boost_strength: f64,
    pub max_boost: f64,
    pub penalty_strength: f64,
    pub max_penalty: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.2,
            boost_strength: 0.5,
            max_boost: 0.15,
            penalty_strength: 0.3,
            max_penalty: 0.10,
        }
    }
}

impl BalanceConfig {
    /// Balance adjustment switched off, as used by competitive modes.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Coefficients for the departmental operations applied during settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsConfig {
    pub salary_per_employee: Decimal,
    pub hire_cost: Decimal,
    pub severance_cost: Decimal,
    pub units_per_worker: u64,
    /// Spend that buys one efficiency point for the whole workforce.
    pub training_spend_per_point: Decimal,
    /// Spend that buys one morale point.
    pub benefits_spend_per_point: Decimal,
    pub max_hr_gain_per_round: f64,
    pub base_turnover: f64,
    pub tax_rate: Decimal,
    pub rd_spend_per_quality_point: Decimal,
    pub feature_spend_per_point: Decimal,
    pub development_rounds: u32,
    pub development_cost: Decimal,
    /// Fractional brand decay per round, limited by `brand_decay_cap`.
    pub brand_decay: f64,
    pub brand_decay_cap: f64,
    pub max_brand_growth: f64,
    /// Spend that buys 0.01 of efficiency.
    pub efficiency_spend_per_point: Decimal,
    /// Spend per unit of added capacity.
    pub capacity_spend_per_unit: Decimal,
    /// Spend that removes 0.001 of defect rate.
    pub quality_spend_per_point: Decimal,
    pub max_factory_efficiency: f64,
    pub min_defect_rate: f64,
    /// Spend that buys one ESG point.
    pub esg_spend_per_point: Decimal,
    /// ESG points lost per round for each supplier below the ethics floor.
    pub unethical_supplier_esg_penalty: f64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            salary_per_employee: Decimal::new(6_000, 0),
            hire_cost: Decimal::new(3_000, 0),
            severance_cost: Decimal::new(5_000, 0),
            units_per_worker: 400,
            training_spend_per_point: Decimal::new(20_000, 0),
            benefits_spend_per_point: Decimal::new(15_000, 0),
            max_hr_gain_per_round: 10.0,
            base_turnover: 0.08,
            tax_rate: Decimal::new(25, 2),
            rd_spend_per_quality_point: Decimal::new(50_000, 0),
            feature_spend_per_point: Decimal::new(20_000, 0),
            development_rounds: 2,
            development_cost: Decimal::new(400_000, 0),
            brand_decay: 0.05,
            brand_decay_cap: 0.03,
            max_brand_growth: 0.08,
            efficiency_spend_per_point: Decimal::new(100_000, 0),
            capacity_spend_per_unit: Decimal::new(20, 0),
            quality_spend_per_point: Decimal::new(20_000, 0),
            max_factory_efficiency: 0.98,
            min_defect_rate: 0.005,
            esg_spend_per_point: Decimal::new(5_000, 0),
            unethical_supplier_esg_penalty: 5.0,
        }
    }
}

/// Point multipliers per achievement tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierMultipliers {
    pub bronze: f64,
    pub silver: f64,
    pub gold: f64,
    pub platinum: f64,
    pub secret: f64,
    pub infamy: f64,
}

impl TierMultipliers {
    pub fn uniform(v: f64) -> Self {
        Self {
            bronze: v,
            silver: v,
            gold: v,
            platinum: v,
            secret: v,
            infamy: v,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementScoring {
    pub multipliers: BTreeMap<Difficulty, TierMultipliers>,
}

impl Default for AchievementScoring {
    fn default() -> Self {
        Self {
            multipliers: BTreeMap::from([
                (
                    Difficulty::Easy,
                    TierMultipliers {
                        infamy: 0.5,
                        ..TierMultipliers::uniform(0.75)
                    },
                ),
                (Difficulty::Normal, TierMultipliers::uniform(1.0)),
                (
                    Difficulty::Hard,
                    TierMultipliers {
                        gold: 1.35,
                        platinum: 1.5,
                        infamy: 1.25,
                        ..TierMultipliers::uniform(1.25)
                    },
                ),
                (
                    Difficulty::Expert,
                    TierMultipliers {
                        gold: 1.75,
                        platinum: 2.0,
                        infamy: 1.5,
                        ..TierMultipliers::uniform(1.5)
                    },
                ),
            ]),
        }
    }
}

impl AchievementScoring {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> TierMultipliers {
        self.multipliers
            .get(&difficulty)
            .copied()
            .unwrap_or_else(|| TierMultipliers::uniform(1.0))
    }
}

/// Complete configuration of a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameProfile {
    pub name: String,
    pub difficulty: Difficulty,
    pub start: StartingConditions,
    pub segments: BTreeMap<Segment, SegmentProfile>,
    pub allocation: AllocationConfig,
    pub esg: EsgThresholds,
    pub economy: EconomyConfig,
    pub supply: SupplyConfig,
    pub trade: TradeConfig,
    pub balance: BalanceConfig,
    pub operations: OperationsConfig,
    pub achievements: AchievementScoring,
}

/// Standard segment table.
pub fn default_segments() -> BTreeMap<Segment, SegmentProfile> {
    let seg = |weights: [u32; 5],
               (floor, ceiling): (i64, i64),
               quality_expectation: f64,
               prefs: [f64; 6],
               base_demand_units: u64,
               growth_rate: f64,
               price_elasticity: f32| SegmentProfile {
        weights: SegmentWeights {
            price: weights[0],
            quality: weights[1],
            brand: weights[2],
            esg: weights[3],
            features: weights[4],
        },
        price_floor: Decimal::new(floor, 0),
        price_ceiling: Decimal::new(ceiling, 0),
        quality_expectation,
        feature_preferences: FeatureVector {
            battery: prefs[0],
            camera: prefs[1],
            ai: prefs[2],
            durability: prefs[3],
            display: prefs[4],
            connectivity: prefs[5],
        },
        base_demand_units,
        growth_rate,
        price_elasticity,
    };
    BTreeMap::from([
        (
            Segment::Budget,
            seg(
                [50, 22, 8, 8, 12],
                (100, 300),
                60.0,
                [35.0, 10.0, 5.0, 25.0, 15.0, 10.0],
                500_000,
                0.010,
                -1.8,
            ),
        ),
        (
            Segment::General,
            seg(
                [32, 28, 15, 10, 15],
                (250, 650),
                70.0,
                [20.0, 25.0, 10.0, 10.0, 20.0, 15.0],
                400_000,
                0.015,
                -1.4,
            ),
        ),
        (
            Segment::Enthusiast,
            seg(
                [12, 30, 15, 8, 35],
                (500, 1_200),
                85.0,
                [10.0, 25.0, 25.0, 5.0, 25.0, 10.0],
                150_000,
                0.030,
                -0.9,
            ),
        ),
        (
            Segment::Professional,
            seg(
                [10, 40, 20, 15, 15],
                (600, 1_400),
                90.0,
                [20.0, 5.0, 25.0, 10.0, 15.0, 25.0],
                120_000,
                0.020,
                -0.7,
            ),
        ),
        (
            Segment::ActiveLifestyle,
            seg(
                [22, 28, 18, 12, 20],
                (300, 800),
                75.0,
                [30.0, 10.0, 5.0, 35.0, 5.0, 15.0],
                180_000,
                0.025,
                -1.1,
            ),
        ),
    ])
}

impl Default for GameProfile {
    fn default() -> Self {
        Self {
            name: "standard".into(),
            difficulty: Difficulty::Normal,
            start: StartingConditions::default(),
            segments: default_segments(),
            allocation: AllocationConfig::default(),
            esg: EsgThresholds::default(),
            economy: EconomyConfig::default(),
            supply: SupplyConfig::default(),
            trade: TradeConfig::default(),
            balance: BalanceConfig::default(),
            operations: OperationsConfig::default(),
            achievements: AchievementScoring::default(),
        }
    }
}

fn probability(name: &str, p: f64) -> Result<(), ValidationError> {
    if !p.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(ValidationError::ProbabilityOutOfRange {
            name: name.to_string(),
            value: p,
        });
    }
    Ok(())
}

fn ordered<T: PartialOrd>(name: &str, min: T, max: T) -> Result<(), ValidationError> {
    if min > max {
        return Err(ValidationError::InvertedRange(name.to_string()));
    }
    Ok(())
}

impl GameProfile {
    /// Parse and validate a profile from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ProfileError> {
        let profile: GameProfile = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let contents = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_yaml_str(&contents)?;
        info!(profile = %profile.name, path = %path.display(), "loaded game profile");
        Ok(profile)
    }

    /// Check every invariant a game relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.segments.is_empty() {
            return Err(ValidationError::NoSegments);
        }
        for (segment, s) in &self.segments {
            crate::validate_segment(*segment, s)?;
        }
        if self.start.cash <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveStartingCash);
        }
        if !(0.0..=1.0).contains(&self.start.brand_value)
            || !(0.0..=1000.0).contains(&self.start.esg_score)
        {
            return Err(ValidationError::NonFinite);
        }
        if self.esg.high <= self.esg.mid {
            return Err(ValidationError::InvertedThreshold("esg.high must exceed esg.mid".into()));
        }
        self.validate_allocation()?;
        self.validate_economy()?;
        self.validate_supply()?;
        self.validate_trade()?;
        self.validate_balance()?;
        Ok(())
    }

    fn validate_allocation(&self) -> Result<(), ValidationError> {
        let a = &self.allocation;
        if !a.temperature.is_finite() || a.temperature <= 0.0 {
            return Err(ValidationError::NonPositiveTemperature);
        }
        probability("allocation.underprice_threshold", a.underprice_threshold)?;
        probability("allocation.supply_quality_weight", a.supply_quality_weight)?;
        if a.underprice_penalty_cap < 0.0 || a.max_awareness_bonus < 0.0 {
            return Err(ValidationError::NonFinite);
        }
        if a.awareness_spend_per_point <= Decimal::ZERO {
            return Err(ValidationError::NegativeMoney);
        }
        Ok(())
    }

    fn validate_economy(&self) -> Result<(), ValidationError> {
        for phase in EconomicPhase::ALL {
            let p = self
                .economy
                .phases
                .get(&phase)
                .ok_or_else(|| ValidationError::MissingPhase(phase.as_str().to_string()))?;
            let mut sum = 0.0;
            for (target, weight) in &p.transitions {
                probability(&format!("economy.{}.{}", phase.as_str(), target.as_str()), *weight)?;
                sum += weight;
            }
            if (sum - 1.0).abs() > 1e-6 {
                return Err(ValidationError::TransitionRowSum {
                    phase: phase.as_str().to_string(),
                    sum,
                });
            }
            if !(p.demand_multiplier.is_finite() && p.demand_multiplier > 0.0) {
                return Err(ValidationError::NonFinite);
            }
        }
        if !(0.0..1.0).contains(&self.economy.demand_jitter) {
            return Err(ValidationError::ProbabilityOutOfRange {
                name: "economy.demand_jitter".into(),
                value: self.economy.demand_jitter,
            });
        }
        Ok(())
    }

    fn validate_supply(&self) -> Result<(), ValidationError> {
        let s = &self.supply;
        for (kind, d) in &s.disruptions {
            let name = kind.as_str();
            probability(name, d.base_probability)?;
            probability(name, d.severity_min)?;
            probability(name, d.severity_max)?;
            ordered(name, d.severity_min, d.severity_max)?;
            ordered(name, d.duration_min, d.duration_max)?;
            if d.duration_min == 0 {
                return Err(ValidationError::InvertedRange(format!("{name}: zero duration")));
            }
        }
        let t = &s.thresholds;
        if t.concentration_critical <= t.concentration_high {
            return Err(ValidationError::InvertedThreshold(
                "supply.thresholds.concentration_critical must exceed concentration_high".into(),
            ));
        }
        if s.cost_multiplier_ceiling < 1.0 {
            return Err(ValidationError::InvertedThreshold(
                "supply.cost_multiplier_ceiling must be at least 1".into(),
            ));
        }
        for v in s.scaling.values() {
            if v.frequency < 0.0 || v.severity < 0.0 || v.recovery <= 0.0 {
                return Err(ValidationError::NonFinite);
            }
        }
        Ok(())
    }

    fn validate_trade(&self) -> Result<(), ValidationError> {
        let t = &self.trade;
        probability("trade.geopolitical_chance", t.geopolitical_chance)?;
        probability("trade.scenario_chance", t.scenario_chance)?;
        for tpl in &t.templates {
            probability(&tpl.id, tpl.probability)?;
            probability(&tpl.id, tpl.severity)?;
            ordered(&tpl.id, tpl.first_round, tpl.last_round)?;
            if let TemplateEffect::Relief { factor } = tpl.effect {
                probability(&tpl.id, factor)?;
            }
        }
        for g in &t.geopolitical_pool {
            ordered("trade.geopolitical_pool", g.severity_min, g.severity_max)?;
            ordered("trade.geopolitical_pool", g.duration_min, g.duration_max)?;
        }
        for a in &t.agreements {
            probability(&a.id, a.reduction)?;
        }
        for tariff in &t.tariffs {
            if !tariff.rate.is_finite() || tariff.rate < 0.0 {
                return Err(ValidationError::NonFinite);
            }
        }
        Ok(())
    }

    fn validate_balance(&self) -> Result<(), ValidationError> {
        let b = &self.balance;
        probability("balance.threshold", b.threshold)?;
        if b.max_boost < 0.0 || b.boost_strength < 0.0 || b.penalty_strength < 0.0 {
            return Err(ValidationError::InvertedThreshold(
                "balance boosts and strengths must be non-negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&b.max_penalty) {
            return Err(ValidationError::ProbabilityOutOfRange {
                name: "balance.max_penalty".into(),
                value: b.max_penalty,
            });
        }
        Ok(())
    }

    pub fn disruption_scaling(&self) -> DisruptionScaling {
        self.supply
            .scaling
            .get(&self.difficulty)
            .copied()
            .unwrap_or(DisruptionScaling {
                frequency: 1.0,
                severity: 1.0,
                recovery: 1.0,
            })
    }

    pub fn max_event_severity(&self) -> f64 {
        self.trade
            .max_event_severity
            .get(&self.difficulty)
            .copied()
            .unwrap_or(1.0)
    }

    /// Market snapshot at game start.
    pub fn initial_market(&self) -> MarketState {
        let phase = self
            .economy
            .phases
            .get(&self.economy.initial_phase);
        MarketState {
            round: 0,
            segments: self
                .segments
                .iter()
                .map(|(segment, profile)| {
                    (
                        *segment,
                        SegmentMarket {
                            profile: profile.clone(),
                            demand_units: profile.base_demand_units,
                            last_effective_units: 0,
                            last_average_price: None,
                        },
                    )
                })
                .collect(),
            phase: self.economy.initial_phase,
            cost_index: 1.0,
            demand_multiplier: phase.map_or(1.0, |p| p.demand_multiplier),
            inflation: phase.map_or(0.0, |p| p.inflation),
            interest_rate: phase.map_or(0.0, |p| p.interest_rate),
        }
    }

    /// Global trade regime at game start.
    pub fn initial_tariffs(&self) -> TariffState {
        TariffState {
            version: 0,
            tariffs: self.trade.tariffs.clone(),
            agreements: self.trade.agreements.clone(),
            events: vec![],
            stances: self.trade.stances.clone(),
            fired_templates: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// A fresh company and supply chain for a team joining the game.
    pub fn new_team(
        &self,
        id: TeamId,
        name: &str,
        home_region: Region,
    ) -> (TeamState, SupplyChainState) {
        let start = &self.start;
        let mut team = TeamState {
            id,
            name: name.to_string(),
            home_region,
            cash: start.cash,
            debt: Decimal::ZERO,
            cumulative_revenue: Decimal::ZERO,
            cumulative_net_income: Decimal::ZERO,
            last_revenue: Decimal::ZERO,
            last_net_income: Decimal::ZERO,
            market_share: BTreeMap::new(),
            brand_value: start.brand_value,
            esg_score: start.esg_score,
            workforce: start.workforce.clone(),
            products: vec![],
            factories: start.factories.clone(),
            counters: TeamCounters::default(),
            next_product_seq: 0,
        };
        for seed in &start.products {
            let id = team.allocate_product_id();
            team.products.push(Product {
                id,
                name: seed.name.clone(),
                segment: seed.segment,
                quality: seed.quality,
                features: seed.features,
                price: seed.price,
                unit_cost: seed.unit_cost,
                status: ProductStatus::Launched,
            });
        }
        let supply = SupplyChainState {
            suppliers: start.suppliers.clone(),
            safety_stock: start.safety_stock,
            cost_multiplier: 1.0,
            ..SupplyChainState::default()
        };
        (team, supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        GameProfile::default().validate().unwrap();
    }

    #[test]
    fn budget_weights_match_reference_table() {
        let p = GameProfile::default();
        let w = p.segments[&Segment::Budget].weights;
        assert_eq!((w.price, w.quality, w.brand, w.esg, w.features), (50, 22, 8, 8, 12));
    }

    #[test]
    fn rejects_weights_not_summing_to_100() {
        let mut p = GameProfile::default();
        p.segments.get_mut(&Segment::General).unwrap().weights.price += 1;
        assert!(matches!(
            p.validate(),
            Err(ValidationError::SegmentWeights { total: 101, .. })
        ));
    }

    #[test]
    fn rejects_inverted_esg_thresholds() {
        let mut p = GameProfile::default();
        p.esg.high = p.esg.mid;
        assert!(matches!(
            p.validate(),
            Err(ValidationError::InvertedThreshold(_))
        ));
    }

    #[test]
    fn rejects_non_positive_starting_cash() {
        let mut p = GameProfile::default();
        p.start.cash = Decimal::ZERO;
        assert_eq!(p.validate(), Err(ValidationError::NonPositiveStartingCash));
    }

    #[test]
    fn rejects_transition_rows_not_summing_to_one() {
        let mut p = GameProfile::default();
        p.economy
            .phases
            .get_mut(&EconomicPhase::Boom)
            .unwrap()
            .transitions
            .insert(EconomicPhase::Boom, 0.9);
        assert!(matches!(
            p.validate(),
            Err(ValidationError::TransitionRowSum { .. })
        ));
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = "name: blitz\ndifficulty: hard\nbalance:\n  enabled: false\n";
        let p = GameProfile::from_yaml_str(yaml).unwrap();
        assert_eq!(p.name, "blitz");
        assert_eq!(p.difficulty, Difficulty::Hard);
        assert!(!p.balance.enabled);
        assert_eq!(p.balance.threshold, BalanceConfig::default().threshold);
        assert_eq!(p.segments.len(), 5);
    }

    #[test]
    fn yaml_with_bad_weights_is_fatal() {
        let yaml = r#"
segments:
  budget:
    weights: { price: 60, quality: 22, brand: 8, esg: 8, features: 12 }
    price_floor: 100
    price_ceiling: 300
    quality_expectation: 60
    feature_preferences: { battery: 50, durability: 50 }
    base_demand_units: 1000
    growth_rate: 0.0
    price_elasticity: -1.5
"#;
        let err = GameProfile::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Invalid(ValidationError::SegmentWeights { total: 110, .. })
        ));
    }

    #[test]
    fn new_team_gets_starting_products() {
        let p = GameProfile::default();
        let (team, supply) = p.new_team(TeamId("alpha".into()), "Alpha", Region::Europe);
        assert_eq!(team.products.len(), 2);
        assert_eq!(team.products[0].id.0, "alpha-p1");
        assert_eq!(supply.suppliers.len(), 4);
        assert_eq!(team.cash, p.start.cash);
    }
}
