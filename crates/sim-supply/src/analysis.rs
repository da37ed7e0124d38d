//! Derived supply-chain metrics and the vulnerability picture.
//!
//! None of these functions fail: an empty or fully disrupted roster degrades to
//! zero capacity and the configured cost ceiling.

use rust_decimal::Decimal;
use sim_core::{
    Disruption, DisruptionProfile, Region, Severity, Supplier, SupplyChainState, SupplyConfig,
    Vulnerability, VulnerabilityKind,
};
use std::collections::{BTreeMap, BTreeSet};

fn in_use(state: &SupplyChainState) -> impl Iterator<Item = &Supplier> {
    state.suppliers.iter().filter(|s| s.in_use())
}

/// Share of sourcing volume placed with the largest supplier.
pub fn concentration(state: &SupplyChainState) -> f64 {
    let total = state.total_volume();
    if total <= 0.0 {
        return 0.0;
    }
    in_use(state)
        .map(|s| s.volume_share)
        .fold(0.0, f64::max)
        / total
}

/// Regions actually sourced from over all regions.
pub fn geographic_diversity(state: &SupplyChainState) -> f64 {
    let used: BTreeSet<Region> = in_use(state).map(|s| s.region).collect();
    used.len() as f64 / Region::ALL.len() as f64
}

/// Fraction of a region's capacity lost to active disruptions.
fn disruption_loss(disruptions: &[Disruption], region: Region) -> f64 {
    let remaining = disruptions
        .iter()
        .filter(|d| d.affects(region))
        .fold(1.0, |acc, d| acc * (1.0 - d.severity.clamp(0.0, 1.0)));
    1.0 - remaining
}

/// Deliverable units per round after disruptions, boosted by the safety-stock buffer.
pub fn effective_capacity(state: &SupplyChainState) -> u64 {
    let raw: f64 = in_use(state)
        .map(|s| s.capacity as f64 * (1.0 - disruption_loss(&state.disruptions, s.region)))
        .sum();
    let buffered = raw * (1.0 + state.safety_stock.clamp(0.0, 1.0));
    buffered.floor().clamp(0.0, u64::MAX as f64) as u64
}

/// Cost multiplier on sourced materials.
///
/// Each active disruption adds its kind's cost impact scaled by severity and
/// by the share of volume sourced from affected regions. Concentration and
/// diversity premiums apply past their thresholds. Clamped to `[1, ceiling]`;
/// an unused roster sits at the ceiling.
pub fn cost_multiplier(
    state: &SupplyChainState,
    config: &SupplyConfig,
    concentration: f64,
    diversity: f64,
) -> f64 {
    let total = state.total_volume();
    let ceiling = config.cost_multiplier_ceiling.max(1.0);
    if total <= 0.0 {
        return ceiling;
    }
    let mut m = 1.0;
    for d in &state.disruptions {
        let exposed: f64 = in_use(state)
            .filter(|s| d.affects(s.region))
            .map(|s| s.volume_share)
            .sum::<f64>()
            / total;
        let impact = config
            .disruptions
            .get(&d.kind)
            .map_or(0.0, |p: &DisruptionProfile| p.cost_impact);
        m += impact * d.severity * exposed;
    }
    if concentration > config.thresholds.concentration_high {
        m += config.concentration_premium;
    }
    if diversity < config.thresholds.diversity_min {
        m += config.diversity_premium;
    }
    if m.is_finite() {
        m.clamp(1.0, ceiling)
    } else {
        ceiling
    }
}

/// Relationship-weighted supplier quality minus disruption penalties, on 0–100.
pub fn quality_impact(state: &SupplyChainState, config: &SupplyConfig) -> f64 {
    let used: Vec<&Supplier> = in_use(state).collect();
    if used.is_empty() {
        return 0.0;
    }
    let weight_total: f64 = used.iter().map(|s| s.relationship.max(0.0)).sum();
    let base = if weight_total > 0.0 {
        used.iter()
            .map(|s| s.quality * s.relationship.max(0.0))
            .sum::<f64>()
            / weight_total
    } else {
        used.iter().map(|s| s.quality).sum::<f64>() / used.len() as f64
    };
    let penalty: f64 = state
        .disruptions
        .iter()
        .filter(|d| used.iter().any(|s| d.affects(s.region)))
        .map(|d| d.severity * config.disruption_quality_penalty)
        .sum();
    (base - penalty).clamp(0.0, 100.0)
}

fn vulnerability(
    kind: VulnerabilityKind,
    severity: Severity,
    costs: &BTreeMap<VulnerabilityKind, Decimal>,
    description: String,
) -> Vulnerability {
    Vulnerability {
        kind,
        severity,
        mitigation_cost: costs.get(&kind).copied().unwrap_or(Decimal::ZERO),
        description,
    }
}

/// Structural weaknesses, most severe first (ties by kind).
pub fn vulnerabilities(
    state: &SupplyChainState,
    config: &SupplyConfig,
    concentration: f64,
    diversity: f64,
    capacity: u64,
) -> Vec<Vulnerability> {
    let t = &config.thresholds;
    let costs = &config.mitigation_costs;
    let mut out = Vec::new();
    if concentration > t.concentration_critical {
        out.push(vulnerability(
            VulnerabilityKind::Concentration,
            Severity::Critical,
            costs,
            format!("{:.0}% of volume comes from one supplier", concentration * 100.0),
        ));
    } else if concentration > t.concentration_high {
        out.push(vulnerability(
            VulnerabilityKind::Concentration,
            Severity::High,
            costs,
            format!("{:.0}% of volume comes from one supplier", concentration * 100.0),
        ));
    }
    if diversity < t.diversity_min {
        out.push(vulnerability(
            VulnerabilityKind::Geographic,
            Severity::Medium,
            costs,
            format!("sourcing covers {:.0}% of regions", diversity * 100.0),
        ));
    }
    if let Some(s) = in_use(state).find(|s| s.quality < t.quality_min) {
        out.push(vulnerability(
            VulnerabilityKind::Quality,
            Severity::Medium,
            costs,
            format!("{} quality {:.0} is below {:.0}", s.name, s.quality, t.quality_min),
        ));
    }
    if let Some(s) = in_use(state).find(|s| s.ethics < t.ethics_min) {
        out.push(vulnerability(
            VulnerabilityKind::Ethical,
            Severity::High,
            costs,
            format!("{} ethics {:.0} is below {:.0}", s.name, s.ethics, t.ethics_min),
        ));
    }
    if capacity < t.capacity_floor {
        out.push(vulnerability(
            VulnerabilityKind::Capacity,
            Severity::Medium,
            costs,
            format!("effective capacity {capacity} is below {}", t.capacity_floor),
        ));
    }
    out.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.kind.cmp(&b.kind)));
    out
}

/// Summary of a supply chain after analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct SupplyAnalysis {
    pub concentration: f64,
    pub geographic_diversity: f64,
    pub effective_capacity: u64,
    pub cost_multiplier: f64,
    pub quality_impact: f64,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Recompute every derived metric and store it on the state.
pub fn analyze(state: &mut SupplyChainState, config: &SupplyConfig) -> SupplyAnalysis {
    let concentration = concentration(state);
    let diversity = geographic_diversity(state);
    let capacity = effective_capacity(state);
    let analysis = SupplyAnalysis {
        concentration,
        geographic_diversity: diversity,
        effective_capacity: capacity,
        cost_multiplier: cost_multiplier(state, config, concentration, diversity),
        quality_impact: quality_impact(state, config),
        vulnerabilities: vulnerabilities(state, config, concentration, diversity, capacity),
    };
    state.concentration = analysis.concentration;
    state.geographic_diversity = analysis.geographic_diversity;
    state.effective_capacity = analysis.effective_capacity;
    state.cost_multiplier = analysis.cost_multiplier;
    state.quality_impact = analysis.quality_impact;
    state.vulnerabilities = analysis.vulnerabilities.clone();
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{DisruptionKind, GameProfile, Material, SupplierId, SupplierTier};

    fn supplier(id: &str, region: Region, share: f64) -> Supplier {
        Supplier {
            id: SupplierId(id.into()),
            name: id.into(),
            tier: SupplierTier::Tier1,
            region,
            material: Material::Display,
            reliability: 0.9,
            quality: 80.0,
            ethics: 70.0,
            capacity: 40_000,
            unit_cost: Decimal::new(30, 0),
            relationship: 50.0,
            volume_share: share,
        }
    }

    fn disruption(regions: Vec<Region>, severity: f64) -> Disruption {
        Disruption {
            id: "d".into(),
            kind: DisruptionKind::NaturalDisaster,
            regions,
            severity,
            duration: 2,
            rounds_remaining: 2,
            started_round: 1,
        }
    }

    #[test]
    fn concentrated_roster_is_critical() {
        let mut state = SupplyChainState {
            suppliers: vec![
                supplier("a", Region::EastAsia, 0.75),
                supplier("b", Region::Europe, 0.25),
            ],
            ..Default::default()
        };
        let a = analyze(&mut state, &SupplyConfig::default());
        assert!((a.concentration - 0.75).abs() < 1e-12);
        let v = &a.vulnerabilities[0];
        assert_eq!(v.kind, VulnerabilityKind::Concentration);
        assert_eq!(v.severity, Severity::Critical);
        assert_eq!(v.mitigation_cost, Decimal::new(400_000, 0));
    }

    #[test]
    fn moderate_concentration_is_high() {
        let mut state = SupplyChainState {
            suppliers: vec![
                supplier("a", Region::EastAsia, 0.6),
                supplier("b", Region::Europe, 0.4),
            ],
            ..Default::default()
        };
        let a = analyze(&mut state, &SupplyConfig::default());
        let v = a
            .vulnerabilities
            .iter()
            .find(|v| v.kind == VulnerabilityKind::Concentration)
            .unwrap();
        assert_eq!(v.severity, Severity::High);
    }

    #[test]
    fn empty_roster_degrades_to_bounds() {
        let mut state = SupplyChainState::default();
        let config = SupplyConfig::default();
        let a = analyze(&mut state, &config);
        assert_eq!(a.effective_capacity, 0);
        assert_eq!(a.cost_multiplier, config.cost_multiplier_ceiling);
        assert_eq!(a.quality_impact, 0.0);
        assert!(a
            .vulnerabilities
            .iter()
            .any(|v| v.kind == VulnerabilityKind::Capacity));
    }

    #[test]
    fn disruptions_cut_capacity_in_affected_regions() {
        let mut state = SupplyChainState {
            suppliers: vec![
                supplier("a", Region::EastAsia, 0.5),
                supplier("b", Region::Europe, 0.5),
            ],
            safety_stock: 0.1,
            ..Default::default()
        };
        assert_eq!(effective_capacity(&state), 88_000);
        state.disruptions.push(disruption(vec![Region::EastAsia], 0.5));
        // (20_000 + 40_000) * 1.1
        assert_eq!(effective_capacity(&state), 66_000);
    }

    #[test]
    fn disruption_raises_cost_by_exposure() {
        let config = SupplyConfig::default();
        let mut state = SupplyChainState {
            suppliers: vec![
                supplier("a", Region::EastAsia, 0.5),
                supplier("b", Region::Europe, 0.5),
                supplier("c", Region::SouthAsia, 0.0),
            ],
            ..Default::default()
        };
        let base = cost_multiplier(&state, &config, 0.5, 2.0 / 6.0);
        assert_eq!(base, 1.0);
        state.disruptions.push(disruption(vec![Region::EastAsia], 1.0));
        let hit = cost_multiplier(&state, &config, 0.5, 2.0 / 6.0);
        // natural disaster impact 0.30 on half the volume
        assert!((hit - 1.15).abs() < 1e-12);
    }

    #[test]
    fn quality_is_relationship_weighted_and_penalised() {
        let config = SupplyConfig::default();
        let mut strong = supplier("a", Region::EastAsia, 0.5);
        strong.quality = 90.0;
        strong.relationship = 75.0;
        let mut weak = supplier("b", Region::Europe, 0.5);
        weak.quality = 60.0;
        weak.relationship = 25.0;
        let mut state = SupplyChainState {
            suppliers: vec![strong, weak],
            ..Default::default()
        };
        assert!((quality_impact(&state, &config) - 82.5).abs() < 1e-9);
        state.disruptions.push(disruption(vec![Region::Europe], 0.5));
        assert!((quality_impact(&state, &config) - 77.5).abs() < 1e-9);
    }

    #[test]
    fn starting_roster_has_no_critical_weakness() {
        let (_, mut state) =
            GameProfile::default().new_team("t".into(), "T", Region::Europe);
        let a = analyze(&mut state, &SupplyConfig::default());
        assert!(a.vulnerabilities.iter().all(|v| v.severity < Severity::Critical));
        assert!(a.effective_capacity > 0);
        assert_eq!(state.effective_capacity, a.effective_capacity);
    }

    #[test]
    fn vulnerabilities_are_ranked_by_severity() {
        let mut s = supplier("a", Region::EastAsia, 1.0);
        s.ethics = 10.0;
        s.quality = 10.0;
        s.capacity = 10;
        let state = SupplyChainState {
            suppliers: vec![s],
            ..Default::default()
        };
        let v = vulnerabilities(&state, &SupplyConfig::default(), 1.0, 1.0 / 6.0, 10);
        let severities: Vec<Severity> = v.iter().map(|v| v.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
        assert_eq!(v[0].kind, VulnerabilityKind::Concentration);
        assert_eq!(v.len(), 5);
    }
}
