//! Disruption lifecycle: resolve expiring disruptions, roll new ones.

use rand::seq::SliceRandom;
use rand::Rng;
use sim_core::{
    Disruption, DisruptionKind, DisruptionProfile, DisruptionScaling, Region, SupplyChainState,
};
use std::collections::BTreeMap;
use tracing::info;

/// Decrement every active disruption and remove those that reach zero.
///
/// Returns the resolved disruptions in their original order.
pub fn advance_disruptions(state: &mut SupplyChainState) -> Vec<Disruption> {
    let mut resolved = Vec::new();
    state.disruptions.retain_mut(|d| {
        d.rounds_remaining = d.rounds_remaining.saturating_sub(1);
        if d.rounds_remaining == 0 {
            resolved.push(d.clone());
            false
        } else {
            true
        }
    });
    for d in &resolved {
        info!(id = %d.id, kind = d.kind.as_str(), "disruption resolved");
    }
    resolved
}

fn pick_regions<R: Rng + ?Sized>(
    kind: DisruptionKind,
    state: &SupplyChainState,
    rng: &mut R,
) -> Vec<Region> {
    let mut regions = match kind {
        DisruptionKind::Pandemic => Region::ALL.to_vec(),
        DisruptionKind::SupplierFailure => {
            let mut used: Vec<Region> = state
                .suppliers
                .iter()
                .filter(|s| s.in_use())
                .map(|s| s.region)
                .collect();
            used.sort();
            used.dedup();
            let pool = if used.is_empty() {
                Region::ALL.to_vec()
            } else {
                used
            };
            pool.choose(rng).copied().into_iter().collect()
        }
        _ => {
            let n = rng.gen_range(1..=3);
            Region::ALL.choose_multiple(rng, n).copied().collect()
        }
    };
    regions.sort();
    regions
}

fn roll_one<R: Rng + ?Sized>(
    kind: DisruptionKind,
    profile: &DisruptionProfile,
    scaling: DisruptionScaling,
    rng: &mut R,
) -> Option<(f64, u32)> {
    let p = (profile.base_probability * scaling.frequency).clamp(0.0, 1.0);
    if rng.gen::<f64>() >= p {
        return None;
    }
    let severity = (rng.gen_range(profile.severity_min..=profile.severity_max) * scaling.severity)
        .clamp(0.0, 1.0);
    let base_duration = rng.gen_range(profile.duration_min..=profile.duration_max);
    let duration = ((base_duration as f64 * scaling.recovery).round() as u32).max(1);
    tracing::debug!(kind = kind.as_str(), severity, duration, "disruption rolled");
    Some((severity, duration))
}

/// Roll every disruption kind once and activate those that trigger.
///
/// Kinds are rolled in a fixed order so the same stream always yields the
/// same disruptions.
pub fn roll_disruptions<R: Rng + ?Sized>(
    state: &mut SupplyChainState,
    profiles: &BTreeMap<DisruptionKind, DisruptionProfile>,
    scaling: DisruptionScaling,
    round: u32,
    rng: &mut R,
) -> Vec<Disruption> {
    let mut created = Vec::new();
    for (kind, profile) in profiles {
        let Some((severity, duration)) = roll_one(*kind, profile, scaling, rng) else {
            continue;
        };
        let regions = pick_regions(*kind, state, rng);
        state.next_disruption_seq += 1;
        let d = Disruption {
            id: format!("{}-{}", kind.as_str(), state.next_disruption_seq),
            kind: *kind,
            regions,
            severity,
            duration,
            rounds_remaining: duration,
            started_round: round,
        };
        info!(id = %d.id, round, severity, duration, "disruption started");
        state.disruptions.push(d.clone());
        created.push(d);
    }
    created
}
