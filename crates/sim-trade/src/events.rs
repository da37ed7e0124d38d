//! Scripted trade templates, unscripted geopolitical events and scenario bundles.

use crate::TradeReport;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{
    GameProfile, GeopoliticalEvent, GeopoliticalTemplate, MaterialScope, PlayerCondition, Region,
    Tariff, TariffState, TeamState, TemplateEffect, TradeAgreement, TradeEventTemplate, TradeRoute,
};
use tracing::info;

/// Aggregate player state that scripted templates may condition on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TradeContext {
    /// Largest single-segment share held by any team.
    pub leader_share: f64,
    pub average_esg: f64,
    /// Combined revenue of all teams last round.
    pub total_revenue: Decimal,
}

impl TradeContext {
    pub fn from_teams<'a>(teams: impl IntoIterator<Item = &'a TeamState>) -> Self {
        let mut ctx = TradeContext::default();
        let mut esg_sum = 0.0;
        let mut n = 0usize;
        for team in teams {
            let top = team.market_share.values().copied().fold(0.0, f64::max);
            ctx.leader_share = ctx.leader_share.max(top);
            esg_sum += team.esg_score;
            ctx.total_revenue += team.last_revenue;
            n += 1;
        }
        if n > 0 {
            ctx.average_esg = esg_sum / n as f64;
        }
        ctx
    }

    pub fn satisfies(&self, condition: &PlayerCondition) -> bool {
        match condition {
            PlayerCondition::LeaderShareAbove { threshold } => self.leader_share > *threshold,
            PlayerCondition::AverageEsgBelow { threshold } => self.average_esg < *threshold,
            PlayerCondition::TotalRevenueAbove { threshold } => self.total_revenue > *threshold,
        }
    }
}

fn eligible(
    tpl: &TradeEventTemplate,
    state: &TariffState,
    round: u32,
    max_severity: f64,
    context: &TradeContext,
) -> bool {
    if round < tpl.first_round || round > tpl.last_round || tpl.severity > max_severity {
        return false;
    }
    if let Some(last) = state.fired_templates.get(&tpl.id) {
        if round.saturating_sub(*last) < tpl.cooldown {
            return false;
        }
    }
    tpl.condition
        .as_ref()
        .map_or(true, |c| context.satisfies(c))
}

fn fire_template(
    state: &mut TariffState,
    tpl: &TradeEventTemplate,
    round: u32,
    report: &mut TradeReport,
) {
    match &tpl.effect {
        TemplateEffect::Escalation {
            rate,
            duration,
            materials,
            volatility,
        } => {
            let tariff = Tariff {
                id: state.next_id(&tpl.id),
                name: tpl.name.clone(),
                route: tpl.route,
                materials: *materials,
                rate: *rate,
                effective_round: round,
                expiry_round: Some(round + (*duration).max(1)),
                volatility: *volatility,
            };
            state.tariffs.push(tariff.clone());
            report.installed.push(tariff);
        }
        TemplateEffect::Relief { factor } => {
            for t in state.tariffs.iter_mut().filter(|t| t.route == tpl.route) {
                t.rate *= 1.0 - factor.clamp(0.0, 1.0);
                report.relieved.push(t.id.clone());
            }
            report.messages.push(format!("Trade relief: {}", tpl.name));
        }
    }
    state.fired_templates.insert(tpl.id.clone(), round);
    info!(round, template = %tpl.id, "trade template fired");
}

/// Roll every eligible scripted template once, in configured order.
pub fn roll_templates<R: Rng + ?Sized>(
    state: &mut TariffState,
    profile: &GameProfile,
    round: u32,
    context: &TradeContext,
    rng: &mut R,
    report: &mut TradeReport,
) {
    let cap = profile.max_event_severity();
    for tpl in &profile.trade.templates {
        if !eligible(tpl, state, round, cap, context) {
            continue;
        }
        if rng.gen::<f64>() < tpl.probability {
            fire_template(state, tpl, round, report);
        }
    }
}

fn install_event(
    state: &mut TariffState,
    template: &GeopoliticalTemplate,
    regions: Vec<Region>,
    (severity, duration): (f64, u32),
    round: u32,
    volatility: f64,
    report: &mut TradeReport,
) {
    let expiry = Some(round + duration);
    if template.kind.is_relief() {
        let id = state.next_id("summit");
        state.agreements.push(TradeAgreement {
            id,
            name: template.name.clone(),
            members: regions.clone(),
            reduction: template.rate.clamp(0.0, 1.0),
            expiry_round: expiry,
        });
    } else {
        for origin in &regions {
            for destination in &regions {
                if origin == destination {
                    continue;
                }
                let tariff = Tariff {
                    id: state.next_id("geo"),
                    name: template.name.clone(),
                    route: TradeRoute::new(*origin, *destination),
                    materials: MaterialScope::All,
                    rate: template.rate * severity,
                    effective_round: round,
                    expiry_round: expiry,
                    volatility,
                };
                state.tariffs.push(tariff.clone());
                report.installed.push(tariff);
            }
        }
    }
    let event = GeopoliticalEvent {
        id: state.next_id("event"),
        kind: template.kind,
        name: template.name.clone(),
        regions,
        severity,
        rounds_remaining: duration,
        started_round: round,
    };
    state.events.push(event.clone());
    report.events_started.push(event);
}

/// With a small per-round chance, start one unscripted geopolitical event
/// between two regions.
pub fn roll_geopolitics<R: Rng + ?Sized>(
    state: &mut TariffState,
    profile: &GameProfile,
    round: u32,
    rng: &mut R,
    report: &mut TradeReport,
) {
    let trade = &profile.trade;
    if rng.gen::<f64>() >= trade.geopolitical_chance {
        return;
    }
    let Some(template) = trade.geopolitical_pool.choose(rng) else {
        return;
    };
    let severity = rng
        .gen_range(template.severity_min..=template.severity_max)
        .min(profile.max_event_severity());
    let duration = rng.gen_range(template.duration_min..=template.duration_max).max(1);
    let mut regions: Vec<Region> = Region::ALL.choose_multiple(rng, 2).copied().collect();
    regions.sort();
    install_event(
        state,
        template,
        regions,
        (severity, duration),
        round,
        trade.default_volatility,
        report,
    );
}

/// With a small per-round chance, inject a configured scenario bundle.
pub fn roll_scenario<R: Rng + ?Sized>(
    state: &mut TariffState,
    profile: &GameProfile,
    round: u32,
    rng: &mut R,
    report: &mut TradeReport,
) {
    let trade = &profile.trade;
    if rng.gen::<f64>() >= trade.scenario_chance {
        return;
    }
    let Some(scenario) = trade.scenarios.choose(rng) else {
        return;
    };
    for st in &scenario.tariffs {
        let tariff = Tariff {
            id: state.next_id(&scenario.id),
            name: scenario.name.clone(),
            route: st.route,
            materials: st.materials,
            rate: st.rate,
            effective_round: round,
            expiry_round: Some(round + st.duration.max(1)),
            volatility: st.volatility,
        };
        state.tariffs.push(tariff.clone());
        report.installed.push(tariff);
    }
    for se in &scenario.events {
        let event = GeopoliticalEvent {
            id: state.next_id("event"),
            kind: se.kind,
            name: se.name.clone(),
            regions: se.regions.clone(),
            severity: se.severity.min(profile.max_event_severity()),
            rounds_remaining: se.duration.max(1),
            started_round: round,
        };
        state.events.push(event.clone());
        report.events_started.push(event);
    }
    info!(round, scenario = %scenario.id, "trade scenario injected");
    report.scenario = Some(scenario.id.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{Difficulty, GeopoliticalKind, Material, TradeScenario, ScenarioTariff};

    fn escalation(id: &str, severity: f64) -> TradeEventTemplate {
        TradeEventTemplate {
            id: id.into(),
            name: id.into(),
            route: TradeRoute::new(Region::EastAsia, Region::Europe),
            effect: TemplateEffect::Escalation {
                rate: 0.2,
                duration: 2,
                materials: MaterialScope::Only(Material::Camera),
                volatility: 0.3,
            },
            first_round: 1,
            last_round: 10,
            probability: 1.0,
            severity,
            cooldown: 3,
            condition: None,
        }
    }

    fn quiet_profile(templates: Vec<TradeEventTemplate>) -> GameProfile {
        let mut p = GameProfile::default();
        p.trade.templates = templates;
        p.trade.geopolitical_chance = 0.0;
        p.trade.scenario_chance = 0.0;
        p
    }

    #[test]
    fn escalation_installs_time_boxed_tariff_and_respects_cooldown() {
        let profile = quiet_profile(vec![escalation("chips", 0.5)]);
        let mut state = TariffState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ctx = TradeContext::default();
        let mut report = TradeReport::default();
        roll_templates(&mut state, &profile, 2, &ctx, &mut rng, &mut report);
        assert_eq!(report.installed.len(), 1);
        assert_eq!(state.tariffs[0].expiry_round, Some(4));
        let mut again = TradeReport::default();
        roll_templates(&mut state, &profile, 4, &ctx, &mut rng, &mut again);
        assert!(again.installed.is_empty());
        roll_templates(&mut state, &profile, 5, &ctx, &mut rng, &mut again);
        assert_eq!(again.installed.len(), 1);
    }

    #[test]
    fn severity_cap_follows_difficulty() {
        let mut profile = quiet_profile(vec![escalation("harsh", 0.8)]);
        profile.difficulty = Difficulty::Easy;
        let mut state = TariffState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = TradeReport::default();
        roll_templates(&mut state, &profile, 2, &TradeContext::default(), &mut rng, &mut report);
        assert!(report.installed.is_empty());
        profile.difficulty = Difficulty::Expert;
        roll_templates(&mut state, &profile, 2, &TradeContext::default(), &mut rng, &mut report);
        assert_eq!(report.installed.len(), 1);
    }

    #[test]
    fn player_condition_gates_template() {
        let mut tpl = escalation("antitrust", 0.5);
        tpl.condition = Some(PlayerCondition::LeaderShareAbove { threshold: 0.6 });
        let profile = quiet_profile(vec![tpl]);
        let mut state = TariffState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = TradeReport::default();
        let calm = TradeContext {
            leader_share: 0.4,
            ..Default::default()
        };
        roll_templates(&mut state, &profile, 2, &calm, &mut rng, &mut report);
        assert!(report.installed.is_empty());
        let dominant = TradeContext {
            leader_share: 0.7,
            ..Default::default()
        };
        roll_templates(&mut state, &profile, 2, &dominant, &mut rng, &mut report);
        assert_eq!(report.installed.len(), 1);
    }

    #[test]
    fn relief_scales_existing_route_tariffs() {
        let mut tpl = escalation("truce", 0.1);
        tpl.effect = TemplateEffect::Relief { factor: 0.5 };
        let profile = quiet_profile(vec![tpl]);
        let mut state = profile.initial_tariffs();
        state.tariffs.retain(|t| t.id == "base-ea-eu");
        let before = state.tariffs[0].rate;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut report = TradeReport::default();
        roll_templates(&mut state, &profile, 2, &TradeContext::default(), &mut rng, &mut report);
        assert!((state.tariffs[0].rate - before * 0.5).abs() < 1e-12);
        assert_eq!(report.relieved, vec!["base-ea-eu".to_string()]);
    }

    #[test]
    fn certain_geopolitics_installs_event() {
        let mut profile = quiet_profile(vec![]);
        profile.trade.geopolitical_chance = 1.0;
        profile.trade.geopolitical_pool = vec![GeopoliticalTemplate {
            kind: GeopoliticalKind::Sanctions,
            name: "Sanctions".into(),
            severity_min: 0.5,
            severity_max: 0.5,
            duration_min: 2,
            duration_max: 2,
            rate: 0.2,
        }];
        let mut state = TariffState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut report = TradeReport::default();
        roll_geopolitics(&mut state, &profile, 1, &mut rng, &mut report);
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.events[0].regions.len(), 2);
        assert_eq!(report.installed.len(), 2);
        assert!((report.installed[0].rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn summit_creates_agreement() {
        let mut profile = quiet_profile(vec![]);
        profile.trade.geopolitical_chance = 1.0;
        profile.trade.geopolitical_pool = vec![GeopoliticalTemplate {
            kind: GeopoliticalKind::TradeSummit,
            name: "Summit".into(),
            severity_min: 0.3,
            severity_max: 0.3,
            duration_min: 1,
            duration_max: 1,
            rate: 0.4,
        }];
        let mut state = TariffState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut report = TradeReport::default();
        roll_geopolitics(&mut state, &profile, 1, &mut rng, &mut report);
        assert_eq!(state.agreements.len(), 1);
        assert_eq!(state.agreements[0].reduction, 0.4);
        assert!(report.installed.is_empty());
    }

    #[test]
    fn scenario_bundle_injects_tariffs_and_events() {
        let mut profile = quiet_profile(vec![]);
        profile.trade.scenario_chance = 1.0;
        profile.trade.scenarios = vec![TradeScenario {
            id: "war".into(),
            name: "War".into(),
            tariffs: vec![ScenarioTariff {
                route: TradeRoute::new(Region::Europe, Region::Africa),
                materials: MaterialScope::All,
                rate: 0.3,
                duration: 2,
                volatility: 0.2,
            }],
            events: vec![],
        }];
        let mut state = TariffState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut report = TradeReport::default();
        roll_scenario(&mut state, &profile, 4, &mut rng, &mut report);
        assert_eq!(report.scenario.as_deref(), Some("war"));
        assert_eq!(state.tariffs[0].expiry_round, Some(6));
    }

    #[test]
    fn context_summarises_teams() {
        let p = GameProfile::default();
        let (mut a, _) = p.new_team("a".into(), "A", Region::Europe);
        let (mut b, _) = p.new_team("b".into(), "B", Region::Europe);
        a.esg_score = 300.0;
        b.esg_score = 500.0;
        a.market_share.insert(sim_core::Segment::Budget, 0.8);
        a.last_revenue = Decimal::new(10, 0);
        b.last_revenue = Decimal::new(5, 0);
        let ctx = TradeContext::from_teams([&a, &b]);
        assert_eq!(ctx.leader_share, 0.8);
        assert_eq!(ctx.average_esg, 400.0);
        assert_eq!(ctx.total_revenue, Decimal::new(15, 0));
    }
}
