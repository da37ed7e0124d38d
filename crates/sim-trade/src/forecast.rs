//! Advisory tariff forecast. Never feeds back into settlement.

use crate::adjusted_rate;
use serde::{Deserialize, Serialize};
use sim_core::{Material, PolicyStance, TariffState, TradeConfig, TradeRoute};

/// Projected rate for one future round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TariffForecast {
    pub round: u32,
    pub expected_rate: f64,
    pub increase_probability: f64,
    pub decrease_probability: f64,
    /// Decays linearly with the horizon, floored at zero.
    pub confidence: f64,
}

fn route_volatility(
    state: &TariffState,
    route: TradeRoute,
    material: Material,
    round: u32,
    default: f64,
) -> f64 {
    state
        .tariffs
        .iter()
        .filter(|t| t.applies(route, material, round))
        .map(|t| t.volatility)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(default)
        .clamp(0.0, 1.0)
}

/// Increase and decrease probabilities for one step, biased by the
/// destination's policy stance.
pub fn step_probabilities(volatility: f64, stance: PolicyStance) -> (f64, f64) {
    let up_bias = match stance {
        PolicyStance::FreeTrade => 0.3,
        PolicyStance::Neutral => 0.5,
        PolicyStance::Protectionist => 0.7,
    };
    (volatility * up_bias, volatility * (1.0 - up_bias))
}

/// Project the adjusted rate for `horizon` rounds after `round`.
///
/// Scheduled expiries are honoured; on top of that the rate drifts by
/// `(p_up - p_down) * forecast_step` per round.
pub fn forecast(
    state: &TariffState,
    route: TradeRoute,
    material: Material,
    round: u32,
    horizon: u32,
    config: &TradeConfig,
) -> Vec<TariffForecast> {
    let volatility = route_volatility(state, route, material, round, config.default_volatility);
    let (up, down) = step_probabilities(volatility, state.stance(route.destination));
    let drift = (up - down) * config.forecast_step;
    (1..=horizon)
        .map(|k| {
            let future = round + k;
            let scheduled = adjusted_rate(state, route, material, future);
            TariffForecast {
                round: future,
                expected_rate: (scheduled + drift * k as f64).max(0.0),
                increase_probability: up,
                decrease_probability: down,
                confidence: (1.0 - config.forecast_confidence_decay * k as f64).max(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{GameProfile, Region};

    #[test]
    fn protectionist_destination_trends_up() {
        let profile = GameProfile::default();
        let state = profile.initial_tariffs();
        let route = TradeRoute::new(Region::EastAsia, Region::NorthAmerica);
        let f = forecast(&state, route, Material::Display, 1, 5, &profile.trade);
        assert_eq!(f.len(), 5);
        assert!(f[0].increase_probability > f[0].decrease_probability);
        assert!(f[4].expected_rate > f[0].expected_rate);
        assert!(f.windows(2).all(|w| w[1].confidence < w[0].confidence));
    }

    #[test]
    fn free_trade_destination_trends_down_but_not_negative() {
        let profile = GameProfile::default();
        let state = profile.initial_tariffs();
        let route = TradeRoute::new(Region::Africa, Region::Europe);
        let f = forecast(&state, route, Material::Battery, 1, 20, &profile.trade);
        assert!(f.iter().all(|p| p.expected_rate >= 0.0));
        assert!(f[0].decrease_probability > f[0].increase_probability);
        assert_eq!(f.last().map(|p| p.confidence), Some(0.0));
    }

    #[test]
    fn scheduled_expiry_is_reflected() {
        let profile = GameProfile::default();
        let mut state = profile.initial_tariffs();
        for t in &mut state.tariffs {
            t.expiry_round = Some(3);
        }
        let route = TradeRoute::new(Region::SouthAsia, Region::NorthAmerica);
        let f = forecast(&state, route, Material::Chassis, 1, 3, &profile.trade);
        assert!(f[0].expected_rate > 0.04);
        assert!(f[1].expected_rate < 0.01);
    }
}
