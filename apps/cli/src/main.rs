#![deny(warnings)]

//! Headless CLI: runs an autopilot game through the round settlement kernel
//! and prints per-round standings and final KPIs.

mod autopilot;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sim_core::{DecisionBundle, GameProfile, Region, TeamId};
use sim_runtime::{RoundReport, Session, TeamSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const TEAM_NAMES: [&str; 8] = [
    "Aurora", "Basalt", "Cobalt", "Dynamo", "Ember", "Fjord", "Granite", "Helix",
];

#[derive(Debug)]
struct Args {
    profile: Option<PathBuf>,
    teams: usize,
    rounds: u32,
    seed: u64,
    json: bool,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        profile: None,
        teams: 4,
        rounds: 8,
        seed: 42,
        json: false,
        version: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--profile" => args.profile = it.next().map(PathBuf::from),
            "--teams" => {
                args.teams = it
                    .next()
                    .context("--teams needs a value")?
                    .parse::<usize>()
                    .context("--teams must be a number")?
            }
            "--rounds" => {
                args.rounds = it
                    .next()
                    .context("--rounds needs a value")?
                    .parse::<u32>()
                    .context("--rounds must be a number")?
            }
            "--seed" => {
                args.seed = it
                    .next()
                    .context("--seed needs a value")?
                    .parse::<u64>()
                    .context("--seed must be a number")?
            }
            "--json" => args.json = true,
            "--version" => args.version = true,
            other => bail!("unknown argument {other}"),
        }
    }
    if args.teams == 0 || args.teams > TEAM_NAMES.len() {
        bail!("--teams must be between 1 and {}", TEAM_NAMES.len());
    }
    Ok(args)
}

fn team_specs(n: usize) -> Vec<TeamSpec> {
    TEAM_NAMES
        .iter()
        .take(n)
        .enumerate()
        .map(|(i, name)| {
            TeamSpec::new(
                &name.to_lowercase(),
                name,
                Region::ALL[i % Region::ALL.len()],
            )
        })
        .collect()
}

#[derive(Serialize)]
struct TeamSummary<'a> {
    team: &'a TeamId,
    name: &'a str,
    cash: String,
    cumulative_revenue: String,
    cumulative_net_income: String,
    brand_value: f64,
    esg_score: f64,
    achievement_points: i64,
    achievements: usize,
}

fn print_round(report: &RoundReport) {
    let outcome = &report.outcome;
    let leader = outcome.rankings.first().map_or("-", |t| t.0.as_str());
    println!(
        "Round {} | phase: {} | demand x{:.2} | tariffs: {} | leader: {}",
        outcome.round,
        outcome.market.phase.as_str(),
        outcome.outlook.demand_multiplier,
        outcome.tariffs.tariffs.len(),
        leader
    );
    for id in &outcome.rankings {
        let Some(r) = outcome.results.get(id) else {
            continue;
        };
        println!(
            "  #{} {:<8} revenue: ${} | net: ${} | share Δ: {:+.2}pp | units: {} | x{:.3}",
            r.rank,
            id.0,
            r.revenue.round_dp(0),
            r.net_income.round_dp(0),
            r.market_share_delta * 100.0,
            r.units_sold.values().sum::<u64>(),
            r.balance_multiplier
        );
    }
    for delta in &report.achievements {
        for message in &delta.messages {
            println!("  [{}] {}", delta.team, message.text);
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    if args.version {
        println!(
            "handset {} ({} built {}) achievements catalog {}",
            env!("CARGO_PKG_VERSION"),
            env!("HANDSET_GIT_SHA"),
            env!("HANDSET_BUILD_DATE"),
            env!("HANDSET_CATALOG_DIGEST")
        );
        return Ok(());
    }
    info!(?args, "starting CLI");

    let profile = match &args.profile {
        Some(path) => GameProfile::from_file(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        None => GameProfile::default(),
    };
    let specs = team_specs(args.teams);
    let mut session = Session::new(profile, &specs, args.seed)?;
    println!(
        "Game OK | profile: {} | teams: {} | rules: {} | seed: {}",
        session.profile().name,
        specs.len(),
        session.ledger().catalog().len(),
        args.seed
    );

    for _ in 0..args.rounds {
        let round = session.round() + 1;
        let team_count = session.teams().len();
        let decisions: BTreeMap<TeamId, DecisionBundle> = session
            .teams()
            .iter()
            .map(|(id, team)| {
                let bundle = autopilot::decide(
                    session.profile(),
                    session.market(),
                    team,
                    team_count,
                    args.seed,
                    round,
                );
                (id.clone(), bundle)
            })
            .collect();
        let report = session.advance(&decisions)?;
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_round(&report);
        }
    }

    let summaries: Vec<TeamSummary<'_>> = session
        .teams()
        .iter()
        .map(|(id, team)| {
            let achievements = session.achievements().get(id);
            TeamSummary {
                team: id,
                name: &team.name,
                cash: team.cash.round_dp(2).to_string(),
                cumulative_revenue: team.cumulative_revenue.round_dp(2).to_string(),
                cumulative_net_income: team.cumulative_net_income.round_dp(2).to_string(),
                brand_value: team.brand_value,
                esg_score: team.esg_score,
                achievement_points: achievements.map_or(0, |a| a.points),
                achievements: achievements.map_or(0, |a| a.earned.len()),
            }
        })
        .collect();
    if args.json {
        println!("{}", serde_json::to_string(&summaries)?);
    } else {
        for s in &summaries {
            let share = session
                .teams()
                .get(s.team)
                .map_or(0.0, |t| sim_core::overall_share(&t.market_share, session.market()));
            println!(
                "KPI | team: {} | revenue: ${} | net: ${} | cash: ${} | share: {:.1}% | brand: {:.2} | esg: {:.0} | points: {} | achievements: {}",
                s.name,
                s.cumulative_revenue,
                s.cumulative_net_income,
                s.cash,
                share * 100.0,
                s.brand_value,
                s.esg_score,
                s.achievement_points,
                s.achievements
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_metadata_is_embedded() {
        let digest = env!("HANDSET_CATALOG_DIGEST");
        assert!(
            digest == "unknown" || (digest.len() == 16 && u64::from_str_radix(digest, 16).is_ok())
        );
        assert!(!env!("HANDSET_GIT_SHA").is_empty());
        assert!(!env!("HANDSET_BUILD_DATE").is_empty());
    }

    #[test]
    fn team_specs_cycle_regions() {
        let specs = team_specs(8);
        assert_eq!(specs.len(), 8);
        assert_eq!(specs[0].id, TeamId::from("aurora"));
        assert_eq!(specs[0].home_region, specs[Region::ALL.len()].home_region);
    }
}
