//! Multi-round driver: carries state between settlements and runs the
//! achievement ledger after each one.

use crate::settle::{settle_round, RoundInput, RoundOutcome};
use serde::Serialize;
use sim_achievements::{
    AchievementCatalog, AchievementDelta, AchievementLedger, AchievementState, CatalogError,
    TeamContext,
};
use sim_core::{
    DecisionBundle, GameProfile, MarketState, Region, SupplyChainState, TariffState, TeamId,
    TeamState, ValidationError,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid profile: {0}")]
    Profile(#[from] ValidationError),
    #[error("achievement catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("team {0} registered twice")]
    DuplicateTeam(TeamId),
    #[error("a session needs at least one team")]
    NoTeams,
}

/// A team joining the game.
#[derive(Clone, Debug, PartialEq)]
pub struct TeamSpec {
    pub id: TeamId,
    pub name: String,
    pub home_region: Region,
}

impl TeamSpec {
    pub fn new(id: &str, name: &str, home_region: Region) -> Self {
        Self {
            id: TeamId::from(id),
            name: name.to_string(),
            home_region,
        }
    }
}

/// Everything produced by one call to [`Session::advance`].
#[derive(Clone, Debug, Serialize)]
pub struct RoundReport {
    pub outcome: RoundOutcome,
    pub achievements: Vec<AchievementDelta>,
}

pub struct Session {
    profile: GameProfile,
    ledger: AchievementLedger,
    seed: u64,
    round: u32,
    market: MarketState,
    tariffs: TariffState,
    teams: BTreeMap<TeamId, TeamState>,
    supply: BTreeMap<TeamId, SupplyChainState>,
    achievements: BTreeMap<TeamId, AchievementState>,
}

impl Session {
    /// Start a game with the built-in achievement catalog.
    pub fn new(profile: GameProfile, teams: &[TeamSpec], seed: u64) -> Result<Self, SessionError> {
        let catalog = AchievementCatalog::builtin()?;
        Self::with_catalog(profile, catalog, teams, seed)
    }

    pub fn with_catalog(
        profile: GameProfile,
        catalog: AchievementCatalog,
        specs: &[TeamSpec],
        seed: u64,
    ) -> Result<Self, SessionError> {
        profile.validate()?;
        if specs.is_empty() {
            return Err(SessionError::NoTeams);
        }
        let mut teams = BTreeMap::new();
        let mut supply = BTreeMap::new();
        for spec in specs {
            if teams.contains_key(&spec.id) {
                return Err(SessionError::DuplicateTeam(spec.id.clone()));
            }
            let (team, chain) = profile.new_team(spec.id.clone(), &spec.name, spec.home_region);
            teams.insert(spec.id.clone(), team);
            supply.insert(spec.id.clone(), chain);
        }
        let ledger = AchievementLedger::new(catalog, &profile.achievements, profile.difficulty);
        info!(
            profile = %profile.name,
            teams = teams.len(),
            rules = ledger.catalog().len(),
            seed,
            "session started"
        );
        Ok(Self {
            market: profile.initial_market(),
            tariffs: profile.initial_tariffs(),
            profile,
            ledger,
            seed,
            round: 0,
            teams,
            supply,
            achievements: BTreeMap::new(),
        })
    }

    /// Settle the next round, score achievements and commit.
    ///
    /// On error nothing is committed.
    pub fn advance(
        &mut self,
        decisions: &BTreeMap<TeamId, DecisionBundle>,
    ) -> Result<RoundReport, SessionError> {
        let round = self.round + 1;
        let outcome = settle_round(&RoundInput {
            round,
            seed: self.seed,
            profile: &self.profile,
            market: &self.market,
            tariffs: &self.tariffs,
            teams: &self.teams,
            supply: &self.supply,
            decisions,
        })?;

        let contexts: Vec<TeamContext<'_>> = outcome
            .teams
            .iter()
            .filter_map(|(id, team)| {
                Some(TeamContext {
                    round,
                    team,
                    previous: self.teams.get(id)?,
                    supply: outcome.supply.get(id)?,
                    result: outcome.results.get(id)?,
                    market: &outcome.market,
                    team_count: outcome.teams.len(),
                })
            })
            .collect();
        let achievements = self
            .ledger
            .evaluate_round(round, &contexts, &mut self.achievements);
        drop(contexts);

        self.round = round;
        self.market = outcome.market.clone();
        self.tariffs = outcome.tariffs.clone();
        self.teams = outcome.teams.clone();
        self.supply = outcome.supply.clone();
        Ok(RoundReport {
            outcome,
            achievements,
        })
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn profile(&self) -> &GameProfile {
        &self.profile
    }

    pub fn ledger(&self) -> &AchievementLedger {
        &self.ledger
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn tariffs(&self) -> &TariffState {
        &self.tariffs
    }

    pub fn teams(&self) -> &BTreeMap<TeamId, TeamState> {
        &self.teams
    }

    pub fn supply(&self) -> &BTreeMap<TeamId, SupplyChainState> {
        &self.supply
    }

    pub fn achievements(&self) -> &BTreeMap<TeamId, AchievementState> {
        &self.achievements
    }
}
