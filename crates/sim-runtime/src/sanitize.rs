//! Decision sanitizing.
//!
//! A rejected or missing department decision never aborts the round: it is
//! replaced by the department's zero-spend default and reported as a warning.

use sim_core::{
    DecisionBundle, DecisionError, Department, FactoryDecision, FinanceDecision, HrDecision,
    MarketingDecision, RdDecision, SupplyChainState, TeamState,
};
use tracing::warn;

/// Department decisions safe to apply, plus what had to be replaced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SanitizedDecisions {
    pub factory: FactoryDecision,
    pub hr: HrDecision,
    pub marketing: MarketingDecision,
    pub finance: FinanceDecision,
    pub rd: RdDecision,
    pub warnings: Vec<String>,
}

fn accept<T: Clone + Default>(
    team: &TeamState,
    department: Department,
    decision: Option<&T>,
    validate: impl FnOnce(&T) -> Result<(), DecisionError>,
    warnings: &mut Vec<String>,
) -> T {
    let Some(decision) = decision else {
        warnings.push(format!(
            "No {} decision submitted; defaults applied",
            department.as_str()
        ));
        return T::default();
    };
    match validate(decision) {
        Ok(()) => decision.clone(),
        Err(err) => {
            warn!(team = %team.id, department = department.as_str(), %err, "decision rejected");
            warnings.push(format!(
                "Rejected {} decision ({err}); defaults applied",
                department.as_str()
            ));
            T::default()
        }
    }
}

/// Validate each department of a team's bundle independently.
pub fn sanitize(
    team: &TeamState,
    supply: &SupplyChainState,
    bundle: Option<&DecisionBundle>,
) -> SanitizedDecisions {
    let Some(bundle) = bundle else {
        warn!(team = %team.id, "no decisions submitted");
        return SanitizedDecisions {
            warnings: vec!["No decisions submitted; defaults applied".to_string()],
            ..Default::default()
        };
    };
    let mut warnings = Vec::new();
    let factory = accept(
        team,
        Department::Factory,
        bundle.factory.as_ref(),
        |d: &FactoryDecision| d.validate(team, supply),
        &mut warnings,
    );
    let hr = accept(
        team,
        Department::Hr,
        bundle.hr.as_ref(),
        |d: &HrDecision| d.validate(team),
        &mut warnings,
    );
    let marketing = accept(
        team,
        Department::Marketing,
        bundle.marketing.as_ref(),
        |d: &MarketingDecision| d.validate(team),
        &mut warnings,
    );
    let finance = accept(
        team,
        Department::Finance,
        bundle.finance.as_ref(),
        |d: &FinanceDecision| d.validate(team),
        &mut warnings,
    );
    let rd = accept(
        team,
        Department::Rd,
        bundle.rd.as_ref(),
        |d: &RdDecision| d.validate(team),
        &mut warnings,
    );
    SanitizedDecisions {
        factory,
        hr,
        marketing,
        finance,
        rd,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use sim_core::{GameProfile, Region};

    fn team() -> (TeamState, SupplyChainState) {
        GameProfile::default().new_team("a".into(), "A", Region::Europe)
    }

    #[test]
    fn missing_bundle_becomes_defaults_with_one_warning() {
        let (t, s) = team();
        let out = sanitize(&t, &s, None);
        assert_eq!(out.hr, HrDecision::default());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn only_the_bad_department_is_replaced() {
        let (t, s) = team();
        let bundle = DecisionBundle {
            factory: Some(FactoryDecision::default()),
            hr: Some(HrDecision {
                fires: t.workforce.headcount + 1,
                ..Default::default()
            }),
            marketing: Some(MarketingDecision::default()),
            finance: Some(FinanceDecision {
                borrow: Decimal::new(250_000, 0),
                ..Default::default()
            }),
            rd: Some(RdDecision::default()),
        };
        let out = sanitize(&t, &s, Some(&bundle));
        assert_eq!(out.hr, HrDecision::default());
        assert_eq!(out.finance.borrow, Decimal::new(250_000, 0));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("hr"));
    }

    #[test]
    fn missing_departments_are_flagged() {
        let (t, s) = team();
        let bundle = DecisionBundle {
            rd: Some(RdDecision::default()),
            ..Default::default()
        };
        let out = sanitize(&t, &s, Some(&bundle));
        assert_eq!(out.warnings.len(), 4);
    }
}
