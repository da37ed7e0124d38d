//! Loading and validation of the achievement rule catalog.
//!
//! The catalog is a YAML document with two lists. `achievements` holds
//! single rules. `ladders` hold one metric/operator pair with a target per
//! tier and expand into one rule per step, with ids `<ladder>_<tier>`.

use crate::metric::Metric;
use crate::types::{
    AchievementCategory, AchievementDefinition, AchievementTier, Comparison, Requirement, Target,
};
use serde::Deserialize;
use sim_core::Segment;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const BUILTIN_ACHIEVEMENTS_YAML: &str = include_str!("data/achievements.yaml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse achievement catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read achievement catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("duplicate achievement id `{id}`")]
    Duplicate { id: String },
    #[error("achievement `{id}` has no requirements")]
    EmptyRequirements { id: String },
    #[error("achievement `{id}` reads {metric:?} without a segment scope")]
    MissingScope { id: String, metric: Metric },
    #[error("achievement `{id}` has a sustained window of zero rounds")]
    ZeroSustained { id: String },
    #[error("ladder `{id}` defines no steps")]
    EmptyLadder { id: String },
}

#[derive(Debug, Deserialize)]
struct Ladder {
    id: String,
    name: String,
    /// `{target}` is replaced by each step's target.
    description: String,
    category: AchievementCategory,
    metric: Metric,
    op: Comparison,
    #[serde(default)]
    scope: Option<Segment>,
    #[serde(default)]
    sustained: Option<u32>,
    #[serde(default)]
    cumulative: bool,
    #[serde(default)]
    percentage: bool,
    steps: BTreeMap<AchievementTier, f64>,
}

impl Ladder {
    fn expand(self) -> Result<Vec<AchievementDefinition>, CatalogError> {
        if self.steps.is_empty() {
            return Err(CatalogError::EmptyLadder { id: self.id });
        }
        Ok(self
            .steps
            .iter()
            .map(|(tier, target)| AchievementDefinition {
                id: format!("{}_{}", self.id, tier),
                name: format!("{} ({})", self.name, title_case(tier.as_str())),
                description: self.description.replace("{target}", &format_target(*target)),
                category: self.category,
                tier: *tier,
                requirements: vec![Requirement {
                    metric: self.metric,
                    scope: self.scope,
                    op: self.op,
                    target: Target::Value(*target),
                    sustained: self.sustained,
                    cumulative: self.cumulative,
                    percentage: self.percentage,
                    invert: false,
                }],
                repeatable: false,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    ladders: Vec<Ladder>,
    #[serde(default)]
    achievements: Vec<AchievementDefinition>,
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_target(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() >= 1_000_000.0 {
        format!("{}M", v / 1_000_000.0)
    } else if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

/// Immutable, validated set of achievement rules in catalog order.
#[derive(Clone, Debug, Default)]
pub struct AchievementCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_ACHIEVEMENTS_YAML)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        let mut definitions = Vec::new();
        for ladder in file.ladders {
            definitions.extend(ladder.expand()?);
        }
        definitions.extend(file.achievements);
        Self::from_definitions(definitions)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn from_definitions(definitions: Vec<AchievementDefinition>) -> Result<Self, CatalogError> {
        let catalog = Self { definitions };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for def in &self.definitions {
            if !seen.insert(def.id.as_str()) {
                return Err(CatalogError::Duplicate { id: def.id.clone() });
            }
            if def.requirements.is_empty() {
                return Err(CatalogError::EmptyRequirements { id: def.id.clone() });
            }
            for req in &def.requirements {
                if req.metric.needs_scope() && req.scope.is_none() {
                    return Err(CatalogError::MissingScope {
                        id: def.id.clone(),
                        metric: req.metric,
                    });
                }
                if req.sustained == Some(0) {
                    return Err(CatalogError::ZeroSustained { id: def.id.clone() });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }

    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Number of rules per category.
    pub fn category_totals(&self) -> BTreeMap<AchievementCategory, usize> {
        let mut totals = BTreeMap::new();
        for def in &self.definitions {
            *totals.entry(def.category).or_insert(0) += 1;
        }
        totals
    }
}
