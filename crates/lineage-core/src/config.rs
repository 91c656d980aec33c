//! Layout configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all)
//! yields the stock schedule. Example:
//!
//! ```toml
//! random_seed = 7
//!
//! [weights]
//! attraction = 10.0
//! blocker = 800.0
//!
//! [[schedule]]
//! name = "rough-sort"
//! strategies = ["parents", "children"]
//! iterations = 30
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub weights: CostWeights,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub groupwise: GroupwiseConfig,
    #[serde(default = "default_schedule")]
    pub schedule: Vec<Phase>,
    /// Seed for the annealing RNG.
    #[serde(default)]
    pub random_seed: u64,
    /// Year used as the end of still-active entities. `None` reads the
    /// system clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_year: Option<i32>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            weights: CostWeights::default(),
            search: SearchConfig::default(),
            groupwise: GroupwiseConfig::default(),
            schedule: default_schedule(),
            random_seed: 0,
            current_year: None,
        }
    }
}

impl LayoutConfig {
    /// Check every value against its domain.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("attraction", self.weights.attraction),
            ("cut_through", self.weights.cut_through),
            ("blocker", self.weights.blocker),
            ("y_shape", self.weights.y_shape),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        let g = &self.groupwise;
        if !g.initial_temperature.is_finite() || g.initial_temperature <= 0.0 {
            return Err(ConfigError::InvalidTemperature(g.initial_temperature));
        }
        if !(g.cooling_rate > 0.0 && g.cooling_rate < 1.0) {
            return Err(ConfigError::InvalidCoolingRate(g.cooling_rate));
        }
        if g.max_group_size == 0 {
            return Err(ConfigError::EmptyGroupSize);
        }

        if let Some(phase) = self.schedule.iter().find(|p| p.strategies.is_empty()) {
            return Err(ConfigError::EmptyPhase(phase.name.clone()));
        }
        Ok(())
    }

    /// The configured current year, or the system clock's.
    #[must_use]
    pub fn resolved_current_year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(crate::model::system_current_year)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Weights of the four cost terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostWeights {
    #[serde(default = "default_attraction")]
    pub attraction: f64,
    #[serde(default = "default_cut_through")]
    pub cut_through: f64,
    #[serde(default = "default_blocker")]
    pub blocker: f64,
    #[serde(default = "default_y_shape")]
    pub y_shape: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            attraction: default_attraction(),
            cut_through: default_cut_through(),
            blocker: default_blocker(),
            y_shape: default_y_shape(),
        }
    }
}

/// Candidate-lane radii for the greedy optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Lanes probed on either side of the current lane.
    #[serde(default = "default_search_radius")]
    pub search_radius: u32,
    /// Lanes probed on either side of each parent's and child's lane.
    #[serde(default = "default_target_radius")]
    pub target_radius: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_radius: default_search_radius(),
            target_radius: default_target_radius(),
        }
    }
}

/// Parameters for rigid moves, swaps, and annealing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupwiseConfig {
    #[serde(default = "default_max_rigid_shift")]
    pub max_rigid_shift: u32,
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
    #[serde(default = "default_anneal_iterations")]
    pub anneal_iterations: usize,
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    #[serde(default = "default_cooling_rate")]
    pub cooling_rate: f64,
    /// Lanes added above and below the group's span when sampling moves.
    #[serde(default = "default_anneal_window")]
    pub anneal_window: u32,
}

impl Default for GroupwiseConfig {
    fn default() -> Self {
        Self {
            max_rigid_shift: default_max_rigid_shift(),
            max_group_size: default_max_group_size(),
            anneal_iterations: default_anneal_iterations(),
            initial_temperature: default_initial_temperature(),
            cooling_rate: default_cooling_rate(),
            anneal_window: default_anneal_window(),
        }
    }
}

/// Optimization strategy dispatched by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Greedy, oldest chains first.
    Parents,
    /// Greedy, youngest chains first.
    Children,
    /// Greedy, best-connected chains first.
    Hubs,
    /// Rigid moves, swaps, then annealing per group.
    Hybrid,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parents => "parents",
            Self::Children => "children",
            Self::Hubs => "hubs",
            Self::Hybrid => "hybrid",
        }
    }
}

/// One step of the pass schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub strategies: Vec<Strategy>,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Families with fewer chains skip this phase.
    #[serde(default)]
    pub min_family_size: usize,
    /// Families with fewer links skip this phase.
    #[serde(default)]
    pub min_links: usize,
}

impl Phase {
    #[must_use]
    pub fn new(name: &str, strategies: &[Strategy], iterations: usize) -> Self {
        Self {
            name: name.to_string(),
            strategies: strategies.to_vec(),
            iterations,
            min_family_size: 0,
            min_links: 0,
        }
    }

    #[must_use]
    pub const fn gated(mut self, min_family_size: usize, min_links: usize) -> Self {
        self.min_family_size = min_family_size;
        self.min_links = min_links;
        self
    }

    /// `true` if a family of this size and link count runs the phase.
    #[must_use]
    pub const fn admits(&self, family_size: usize, links: usize) -> bool {
        family_size >= self.min_family_size && links >= self.min_links
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Rough sort, hub anchoring, fine tuning, hybrid cleanup.
#[must_use]
pub fn default_schedule() -> Vec<Phase> {
    use Strategy::{Children, Hubs, Hybrid, Parents};
    vec![
        Phase::new("rough-sort", &[Parents, Children], 30),
        Phase::new("hub-anchor", &[Hubs], 10).gated(5, 3),
        Phase::new("fine-tune", &[Parents, Children, Hubs], 20),
        Phase::new("hybrid", &[Hybrid], 1).gated(5, 2),
    ]
}

const fn default_attraction() -> f64 {
    10.0
}

const fn default_cut_through() -> f64 {
    500.0
}

const fn default_blocker() -> f64 {
    500.0
}

const fn default_y_shape() -> f64 {
    40.0
}

const fn default_search_radius() -> u32 {
    3
}

const fn default_target_radius() -> u32 {
    1
}

const fn default_max_rigid_shift() -> u32 {
    3
}

const fn default_max_group_size() -> usize {
    8
}

const fn default_anneal_iterations() -> usize {
    100
}

const fn default_initial_temperature() -> f64 {
    50.0
}

const fn default_cooling_rate() -> f64 {
    0.95
}

const fn default_anneal_window() -> u32 {
    2
}

const fn default_iterations() -> usize {
    1
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`LayoutConfig`] from a TOML file.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if a value is
/// out of range.
pub fn load_layout_config(path: &Path) -> Result<LayoutConfig> {
    if !path.exists() {
        return Ok(LayoutConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<LayoutConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid layout config in {}", path.display()))?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        LayoutConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn default_schedule_matches_stock_phases() {
        let schedule = default_schedule();
        let summary: Vec<(&str, usize, usize, usize)> = schedule
            .iter()
            .map(|p| (p.name.as_str(), p.iterations, p.min_family_size, p.min_links))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("rough-sort", 30, 0, 0),
                ("hub-anchor", 10, 5, 3),
                ("fine-tune", 20, 0, 0),
                ("hybrid", 1, 5, 2),
            ]
        );
        assert_eq!(schedule[3].strategies, vec![Strategy::Hybrid]);
    }

    #[test]
    fn gating_thresholds() {
        let phase = Phase::new("hub", &[Strategy::Hubs], 1).gated(5, 3);
        assert!(!phase.admits(4, 10));
        assert!(!phase.admits(10, 2));
        assert!(phase.admits(5, 3));
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config: LayoutConfig = toml::from_str("").expect("parse empty");
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config: LayoutConfig = toml::from_str(
            r#"
            random_seed = 9
            current_year = 2020

            [weights]
            blocker = 900.0

            [[schedule]]
            name = "only"
            strategies = ["hubs", "hybrid"]
            iterations = 2
            min_links = 1
            "#,
        )
        .expect("parse config");

        assert_eq!(config.random_seed, 9);
        assert_eq!(config.resolved_current_year(), 2020);
        assert!((config.weights.blocker - 900.0).abs() < f64::EPSILON);
        assert!((config.weights.attraction - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.schedule.len(), 1);
        assert_eq!(config.schedule[0].strategies, vec![Strategy::Hubs, Strategy::Hybrid]);
        assert_eq!(config.schedule[0].min_family_size, 0);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = LayoutConfig::default();
        config.weights.y_shape = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "y_shape", .. })
        ));

        let mut config = LayoutConfig::default();
        config.groupwise.cooling_rate = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCoolingRate(1.0)));

        let mut config = LayoutConfig::default();
        config.groupwise.initial_temperature = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTemperature(0.0)));

        let mut config = LayoutConfig::default();
        config.groupwise.max_group_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyGroupSize));

        let mut config = LayoutConfig::default();
        config.schedule.push(Phase::new("blank", &[], 1));
        assert_eq!(config.validate(), Err(ConfigError::EmptyPhase("blank".into())));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_layout_config(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn load_reports_invalid_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("layout.toml");
        std::fs::write(&path, "[groupwise]\ncooling_rate = 2.0\n").expect("write");
        let err = load_layout_config(&path).expect_err("invalid cooling rate");
        assert!(format!("{err:#}").contains("cooling rate"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let text = toml::to_string(&LayoutConfig::default()).expect("serialize");
        let back: LayoutConfig = toml::from_str(&text).expect("parse");
        assert_eq!(back, LayoutConfig::default());
    }
}
