//! Tunable parameters for the terrain engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Tint;

/// Reasons a [`TerrainConfig`] is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A per-step or per-tick budget was zero, which would stall its queue.
    #[error("`{field}` must be greater than zero")]
    ZeroBudget {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A fraction was outside the closed unit interval.
    #[error("`{field}` must lie within 0..=1, got {value}")]
    OutOfUnitRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value supplied by the configuration.
        value: f32,
    },
    /// A scalar that must be non-negative and finite was not.
    #[error("`{field}` must be finite and non-negative, got {value}")]
    NotNonNegative {
        /// Name of the offending field.
        field: &'static str,
        /// Value supplied by the configuration.
        value: f32,
    },
}

/// Every adjustable knob of the terrain engine.
///
/// Durations are stored in milliseconds so the structure reads naturally from
/// TOML; the accessor methods convert them into [`Duration`] values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerrainConfig {
    /// Seed from which every generation seed is derived.
    pub seed: u64,
    /// Default regrow delay expressed in musical loops of the host.
    pub regrow_delay_loops: f32,
    /// Wait before re-checking a regrow that failed a transient veto.
    pub regrow_backoff_ms: u64,
    /// Maximum number of cells promoted per rhythmic step.
    pub regrow_cells_per_step: usize,
    /// Time a regrowing cell spends growing in before it turns solid.
    pub settle_delay_ms: u64,
    /// Grow-in animation length handed to visuals.
    pub grow_in_ms: u64,
    /// Minimum spacing between composite rebuilds; zero rebuilds every physics tick.
    pub composite_debounce_ms: u64,
    /// Maximum cells the staggered spawn pass emits per frame tick.
    pub spawn_cells_per_tick: usize,
    /// Wall-clock budget of the staggered spawn pass per frame tick.
    pub spawn_budget_ms: u64,
    /// Maximum cells a single carve removes.
    pub carve_budget: usize,
    /// Radius of the permanently clear disk reserved around maze anchors.
    pub anchor_clear_radius: u32,
    /// Upper bound on tunnel length, in cells, between two anchors.
    pub tunnel_step_limit: usize,
    /// Fade used when keep-clear pockets force terrain out.
    pub forced_clear_fade_ms: u64,
    /// Flow cells refreshed per frame tick.
    pub flow_cells_per_tick: usize,
    /// Blend factor pulling a flow cell towards its freshly sampled direction.
    pub flow_smoothing: f32,
    /// Tint diffusion cells processed per frame tick.
    pub diffusion_cells_per_tick: usize,
    /// Fraction of the gap to the neighbourhood average closed per visit.
    pub diffusion_rate: f32,
    /// Smallest tint change that still propagates to neighbours.
    pub diffusion_min_delta: f32,
    /// Tint of terrain that carries no imprint.
    pub default_tint: Tint,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_d057_f1e1_d000,
            regrow_delay_loops: 1.0,
            regrow_backoff_ms: 250,
            regrow_cells_per_step: 6,
            settle_delay_ms: 300,
            grow_in_ms: 400,
            composite_debounce_ms: 50,
            spawn_cells_per_tick: 256,
            spawn_budget_ms: 2,
            carve_budget: 64,
            anchor_clear_radius: 2,
            tunnel_step_limit: 4_096,
            forced_clear_fade_ms: 120,
            flow_cells_per_tick: 128,
            flow_smoothing: 0.25,
            diffusion_cells_per_tick: 32,
            diffusion_rate: 0.5,
            diffusion_min_delta: 0.02,
            default_tint: Tint::new(0.55, 0.5, 0.42),
        }
    }
}

impl TerrainConfig {
    /// Checks every field for values that would stall or destabilise the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, budget) in [
            ("regrow_cells_per_step", self.regrow_cells_per_step),
            ("spawn_cells_per_tick", self.spawn_cells_per_tick),
            ("carve_budget", self.carve_budget),
            ("flow_cells_per_tick", self.flow_cells_per_tick),
            ("diffusion_cells_per_tick", self.diffusion_cells_per_tick),
        ] {
            if budget == 0 {
                return Err(ConfigError::ZeroBudget { field });
            }
        }

        for (field, value) in [
            ("flow_smoothing", self.flow_smoothing),
            ("diffusion_rate", self.diffusion_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }

        for (field, value) in [
            ("regrow_delay_loops", self.regrow_delay_loops),
            ("diffusion_min_delta", self.diffusion_min_delta),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NotNonNegative { field, value });
            }
        }

        Ok(())
    }

    /// Default regrow delay for a host whose loop lasts `loop_duration`.
    ///
    /// Saturates at [`Duration::MAX`] when the product cannot be represented.
    #[must_use]
    pub fn regrow_delay(&self, loop_duration: Duration) -> Duration {
        let seconds = loop_duration.as_secs_f32() * self.regrow_delay_loops.max(0.0);
        Duration::try_from_secs_f32(seconds).unwrap_or(Duration::MAX)
    }

    /// Copy with every field pulled into the range [`TerrainConfig::validate`]
    /// accepts: zero budgets become one, fractions are clamped to `0..=1` and
    /// non-finite scalars fall back to their defaults.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        for budget in [
            &mut self.regrow_cells_per_step,
            &mut self.spawn_cells_per_tick,
            &mut self.carve_budget,
            &mut self.flow_cells_per_tick,
            &mut self.diffusion_cells_per_tick,
        ] {
            *budget = (*budget).max(1);
        }
        self.flow_smoothing = unit_or(self.flow_smoothing, defaults.flow_smoothing);
        self.diffusion_rate = unit_or(self.diffusion_rate, defaults.diffusion_rate);
        self.regrow_delay_loops =
            non_negative_or(self.regrow_delay_loops, defaults.regrow_delay_loops);
        self.diffusion_min_delta =
            non_negative_or(self.diffusion_min_delta, defaults.diffusion_min_delta);
        self
    }

    /// Wait applied after a transient regrow veto.
    #[must_use]
    pub const fn regrow_backoff(&self) -> Duration {
        Duration::from_millis(self.regrow_backoff_ms)
    }

    /// Delay between a cell starting to regrow and becoming solid.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Grow-in animation length.
    #[must_use]
    pub const fn grow_in(&self) -> Duration {
        Duration::from_millis(self.grow_in_ms)
    }

    /// Minimum spacing between composite rebuilds.
    #[must_use]
    pub const fn composite_debounce(&self) -> Duration {
        Duration::from_millis(self.composite_debounce_ms)
    }

    /// Wall-clock budget of a single staggered spawn slice.
    #[must_use]
    pub const fn spawn_budget(&self) -> Duration {
        Duration::from_millis(self.spawn_budget_ms)
    }

    /// Fade applied to cells forced out by keep-clear pockets.
    #[must_use]
    pub const fn forced_clear_fade(&self) -> Duration {
        Duration::from_millis(self.forced_clear_fade_ms)
    }
}

fn unit_or(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn non_negative_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        fallback
    }
}
