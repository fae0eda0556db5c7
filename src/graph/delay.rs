//! Simulated latency model.
//!
//! Every engine operation pauses at fixed suspension points for a duration
//! sampled from the [`DelayProfile`] of its [`DelayCategory`]. The pauses only
//! govern wall-clock pacing; results never depend on them.
//!
//! The engine talks to a [`DelayProvider`] so the sampler can be swapped:
//! [`DelayModel`] in production, [`NoDelay`] (or a recording provider) in tests.

use super::models::DelayProfile;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Upper bound on a single simulated pause.
pub const MAX_SUSPENSION: Duration = Duration::from_secs(3600);

/// Operation category a delay is sampled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayCategory {
    Network,
    Compute,
    Inference,
    Validation,
    Training,
    Propagation,
}

impl DelayCategory {
    pub const ALL: [DelayCategory; 6] = [
        Self::Network,
        Self::Compute,
        Self::Inference,
        Self::Validation,
        Self::Training,
        Self::Propagation,
    ];

    /// Built-in profile for this category.
    pub fn default_profile(&self) -> DelayProfile {
        match self {
            Self::Network => DelayProfile::new(150.0, 50.0),
            Self::Compute => DelayProfile::new(80.0, 30.0).with_throttle(0.8),
            Self::Inference => DelayProfile::new(2000.0, 800.0).with_throttle(1.5),
            Self::Validation => DelayProfile::new(300.0, 100.0).with_throttle(1.1),
            Self::Training => DelayProfile::new(5000.0, 2000.0).with_throttle(2.0),
            Self::Propagation => DelayProfile::new(50.0, 20.0).with_throttle(0.9),
        }
    }
}

// ============================================================================
// Provider trait
// ============================================================================

/// Source of simulated latency.
///
/// `suspend` is a cooperative pause: it never blocks the runtime thread, and a
/// zero sample still yields once so concurrent tasks get scheduled.
#[async_trait]
pub trait DelayProvider: Send + Sync {
    /// Sample a delay for the category without waiting.
    fn sample(&self, category: DelayCategory) -> Duration;

    /// Sample a delay and wait it out. Returns the duration waited.
    async fn suspend(&self, category: DelayCategory) -> Duration {
        let delay = self.sample(category);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

/// Provider that never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayProvider for NoDelay {
    fn sample(&self, _category: DelayCategory) -> Duration {
        Duration::ZERO
    }
}

// ============================================================================
// Stochastic model
// ============================================================================

/// Per-category stochastic latency sampler.
pub struct DelayModel {
    profiles: BTreeMap<DelayCategory, DelayProfile>,
    /// Multiplies every sample; 0 disables pacing entirely
    scale: f64,
    rng: Mutex<StdRng>,
}

impl DelayModel {
    /// Model with the built-in profiles and an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Model with the built-in profiles and a reproducible sample sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let profiles = DelayCategory::ALL
            .iter()
            .map(|c| (*c, c.default_profile()))
            .collect();
        Self {
            profiles,
            scale: 1.0,
            rng: Mutex::new(rng),
        }
    }

    /// Override the profile of one category.
    pub fn with_profile(mut self, category: DelayCategory, profile: DelayProfile) -> Self {
        self.profiles.insert(category, profile);
        self
    }

    /// Scale every sample. Negative scales are treated as 0; non-finite ones
    /// are rejected and leave the current scale in place.
    pub fn with_scale(mut self, scale: f64) -> Self {
        if scale.is_finite() {
            self.scale = scale.max(0.0);
        } else {
            warn!(scale, kept = self.scale, "Ignoring non-finite delay scale");
        }
        self
    }

    pub fn profile(&self, category: DelayCategory) -> DelayProfile {
        self.profiles
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_profile())
    }

    /// Sample a delay in milliseconds.
    pub fn sample_ms(&self, category: DelayCategory) -> f64 {
        if self.scale == 0.0 {
            return 0.0;
        }
        let profile = self.profile(category);
        // Poisoning leaves the RNG state intact
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        profile.sample_delay(&mut *rng) * self.scale
    }
}

impl Default for DelayModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayProvider for DelayModel {
    fn sample(&self, category: DelayCategory) -> Duration {
        Duration::try_from_secs_f64(self.sample_ms(category) / 1000.0)
            .map_or(MAX_SUSPENSION, |d| d.min(MAX_SUSPENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles() {
        let model = DelayModel::seeded(1);
        let inference = model.profile(DelayCategory::Inference);
        assert_eq!(inference.base_ms, 2000.0);
        assert_eq!(inference.variance_ms, 800.0);
        assert_eq!(inference.throttle_factor, 1.5);
        assert_eq!(model.profile(DelayCategory::Network).throttle_factor, 1.0);
    }

    #[test]
    fn test_samples_respect_profile_bounds() {
        let model = DelayModel::seeded(42);
        for _ in 0..200 {
            let ms = model.sample_ms(DelayCategory::Propagation);
            // 50 * 0.9 ± 20
            assert!((25.0..=65.0).contains(&ms), "{} out of range", ms);
        }
    }

    #[test]
    fn test_seeded_models_are_reproducible() {
        let a = DelayModel::seeded(9);
        let b = DelayModel::seeded(9);
        for category in DelayCategory::ALL {
            assert_eq!(a.sample_ms(category), b.sample_ms(category));
        }
    }

    #[test]
    fn test_zero_scale_disables_delays() {
        let model = DelayModel::seeded(3).with_scale(0.0);
        assert_eq!(model.sample(DelayCategory::Training), Duration::ZERO);
        let negative = DelayModel::seeded(3).with_scale(-4.0);
        assert_eq!(negative.sample_ms(DelayCategory::Training), 0.0);
    }

    #[test]
    fn test_profile_override() {
        let model = DelayModel::seeded(5)
            .with_profile(DelayCategory::Compute, DelayProfile::new(10.0, 0.0));
        assert_eq!(model.sample_ms(DelayCategory::Compute), 10.0);
    }

    #[tokio::test]
    async fn test_no_delay_suspend_returns_immediately() {
        let waited = NoDelay.suspend(DelayCategory::Inference).await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_model_suspend_sleeps_for_sample() {
        let model = DelayModel::seeded(11)
            .with_profile(DelayCategory::Network, DelayProfile::new(40.0, 0.0));
        let start = std::time::Instant::now();
        let waited = model.suspend(DelayCategory::Network).await;
        assert!((waited.as_secs_f64() - 0.040).abs() < 1e-6);
        assert!(start.elapsed() >= Duration::from_millis(39));
    }

    #[test]
    fn test_non_finite_scale_is_rejected() {
        let model = DelayModel::seeded(1)
            .with_profile(DelayCategory::Propagation, DelayProfile::new(50.0, 0.0))
            .with_scale(2.0)
            .with_scale(f64::INFINITY)
            .with_scale(f64::NAN);
        assert_eq!(model.sample_ms(DelayCategory::Propagation), 100.0);
        let sampled = model.sample(DelayCategory::Propagation);
        assert!((sampled.as_secs_f64() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_huge_scale_is_capped() {
        let model = DelayModel::seeded(1).with_scale(1e300);
        assert_eq!(model.sample(DelayCategory::Network), MAX_SUSPENSION);

        let parsed: f64 = "inf".parse().unwrap();
        let from_config = DelayModel::seeded(1).with_scale(parsed);
        assert!(from_config.sample(DelayCategory::Network) <= Duration::from_millis(200));
    }
}
