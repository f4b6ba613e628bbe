//! Reducer configuration.
//!
//! Every loop in the reducer runs a fixed number of times, so every bound is
//! an explicit, validated parameter.

use std::env;

use crate::error::ConfigError;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_ACTIONS_PER_UPDATE: usize = 5;
pub const DEFAULT_MAX_UPDATES_PER_PROOF: usize = 300;
pub const DEFAULT_MAX_UPDATES_FINAL_PROOF: usize = 100;

/// Loop bounds of one reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReducerConfig {
    /// Action slots handed to the callback per processed batch.
    pub batch_size: usize,
    /// Updates popped off the stack per batch.
    pub max_updates_per_batch: usize,
    /// Actions a single update may hold.
    pub max_actions_per_update: usize,
    /// Updates reversed by one recursive proof step.
    pub max_updates_per_proof: usize,
    /// Updates reversed directly while processing, without a proof.
    pub max_updates_final_proof: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl ReducerConfig {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            max_updates_per_batch: batch_size,
            max_actions_per_update: batch_size.min(DEFAULT_MAX_ACTIONS_PER_UPDATE),
            max_updates_per_proof: DEFAULT_MAX_UPDATES_PER_PROOF,
            max_updates_final_proof: DEFAULT_MAX_UPDATES_FINAL_PROOF,
        }
    }

    pub fn with_max_updates_per_batch(mut self, value: usize) -> Self {
        self.max_updates_per_batch = value;
        self
    }

    pub fn with_max_actions_per_update(mut self, value: usize) -> Self {
        self.max_actions_per_update = value;
        self
    }

    pub fn with_max_updates_per_proof(mut self, value: usize) -> Self {
        self.max_updates_per_proof = value;
        self
    }

    pub fn with_max_updates_final_proof(mut self, value: usize) -> Self {
        self.max_updates_final_proof = value;
        self
    }

    /// Every bound must be at least 1, and a batch must be able to hold the
    /// largest update so that preparation always makes progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [
            ("batch_size", self.batch_size),
            ("max_updates_per_batch", self.max_updates_per_batch),
            ("max_actions_per_update", self.max_actions_per_update),
            ("max_updates_per_proof", self.max_updates_per_proof),
            ("max_updates_final_proof", self.max_updates_final_proof),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroBound { name: *name });
        }
        if self.batch_size < self.max_actions_per_update {
            return Err(ConfigError::BudgetBelowUpdate {
                batch_size: self.batch_size,
                max_actions_per_update: self.max_actions_per_update,
            });
        }
        Ok(())
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `REDUCER_BATCH_SIZE` - Action slots per batch (default: 10); also
    ///   re-derives the two per-batch defaults below
    /// - `REDUCER_MAX_UPDATES_PER_BATCH` - Updates per batch (default: batch size)
    /// - `REDUCER_MAX_ACTIONS_PER_UPDATE` - Actions per update (default: min(batch size, 5))
    /// - `REDUCER_MAX_UPDATES_PER_PROOF` - Updates per proof step (default: 300)
    /// - `REDUCER_MAX_UPDATES_FINAL_PROOF` - Updates reversed directly (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match read_env::<usize>("REDUCER_BATCH_SIZE")? {
            Some(batch_size) => Self::new(batch_size),
            None => Self::default(),
        };

        if let Some(value) = read_env("REDUCER_MAX_UPDATES_PER_BATCH")? {
            config.max_updates_per_batch = value;
        }
        if let Some(value) = read_env("REDUCER_MAX_ACTIONS_PER_UPDATE")? {
            config.max_actions_per_update = value;
        }
        if let Some(value) = read_env("REDUCER_MAX_UPDATES_PER_PROOF")? {
            config.max_updates_per_proof = value;
        }
        if let Some(value) = read_env("REDUCER_MAX_UPDATES_FINAL_PROOF")? {
            config.max_updates_final_proof = value;
        }

        config.validate()?;
        Ok(config)
    }
}

fn read_env<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        Err(_) => Ok(None),
    }
}
