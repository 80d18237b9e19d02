use serde::Deserialize;
use std::time::Duration;

fn default_start_time() -> f64 {
    0.0
}

fn default_watchdog_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_finish() -> bool {
    true
}

/// Tunables for a simulation run, deserializable from a TOML config file the
/// way the rest of the corpus wires up its `SimConfig`-shaped structs.
///
/// ```toml
/// start_time = 0.0
/// watchdog_interval_ms = 100
/// finish = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Virtual time the clock starts at.
    #[serde(default = "default_start_time")]
    pub start_time: f64,
    /// How often the watchdog samples the clock for stalled progress.
    #[serde(
        rename = "watchdog_interval_ms",
        with = "humantime_millis",
        default = "default_watchdog_interval"
    )]
    pub watchdog_interval: Duration,
    /// Whether `simulate` injects `Finished` into still-suspended clients
    /// when the run ends. Exposed mainly so tests can disable it and
    /// inspect a bare `Termination` without also racing client cleanup.
    #[serde(default = "default_finish")]
    pub finish: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            watchdog_interval: default_watchdog_interval(),
            finish: default_finish(),
        }
    }
}

/// (De)serializes a `Duration` as a plain integer number of milliseconds,
/// since TOML has no native duration type.
mod humantime_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(de: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(de)?;
        Ok(Duration::from_millis(ms))
    }
}
