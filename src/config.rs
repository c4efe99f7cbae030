//! Engine Capacity Configuration
//!
//! Fixed limits for a path session:
//! - Maximum struct nesting depth
//! - Maximum number of simultaneously open array dimensions
//! - Number of hash-context slots in the arena
//!
//! Presets mirror the targets the engine runs on; `from_env` lets the CLI
//! override individual limits.

use crate::error::{Eip712Error, Eip712Result};

/// Environment variable overriding the struct depth limit
pub const ENV_MAX_PATH_DEPTH: &str = "EIP712_MAX_PATH_DEPTH";
/// Environment variable overriding the array depth limit
pub const ENV_MAX_ARRAY_DEPTH: &str = "EIP712_MAX_ARRAY_DEPTH";
/// Environment variable overriding the hash arena size
pub const ENV_HASH_SLOTS: &str = "EIP712_HASH_SLOTS";

/// Capacity limits of a path session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Preset the limits were derived from
    pub preset: Preset,
    /// Maximum number of open struct depths
    pub max_path_depth: usize,
    /// Maximum number of open array dimensions
    pub max_array_depth: usize,
    /// Number of hash contexts the arena can hold at once
    pub hash_context_slots: usize,
}

/// Limit presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Default limits of a hardware signer
    Standard,
    /// Small-memory devices
    Constrained,
    /// Host-side verification of deeply nested documents
    Relaxed,
    /// User-defined limits
    Custom,
}

impl std::str::FromStr for Preset {
    type Err = Eip712Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Preset::Standard),
            "constrained" => Ok(Preset::Constrained),
            "relaxed" => Ok(Preset::Relaxed),
            other => Err(Eip712Error::InvalidConfig(format!("unknown preset '{}'", other))),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EngineConfig {
    /// Standard preset
    pub fn standard() -> Self {
        Self {
            preset: Preset::Standard,
            max_path_depth: 16,
            max_array_depth: 8,
            hash_context_slots: 24,
        }
    }

    /// Constrained preset
    pub fn constrained() -> Self {
        Self {
            preset: Preset::Constrained,
            max_path_depth: 8,
            max_array_depth: 4,
            hash_context_slots: 12,
        }
    }

    /// Relaxed preset
    pub fn relaxed() -> Self {
        Self {
            preset: Preset::Relaxed,
            max_path_depth: 32,
            max_array_depth: 16,
            hash_context_slots: 48,
        }
    }

    /// Create from a preset
    pub fn with_preset(preset: Preset) -> Self {
        match preset {
            Preset::Standard | Preset::Custom => Self::standard(),
            Preset::Constrained => Self::constrained(),
            Preset::Relaxed => Self::relaxed(),
        }
    }

    /// Custom limits
    pub fn custom(max_path_depth: usize, max_array_depth: usize, hash_context_slots: usize) -> Self {
        Self {
            preset: Preset::Custom,
            max_path_depth,
            max_array_depth,
            hash_context_slots,
        }
    }

    /// Overlay limits found in the process environment
    pub fn from_env(base: Self) -> Eip712Result<Self> {
        Self::from_lookup(base, |key| std::env::var(key).ok())
    }

    /// Overlay limits from an arbitrary key lookup
    pub fn from_lookup<F>(base: Self, lookup: F) -> Eip712Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = base;
        for (key, slot) in [
            (ENV_MAX_PATH_DEPTH, &mut config.max_path_depth),
            (ENV_MAX_ARRAY_DEPTH, &mut config.max_array_depth),
            (ENV_HASH_SLOTS, &mut config.hash_context_slots),
        ] {
            if let Some(raw) = lookup(key) {
                *slot = raw.trim().parse().map_err(|_| {
                    Eip712Error::InvalidConfig(format!("{} is not a number: '{}'", key, raw))
                })?;
                config.preset = Preset::Custom;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate limits consistency
    pub fn validate(&self) -> Eip712Result<()> {
        if self.max_path_depth == 0 {
            return Err(Eip712Error::InvalidConfig("max_path_depth must be positive".into()));
        }
        // depth indices are stored as u8
        if self.max_path_depth > u8::MAX as usize {
            return Err(Eip712Error::InvalidConfig(format!(
                "max_path_depth above {}",
                u8::MAX
            )));
        }
        if self.max_array_depth == 0 {
            return Err(Eip712Error::InvalidConfig("max_array_depth must be positive".into()));
        }
        if self.hash_context_slots < 2 {
            return Err(Eip712Error::InvalidConfig(
                "hash_context_slots must allow a root and one nested scope".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_presets_are_valid() {
        for preset in [Preset::Standard, Preset::Constrained, Preset::Relaxed] {
            assert!(EngineConfig::with_preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("Constrained".parse::<Preset>().unwrap(), Preset::Constrained);
        assert!("turbo".parse::<Preset>().is_err());
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [(ENV_MAX_ARRAY_DEPTH, "3")].into_iter().collect();
        let config = EngineConfig::from_lookup(EngineConfig::standard(), |k| {
            vars.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.max_array_depth, 3);
        assert_eq!(config.max_path_depth, 16);
        assert_eq!(config.preset, Preset::Custom);
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let result = EngineConfig::from_lookup(EngineConfig::standard(), |k| {
            (k == ENV_HASH_SLOTS).then(|| "many".to_string())
        });
        assert!(matches!(result, Err(Eip712Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        assert!(EngineConfig::custom(0, 4, 8).validate().is_err());
        assert!(EngineConfig::custom(4, 0, 8).validate().is_err());
        assert!(EngineConfig::custom(4, 4, 1).validate().is_err());
        assert!(EngineConfig::custom(300, 4, 8).validate().is_err());
    }
}
