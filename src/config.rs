//! Tail-calling configuration.
//!
//! The recognized options mirror the poly-tail configuration surface:
//! primers for cDNA reads, flank sequences for plasmids, and the thresholds
//! controlling interruption bridging and the minimum callable tail. Reverse
//! complements are computed once at construction; the rest of the crate
//! treats the resolved struct as opaque.

use crate::sequence::reverse_complement;
use serde::Deserialize;
use std::path::Path;

// SSP / VNP primer defaults.
const DEFAULT_FRONT_PRIMER: &str = "TTTCTGTTGGTGCTGATATTGCTTT";
const DEFAULT_REAR_PRIMER: &str = "ACTTGCCTGTCGCTCTATCTTCAGAGGAGAGTCCGCCGCCCGCAAGTTTT";

/// On-disk shape of the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawTailConfig {
    front_primer: String,
    rear_primer: String,
    plasmid_front_flank: String,
    plasmid_rear_flank: String,
    plasmid_flank_threshold: usize,
    is_plasmid: bool,
    tail_interrupt_length: usize,
    min_base_count: usize,
}

impl Default for RawTailConfig {
    fn default() -> Self {
        Self {
            front_primer: DEFAULT_FRONT_PRIMER.to_string(),
            rear_primer: DEFAULT_REAR_PRIMER.to_string(),
            plasmid_front_flank: String::new(),
            plasmid_rear_flank: String::new(),
            plasmid_flank_threshold: 5,
            is_plasmid: false,
            tail_interrupt_length: 0,
            min_base_count: 10,
        }
    }
}

/// Resolved configuration with precomputed reverse complements.
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub front_primer: Vec<u8>,
    pub rear_primer: Vec<u8>,
    pub rc_front_primer: Vec<u8>,
    pub rc_rear_primer: Vec<u8>,
    pub plasmid_front_flank: Vec<u8>,
    pub plasmid_rear_flank: Vec<u8>,
    pub rc_plasmid_front_flank: Vec<u8>,
    pub rc_plasmid_rear_flank: Vec<u8>,
    pub plasmid_flank_threshold: usize,
    pub is_plasmid: bool,
    pub tail_interrupt_length: usize,
    pub min_base_count: usize,
}

impl From<RawTailConfig> for TailConfig {
    fn from(raw: RawTailConfig) -> Self {
        let front_primer = raw.front_primer.into_bytes();
        let rear_primer = raw.rear_primer.into_bytes();
        let plasmid_front_flank = raw.plasmid_front_flank.into_bytes();
        let plasmid_rear_flank = raw.plasmid_rear_flank.into_bytes();
        Self {
            rc_front_primer: reverse_complement(&front_primer),
            rc_rear_primer: reverse_complement(&rear_primer),
            rc_plasmid_front_flank: reverse_complement(&plasmid_front_flank),
            rc_plasmid_rear_flank: reverse_complement(&plasmid_rear_flank),
            front_primer,
            rear_primer,
            plasmid_front_flank,
            plasmid_rear_flank,
            plasmid_flank_threshold: raw.plasmid_flank_threshold,
            is_plasmid: raw.is_plasmid,
            tail_interrupt_length: raw.tail_interrupt_length,
            min_base_count: raw.min_base_count,
        }
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        RawTailConfig::default().into()
    }
}

impl TailConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let raw: RawTailConfig = toml::from_str(text)
            .map_err(|e| anyhow::anyhow!("Error parsing tail configuration: {}", e))?;
        let config: Self = raw.into();
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("Error reading tail configuration {}: {}", path.display(), e)
                })?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.is_plasmid
            && (self.plasmid_front_flank.is_empty() || self.plasmid_rear_flank.is_empty())
        {
            anyhow::bail!("plasmid mode requires both plasmid_front_flank and plasmid_rear_flank");
        }
        Ok(())
    }
}
