//! Pipeline configuration
//!
//! Values only; where they come from (command line, TOML file) is the
//! caller's business.

use crate::align::DnaScore;
use crate::error::{Result, TracyError};
use crate::index::LocatorParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of the dominant peak above which a second peak is a real call
    pub peak_ratio: f32,

    /// K-mer size used for reference seeding
    pub kmer: usize,

    /// Minimum number of agreeing k-mers to accept a reference location
    pub min_kmer_support: usize,

    /// K-mers occurring more often than this are treated as repeats
    pub max_kmer_occurrences: usize,

    /// Maximum indel size expected in the trace
    pub max_indel: usize,

    /// Base calls removed from the 5' end
    pub trim_left: usize,

    /// Base calls removed from the 3' end
    pub trim_right: usize,

    /// Median-absolute-deviation cutoff for the profile-shift detector
    pub madc: f64,

    pub scoring: DnaScore,

    /// Extract variants from the final allele alignments
    pub call_variants: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            peak_ratio: 0.33,
            kmer: 15,
            min_kmer_support: 3,
            max_kmer_occurrences: 10,
            max_indel: 1000,
            trim_left: 50,
            trim_right: 50,
            madc: 5.0,
            scoring: DnaScore::default(),
            call_variants: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.peak_ratio > 0.0 && self.peak_ratio <= 1.0) {
            return Err(TracyError::configuration(format!(
                "peak ratio must be in (0, 1], got {}",
                self.peak_ratio
            )));
        }
        if self.kmer == 0 || self.kmer > 32 {
            return Err(TracyError::configuration(format!(
                "k-mer size must be between 1 and 32, got {}",
                self.kmer
            )));
        }
        if self.min_kmer_support == 0 {
            return Err(TracyError::configuration("minimum k-mer support must be at least 1"));
        }
        if self.max_kmer_occurrences == 0 {
            return Err(TracyError::configuration("maximum k-mer occurrences must be at least 1"));
        }
        if self.madc < 0.0 || !self.madc.is_finite() {
            return Err(TracyError::configuration(format!(
                "MAD cutoff must be a non-negative number, got {}",
                self.madc
            )));
        }
        Ok(())
    }

    /// Indel sizes below one are meaningless; clamp as the command line does.
    pub fn normalized(mut self) -> Self {
        self.max_indel = self.max_indel.max(1);
        self
    }

    pub fn locator_params(&self) -> LocatorParams {
        LocatorParams {
            kmer: self.kmer,
            min_kmer_support: self.min_kmer_support,
            max_kmer_occurrences: self.max_kmer_occurrences,
            max_indel: self.max_indel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.kmer, 15);
        assert_eq!(config.min_kmer_support, 3);
        assert_eq!(config.max_indel, 1000);
        assert_eq!(config.trim_left, 50);
        assert_eq!(config.trim_right, 50);
        assert_eq!(config.scoring, DnaScore::new(5, -4, -10, -1));
        assert!(!config.call_variants);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_kmer = PipelineConfig { kmer: 0, ..Default::default() };
        assert!(matches!(bad_kmer.validate(), Err(TracyError::Configuration(_))));

        let bad_ratio = PipelineConfig { peak_ratio: 1.5, ..Default::default() };
        assert!(bad_ratio.validate().is_err());

        let bad_support = PipelineConfig { min_kmer_support: 0, ..Default::default() };
        assert!(bad_support.validate().is_err());
    }

    #[test]
    fn test_normalized_clamps_max_indel() {
        let config = PipelineConfig { max_indel: 0, ..Default::default() }.normalized();
        assert_eq!(config.max_indel, 1);
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"kmer": 21, "call_variants": true}"#).unwrap();
        assert_eq!(config.kmer, 21);
        assert!(config.call_variants);
        assert_eq!(config.trim_left, 50);
    }
}
