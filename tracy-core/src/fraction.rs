use crate::types::{BaseCalls, Trace};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Relative signal of the two alleles, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllelicFraction {
    pub primary: f64,
    pub secondary: f64,
}

impl Default for AllelicFraction {
    /// Homozygous: all signal from the primary allele
    fn default() -> Self {
        Self {
            primary: 1.0,
            secondary: 0.0,
        }
    }
}

impl AllelicFraction {
    /// Average the primary and secondary peak shares over every
    /// heterozygous call in `range`, measured at the call's scan point.
    pub fn estimate(trace: &Trace, calls: &BaseCalls, range: Range<usize>) -> Self {
        let mut primary = 0.0;
        let mut secondary = 0.0;
        let mut sites = 0usize;

        for call in &calls.calls[range] {
            if !call.is_heterozygous() {
                continue;
            }
            let (Some(p), Some(s)) = (call.primary.channel(), call.secondary.channel()) else {
                continue;
            };
            let h1 = trace.intensity(p, call.scan) as f64;
            let h2 = trace.intensity(s, call.scan) as f64;
            if h1 + h2 <= 0.0 {
                continue;
            }
            primary += h1 / (h1 + h2);
            secondary += h2 / (h1 + h2);
            sites += 1;
        }

        if sites == 0 {
            return Self::default();
        }
        Self {
            primary: (primary / sites as f64).clamp(0.0, 1.0),
            secondary: (secondary / sites as f64).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Base, BaseCall};

    fn single_scan_trace(columns: &[[u16; 4]]) -> Trace {
        let mut channels: [Vec<u16>; 4] = Default::default();
        for column in columns {
            for (ch, &value) in column.iter().enumerate() {
                channels[ch].push(value);
            }
        }
        Trace::new(channels).unwrap()
    }

    fn call(primary: Base, secondary: Base, scan: usize) -> BaseCall {
        BaseCall { primary, secondary, peak_height: 0, scan }
    }

    #[test]
    fn test_homozygous_is_degenerate() {
        let trace = single_scan_trace(&[[100, 0, 0, 0], [0, 100, 0, 0]]);
        let calls = BaseCalls::new(vec![call(Base::A, Base::A, 0), call(Base::C, Base::C, 1)]);
        assert_eq!(AllelicFraction::estimate(&trace, &calls, 0..2), AllelicFraction::default());
    }

    #[test]
    fn test_heterozygous_average() {
        let trace = single_scan_trace(&[[300, 100, 0, 0], [0, 0, 0, 50], [0, 0, 200, 200]]);
        let calls = BaseCalls::new(vec![
            call(Base::A, Base::C, 0),
            call(Base::T, Base::T, 1),
            call(Base::G, Base::T, 2),
        ]);
        let fraction = AllelicFraction::estimate(&trace, &calls, 0..3);
        // (0.75 + 0.5) / 2 and (0.25 + 0.5) / 2
        assert!((fraction.primary - 0.625).abs() < 1e-9);
        assert!((fraction.secondary - 0.375).abs() < 1e-9);
        assert!((fraction.primary + fraction.secondary - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_range_excludes_trimmed_calls() {
        let trace = single_scan_trace(&[[300, 100, 0, 0], [100, 0, 0, 0]]);
        let calls = BaseCalls::new(vec![call(Base::A, Base::C, 0), call(Base::A, Base::A, 1)]);
        assert_eq!(AllelicFraction::estimate(&trace, &calls, 1..2), AllelicFraction::default());
    }
}
