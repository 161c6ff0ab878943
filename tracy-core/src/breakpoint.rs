//! Breakpoint and indel-shift detection
//!
//! A heterozygous indel leaves the chromatogram clean up to the indel and
//! mixed afterwards, because the two alleles run out of register. The
//! profile-shift detector finds that change point directly in the trace
//! profile. Homozygous indels keep the trace clean and are only visible as a
//! gap run in the trace-vs-reference alignment.

use crate::align::Alignment;
use crate::profile::SignalProfile;
use crate::types::BaseCalls;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Minimum number of columns on either side of a candidate change point
const MIN_FLANK: usize = 10;

/// Minimum mean mixture increase across the change point
const MIN_SHIFT_DIFF: f64 = 0.15;

/// Fraction of columns after the change point that must be outliers
const MIN_OUTLIER_FRACTION: f64 = 0.5;

/// Floor for the MAD so that a perfectly clean baseline still has a cutoff
const MAD_FLOOR: f64 = 0.01;

/// Gap columns required before a run counts as an indel
pub const MIN_GAP_RUN: usize = 1;

/// Which detector produced the split point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakpointSource {
    ProfileShift,
    AlignmentGap,
    NearestSnp,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceBreakpoint {
    /// The trace profile itself shows a heterozygous indel shift
    pub indel_shift: bool,
    /// First mixed profile column (0-based, trimmed coordinates)
    pub trace_left: usize,
    /// Split point in trimmed trace bases; 0 means no split.
    ///
    /// For `ProfileShift` and `AlignmentGap` this counts the bases before the
    /// event. For `NearestSnp` it is the 1-based position of the chosen
    /// heterozygous call, so a call on the first trimmed base still splits.
    pub breakpoint: usize,
    /// Mean mixture increase across the change point
    pub best_diff: f64,
    /// Signed indel length seen in the alignment (insertion positive)
    pub indel: i32,
    pub source: BreakpointSource,
}

impl Default for TraceBreakpoint {
    fn default() -> Self {
        Self {
            indel_shift: false,
            trace_left: 0,
            breakpoint: 0,
            best_diff: 0.0,
            indel: 0,
            source: BreakpointSource::None,
        }
    }
}

impl TraceBreakpoint {
    pub fn has_split(&self) -> bool {
        self.breakpoint > 0
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Median and median absolute deviation
fn median_mad(values: &[f64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    let med = median(&mut sorted);
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    (med, median(&mut deviations))
}

/// Scan the trimmed trace profile for a clean-to-mixed change point.
///
/// The change point maximises the difference in mean mixture (second / first
/// channel) between the right and left side. It is accepted when that
/// difference is large enough and most columns to its right exceed the left
/// side's median by more than `madc` MADs.
pub fn find_profile_shift(profile: &SignalProfile, madc: f64) -> TraceBreakpoint {
    let mixture = profile.mixture();
    let n = mixture.len();
    let mut bp = TraceBreakpoint::default();
    if n < 2 * MIN_FLANK {
        return bp;
    }

    let mut prefix = vec![0.0f64; n + 1];
    for (i, m) in mixture.iter().enumerate() {
        prefix[i + 1] = prefix[i] + m;
    }

    let mut best_split = 0;
    let mut best_diff = f64::NEG_INFINITY;
    for t in MIN_FLANK..=(n - MIN_FLANK) {
        let left = prefix[t] / t as f64;
        let right = (prefix[n] - prefix[t]) / (n - t) as f64;
        let diff = right - left;
        if diff > best_diff {
            best_diff = diff;
            best_split = t;
        }
    }
    bp.best_diff = best_diff;

    let (med, mad) = median_mad(&mixture[..best_split]);
    let cutoff = med + madc * mad.max(MAD_FLOOR);
    let outliers = mixture[best_split..].iter().filter(|&&m| m > cutoff).count();
    let fraction = outliers as f64 / (n - best_split) as f64;
    log::debug!(
        "Profile shift candidate at {}: diff {:.3}, cutoff {:.3}, outlier fraction {:.2}",
        best_split,
        best_diff,
        cutoff,
        fraction
    );

    if best_diff >= MIN_SHIFT_DIFF && fraction >= MIN_OUTLIER_FRACTION {
        bp.indel_shift = true;
        bp.trace_left = best_split;
        bp.breakpoint = best_split;
        bp.source = BreakpointSource::ProfileShift;
    }
    bp
}

/// Find the first interior gap run of at least `min_run` columns.
///
/// Returns the trace bases preceding the run and its signed length. Runs
/// touching either end of the alignment are end gaps, not indels.
pub fn find_homozygous_breakpoint(alignment: &Alignment, min_run: usize) -> Option<(usize, i32)> {
    alignment
        .gap_runs()
        .into_iter()
        .find(|run| !run.terminal && run.len >= min_run.max(1))
        .map(|run| (run.query_pos, run.signed_len()))
}

/// Midpoint of the longest run of homozygous calls inside `range`
pub fn best_trace_section(calls: &BaseCalls, range: Range<usize>) -> usize {
    let mut best = (0usize, range.start);
    let mut run_start = range.start;
    for i in range.clone() {
        if calls.calls[i].is_heterozygous() {
            run_start = i + 1;
        } else if i + 1 - run_start > best.0 {
            best = (i + 1 - run_start, run_start);
        }
    }
    best.1 + best.0 / 2
}

/// Heterozygous call inside `range` closest to `pos` (earlier one on ties)
pub fn nearest_snp(calls: &BaseCalls, range: Range<usize>, pos: usize) -> Option<usize> {
    range
        .filter(|&i| calls.calls[i].is_heterozygous())
        .min_by_key(|&i| (i.abs_diff(pos), i))
}

/// Combine both detectors with the SNP fallback.
///
/// `shift` is the profile-shift result; when it found nothing the alignment
/// is searched for a homozygous indel, then the split centres on the
/// heterozygous call nearest the most reliable trace section. With none of
/// these the breakpoint stays 0: no split.
pub fn resolve_breakpoint(
    shift: TraceBreakpoint,
    alignment: &Alignment,
    calls: &BaseCalls,
    range: Range<usize>,
) -> TraceBreakpoint {
    if shift.indel_shift {
        return shift;
    }

    let mut bp = shift;
    if let Some((breakpoint, indel)) = find_homozygous_breakpoint(alignment, MIN_GAP_RUN) {
        log::info!("Homozygous indel of {} bp after trace base {}", indel, breakpoint);
        bp.breakpoint = breakpoint;
        bp.indel = indel;
        bp.source = BreakpointSource::AlignmentGap;
        return bp;
    }

    let reliable = best_trace_section(calls, range.clone());
    match nearest_snp(calls, range.clone(), reliable) {
        Some(snp) => {
            log::warn!("No indel found, centering on heterozygous call {}", snp - range.start + 1);
            bp.breakpoint = snp - range.start + 1;
            bp.source = BreakpointSource::NearestSnp;
        }
        None => {
            log::warn!("No indel and no heterozygous call, trace is not split");
            bp.breakpoint = 0;
            bp.source = BreakpointSource::None;
        }
    }
    bp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{gotoh, AlignMode, DnaScore};
    use crate::types::{Base, BaseCall, Trace, CHANNELS};
    use crate::profile::trace_profile;

    const BASES: &[u8] = b"ACGT";

    fn pseudo_random_seq(len: usize, seed: usize) -> Vec<u8> {
        (0..len).map(|i| BASES[(i * 7 + seed * 13 + i * i * 3) % 4]).collect()
    }

    /// Calls that are clean before `mixed_from` and carry a different
    /// secondary base from there on.
    fn shifted_calls(len: usize, mixed_from: usize) -> (Trace, BaseCalls) {
        let primary = pseudo_random_seq(len, 1);
        let mut channels: [Vec<u16>; CHANNELS] = Default::default();
        let mut calls = Vec::new();
        for (i, &p) in primary.iter().enumerate() {
            let p = Base::from_byte(p);
            let s = if i >= mixed_from {
                Base::from_channel((p.channel().unwrap() + 1) % 4)
            } else {
                p
            };
            for _ in 0..8 {
                for (ch, channel) in channels.iter_mut().enumerate() {
                    let value = if Some(ch) == p.channel() {
                        1000
                    } else if Some(ch) == s.channel() {
                        600
                    } else {
                        20
                    };
                    channel.push(value);
                }
            }
            calls.push(BaseCall { primary: p, secondary: s, peak_height: 1000, scan: i * 8 + 4 });
        }
        (Trace::new(channels).unwrap(), BaseCalls::new(calls))
    }

    #[test]
    fn test_profile_shift_detected() {
        let (trace, calls) = shifted_calls(120, 60);
        let profile = trace_profile(&trace, &calls, 0, 0).unwrap();
        let bp = find_profile_shift(&profile, 5.0);
        assert!(bp.indel_shift);
        assert_eq!(bp.trace_left, 60);
        assert_eq!(bp.breakpoint, 60);
        assert_eq!(bp.source, BreakpointSource::ProfileShift);
        assert!(bp.best_diff > 0.5);
    }

    #[test]
    fn test_profile_shift_moves_with_indel() {
        for delta in [0usize, 7, 15, 30] {
            let (trace, calls) = shifted_calls(150, 40 + delta);
            let profile = trace_profile(&trace, &calls, 0, 0).unwrap();
            let bp = find_profile_shift(&profile, 5.0);
            assert!(bp.indel_shift);
            assert!(bp.breakpoint.abs_diff(40 + delta) <= 1);
        }
    }

    #[test]
    fn test_clean_trace_has_no_shift() {
        let (trace, calls) = shifted_calls(100, 100);
        let profile = trace_profile(&trace, &calls, 0, 0).unwrap();
        let bp = find_profile_shift(&profile, 5.0);
        assert!(!bp.indel_shift);
        assert_eq!(bp.breakpoint, 0);
        assert_eq!(bp.source, BreakpointSource::None);
    }

    #[test]
    fn test_homozygous_breakpoint_from_alignment() {
        let aln = gotoh(&b"ACGTTACGTACGT"[..], &b"ACGTACGTACGT"[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        assert_eq!(find_homozygous_breakpoint(&aln, 1), Some((4, 1)));

        let reference = b"TTTTGATTACAGGCTTAACCGTAGCTTTT";
        let aln = gotoh(&b"GATTACAGGCAACCGTAGC"[..], &reference[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        let (breakpoint, indel) = find_homozygous_breakpoint(&aln, 1).unwrap();
        assert_eq!(indel, -2);
        assert!(breakpoint >= 9 && breakpoint <= 11);

        // end gaps alone are not an indel
        let aln = gotoh(&b"ACGTACGGATCC"[..], &b"TTTACGTACGGATCCTTT"[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        assert_eq!(find_homozygous_breakpoint(&aln, 1), None);
    }

    #[test]
    fn test_homozygous_breakpoint_moves_with_indel() {
        let base = pseudo_random_seq(80, 3);
        let mut results = Vec::new();
        for pos in [20usize, 25, 40] {
            let mut query = base.clone();
            query.insert(pos, b'G');
            query.insert(pos, b'G');
            query.insert(pos, b'G');
            let aln = gotoh(&query[..], &base[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
            let (breakpoint, indel) = find_homozygous_breakpoint(&aln, 1).unwrap();
            assert_eq!(indel, 3);
            results.push(breakpoint);
        }
        assert!((results[1] as i64 - results[0] as i64 - 5).abs() <= 1);
        assert!((results[2] as i64 - results[0] as i64 - 20).abs() <= 1);
    }

    fn calls_from(primary: &[u8], secondary: &[u8]) -> BaseCalls {
        BaseCalls::new(
            primary
                .iter()
                .zip(secondary)
                .enumerate()
                .map(|(i, (&p, &s))| BaseCall {
                    primary: Base::from_byte(p),
                    secondary: Base::from_byte(s),
                    peak_height: 100,
                    scan: i * 10,
                })
                .collect(),
        )
    }

    #[test]
    fn test_snp_fallback() {
        let calls = calls_from(b"ACGTACGTAC", b"ACGTACGTAG");
        let reference = b"ACGTACGTAC";
        let aln = gotoh(&calls.primary()[..], &reference[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        let bp = resolve_breakpoint(TraceBreakpoint::default(), &aln, &calls, 0..10);
        assert_eq!(bp.source, BreakpointSource::NearestSnp);
        assert_eq!(bp.breakpoint, 10);
        assert!(!bp.indel_shift);
    }

    #[test]
    fn test_snp_fallback_on_first_base_still_splits() {
        let calls = calls_from(b"ACGTACGTAC", b"TCGTACGTAC");
        let aln = gotoh(&calls.primary()[..], &b"ACGTACGTAC"[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        let bp = resolve_breakpoint(TraceBreakpoint::default(), &aln, &calls, 0..10);
        assert_eq!(bp.source, BreakpointSource::NearestSnp);
        assert_eq!(bp.breakpoint, 1);
        assert!(bp.has_split());
    }

    #[test]
    fn test_homozygous_trace_is_not_split() {
        let calls = calls_from(b"ACGTACGTAC", b"ACGTACGTAC");
        let aln = gotoh(&calls.primary()[..], &b"ACGTACGTAC"[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        let bp = resolve_breakpoint(TraceBreakpoint::default(), &aln, &calls, 0..10);
        assert_eq!(bp.breakpoint, 0);
        assert_eq!(bp.source, BreakpointSource::None);
        assert!(!bp.has_split());
    }

    #[test]
    fn test_best_trace_section_and_nearest_snp() {
        let calls = calls_from(b"ACGTACGTACGTACGT", b"TCGTACGTACGAACGT");
        // homozygous run 1..11 is the longest
        assert_eq!(best_trace_section(&calls, 0..16), 6);
        assert_eq!(nearest_snp(&calls, 0..16, 6), Some(11));
        assert_eq!(nearest_snp(&calls, 2..10, 6), None);
    }
}
