//! Split a mixed trace into two allele sequences
//!
//! Before the breakpoint both alleles share the primary calls. After it, every
//! candidate indel size is scored by how well the reference, read once in
//! register and once shifted by the candidate, explains the primary and
//! secondary calls. The winning shift decides which call of each column is
//! the reference-like allele.

use crate::align::{Alignment, GAP};
use crate::breakpoint::{BreakpointSource, TraceBreakpoint};
use crate::error::{Result, TracyError};
use crate::types::BaseCalls;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Range;

/// Candidate shifts compared on fewer columns are not scored
const MIN_COMPARED: usize = 5;

/// Highest error rate the winning shift may have
const MAX_ERROR_RATE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecompositionEvent {
    /// Candidate indel tested from `position` on: columns the shifted
    /// reference fails to explain out of the columns compared
    Shift {
        position: usize,
        indel: i32,
        errors: usize,
        compared: usize,
    },
    /// Heterozygous substitution at a 1-based trace position
    Mismatch { position: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub events: Vec<DecompositionEvent>,
    /// Winning indel (insertion in allele 2 positive), 0 without a shift
    pub indel: i32,
}

impl Decomposition {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleSplit {
    #[serde(with = "crate::types::seq_string")]
    pub allele1: Vec<u8>,
    #[serde(with = "crate::types::seq_string")]
    pub allele2: Vec<u8>,
    pub decomposition: Decomposition,
}

/// Reference index following trace base `split - 1` in the alignment, so a
/// deletion right at the split counts as part of the shifted region.
fn reference_anchor(alignment: &Alignment, split: usize) -> usize {
    let mut query_seen = 0;
    let mut reference_seen = 0;
    for (q, r) in alignment.columns() {
        if query_seen == split && (split > 0 || q != GAP) {
            return reference_seen;
        }
        if q != GAP {
            query_seen += 1;
        }
        if r != GAP {
            reference_seen += 1;
        }
    }
    reference_seen
}

fn explained(a: u8, b: u8, primary: u8, secondary: u8) -> bool {
    let hit = |base: u8| base != b'N' && (base == primary || base == secondary);
    hit(a) && hit(b)
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    indel: i32,
    errors: usize,
    compared: usize,
}

impl Candidate {
    /// Fewer errors per compared column first, then the smaller indel, then
    /// insertions before deletions.
    fn rank(&self, other: &Self) -> Ordering {
        (self.errors * other.compared)
            .cmp(&(other.errors * self.compared))
            .then(self.indel.unsigned_abs().cmp(&other.indel.unsigned_abs()))
            .then(other.indel.cmp(&self.indel))
    }

    fn error_rate(&self) -> f64 {
        self.errors as f64 / self.compared.max(1) as f64
    }
}

/// Derive both alleles from the trimmed calls.
///
/// `alignment` is the trace-vs-reference alignment and `reference` the slice
/// sequence it was computed against. Without a profile shift the alleles are
/// the primary and secondary calls as they stand.
pub fn decompose(
    calls: &BaseCalls,
    range: Range<usize>,
    alignment: &Alignment,
    reference: &[u8],
    breakpoint: &TraceBreakpoint,
    max_indel: usize,
) -> Result<AlleleSplit> {
    let primary = calls.primary()[range.clone()].to_vec();
    let secondary = calls.secondary()[range].to_vec();

    if primary == secondary {
        log::info!("Trace is homozygous, alleles are identical");
        return Ok(AlleleSplit {
            allele1: primary,
            allele2: secondary,
            decomposition: Decomposition::default(),
        });
    }

    if breakpoint.source != BreakpointSource::ProfileShift {
        let events = primary
            .iter()
            .zip(&secondary)
            .enumerate()
            .filter(|(_, (p, s))| p != s)
            .map(|(i, _)| DecompositionEvent::Mismatch { position: i + 1 })
            .collect::<Vec<_>>();
        log::info!("Substitution-only split with {} heterozygous positions", events.len());
        return Ok(AlleleSplit {
            allele1: primary,
            allele2: secondary,
            decomposition: Decomposition { events, indel: 0 },
        });
    }

    let split = breakpoint.breakpoint.min(primary.len());
    let anchor = reference_anchor(alignment, split);

    let max_indel = max_indel.min(reference.len()) as i64;
    let mut candidates = Vec::new();
    for indel in -max_indel..=max_indel {
        if indel == 0 {
            continue;
        }
        let mut errors = 0;
        let mut compared = 0;
        for i in split..primary.len() {
            let r = (anchor + i - split) as i64;
            let r2 = r - indel;
            if r >= reference.len() as i64 || r2 < 0 || r2 >= reference.len() as i64 {
                continue;
            }
            compared += 1;
            if !explained(reference[r as usize], reference[r2 as usize], primary[i], secondary[i]) {
                errors += 1;
            }
        }
        if compared >= MIN_COMPARED {
            candidates.push(Candidate { indel: indel as i32, errors, compared });
        }
    }

    let best = candidates
        .iter()
        .min_by(|a, b| a.rank(b))
        .copied()
        .ok_or_else(|| {
            TracyError::decomposition(format!("no indel candidate can be compared after trace base {}", split))
        })?;
    if best.error_rate() > MAX_ERROR_RATE {
        return Err(TracyError::decomposition(format!(
            "best indel {} leaves {} of {} columns unexplained",
            best.indel, best.errors, best.compared
        )));
    }
    log::info!(
        "Indel of {} bp after trace base {} ({}/{} columns unexplained)",
        best.indel,
        split,
        best.errors,
        best.compared
    );
    let indel = best.indel;
    let events = candidates
        .into_iter()
        .map(|c| DecompositionEvent::Shift {
            position: split,
            indel: c.indel,
            errors: c.errors,
            compared: c.compared,
        })
        .collect();

    let mut allele1 = primary[..split].to_vec();
    let mut allele2 = primary[..split].to_vec();
    for i in split..primary.len() {
        let (p, s) = (primary[i], secondary[i]);
        let r = anchor + i - split;
        if reference.get(r).is_some_and(|&base| base == s && base != p) {
            allele1.push(s);
            allele2.push(p);
        } else {
            allele1.push(p);
            allele2.push(s);
        }
    }

    Ok(AlleleSplit {
        allele1,
        allele2,
        decomposition: Decomposition { events, indel },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{gotoh, AlignMode, DnaScore};
    use crate::types::{Base, BaseCall};

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

    fn reference() -> Vec<u8> {
        // no period shorter than the sequence, so shifted reads disagree
        b"GATCCTAGGCATTGACCGTAATCGGACTTGCAAGTCCATGAGTTACGCTTAGCAGGTACCATGTCGAACTGATCGTTAGGCCATACGTGACTTCAGAGCT".to_vec()
    }

    fn shift_breakpoint(at: usize) -> TraceBreakpoint {
        TraceBreakpoint {
            indel_shift: true,
            trace_left: at,
            breakpoint: at,
            best_diff: 0.6,
            indel: 0,
            source: BreakpointSource::ProfileShift,
        }
    }

    fn het_deletion() -> (Vec<u8>, Vec<u8>) {
        let reference = reference();
        let wildtype = reference[10..70].to_vec();
        let mut mutant = reference[10..40].to_vec();
        mutant.extend_from_slice(&reference[43..73]);
        (wildtype, mutant)
    }

    #[test]
    fn test_homozygous_trace_round_trips() {
        let seq = b"ACGTTGCAACGGTACCTTGA";
        let calls = calls_from(seq, seq);
        let aln = gotoh(&seq[..], &seq[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        let split = decompose(&calls, 0..seq.len(), &aln, seq, &TraceBreakpoint::default(), 100).unwrap();
        assert_eq!(split.allele1, seq.to_vec());
        assert_eq!(split.allele2, seq.to_vec());
        assert!(split.decomposition.is_empty());
    }

    #[test]
    fn test_snp_only_split() {
        let calls = calls_from(b"ACGT", b"ACGA");
        let aln = gotoh(&b"ACGT"[..], &b"ACGT"[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());
        let bp = TraceBreakpoint { breakpoint: 4, source: BreakpointSource::NearestSnp, ..Default::default() };
        let split = decompose(&calls, 0..4, &aln, b"ACGT", &bp, 100).unwrap();
        assert_eq!(split.allele1, b"ACGT".to_vec());
        assert_eq!(split.allele2, b"ACGA".to_vec());
        assert_eq!(split.decomposition.events, vec![DecompositionEvent::Mismatch { position: 4 }]);
        assert_eq!(split.decomposition.indel, 0);
    }

    #[test]
    fn test_heterozygous_deletion() {
        let reference = reference();
        let (wildtype, mutant) = het_deletion();
        let calls = calls_from(&wildtype, &mutant);
        let aln = gotoh(&calls.primary()[..], &reference[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());

        let split = decompose(&calls, 0..60, &aln, &reference, &shift_breakpoint(30), 20).unwrap();
        assert_eq!(split.decomposition.indel, -3);
        assert_eq!(split.allele1, wildtype);
        assert_eq!(split.allele2, mutant);
        assert!(split.decomposition.events.iter().any(|e| matches!(
            e,
            DecompositionEvent::Shift { indel: -3, errors: 0, .. }
        )));
    }

    #[test]
    fn test_mutant_primary_still_yields_reference_allele_first() {
        let reference = reference();
        let (wildtype, mutant) = het_deletion();
        let calls = calls_from(&mutant, &wildtype);
        let aln = gotoh(&calls.primary()[..], &reference[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());

        let split = decompose(&calls, 0..60, &aln, &reference, &shift_breakpoint(30), 20).unwrap();
        assert_eq!(split.decomposition.indel, -3);
        assert_eq!(split.allele1, wildtype);
        assert_eq!(split.allele2, mutant);
    }

    #[test]
    fn test_unexplained_mixture_is_an_error() {
        let reference = reference();
        let wildtype = reference[10..70].to_vec();
        let rotate = |b: u8, by: usize| {
            let bases = b"ACGT";
            let idx = bases.iter().position(|&x| x == b).unwrap_or(0);
            bases[(idx + by) % 4]
        };
        let mut primary = wildtype.clone();
        let mut secondary = wildtype.clone();
        for i in 30..60 {
            primary[i] = rotate(wildtype[i], 1);
            secondary[i] = rotate(wildtype[i], 2);
        }
        let calls = calls_from(&primary, &secondary);
        let aln = gotoh(&wildtype[..], &reference[..], AlignMode::SEMI_GLOBAL, &DnaScore::default());

        let result = decompose(&calls, 0..60, &aln, &reference, &shift_breakpoint(30), 20);
        assert!(matches!(result, Err(TracyError::Decomposition(_))));
    }

    #[test]
    fn test_reference_anchor_skips_trailing_deletion() {
        let aln = Alignment { query: b"AC-GT".to_vec(), reference: b"ACTG-".to_vec(), score: 0 };
        assert_eq!(reference_anchor(&aln, 0), 0);
        assert_eq!(reference_anchor(&aln, 2), 2);
        assert_eq!(reference_anchor(&aln, 3), 4);
        assert_eq!(reference_anchor(&aln, 4), 4);
    }
}
