//! End-to-end analysis of one trace against an indexed reference
//!
//! [`AnalysisContext`] owns the inputs of a run and borrows the shared
//! reference index; [`AnalysisContext::run`] threads every stage's output into
//! the next and returns everything the report needs.

use crate::align::{gotoh, AlignMode, Alignment, DnaScore};
use crate::breakpoint::{find_profile_shift, resolve_breakpoint, TraceBreakpoint};
use crate::config::PipelineConfig;
use crate::decompose::{decompose, AlleleSplit};
use crate::error::Result;
use crate::fraction::AllelicFraction;
use crate::index::{locate_slice, trim_reference_slice, ReferenceIndex};
use crate::profile::{reference_profile, trace_profile};
use crate::types::{BaseCalls, ReferenceSlice, Strand, Trace};
use crate::variants::{call_variants, merge_genotypes, sort_variants, Variant};
use serde::Serialize;

/// Name of the pseudo-slice used when comparing the two alleles
pub const ALLELE2_SLICE: &str = "Alt2";

/// A final alignment together with the slice it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlleleAlignment {
    pub slice: ReferenceSlice,
    pub alignment: Alignment,
}

impl AlleleAlignment {
    pub fn score(&self) -> i32 {
        self.alignment.score
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Kept call positions after trimming, half-open
    pub trimmed: (usize, usize),
    /// Padded reference window found by k-mer seeding
    pub slice: ReferenceSlice,
    /// Trace profile against the padded window
    pub trace_alignment: Alignment,
    pub breakpoint: TraceBreakpoint,
    pub alleles: AlleleSplit,
    pub fraction: AllelicFraction,
    pub allele1: AlleleAlignment,
    pub allele2: AlleleAlignment,
    /// Allele 1 against allele 2, global
    pub allele_comparison: AlleleAlignment,
    pub variants: Vec<Variant>,
}

pub struct AnalysisContext<'a> {
    config: PipelineConfig,
    trace: Trace,
    calls: BaseCalls,
    index: &'a ReferenceIndex,
}

/// Coarse pass to find the covered span, final pass on the narrowed slice.
fn realign(allele: &[u8], slice: &ReferenceSlice, scoring: &DnaScore) -> AlleleAlignment {
    let coarse = gotoh(allele, &slice.seq[..], AlignMode::SEMI_GLOBAL, scoring);
    let trimmed = trim_reference_slice(slice, &coarse);
    let alignment = gotoh(allele, &trimmed.seq[..], AlignMode::SEMI_GLOBAL, scoring);
    AlleleAlignment { slice: trimmed, alignment }
}

impl<'a> AnalysisContext<'a> {
    pub fn new(config: PipelineConfig, trace: Trace, calls: BaseCalls, index: &'a ReferenceIndex) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;
        Ok(Self {
            config,
            trace,
            calls,
            index,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn calls(&self) -> &BaseCalls {
        &self.calls
    }

    /// Locate the trimmed primary calls in the reference without running
    /// the rest of the analysis.
    pub fn locate(&self) -> Result<ReferenceSlice> {
        let range = self.calls.trimmed_range(self.config.trim_left, self.config.trim_right);
        let consensus = &self.calls.primary()[range];
        locate_slice(self.index, consensus, &self.config.locator_params())
    }

    pub fn run(&self) -> Result<PipelineResult> {
        let config = &self.config;
        let scoring = &config.scoring;
        let range = self.calls.trimmed_range(config.trim_left, config.trim_right);
        log::info!(
            "Analysing {} base calls ({} kept after trimming)",
            self.calls.len(),
            range.len()
        );

        let profile = trace_profile(&self.trace, &self.calls, config.trim_left, config.trim_right)?;
        let shift = find_profile_shift(&profile, config.madc);
        if shift.indel_shift {
            log::info!("Profile shift after trace base {} (diff {:.3})", shift.breakpoint, shift.best_diff);
        }

        let slice = self.locate()?;
        let reference = reference_profile(&slice.seq)?;
        let trace_alignment = gotoh(&profile, &reference, AlignMode::SEMI_GLOBAL, scoring);
        log::debug!("Trace alignment score {}", trace_alignment.score);

        let breakpoint = resolve_breakpoint(shift, &trace_alignment, &self.calls, range.clone());
        log::info!("Breakpoint {} ({:?})", breakpoint.breakpoint, breakpoint.source);

        let alleles = decompose(
            &self.calls,
            range.clone(),
            &trace_alignment,
            &slice.seq,
            &breakpoint,
            config.max_indel,
        )?;

        let fraction = AllelicFraction::estimate(&self.trace, &self.calls, range.clone());
        log::info!(
            "Allelic fraction {:.3} / {:.3}",
            fraction.primary,
            fraction.secondary
        );

        let (allele1, allele2) = rayon::join(
            || realign(&alleles.allele1, &slice, scoring),
            || realign(&alleles.allele2, &slice, scoring),
        );
        log::info!("Allele scores {} / {}", allele1.score(), allele2.score());

        let alt_slice = ReferenceSlice::new(ALLELE2_SLICE, Strand::Forward, 0, alleles.allele2.clone());
        let allele_comparison = AlleleAlignment {
            alignment: gotoh(&alleles.allele1[..], &alt_slice.seq[..], AlignMode::GLOBAL, scoring),
            slice: alt_slice,
        };

        let variants = if config.call_variants {
            let mut pooled = call_variants(&allele1.alignment, &allele1.slice, 1);
            pooled.extend(call_variants(&allele2.alignment, &allele2.slice, 2));
            sort_variants(&mut pooled);
            let merged = merge_genotypes(pooled);
            log::info!("{} variants called", merged.len());
            merged
        } else {
            Vec::new()
        };

        Ok(PipelineResult {
            trimmed: (range.start, range.end),
            slice,
            trace_alignment,
            breakpoint,
            alleles,
            fraction,
            allele1,
            allele2,
            allele_comparison,
            variants,
        })
    }
}
