//! Variant extraction from allele-vs-reference alignments
//!
//! Positions are 1-based forward-strand genome coordinates. Insertions and
//! deletions carry the preceding reference base as anchor, as in VCF.

use crate::align::{Alignment, GAP};
use crate::seq::reverse_complement;
use crate::types::{ReferenceSlice, Strand};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariantKind {
    Snp,
    Insertion,
    Deletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Genotype {
    Het,
    HomAlt,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub chr: String,
    pub pos: u64,
    pub reference: String,
    pub alt: String,
    pub kind: VariantKind,
    pub genotype: Genotype,
    /// Allele alignment the variant was called from
    pub alignment: usize,
}

impl Ord for Variant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pos
            .cmp(&other.pos)
            .then(self.kind.cmp(&other.kind))
            .then_with(|| self.alt.cmp(&other.alt))
            .then_with(|| self.reference.cmp(&other.reference))
            .then(self.alignment.cmp(&other.alignment))
            .then_with(|| self.chr.cmp(&other.chr))
            .then(self.genotype.cmp(&other.genotype))
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Variant {
    fn same_allele(&self, other: &Self) -> bool {
        self.chr == other.chr
            && self.pos == other.pos
            && self.kind == other.kind
            && self.reference == other.reference
            && self.alt == other.alt
    }
}

fn text(bases: &[u8]) -> String {
    String::from_utf8_lossy(bases).into_owned()
}

/// Extract every SNP and maximal gap run between the first and last
/// aligned column of an allele-vs-slice alignment.
pub fn call_variants(alignment: &Alignment, slice: &ReferenceSlice, alignment_id: usize) -> Vec<Variant> {
    let (query, reference) = match slice.strand {
        Strand::Forward => (alignment.query.clone(), alignment.reference.clone()),
        Strand::Reverse => (reverse_complement(&alignment.query), reverse_complement(&alignment.reference)),
    };
    let oriented = Alignment { query, reference, score: alignment.score };
    let Some((first, last)) = oriented.aligned_span() else {
        return Vec::new();
    };

    let variant = |pos: u64, reference: Vec<u8>, alt: Vec<u8>, kind: VariantKind| Variant {
        chr: slice.chr.clone(),
        pos,
        reference: text(&reference),
        alt: text(&alt),
        kind,
        genotype: Genotype::Het,
        alignment: alignment_id,
    };

    let mut variants = Vec::new();
    let mut consumed = 0u64;
    let mut last_reference_base = b'N';
    let mut col = 0;
    while col < oriented.len() {
        let (q, r) = (oriented.query[col], oriented.reference[col]);
        if col < first || col > last {
            if r != GAP {
                consumed += 1;
                last_reference_base = r;
            }
            col += 1;
            continue;
        }

        if q != GAP && r != GAP {
            if q != r && q != b'N' && r != b'N' {
                variants.push(variant(slice.pos + consumed + 1, vec![r], vec![q], VariantKind::Snp));
            }
            consumed += 1;
            last_reference_base = r;
            col += 1;
        } else if r == GAP {
            let start = col;
            while col <= last && oriented.reference[col] == GAP {
                col += 1;
            }
            let mut alt = vec![last_reference_base];
            alt.extend_from_slice(&oriented.query[start..col]);
            variants.push(variant(slice.pos + consumed, vec![last_reference_base], alt, VariantKind::Insertion));
        } else {
            let start = col;
            while col <= last && oriented.query[col] == GAP {
                col += 1;
            }
            let deleted = &oriented.reference[start..col];
            let mut reference = vec![last_reference_base];
            reference.extend_from_slice(deleted);
            variants.push(variant(slice.pos + consumed, reference, vec![last_reference_base], VariantKind::Deletion));
            consumed += deleted.len() as u64;
            last_reference_base = deleted[deleted.len() - 1];
        }
    }
    variants
}

/// Total order by position, kind and allele; stable for equal keys.
pub fn sort_variants(variants: &mut [Variant]) {
    variants.sort();
}

/// Collapse a sorted list: a variant called from both alleles becomes one
/// homozygous-alternative variant, anything else stays heterozygous.
pub fn merge_genotypes(variants: Vec<Variant>) -> Vec<Variant> {
    let mut merged: Vec<Variant> = Vec::with_capacity(variants.len());
    for variant in variants {
        match merged.last_mut() {
            Some(prev) if prev.same_allele(&variant) && prev.alignment != variant.alignment => {
                prev.genotype = Genotype::HomAlt;
            }
            _ => merged.push(variant),
        }
    }
    merged
}
