//! Reference index and slice locator
//!
//! The reference is indexed once with an FM-index; the locator then seeds the
//! trace consensus against it with non-overlapping k-mers and extracts a
//! padded window around the best-supported diagonal.

use std::sync::Arc;

use bio::alphabets::Alphabet;
use bio::data_structures::bwt::{bwt, less, Less, Occ, BWT};
use bio::data_structures::fmindex::{BackwardSearchResult, FMIndex, FMIndexable};
use bio::data_structures::suffix_array::{suffix_array, SampledSuffixArray, SuffixArray};

use crate::align::{Alignment, GAP};
use crate::error::{Result, TracyError};
use crate::seq::{is_acgt, normalize, reverse_complement};
use crate::types::{ReferenceSlice, Strand};

/// Occurrence-table sampling rate
const OCC_SAMPLING: u32 = 64;

/// Every n-th suffix array entry is kept; the rest are recovered by LF-mapping
pub const SA_SAMPLING: usize = 32;

/// Symbols of the indexed text after normalisation
const INDEX_ALPHABET: &[u8] = b"ACGTN";

type SharedBwt = Arc<BWT>;
type SharedLess = Arc<Less>;
type SharedOcc = Arc<Occ>;

/// Separator between records in the indexed text
const RECORD_SEPARATOR: u8 = b'N';

/// One named reference sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

impl ReferenceRecord {
    pub fn new(name: impl Into<String>, seq: &[u8]) -> Self {
        Self {
            name: name.into(),
            seq: normalize(seq),
        }
    }
}

/// Immutable FM-index over every reference record.
pub struct ReferenceIndex {
    names: Vec<String>,
    /// Offset of each record in `text`
    offsets: Vec<usize>,
    lengths: Vec<usize>,
    text: Vec<u8>,
    sa: SampledSuffixArray<SharedBwt, SharedLess, SharedOcc>,
    fm: FMIndex<SharedBwt, SharedLess, SharedOcc>,
}

impl std::fmt::Debug for ReferenceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceIndex")
            .field("names", &self.names)
            .field("lengths", &self.lengths)
            .finish()
    }
}

impl ReferenceIndex {
    /// Build the index. Records are concatenated with `N` separators so that
    /// no ACGT pattern can match across a record boundary.
    pub fn build(records: Vec<ReferenceRecord>) -> Result<Self> {
        Self::build_sampled(records, SA_SAMPLING)
    }

    /// Build with an explicit suffix-array sampling rate. The full suffix
    /// array only lives for the duration of the build.
    pub fn build_sampled(records: Vec<ReferenceRecord>, sa_sampling: usize) -> Result<Self> {
        if sa_sampling == 0 {
            return Err(TracyError::configuration("suffix array sampling rate must be positive"));
        }
        let records: Vec<ReferenceRecord> = records.into_iter().filter(|r| !r.seq.is_empty()).collect();
        if records.is_empty() {
            return Err(TracyError::Parse("reference contains no sequence".to_string()));
        }

        let total: usize = records.iter().map(|r| r.seq.len() + 1).sum();
        let mut text = Vec::with_capacity(total + 1);
        let mut names = Vec::with_capacity(records.len());
        let mut offsets = Vec::with_capacity(records.len());
        let mut lengths = Vec::with_capacity(records.len());

        for (i, record) in records.into_iter().enumerate() {
            if i > 0 {
                text.push(RECORD_SEPARATOR);
            }
            offsets.push(text.len());
            lengths.push(record.seq.len());
            text.extend_from_slice(&record.seq);
            names.push(record.name);
        }
        text.push(b'$');

        log::info!(
            "Indexing {} reference record(s), {} bp",
            names.len(),
            lengths.iter().sum::<usize>()
        );

        let alphabet = Alphabet::new(INDEX_ALPHABET);
        let full_sa = suffix_array(&text);
        let bwt = Arc::new(bwt(&text, &full_sa));
        let less = Arc::new(less(&bwt, &alphabet));
        let occ = Arc::new(Occ::new(&bwt, OCC_SAMPLING, &alphabet));
        let sa = full_sa.sample(&text, Arc::clone(&bwt), Arc::clone(&less), Arc::clone(&occ), sa_sampling);
        drop(full_sa);
        let fm = FMIndex::new(bwt, less, occ);

        Ok(Self {
            names,
            offsets,
            lengths,
            text,
            sa,
            fm,
        })
    }

    pub fn record_count(&self) -> usize {
        self.names.len()
    }

    pub fn record_name(&self, record: usize) -> Option<&str> {
        self.names.get(record).map(String::as_str)
    }

    pub fn record_len(&self, record: usize) -> Option<usize> {
        self.lengths.as_slice().get(record).copied()
    }

    /// Number of exact occurrences of `pattern`
    pub fn count(&self, pattern: &[u8]) -> usize {
        if pattern.is_empty() {
            return 0;
        }
        match self.fm.backward_search(pattern.iter()) {
            BackwardSearchResult::Complete(interval) => interval.upper - interval.lower,
            _ => 0,
        }
    }

    /// Occurrences of `pattern` as (record, 0-based offset), sorted
    pub fn locate(&self, pattern: &[u8]) -> Vec<(usize, usize)> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<(usize, usize)> = match self.fm.backward_search(pattern.iter()) {
            BackwardSearchResult::Complete(interval) => interval
                .occ(&self.sa)
                .into_iter()
                .filter_map(|global| self.resolve(global))
                .collect(),
            _ => Vec::new(),
        };
        hits.sort_unstable();
        hits
    }

    /// Map an offset in the concatenated text back to (record, local offset)
    fn resolve(&self, global: usize) -> Option<(usize, usize)> {
        let record = match self.offsets.binary_search(&global) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        let local = global - self.offsets[record];
        (local < self.lengths[record]).then_some((record, local))
    }

    /// Forward-strand bases `start..end` of a record, clipped to its length
    pub fn subsequence(&self, record: usize, start: usize, end: usize) -> &[u8] {
        let len = self.lengths[record];
        let end = end.min(len);
        let start = start.min(end);
        let offset = self.offsets[record];
        &self.text[offset + start..offset + end]
    }
}

/// Seeding parameters for [`locate_slice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorParams {
    pub kmer: usize,
    pub min_kmer_support: usize,
    pub max_kmer_occurrences: usize,
    pub max_indel: usize,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            kmer: 15,
            min_kmer_support: 3,
            max_kmer_occurrences: 10,
            max_indel: 1000,
        }
    }
}

/// One k-mer hit projected onto a read diagonal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Vote {
    record: usize,
    reverse: bool,
    diagonal: i64,
    kmer: usize,
}

/// Locate the reference window the consensus came from.
///
/// Fails with [`TracyError::NoReferenceMatch`] when fewer than
/// `min_kmer_support` distinct k-mers agree on record, strand and diagonal
/// (within `max_indel`).
pub fn locate_slice(
    index: &ReferenceIndex,
    consensus: &[u8],
    params: &LocatorParams,
) -> Result<ReferenceSlice> {
    let k = params.kmer;
    let read_len = consensus.len();
    let mut votes = Vec::new();

    if k > 0 {
        for (kmer_id, start) in (0..read_len.saturating_sub(k - 1)).step_by(k).enumerate() {
            let kmer = &consensus[start..start + k];
            if !is_acgt(kmer) {
                continue;
            }
            let kmer = normalize(kmer);
            let forward = index.locate(&kmer);
            let reverse = index.locate(&reverse_complement(&kmer));
            let occurrences = forward.len() + reverse.len();
            if occurrences == 0 || occurrences > params.max_kmer_occurrences {
                log::debug!("Skipping k-mer at {} with {} occurrences", start, occurrences);
                continue;
            }

            for (record, pos) in forward {
                votes.push(Vote {
                    record,
                    reverse: false,
                    diagonal: pos as i64 - start as i64,
                    kmer: kmer_id,
                });
            }
            // On the reverse strand the k-mer sits at read_len - start - k of
            // the reverse-complemented read.
            for (record, pos) in reverse {
                votes.push(Vote {
                    record,
                    reverse: true,
                    diagonal: pos as i64 - (read_len - start - k) as i64,
                    kmer: kmer_id,
                });
            }
        }
    }

    votes.sort_unstable();
    let (support, cluster) = best_cluster(&votes, params.max_indel as i64);
    log::debug!("{} k-mer votes, best cluster supported by {} k-mers", votes.len(), support);

    if support < params.min_kmer_support {
        return Err(TracyError::NoReferenceMatch {
            support,
            required: params.min_kmer_support,
        });
    }

    let anchor = &cluster[cluster.len() / 2];
    let record = anchor.record;
    let contig_len = index.lengths[record] as i64;
    let start = (anchor.diagonal - params.max_indel as i64).clamp(0, contig_len) as usize;
    let end = (anchor.diagonal + read_len as i64 + params.max_indel as i64).clamp(0, contig_len) as usize;
    if start >= end {
        return Err(TracyError::NoReferenceMatch {
            support: 0,
            required: params.min_kmer_support,
        });
    }

    let window = index.subsequence(record, start, end);
    let (strand, seq) = if anchor.reverse {
        (Strand::Reverse, reverse_complement(window))
    } else {
        (Strand::Forward, window.to_vec())
    };

    log::info!(
        "Reference match {}:{}-{} ({}), {} supporting k-mers",
        index.names[record],
        start + 1,
        end,
        char::from(strand),
        support
    );

    Ok(ReferenceSlice::new(index.names[record].clone(), strand, start as u64, seq))
}

/// Largest group of votes on one record/strand whose diagonals lie within
/// `tolerance`, counted by distinct k-mers. Votes must be sorted.
fn best_cluster(votes: &[Vote], tolerance: i64) -> (usize, &[Vote]) {
    let mut best: (usize, &[Vote]) = (0, &votes[..0]);
    let mut lo = 0;
    for hi in 0..votes.len() {
        while votes[lo].record != votes[hi].record
            || votes[lo].reverse != votes[hi].reverse
            || votes[hi].diagonal - votes[lo].diagonal > tolerance
        {
            lo += 1;
        }
        let window = &votes[lo..=hi];
        let mut kmers: Vec<usize> = window.iter().map(|v| v.kmer).collect();
        kmers.sort_unstable();
        kmers.dedup();
        if kmers.len() > best.0 {
            best = (kmers.len(), window);
        }
    }
    best
}

/// Narrow a slice to the reference span covered by the query of `alignment`.
///
/// The alignment must have been computed against `slice.seq`. A new slice is
/// returned; the input is left untouched for re-use by the other allele.
pub fn trim_reference_slice(slice: &ReferenceSlice, alignment: &Alignment) -> ReferenceSlice {
    let query_cols: Vec<usize> = alignment
        .query
        .iter()
        .enumerate()
        .filter(|(_, &q)| q != GAP)
        .map(|(c, _)| c)
        .collect();
    let (first, last) = match (query_cols.first(), query_cols.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return slice.clone(),
    };

    let ref_before = |col: usize| alignment.reference[..col].iter().filter(|&&r| r != GAP).count();
    let begin = ref_before(first);
    let end = ref_before(last + 1);
    if begin >= end || end > slice.seq.len() {
        return slice.clone();
    }

    let pos = match slice.strand {
        Strand::Forward => slice.pos + begin as u64,
        Strand::Reverse => slice.pos + (slice.seq.len() - end) as u64,
    };
    ReferenceSlice::new(slice.chr.clone(), slice.strand, pos, slice.seq[begin..end].to_vec())
}
