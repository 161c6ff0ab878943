//! Affine-gap alignment engine
//!
//! Three-matrix Gotoh recurrences over any [`Alignable`] pair. The same routine
//! aligns trace profiles against reference profiles and plain allele
//! sequences against reference slices; the end-gap policy is a small
//! [`AlignMode`] value rather than a separate code path.

use serde::{Deserialize, Serialize};

/// Match, mismatch and affine gap scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnaScore {
    pub match_score: i32,
    pub mismatch: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for DnaScore {
    fn default() -> Self {
        Self::new(5, -4, -10, -1)
    }
}

impl DnaScore {
    pub fn new(match_score: i32, mismatch: i32, gap_open: i32, gap_extend: i32) -> Self {
        Self {
            match_score,
            mismatch,
            gap_open,
            gap_extend,
        }
    }

    /// Score of a single gap of `len` columns
    pub fn gap_cost(&self, len: usize) -> i32 {
        if len == 0 {
            0
        } else {
            self.gap_open + (len as i32 - 1) * self.gap_extend
        }
    }
}

/// End-gap policy.
///
/// `free_reference_ends` lets the reference overhang the query at either end
/// without penalty; `free_query_ends` does the same for the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignMode {
    pub free_reference_ends: bool,
    pub free_query_ends: bool,
}

impl AlignMode {
    /// Query fully aligned, over-sized reference window free at both ends
    pub const SEMI_GLOBAL: AlignMode = AlignMode {
        free_reference_ends: true,
        free_query_ends: false,
    };

    pub const GLOBAL: AlignMode = AlignMode {
        free_reference_ends: false,
        free_query_ends: false,
    };
}

/// A sequence-like value the alignment engine can consume.
pub trait Alignable {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Character written into the alignment row for position `i`
    fn symbol(&self, i: usize) -> u8;

    /// Substitution score of position `i` against position `j` of `other`
    fn pair_score(&self, i: usize, other: &Self, j: usize, scoring: &DnaScore) -> i32;
}

impl Alignable for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn symbol(&self, i: usize) -> u8 {
        self[i].to_ascii_uppercase()
    }

    fn pair_score(&self, i: usize, other: &Self, j: usize, scoring: &DnaScore) -> i32 {
        if self[i].eq_ignore_ascii_case(&other[j]) {
            scoring.match_score
        } else {
            scoring.mismatch
        }
    }
}

pub const GAP: u8 = b'-';

/// Two-row alignment: query (trace or allele) over reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    #[serde(with = "crate::types::seq_string")]
    pub query: Vec<u8>,
    #[serde(with = "crate::types::seq_string")]
    pub reference: Vec<u8>,
    pub score: i32,
}

/// Which row carries the gaps of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapKind {
    /// Gap in the reference row: bases present only in the query
    Insertion,
    /// Gap in the query row: reference bases missing from the query
    Deletion,
}

/// Maximal run of gap columns in one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRun {
    pub kind: GapKind,
    /// First column of the run
    pub column: usize,
    /// Reference bases consumed before the run
    pub reference_pos: usize,
    /// Query bases consumed before the run
    pub query_pos: usize,
    pub len: usize,
    /// True when the run touches either end of the alignment
    pub terminal: bool,
}

impl GapRun {
    /// Signed length: positive for insertions, negative for deletions
    pub fn signed_len(&self) -> i32 {
        match self.kind {
            GapKind::Insertion => self.len as i32,
            GapKind::Deletion => -(self.len as i32),
        }
    }
}

impl Alignment {
    /// Number of columns
    pub fn len(&self) -> usize {
        self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.query.iter().copied().zip(self.reference.iter().copied())
    }

    /// Columns spanned by aligned (non-gap in both rows) positions, inclusive.
    pub fn aligned_span(&self) -> Option<(usize, usize)> {
        let mut cols = self
            .columns()
            .enumerate()
            .filter(|(_, (q, r))| *q != GAP && *r != GAP)
            .map(|(c, _)| c);
        let first = cols.next()?;
        let last = cols.last().unwrap_or(first);
        Some((first, last))
    }

    /// Every maximal gap run, in column order
    pub fn gap_runs(&self) -> Vec<GapRun> {
        let mut runs: Vec<GapRun> = Vec::new();
        let mut query_pos = 0usize;
        let mut reference_pos = 0usize;

        for (col, (q, r)) in self.columns().enumerate() {
            let kind = if r == GAP {
                Some(GapKind::Insertion)
            } else if q == GAP {
                Some(GapKind::Deletion)
            } else {
                None
            };

            if let Some(kind) = kind {
                match runs.last_mut() {
                    Some(run) if run.kind == kind && run.column + run.len == col => run.len += 1,
                    _ => runs.push(GapRun {
                        kind,
                        column: col,
                        reference_pos,
                        query_pos,
                        len: 1,
                        terminal: col == 0,
                    }),
                }
            }

            if q != GAP {
                query_pos += 1;
            }
            if r != GAP {
                reference_pos += 1;
            }
        }

        let total = self.len();
        if let Some(run) = runs.last_mut() {
            if run.column + run.len == total {
                run.terminal = true;
            }
        }
        runs
    }
}

const NEG_INF: i32 = i32::MIN / 4;

// Traceback sources for the best-score matrix
const FROM_DIAG: u8 = 0;
const FROM_VERTICAL: u8 = 1;
const FROM_HORIZONTAL: u8 = 2;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Best,
    Vertical,
    Horizontal,
}

/// Align `query` against `reference` with affine gaps.
///
/// Vertical moves consume the query (insertions), horizontal moves consume
/// the reference (deletions). Equal-scoring predecessors are resolved in the
/// fixed order vertical, horizontal, diagonal, which shifts equivalent gaps
/// to their 3'-most position and makes the output reproducible.
pub fn gotoh<A: Alignable + ?Sized>(
    query: &A,
    reference: &A,
    mode: AlignMode,
    scoring: &DnaScore,
) -> Alignment {
    let n = query.len();
    let m = reference.len();
    let width = m + 1;
    let idx = |i: usize, j: usize| i * width + j;

    let cells = (n + 1) * width;
    let mut best = vec![NEG_INF; cells];
    let mut vertical = vec![NEG_INF; cells];
    let mut horizontal = vec![NEG_INF; cells];
    let mut best_src = vec![FROM_DIAG; cells];
    let mut vertical_ext = vec![false; cells];
    let mut horizontal_ext = vec![false; cells];

    best[idx(0, 0)] = 0;
    for j in 1..=m {
        let score = if mode.free_reference_ends { 0 } else { scoring.gap_cost(j) };
        horizontal[idx(0, j)] = score;
        horizontal_ext[idx(0, j)] = j > 1;
        best[idx(0, j)] = score;
        best_src[idx(0, j)] = FROM_HORIZONTAL;
    }
    for i in 1..=n {
        let score = if mode.free_query_ends { 0 } else { scoring.gap_cost(i) };
        vertical[idx(i, 0)] = score;
        vertical_ext[idx(i, 0)] = i > 1;
        best[idx(i, 0)] = score;
        best_src[idx(i, 0)] = FROM_VERTICAL;
    }

    for i in 1..=n {
        for j in 1..=m {
            let here = idx(i, j);

            let v_open = best[idx(i - 1, j)] + scoring.gap_open;
            let v_extend = vertical[idx(i - 1, j)] + scoring.gap_extend;
            vertical[here] = v_open.max(v_extend);
            vertical_ext[here] = v_extend > v_open;

            let h_open = best[idx(i, j - 1)] + scoring.gap_open;
            let h_extend = horizontal[idx(i, j - 1)] + scoring.gap_extend;
            horizontal[here] = h_open.max(h_extend);
            horizontal_ext[here] = h_extend > h_open;

            let diag = best[idx(i - 1, j - 1)] + query.pair_score(i - 1, reference, j - 1, scoring);

            let mut score = vertical[here];
            let mut src = FROM_VERTICAL;
            if horizontal[here] > score {
                score = horizontal[here];
                src = FROM_HORIZONTAL;
            }
            if diag > score {
                score = diag;
                src = FROM_DIAG;
            }
            best[here] = score;
            best_src[here] = src;
        }
    }

    // Pick the end cell; free end gaps allow any cell on the last row/column.
    let mut end = (n, m);
    let mut end_score = best[idx(n, m)];
    if mode.free_reference_ends {
        for j in (0..m).rev() {
            if best[idx(n, j)] > end_score {
                end_score = best[idx(n, j)];
                end = (n, j);
            }
        }
    }
    if mode.free_query_ends {
        for i in (0..n).rev() {
            if best[idx(i, m)] > end_score {
                end_score = best[idx(i, m)];
                end = (i, m);
            }
        }
    }

    let mut query_row = Vec::with_capacity(n + m);
    let mut reference_row = Vec::with_capacity(n + m);

    // Trailing overhang, pushed in reverse like the rest of the traceback
    for j in (end.1..m).rev() {
        query_row.push(GAP);
        reference_row.push(reference.symbol(j));
    }
    for i in (end.0..n).rev() {
        query_row.push(query.symbol(i));
        reference_row.push(GAP);
    }

    let (mut i, mut j) = end;
    let mut state = State::Best;
    while i > 0 && j > 0 {
        let here = idx(i, j);
        match state {
            State::Best => match best_src[here] {
                FROM_VERTICAL => state = State::Vertical,
                FROM_HORIZONTAL => state = State::Horizontal,
                _ => {
                    query_row.push(query.symbol(i - 1));
                    reference_row.push(reference.symbol(j - 1));
                    i -= 1;
                    j -= 1;
                }
            },
            State::Vertical => {
                query_row.push(query.symbol(i - 1));
                reference_row.push(GAP);
                if !vertical_ext[here] {
                    state = State::Best;
                }
                i -= 1;
            }
            State::Horizontal => {
                query_row.push(GAP);
                reference_row.push(reference.symbol(j - 1));
                if !horizontal_ext[here] {
                    state = State::Best;
                }
                j -= 1;
            }
        }
    }
    while i > 0 {
        query_row.push(query.symbol(i - 1));
        reference_row.push(GAP);
        i -= 1;
    }
    while j > 0 {
        query_row.push(GAP);
        reference_row.push(reference.symbol(j - 1));
        j -= 1;
    }

    query_row.reverse();
    reference_row.reverse();

    Alignment {
        query: query_row,
        reference: reference_row,
        score: end_score,
    }
}
