//! Signal profiles: the alignable unit for trace and reference
//!
//! A profile is a 4 x n matrix of per-base channel weights. Trace profiles
//! hold normalised intensities, reference profiles are one-hot, so one
//! alignment routine can consume either.

use crate::align::{Alignable, DnaScore};
use crate::error::{Result, TracyError};
use crate::types::{Base, BaseCalls, Trace, CHANNELS};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalProfile {
    /// Column-major: `data[col * CHANNELS + channel]`
    data: Vec<f32>,
    cols: usize,
}

impl SignalProfile {
    fn from_columns(columns: Vec<[f32; CHANNELS]>) -> Self {
        let cols = columns.len();
        let data = columns.into_iter().flatten().collect();
        Self { data, cols }
    }

    pub fn len(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0
    }

    pub fn get(&self, channel: usize, col: usize) -> f32 {
        self.data[col * CHANNELS + channel]
    }

    pub fn column(&self, col: usize) -> [f32; CHANNELS] {
        let mut out = [0.0; CHANNELS];
        out.copy_from_slice(&self.data[col * CHANNELS..(col + 1) * CHANNELS]);
        out
    }

    /// Dominant channel per column, `N` where every channel is zero
    pub fn consensus(&self) -> Vec<u8> {
        (0..self.cols).map(|c| self.symbol_at(c)).collect()
    }

    fn symbol_at(&self, col: usize) -> u8 {
        let column = self.column(col);
        let mut best = 0;
        for ch in 1..CHANNELS {
            if column[ch] > column[best] {
                best = ch;
            }
        }
        if column[best] > 0.0 {
            Base::from_channel(best).as_byte()
        } else {
            b'N'
        }
    }

    /// Ratio of the second-highest to the highest channel per column
    pub fn mixture(&self) -> Vec<f64> {
        (0..self.cols)
            .map(|c| {
                let mut column = self.column(c);
                column.sort_by(|a, b| b.total_cmp(a));
                if column[0] > 0.0 {
                    (column[1] / column[0]) as f64
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl Alignable for SignalProfile {
    fn len(&self) -> usize {
        self.cols
    }

    fn symbol(&self, i: usize) -> u8 {
        self.symbol_at(i)
    }

    /// Expected substitution score: every channel pair weighted by the
    /// product of its weights, match on the diagonal, mismatch elsewhere.
    fn pair_score(&self, i: usize, other: &Self, j: usize, scoring: &DnaScore) -> i32 {
        let a = self.column(i);
        let b = other.column(j);
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let total = a.iter().sum::<f32>() * b.iter().sum::<f32>();
        let score = scoring.match_score as f32 * dot + scoring.mismatch as f32 * (total - dot);
        score.round() as i32
    }
}

/// Scan points attributed to call `i`: halfway to each neighbouring peak.
fn peak_span(calls: &BaseCalls, i: usize, trace_len: usize) -> Range<usize> {
    let scan = calls.calls[i].scan;
    let start = if i == 0 {
        let next = calls.calls.get(1).map_or(scan, |c| c.scan);
        scan.saturating_sub(next.saturating_sub(scan) / 2)
    } else {
        (calls.calls[i - 1].scan + scan + 1) / 2
    };
    let end = if i + 1 < calls.len() {
        (scan + calls.calls[i + 1].scan + 1) / 2
    } else {
        let prev = if i > 0 { calls.calls[i - 1].scan } else { scan };
        scan + scan.saturating_sub(prev) / 2 + 1
    };
    let end = end.max(scan + 1).min(trace_len);
    start.min(end)..end
}

/// Build the trimmed trace profile.
///
/// Each column averages the channel intensities over the call's peak span and
/// normalises them to sum to one; a column without signal falls back to the
/// one-hot primary call.
pub fn trace_profile(
    trace: &Trace,
    calls: &BaseCalls,
    trim_left: usize,
    trim_right: usize,
) -> Result<SignalProfile> {
    let range = calls.trimmed_range(trim_left, trim_right);
    if range.is_empty() {
        return Err(TracyError::configuration(format!(
            "trimming {} + {} bases leaves no trace profile ({} calls)",
            trim_left,
            trim_right,
            calls.len()
        )));
    }

    let columns = range
        .map(|i| {
            let span = peak_span(calls, i, trace.len());
            let mut column = [0.0f32; CHANNELS];
            for scan in span.clone() {
                for (ch, value) in trace.sample(scan).iter().enumerate() {
                    column[ch] += value;
                }
            }
            let sum: f32 = column.iter().sum();
            if sum > 0.0 {
                for value in column.iter_mut() {
                    *value /= sum;
                }
                column
            } else {
                one_hot(calls.calls[i].primary.as_byte())
            }
        })
        .collect();

    Ok(SignalProfile::from_columns(columns))
}

fn one_hot(base: u8) -> [f32; CHANNELS] {
    let mut column = [0.0; CHANNELS];
    if let Some(ch) = Base::from_byte(base).channel() {
        column[ch] = 1.0;
    }
    column
}

/// One-hot profile of a reference sequence
pub fn reference_profile(seq: &[u8]) -> Result<SignalProfile> {
    if seq.is_empty() {
        return Err(TracyError::configuration("reference slice is empty"));
    }
    Ok(SignalProfile::from_columns(seq.iter().map(|&b| one_hot(b)).collect()))
}
