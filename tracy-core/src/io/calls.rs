//! Base-caller output: trace channels plus per-base calls as JSON
//!
//! Binary chromatogram encodings are decoded upstream; handing one of them
//! to this loader is an [`TracyError::UnknownFormat`] error.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TracyError};
use crate::index::ReferenceRecord;
use crate::types::{Base, BaseCall, BaseCalls, Trace, CHANNELS};

/// Record name used when a trace stands in for the reference genome
pub const WILDTYPE_RECORD: &str = "wildtype";

#[derive(Debug, Deserialize)]
struct TraceDocument {
    trace: ChannelDocument,
    calls: Vec<CallDocument>,
}

#[derive(Debug, Deserialize)]
struct ChannelDocument {
    channels: Vec<Vec<u16>>,
}

#[derive(Debug, Deserialize)]
struct CallDocument {
    primary: char,
    #[serde(default)]
    secondary: Option<char>,
    #[serde(default)]
    peak_height: Option<u16>,
    scan: usize,
}

/// Base for a called symbol; anything outside ACGT, including non-ASCII
/// characters, is `N`.
fn call_base(symbol: char) -> Base {
    u8::try_from(symbol).map_or(Base::N, Base::from_byte)
}

/// Reject known binary chromatogram encodings and anything that is not a
/// JSON object.
fn sniff_format(bytes: &[u8]) -> Result<()> {
    if bytes.starts_with(b"ABIF") {
        return Err(TracyError::UnknownFormat("ABIF chromatogram, convert to base-call JSON first".to_string()));
    }
    if bytes.starts_with(b".scf") {
        return Err(TracyError::UnknownFormat("SCF chromatogram, convert to base-call JSON first".to_string()));
    }
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Ok(()),
        _ => Err(TracyError::UnknownFormat("expected a base-call JSON document".to_string())),
    }
}

/// Secondary call at `scan`: the strongest other channel when it reaches
/// `peak_ratio` of the primary channel, the primary otherwise.
pub fn derive_secondary(trace: &Trace, scan: usize, primary: Base, peak_ratio: f32) -> Base {
    let sample = trace.sample(scan);
    let Some(dominant) = primary.channel() else {
        return primary;
    };
    let runner_up = (0..CHANNELS)
        .filter(|&ch| ch != dominant)
        .max_by(|&a, &b| sample[a].total_cmp(&sample[b]).then(b.cmp(&a)));
    match runner_up {
        Some(ch) if sample[ch] > 0.0 && sample[ch] >= peak_ratio * sample[dominant] => Base::from_channel(ch),
        _ => primary,
    }
}

/// Parse a base-call document already read into memory.
pub fn parse_trace_input(bytes: &[u8], peak_ratio: f32) -> Result<(Trace, BaseCalls)> {
    sniff_format(bytes)?;
    let document: TraceDocument = serde_json::from_slice(bytes).map_err(|e| TracyError::Parse(e.to_string()))?;

    let channels: [Vec<u16>; CHANNELS] = document.trace.channels.try_into().map_err(|c: Vec<Vec<u16>>| {
        TracyError::Parse(format!("expected {} trace channels, found {}", CHANNELS, c.len()))
    })?;
    let trace = Trace::new(channels)?;

    let calls = document
        .calls
        .into_iter()
        .enumerate()
        .map(|(i, call)| {
            if call.scan >= trace.len() {
                return Err(TracyError::Parse(format!(
                    "call {} points to scan {} beyond the trace ({} scans)",
                    i + 1,
                    call.scan,
                    trace.len()
                )));
            }
            let primary = call_base(call.primary);
            let secondary = match call.secondary {
                Some(base) => call_base(base),
                None => derive_secondary(&trace, call.scan, primary, peak_ratio),
            };
            let peak_height = call.peak_height.unwrap_or_else(|| {
                primary
                    .channel()
                    .map_or(0, |ch| trace.intensity(ch, call.scan) as u16)
            });
            Ok(BaseCall {
                primary,
                secondary,
                peak_height,
                scan: call.scan,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((trace, BaseCalls::new(calls)))
}

/// Load trace and base calls. A missing file, or one without calls, is
/// [`TracyError::InputMissing`].
pub fn load_trace_input<P: AsRef<Path>>(path: P, peak_ratio: f32) -> Result<(Trace, BaseCalls)> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|_| TracyError::input_missing(path))?;
    if bytes.is_empty() {
        return Err(TracyError::input_missing(path));
    }
    let (trace, calls) = parse_trace_input(&bytes, peak_ratio)?;
    if calls.is_empty() {
        return Err(TracyError::input_missing(path));
    }
    log::info!(
        "Loaded {} base calls over {} scan points from {}",
        calls.len(),
        trace.len(),
        path.display()
    );
    Ok((trace, calls))
}

/// Use a wildtype trace's primary calls as a single-record reference.
pub fn wildtype_reference<P: AsRef<Path>>(path: P, peak_ratio: f32) -> Result<ReferenceRecord> {
    let (_, calls) = load_trace_input(path, peak_ratio)?;
    Ok(ReferenceRecord::new(WILDTYPE_RECORD, &calls.primary()))
}
