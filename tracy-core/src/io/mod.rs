//! Boundary loaders for the reference genome and the base-caller output

pub mod calls;
pub mod fasta;

pub use calls::{derive_secondary, load_trace_input, parse_trace_input, wildtype_reference, WILDTYPE_RECORD};
pub use fasta::FastaParser;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, TracyError};
use crate::index::ReferenceRecord;

/// Load reference records from FASTA, or from a wildtype base-call JSON
/// document when the file holds one.
pub fn load_reference<P: AsRef<Path>>(path: P, peak_ratio: f32) -> Result<Vec<ReferenceRecord>> {
    let path = path.as_ref();
    let mut head = [0u8; 64];
    let read = File::open(path)
        .and_then(|mut file| file.read(&mut head))
        .map_err(|_| TracyError::input_missing(path))?;

    let is_json = head[..read].iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');
    if is_json {
        log::info!("Using wildtype trace {} as reference", path.display());
        Ok(vec![wildtype_reference(path, peak_ratio)?])
    } else {
        FastaParser::parse_file(path)
    }
}
