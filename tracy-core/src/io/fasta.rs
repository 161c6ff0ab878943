//! FASTA reference loading
//!
//! Plain or gzip-compressed, single or multi-record, parsed with needletail.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;
use needletail::{parse_fastx_file, parse_fastx_reader};

use crate::error::{Result, TracyError};
use crate::index::ReferenceRecord;

/// FASTA parser producing normalised reference records
pub struct FastaParser;

impl FastaParser {
    /// Parse every record of a FASTA file. A missing or empty file is
    /// [`TracyError::InputMissing`].
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<ReferenceRecord>> {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(TracyError::input_missing(path)),
        }

        let records = if path.to_string_lossy().ends_with(".gz") {
            Self::parse_gzipped_file(path)?
        } else {
            Self::parse_uncompressed_file(path)?
        };

        if records.is_empty() {
            return Err(TracyError::input_missing(path));
        }
        log::info!(
            "Loaded {} reference records ({} bp) from {}",
            records.len(),
            records.iter().map(|r| r.seq.len()).sum::<usize>(),
            path.display()
        );
        Ok(records)
    }

    fn parse_uncompressed_file(path: &Path) -> Result<Vec<ReferenceRecord>> {
        let mut reader = parse_fastx_file(path).map_err(|e| TracyError::Parse(e.to_string()))?;
        let mut records = Vec::new();
        while let Some(record) = reader.next() {
            let record = record.map_err(|e| TracyError::Parse(e.to_string()))?;
            records.push(Self::to_record(&record));
        }
        Ok(records)
    }

    fn parse_gzipped_file(path: &Path) -> Result<Vec<ReferenceRecord>> {
        let file = File::open(path)?;
        Self::parse_reader(BufReader::new(GzDecoder::new(file)))
    }

    /// Parse FASTA data from any readable source
    pub fn parse_reader<R: std::io::Read + Send>(reader: R) -> Result<Vec<ReferenceRecord>> {
        let mut fastx_reader = parse_fastx_reader(reader).map_err(|e| TracyError::Parse(e.to_string()))?;
        let mut records = Vec::new();
        while let Some(record) = fastx_reader.next() {
            let record = record.map_err(|e| TracyError::Parse(e.to_string()))?;
            records.push(Self::to_record(&record));
        }
        Ok(records)
    }

    /// Record name is the header up to the first whitespace
    fn to_record(record: &needletail::parser::SequenceRecord) -> ReferenceRecord {
        let id = String::from_utf8_lossy(record.id());
        let name = id.split_whitespace().next().unwrap_or_default();
        ReferenceRecord::new(name, &record.seq())
    }
}
