use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};
use tracy_core::index::{locate_slice, LocatorParams};
use tracy_core::io::{load_reference, FastaParser};
use tracy_core::{ReferenceIndex, Strand, TracyError};

const CONTIG: &str = "TCGATCTCTATGGCCAGTTCGATATGGATAGAGTGCATTCCGGTACCTGTACACATACCTTGGACTTAAGGCACGTTACCTGTGCATTCC";

#[test]
fn gzipped_fasta_round_trips_through_the_index() {
    let file = Builder::new().suffix(".fa.gz").tempfile().expect("create temp fasta");
    let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
    writeln!(encoder, ">decoy\nGGGGGGGGGGCCCCCCCCCC").unwrap();
    writeln!(encoder, ">target some description").unwrap();
    for chunk in CONTIG.as_bytes().chunks(30) {
        encoder.write_all(chunk).unwrap();
        encoder.write_all(b"\n").unwrap();
    }
    encoder.finish().unwrap();

    let records = FastaParser::parse_file(file.path()).expect("parse gzipped FASTA");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].name, "target");
    assert_eq!(records[1].seq, CONTIG.as_bytes().to_vec());

    let index = ReferenceIndex::build(records).unwrap();
    assert_eq!(index.record_count(), 2);
    assert_eq!(index.count(&CONTIG.as_bytes()[40..55]), 1);

    let params = LocatorParams { kmer: 10, min_kmer_support: 3, max_indel: 5, ..Default::default() };
    let slice = locate_slice(&index, &CONTIG.as_bytes()[20..70], &params).unwrap();
    assert_eq!(slice.chr, "target");
    assert_eq!(slice.strand, Strand::Forward);
    assert_eq!(slice.pos, 15);
    assert_eq!(slice.seq, CONTIG.as_bytes()[15..75].to_vec());
}

#[test]
fn fasta_without_records_is_missing_input() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file).unwrap();
    let result = load_reference(file.path(), 0.33);
    assert!(matches!(
        result,
        Err(TracyError::InputMissing { .. }) | Err(TracyError::Parse(_))
    ));
}
