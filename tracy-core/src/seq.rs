//! Nucleotide helpers shared by the index, the decomposer and the variant caller

/// Encode a nucleotide to 2-bit representation
pub fn encode_nucleotide(nucleotide: u8) -> Option<u8> {
    match nucleotide.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Get complement of a single nucleotide
pub fn complement_nucleotide(nucleotide: u8) -> u8 {
    match nucleotide.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'-' => b'-',
        _ => b'N',
    }
}

/// Generate reverse complement of a sequence
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .rev()
        .map(|&nucleotide| complement_nucleotide(nucleotide))
        .collect()
}

/// Upper-case ACGT, everything else becomes `N`
pub fn normalize(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .map(|&b| match b.to_ascii_uppercase() {
            n @ (b'A' | b'C' | b'G' | b'T') => n,
            _ => b'N',
        })
        .collect()
}

pub fn is_acgt(sequence: &[u8]) -> bool {
    sequence.iter().all(|&b| encode_nucleotide(b).is_some())
}
