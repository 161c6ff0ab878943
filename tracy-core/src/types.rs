use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Range;

/// Number of dye channels in a chromatogram
pub const CHANNELS: usize = 4;

/// Nucleotide call. Channel order is A, C, G, T.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Base {
    A,
    C,
    G,
    T,
    N,
}

impl Base {
    pub fn from_byte(byte: u8) -> Self {
        match byte.to_ascii_uppercase() {
            b'A' => Base::A,
            b'C' => Base::C,
            b'G' => Base::G,
            b'T' => Base::T,
            _ => Base::N,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Base::A => b'A',
            Base::C => b'C',
            Base::G => b'G',
            Base::T => b'T',
            Base::N => b'N',
        }
    }

    /// Dye channel carrying this base, `None` for `N`
    pub fn channel(self) -> Option<usize> {
        match self {
            Base::A => Some(0),
            Base::C => Some(1),
            Base::G => Some(2),
            Base::T => Some(3),
            Base::N => None,
        }
    }

    pub fn from_channel(channel: usize) -> Self {
        match channel {
            0 => Base::A,
            1 => Base::C,
            2 => Base::G,
            3 => Base::T,
            _ => Base::N,
        }
    }
}

/// Raw chromatogram: one intensity series per dye channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub channels: [Vec<u16>; CHANNELS],
}

impl Trace {
    /// Build a trace, requiring all four channels to have the same length
    pub fn new(channels: [Vec<u16>; CHANNELS]) -> crate::Result<Self> {
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(crate::TracyError::Parse(
                "trace channels have different lengths".to_string(),
            ));
        }
        Ok(Self { channels })
    }

    /// Number of scan points
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn intensity(&self, channel: usize, scan: usize) -> f32 {
        self.channels
            .get(channel)
            .and_then(|c| c.get(scan))
            .map_or(0.0, |&v| v as f32)
    }

    /// All four channel intensities at one scan point
    pub fn sample(&self, scan: usize) -> [f32; CHANNELS] {
        let mut out = [0.0; CHANNELS];
        for (ch, value) in out.iter_mut().enumerate() {
            *value = self.intensity(ch, scan);
        }
        out
    }
}

/// One called base and the scan point its peak sits on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseCall {
    pub primary: Base,
    pub secondary: Base,
    pub peak_height: u16,
    pub scan: usize,
}

impl BaseCall {
    pub fn is_heterozygous(&self) -> bool {
        self.primary != self.secondary
    }
}

/// Base calls in read order, as produced by the external base caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseCalls {
    pub calls: Vec<BaseCall>,
}

impl BaseCalls {
    pub fn new(calls: Vec<BaseCall>) -> Self {
        Self { calls }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn primary(&self) -> Vec<u8> {
        self.calls.iter().map(|c| c.primary.as_byte()).collect()
    }

    pub fn secondary(&self) -> Vec<u8> {
        self.calls.iter().map(|c| c.secondary.as_byte()).collect()
    }

    /// Positions kept after removing `trim_left` and `trim_right` calls.
    /// The range is empty when the trims consume every call.
    pub fn trimmed_range(&self, trim_left: usize, trim_right: usize) -> Range<usize> {
        let end = self.len().saturating_sub(trim_right);
        let start = trim_left.min(end);
        start..end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl From<bool> for Strand {
    fn from(forward: bool) -> Self {
        if forward {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

impl From<Strand> for char {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

/// Window of a reference contig, oriented like the trace.
///
/// `pos` is the 0-based forward-strand offset of the window's leftmost base;
/// on the reverse strand `seq` holds the reverse complement of that window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSlice {
    pub chr: String,
    pub strand: Strand,
    pub pos: u64,
    #[serde(with = "seq_string")]
    pub seq: Vec<u8>,
}

impl ReferenceSlice {
    pub fn new(chr: impl Into<String>, strand: Strand, pos: u64, seq: Vec<u8>) -> Self {
        Self {
            chr: chr.into(),
            strand,
            pos,
            seq,
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Serialize byte sequences as plain strings.
pub(crate) mod seq_string {
    use super::*;

    pub fn serialize<S: Serializer>(seq: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(seq))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_round_trip() {
        for &byte in b"ACGTN" {
            assert_eq!(Base::from_byte(byte).as_byte(), byte);
        }
        assert_eq!(Base::from_byte(b'g'), Base::G);
        assert_eq!(Base::from_byte(b'R'), Base::N);
        assert_eq!(Base::from_channel(Base::T.channel().unwrap()), Base::T);
        assert_eq!(Base::N.channel(), None);
    }

    #[test]
    fn test_trace_rejects_ragged_channels() {
        let result = Trace::new([vec![1, 2], vec![1, 2], vec![1], vec![1, 2]]);
        assert!(result.is_err());

        let trace = Trace::new([vec![1, 2], vec![3, 4], vec![5, 6], vec![7, 8]]).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.sample(1), [2.0, 4.0, 6.0, 8.0]);
        assert_eq!(trace.intensity(0, 10), 0.0);
    }

    #[test]
    fn test_trimmed_range() {
        let call = BaseCall { primary: Base::A, secondary: Base::A, peak_height: 100, scan: 0 };
        let calls = BaseCalls::new(vec![call; 10]);
        assert_eq!(calls.trimmed_range(2, 3), 2..7);
        assert!(calls.trimmed_range(6, 6).is_empty());
        assert_eq!(calls.trimmed_range(0, 0), 0..10);
    }

    #[test]
    fn test_slice_serializes_sequence_as_string() {
        let slice = ReferenceSlice::new("chr1", Strand::Forward, 10, b"ACGT".to_vec());
        let json = serde_json::to_string(&slice).unwrap();
        assert!(json.contains("\"seq\":\"ACGT\""));
        let back: ReferenceSlice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slice);
    }
}
