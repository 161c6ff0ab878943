//! Tracy Core Library
//!
//! Reference location, signal profiles, affine-gap alignment, breakpoint
//! detection, allele decomposition and variant extraction for single-sample
//! Sanger chromatograms.

pub mod types;
pub mod error;
pub mod config;
pub mod seq;
pub mod io;
pub mod index;
pub mod profile;
pub mod align;
pub mod breakpoint;
pub mod decompose;
pub mod fraction;
pub mod variants;
pub mod pipeline;

// Re-export commonly used types and functions
pub use types::{Base, BaseCall, BaseCalls, ReferenceSlice, Strand, Trace};
pub use error::{Result, TracyError};
pub use config::PipelineConfig;
pub use index::{ReferenceIndex, ReferenceRecord};
pub use profile::SignalProfile;
pub use align::{gotoh, AlignMode, Alignable, Alignment, DnaScore};
pub use breakpoint::{BreakpointSource, TraceBreakpoint};
pub use decompose::{AlleleSplit, Decomposition, DecompositionEvent};
pub use fraction::AllelicFraction;
pub use variants::{Genotype, Variant, VariantKind};
pub use pipeline::{AlleleAlignment, AnalysisContext, PipelineResult};

/// Version information for the tracy core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
