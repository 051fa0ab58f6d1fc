//! Market-structure detectors
//!
//! Each detector reads a trailing window of the series and needs a minimum
//! sample before it reports anything.
//!
//! # Detectors
//!
//! - **Support/resistance**: extreme or clustered price levels, plus
//!   consolidation zones.
//! - **Structure**: BOS/CHoCH breaks and their coalesced zones.
//! - **Harmonic**: AB=CD four-point patterns.
//! - **Swing**: swing points, order blocks and liquidity levels (ungated).

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
    ($($detector:ty),* $(,)?) => {
        $(impl $detector {
            pub fn with_defaults() -> Self { Self::default() }
        })*
    };
}

pub mod harmonic;
pub mod structure;
pub mod support_resistance;
pub mod swing;

pub use harmonic::*;
pub use structure::*;
pub use support_resistance::*;
pub use swing::*;

impl_with_defaults!(HarmonicDetector, StructureDetector, SupportResistanceDetector);

/// Default swing-point neighbourhood half-width
pub const SWING_LENGTH: usize = 5;
