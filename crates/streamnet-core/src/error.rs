//! Typed errors for the core labeling library.
use thiserror::Error;

use crate::digits::DigitBase;

/// Errors raised while minting hierarchical labels.
#[derive(Debug, Error)]
pub enum MinterError {
    #[error("counter for key {key:?} overflowed its {base:?} width-2 ceiling ({ceiling})")]
    CounterOverflow {
        key: String,
        base: DigitBase,
        ceiling: u32,
    },
}

/// Errors raised while compacting or fully-qualifying a raw label.
#[derive(Debug, Error)]
pub enum CompactError {
    #[error("raw label {raw:?} has {segments} segments, exceeding the compact width budget")]
    TooManySegments { raw: String, segments: usize },

    #[error("watershed code {code:?} must be exactly 2 characters")]
    BadWatershedCode { code: String },
}

/// Errors raised by the traversal engine while labeling a single watershed.
///
/// A dangling downstream/upstream reference or a revisited flowline (a cycle
/// that slipped past divergence filtering) is not an error here: the
/// traversal silently skips it, per the store's own dangle semantics and the
/// visited-set's guard against ever re-entering a flowline.
#[derive(Debug, Error)]
pub enum StreamNetError {
    #[error(transparent)]
    Minter(#[from] MinterError),

    #[error(transparent)]
    Compact(#[from] CompactError),
}
