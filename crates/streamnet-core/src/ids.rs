//! Flowline identifier types for medium- and high-resolution NHDPlus sources.
use std::fmt;

/// COMID: the medium-resolution NHDPlus flowline identifier.
pub type ComId = i64;

/// NHDPlus HR flowline identifier (`nhdplusid`), stored as a real number in
/// the source database.
///
/// `f64` is not `Eq`/`Hash`, so the bit pattern is kept instead. NHDPlusHR
/// ids are always non-negative whole numbers, so ordering the bit patterns
/// as unsigned integers agrees with ordering the floats themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NhdPlusId(u64);

impl NhdPlusId {
    pub fn from_f64(id: f64) -> Self {
        debug_assert!(id.is_finite() && id >= 0.0, "nhdplusid must be a non-negative finite number, got {id}");
        Self(id.to_bits())
    }

    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Display for NhdPlusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
