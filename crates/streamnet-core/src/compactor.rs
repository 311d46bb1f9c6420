//! Converts a hierarchical raw label into the fixed-width compact and
//! fully-qualified label forms used in output.
use crate::digits::{encode_width2, DigitBase};
use crate::error::CompactError;

pub const MAX_LABEL_LEN: usize = 14;
pub const MAX_FQ_LABEL_LEN: usize = 16;
pub const MAX_LABEL_LEVEL: usize = 6;

/// Compact `raw` (e.g. `"0101-3-12"`) into a fixed-width-14 string in digit
/// base `base`.
///
/// The leading chunk of a raw label, up to the first `'-'`, already carries
/// the main-stem segment and (if present) the first-order segment
/// concatenated with no separator between them; both are minted directly in
/// `base` and are passed through unchanged. Every segment after the first
/// `'-'` is a decimal integer string minted independently of `base` and is
/// encoded fresh, width 2, zero-padded. The concatenation is right-padded
/// with `'0'` to width 14.
pub fn compact_label(raw: &str, base: DigitBase) -> Result<String, CompactError> {
    let segments: Vec<&str> = raw.split('-').collect();
    if segments.len() > MAX_LABEL_LEVEL {
        return Err(CompactError::TooManySegments {
            raw: raw.to_string(),
            segments: segments.len(),
        });
    }

    let mut out = String::with_capacity(MAX_LABEL_LEN);
    for (i, segment) in segments.iter().enumerate() {
        if i == 0 {
            out.push_str(segment);
        } else {
            let value: u32 = segment.parse().unwrap_or(0);
            out.push_str(&encode_width2(value, base));
        }
    }

    if out.len() > MAX_LABEL_LEN {
        return Err(CompactError::TooManySegments {
            raw: raw.to_string(),
            segments: segments.len(),
        });
    }
    while out.len() < MAX_LABEL_LEN {
        out.push('0');
    }
    Ok(out)
}

/// Prepend the watershed's 2-character code to a compact label.
///
/// Returns the fully-qualified label together with whether it exceeds
/// `MAX_FQ_LABEL_LEN`; callers should log a warning (not fail) in that case.
pub fn fully_qualify(ws_code: &str, compact: &str) -> Result<(String, bool), CompactError> {
    if ws_code.chars().count() != 2 {
        return Err(CompactError::BadWatershedCode {
            code: ws_code.to_string(),
        });
    }
    let fq = format!("{ws_code}{compact}");
    let too_long = fq.len() > MAX_FQ_LABEL_LEN;
    Ok((fq, too_long))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digits::DigitBase;
    use crate::minter::LabelMinter;

    #[test]
    fn single_straight_stem_compacts_to_zero_padded_mainstem() {
        let compact = compact_label("01", DigitBase::Hex).unwrap();
        assert_eq!(compact, "01000000000000");
    }

    #[test]
    fn simple_tributary_compacts_concatenated_first_order_segment() {
        // Matches the "0101" raw label from the simple-tributary scenario:
        // mainstem "01" and first-order "01" concatenated with no separator.
        let compact = compact_label("0101", DigitBase::Hex).unwrap();
        assert_eq!(compact, "01010000000000");
    }

    #[test]
    fn nth_order_segments_are_decimal_and_encoded_at_compaction() {
        let compact = compact_label("0101-3-12", DigitBase::Hex).unwrap();
        assert_eq!(&compact[0..4], "0101");
        assert_eq!(&compact[4..6], "03");
        assert_eq!(&compact[6..8], "0c");
        assert_eq!(compact.len(), MAX_LABEL_LEN);
    }

    #[test]
    fn compaction_is_consistent_with_minter_output_within_one_base() {
        let mut m = LabelMinter::new(DigitBase::Crockford);
        let ms = m.next_mainstem().unwrap();
        let fo = m.next_first_order(&ms).unwrap();
        let nth = m.next_for_next_level(2, &fo).unwrap();
        let compact = compact_label(&nth, DigitBase::Crockford).unwrap();
        assert_eq!(&compact[0..4], fo);
        assert_eq!(compact.len(), MAX_LABEL_LEN);
    }

    #[test]
    fn fully_qualified_label_bounds_to_sixteen() {
        let (fq, too_long) = fully_qualify("AA", "01000000000000").unwrap();
        assert_eq!(fq, "AA01000000000000");
        assert_eq!(fq.len(), 16);
        assert!(!too_long);
    }

    #[test]
    fn bad_watershed_code_length_errors() {
        assert!(fully_qualify("AAA", "01000000000000").is_err());
    }
}
