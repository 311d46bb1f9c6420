//! The label minter: per-prefix counter state and the four label-issuing
//! operations the traversal engine drives.
use std::collections::HashMap;

use crate::digits::{encode_width2, DigitBase};
use crate::error::MinterError;

/// Holds one counter per prefix key and mints the next raw-label segment at
/// that key on request. Counters never decrement and are never shared
/// across watersheds; a fresh `LabelMinter` is created per watershed run.
#[derive(Debug, Clone)]
pub struct LabelMinter {
    base: DigitBase,
    counters: HashMap<String, u32>,
}

impl LabelMinter {
    pub fn new(base: DigitBase) -> Self {
        Self {
            base,
            counters: HashMap::new(),
        }
    }

    fn bump(&mut self, key: &str) -> Result<u32, MinterError> {
        let ceiling = self.base.ceiling();
        let entry = self.counters.entry(key.to_string()).or_insert(0);
        if *entry >= ceiling {
            return Err(MinterError::CounterOverflow {
                key: key.to_string(),
                base: self.base,
                ceiling,
            });
        }
        *entry += 1;
        Ok(*entry)
    }

    /// Mint the next main-stem label. Increments the counter at key `"0"`.
    pub fn next_mainstem(&mut self) -> Result<String, MinterError> {
        let v = self.bump("0")?;
        Ok(encode_width2(v, self.base))
    }

    /// Mint the next first-order label under `mainstem_label`.
    pub fn next_first_order(&mut self, mainstem_label: &str) -> Result<String, MinterError> {
        let v = self.bump(mainstem_label)?;
        Ok(format!("{mainstem_label}{}", encode_width2(v, self.base)))
    }

    /// Mint the next nth-order label as a sibling of `current_label`.
    ///
    /// The stub is every hierarchy segment of `current_label` but the last,
    /// rejoined with `'-'` and followed by a trailing `'-'`; the counter at
    /// `stub + "0"` tracks how many siblings have been minted at this depth.
    /// Deeper-level counters are rendered as decimal in the raw label; base-B
    /// encoding happens only when the label is compacted.
    pub fn next_nth_order(&mut self, current_label: &str) -> Result<String, MinterError> {
        let mut segments: Vec<&str> = current_label.split('-').collect();
        segments.pop();
        let stub = if segments.is_empty() {
            String::new()
        } else {
            format!("{}-", segments.join("-"))
        };
        let key = format!("{stub}0");
        let v = self.bump(&key)?;
        Ok(format!("{stub}{v}"))
    }

    /// Dispatch by `order` to mint a sibling label at the current hierarchy
    /// depth, used on Case A2 (new minor-divergence branch) descents.
    pub fn next_for_current_level(
        &mut self,
        order: u32,
        current_label: &str,
    ) -> Result<String, MinterError> {
        match order {
            0 => self.next_mainstem(),
            1 => {
                let mainstem = &current_label[..2.min(current_label.len())];
                self.next_first_order(mainstem)
            }
            _ => self.next_nth_order(current_label),
        }
    }

    /// Dispatch by `new_order` to mint a label one level shallower, used on
    /// Case B (upstream of higher Strahler order) descents.
    pub fn next_for_previous_level(
        &mut self,
        new_order: u32,
        current_label: &str,
    ) -> Result<String, MinterError> {
        self.next_for_current_level(new_order, current_label)
    }

    /// Mint a label one level deeper than `current_label`, used on Case C
    /// (tributary) descents.
    pub fn next_for_next_level(
        &mut self,
        new_order: u32,
        current_label: &str,
    ) -> Result<String, MinterError> {
        match new_order {
            0 => unreachable!("next_for_next_level must not be invoked with new_order == 0"),
            1 => self.next_first_order(current_label),
            _ => {
                let key = format!("{current_label}-0");
                let v = self.bump(&key)?;
                Ok(format!("{current_label}-{v}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainstem_counter_increments_and_pads() {
        let mut m = LabelMinter::new(DigitBase::Hex);
        assert_eq!(m.next_mainstem().unwrap(), "01");
        assert_eq!(m.next_mainstem().unwrap(), "02");
    }

    #[test]
    fn first_order_keys_off_mainstem_label() {
        let mut m = LabelMinter::new(DigitBase::Hex);
        let ms = m.next_mainstem().unwrap();
        assert_eq!(m.next_first_order(&ms).unwrap(), "0101");
        assert_eq!(m.next_first_order(&ms).unwrap(), "0102");
    }

    #[test]
    fn nth_order_mints_a_new_sibling_at_an_existing_depth() {
        let mut m = LabelMinter::new(DigitBase::Hex);
        let ms = m.next_mainstem().unwrap();
        let fo = m.next_first_order(&ms).unwrap();
        // First descent to depth 2 happens inline in next_for_next_level...
        let first_child = m.next_for_next_level(2, &fo).unwrap();
        assert_eq!(first_child, format!("{fo}-1"));
        // ...a second branch at the same depth is a sibling via next_nth_order.
        assert_eq!(m.next_nth_order(&first_child).unwrap(), format!("{fo}-2"));
        assert_eq!(m.next_nth_order(&first_child).unwrap(), format!("{fo}-3"));
    }

    #[test]
    fn distinct_prefix_keys_are_independent() {
        let mut m = LabelMinter::new(DigitBase::Hex);
        let ms1 = m.next_mainstem().unwrap();
        let ms2 = m.next_mainstem().unwrap();
        assert_eq!(m.next_first_order(&ms1).unwrap(), format!("{ms1}01"));
        assert_eq!(m.next_first_order(&ms2).unwrap(), format!("{ms2}01"));
    }

    #[test]
    fn overflow_is_fatal_at_ceiling() {
        let mut m = LabelMinter::new(DigitBase::Hex);
        for _ in 0..255 {
            m.next_mainstem().unwrap();
        }
        assert!(m.next_mainstem().is_err());
    }

    #[test]
    fn next_for_next_level_deeper_than_one_appends_decimal_sibling() {
        let mut m = LabelMinter::new(DigitBase::Hex);
        let ms = m.next_mainstem().unwrap();
        let fo = m.next_first_order(&ms).unwrap();
        let nth = m.next_for_next_level(2, &fo).unwrap();
        assert_eq!(nth, format!("{fo}-1"));
    }
}
