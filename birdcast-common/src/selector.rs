//! Deterministic daily selection
//!
//! Every list picked from the same day multiplies the base [`DaySeed`] by a
//! distinct small odd constant before reducing modulo the list length, so
//! the voice and the ambience track do not always land on the same slot.
//!
//! Caveat: lists whose length divides the seed delta between two days will
//! alias on those days. Changing the constants changes every published
//! selection sequence, so they stay as they are.

use crate::time::{day_seed, DaySeed};
use crate::{Error, Result};
use chrono::NaiveDate;

/// Selection domains, each with its own decorrelation multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionDomain {
    Voice,
    Ambience,
    IntroVariant,
    OutroVariant,
    FactTemplate,
}

impl SelectionDomain {
    /// Odd multiplier applied to the base seed
    pub const fn multiplier(&self) -> u64 {
        match self {
            SelectionDomain::Voice => 1,
            SelectionDomain::Ambience => 7,
            SelectionDomain::IntroVariant => 13,
            SelectionDomain::OutroVariant => 17,
            SelectionDomain::FactTemplate => 19,
        }
    }
}

impl DaySeed {
    /// Seed for a given selection domain
    pub fn decorrelate(self, domain: SelectionDomain) -> u64 {
        self.0.wrapping_mul(domain.multiplier())
    }
}

/// Pick an index in `[0, n)` from a seed
///
/// Errors when `n == 0`; callers are expected to guard empty lists.
pub fn select(seed: u64, n: usize) -> Result<usize> {
    if n == 0 {
        return Err(Error::InvalidInput(
            "cannot select from an empty candidate list".to_string(),
        ));
    }
    Ok((seed % n as u64) as usize)
}

/// Pick the entry of `items` for `date` in the given domain
pub fn select_from<T>(domain: SelectionDomain, date: NaiveDate, items: &[T]) -> Result<&T> {
    let seed = day_seed(date).decorrelate(domain);
    let index = select(seed, items.len())?;
    Ok(&items[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_select_in_range() {
        for seed in [0u64, 1, 7, 20240101, u64::MAX] {
            for n in 1..10 {
                assert!(select(seed, n).unwrap() < n);
            }
        }
    }

    #[test]
    fn test_select_empty_is_error() {
        assert!(matches!(select(42, 0), Err(Error::InvalidInput(_))));
        let empty: [u8; 0] = [];
        assert!(select_from(SelectionDomain::Voice, date(2024, 1, 1), &empty).is_err());
    }

    #[test]
    fn test_select_from_is_stable_for_a_day() {
        let voices = ["a", "b", "c", "d"];
        let d = date(2024, 5, 17);
        let first = select_from(SelectionDomain::Voice, d, &voices).unwrap();
        for _ in 0..100 {
            assert_eq!(select_from(SelectionDomain::Voice, d, &voices).unwrap(), first);
        }
    }

    #[test]
    fn test_voice_domain_is_plain_modulo() {
        let items: Vec<u32> = (0..5).collect();
        let d = date(2024, 5, 17);
        assert_eq!(
            *select_from(SelectionDomain::Voice, d, &items).unwrap() as u64,
            20240517 % 5
        );
    }

    #[test]
    fn test_domains_decorrelate() {
        // Same list length, same day: at least one day in a week should
        // differ between voice and ambience picks.
        let items: Vec<u32> = (0..4).collect();
        let mut differs = false;
        let mut d = date(2024, 5, 1);
        for _ in 0..7 {
            let v = select_from(SelectionDomain::Voice, d, &items).unwrap();
            let a = select_from(SelectionDomain::Ambience, d, &items).unwrap();
            differs |= v != a;
            d = d.succ_opt().unwrap();
        }
        assert!(differs);
    }
}
