//! MCS/MLS levels: sensitivities and category sets
//!
//! A level is `sN[:categories]`, where categories are a comma-separated list
//! of `cN` singletons and `cA.cB` inclusive ranges. Category sets are stored
//! as bitmaps, so `c0,c1,c2` and `c0.c2` are the same value and hash alike.
//!
//! Rendering is canonical: runs of three or more contiguous categories
//! collapse to `cA.cB`, a run of two renders as `cA,cB`, and a singleton is
//! always `cN`.

use seclabel_core::{LabelError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Number of categories a set can hold (`c0` through `c1023`)
pub const CATEGORY_LIMIT: u32 = 1024;

const WORD_BITS: u32 = u64::BITS;

/// Set of MCS categories backed by a bitmap.
///
/// Trailing zero words are never stored, which keeps the derived equality
/// and hashing independent of how the set was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CategorySet {
    words: Vec<u64>,
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from category numbers
    pub fn from_categories<I: IntoIterator<Item = u32>>(categories: I) -> Result<Self> {
        let mut set = Self::new();
        for category in categories {
            set.insert(category)?;
        }
        Ok(set)
    }

    /// Add a category, failing if it is outside `0..CATEGORY_LIMIT`
    pub fn insert(&mut self, category: u32) -> Result<()> {
        if category >= CATEGORY_LIMIT {
            return Err(LabelError::Parse(format!(
                "category c{} exceeds c{}",
                category,
                CATEGORY_LIMIT - 1
            )));
        }
        let word = (category / WORD_BITS) as usize;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (category % WORD_BITS);
        Ok(())
    }

    pub fn remove(&mut self, category: u32) {
        let word = (category / WORD_BITS) as usize;
        if let Some(bits) = self.words.get_mut(word) {
            *bits &= !(1u64 << (category % WORD_BITS));
        }
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    pub fn contains(&self, category: u32) -> bool {
        let word = (category / WORD_BITS) as usize;
        self.words
            .get(word)
            .is_some_and(|&bits| bits & (1u64 << (category % WORD_BITS)) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Categories in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let base = index as u32 * WORD_BITS;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let offset = bits.trailing_zeros();
                bits &= bits - 1;
                Some(base + offset)
            })
        })
    }

    pub fn is_subset(&self, other: &CategorySet) -> bool {
        self.words.iter().enumerate().all(|(index, &word)| {
            let theirs = other.words.get(index).copied().unwrap_or(0);
            word & !theirs == 0
        })
    }

    pub fn is_disjoint(&self, other: &CategorySet) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(mine, theirs)| mine & theirs == 0)
    }

    pub fn overlaps(&self, other: &CategorySet) -> bool {
        !self.is_disjoint(other)
    }

    /// Contiguous runs as inclusive `(first, last)` pairs
    fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for category in self.iter() {
            match runs.last_mut() {
                Some((_, last)) if *last + 1 == category => *last = category,
                _ => runs.push((category, category)),
            }
        }
        runs
    }
}

impl Ord for CategorySet {
    /// Lexicographic order over the sorted members
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl PartialOrd for CategorySet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .runs()
            .into_iter()
            .map(|(start, end)| match end - start {
                0 => format!("c{}", start),
                1 => format!("c{},c{}", start, end),
                _ => format!("c{}.c{}", start, end),
            })
            .collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for CategorySet {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self> {
        let mut set = CategorySet::new();
        for entry in s.split(',') {
            match entry.split_once('.') {
                Some((low, high)) => {
                    let low = parse_category(low)?;
                    let high = parse_category(high)?;
                    if low > high {
                        return Err(LabelError::Parse(format!(
                            "reversed category range {}",
                            entry
                        )));
                    }
                    for category in low..=high {
                        set.insert(category)?;
                    }
                }
                None => set.insert(parse_category(entry)?)?,
            }
        }
        Ok(set)
    }
}

fn parse_category(s: &str) -> Result<u32> {
    parse_prefixed(s, 'c', "category")
}

fn parse_prefixed(s: &str, prefix: char, what: &str) -> Result<u32> {
    let digits = s
        .strip_prefix(prefix)
        .ok_or_else(|| LabelError::Parse(format!("invalid {} '{}'", what, s)))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LabelError::Parse(format!("invalid {} '{}'", what, s)));
    }
    digits
        .parse()
        .map_err(|_| LabelError::Parse(format!("invalid {} '{}'", what, s)))
}

/// A single security level: sensitivity plus categories
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Level {
    sensitivity: u32,
    categories: CategorySet,
}

impl Level {
    pub fn new(sensitivity: u32, categories: CategorySet) -> Self {
        Self {
            sensitivity,
            categories,
        }
    }

    pub fn sensitivity(&self) -> u32 {
        self.sensitivity
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    /// `self` dominates `other` when its sensitivity is at least as high and
    /// its categories are a superset
    pub fn dominates(&self, other: &Level) -> bool {
        self.sensitivity >= other.sensitivity && other.categories.is_subset(&self.categories)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.sensitivity)?;
        if !self.categories.is_empty() {
            write!(f, ":{}", self.categories)?;
        }
        Ok(())
    }
}

impl FromStr for Level {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self> {
        let (sensitivity, categories) = match s.split_once(':') {
            Some((sens, cats)) => (sens, Some(cats)),
            None => (s, None),
        };
        let sensitivity = parse_prefixed(sensitivity, 's', "sensitivity")?;
        let categories = match categories {
            Some(cats) => cats.parse()?,
            None => CategorySet::new(),
        };
        Ok(Self {
            sensitivity,
            categories,
        })
    }
}

/// `low[-high]` MLS range. A plain level has no high part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelRange {
    low: Level,
    high: Option<Level>,
}

impl LevelRange {
    /// A range whose high end equals its low end collapses to the plain level,
    /// so both spellings of one level compare and hash equal.
    pub fn new(low: Level, high: Option<Level>) -> Result<Self> {
        if let Some(high) = &high
            && !high.dominates(&low)
        {
            return Err(LabelError::Parse(format!(
                "range high {} does not dominate low {}",
                high, low
            )));
        }
        let high = high.filter(|high| *high != low);
        Ok(Self { low, high })
    }

    pub fn low(&self) -> &Level {
        &self.low
    }

    pub fn high(&self) -> Option<&Level> {
        self.high.as_ref()
    }

    /// Every category named by either end of the range
    pub fn categories(&self) -> CategorySet {
        let mut set = self.low.categories.clone();
        if let Some(high) = &self.high {
            for category in high.categories.iter() {
                // both ends were range-checked on construction
                let _ = set.insert(category);
            }
        }
        set
    }
}

impl From<Level> for LevelRange {
    fn from(level: Level) -> Self {
        Self {
            low: level,
            high: None,
        }
    }
}

impl fmt::Display for LevelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.low)?;
        if let Some(high) = &self.high {
            write!(f, "-{}", high)?;
        }
        Ok(())
    }
}

impl FromStr for LevelRange {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(LabelError::Parse("empty level".to_string()));
        }
        match s.split_once('-') {
            Some((low, high)) => LevelRange::new(low.parse()?, Some(high.parse()?)),
            None => Ok(LevelRange::from(s.parse::<Level>()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(s: &str) -> CategorySet {
        s.parse().unwrap()
    }

    #[test]
    fn list_and_range_forms_are_equal() {
        assert_eq!(cats("c0,c1,c2"), cats("c0.c2"));
        assert_eq!(cats("c2,c0,c1"), cats("c0.c2"));
        assert_eq!(cats("c5.c5"), cats("c5"));
    }

    #[test]
    fn rendering_compresses_runs() {
        assert_eq!(cats("c0,c1,c2,c3").to_string(), "c0.c3");
        assert_eq!(cats("c1,c2").to_string(), "c1,c2");
        assert_eq!(cats("c7").to_string(), "c7");
        assert_eq!(cats("c0.c2,c4,c6,c7,c9.c12").to_string(), "c0.c2,c4,c6,c7,c9.c12");
        assert_eq!(cats("c0.c1023").to_string(), "c0.c1023");
    }

    #[test]
    fn runs_across_word_boundary() {
        assert_eq!(cats("c62,c63,c64,c65").to_string(), "c62.c65");
        assert_eq!(cats("c63.c64").len(), 2);
    }

    #[test]
    fn rejects_malformed_categories() {
        for bad in ["", "c", "1", "cx", "c1,", "c3.c1", "c1024", "c1.c2.c3", "c-1", "c+1"] {
            assert!(bad.parse::<CategorySet>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn remove_keeps_equality_canonical() {
        let mut set = cats("c1,c200");
        set.remove(200);
        assert_eq!(set, cats("c1"));
        set.remove(1);
        assert_eq!(set, CategorySet::new());
        assert!(set.is_empty());
    }

    #[test]
    fn ordering_is_lexicographic_on_members() {
        assert!(cats("c0,c1") < cats("c0,c2"));
        assert!(cats("c0,c5") < cats("c1,c2"));
        assert!(cats("c0") < cats("c0,c1"));
    }

    #[test]
    fn subset_and_disjoint() {
        assert!(cats("c1,c2").is_subset(&cats("c0.c5")));
        assert!(!cats("c1,c70").is_subset(&cats("c0.c5")));
        assert!(cats("c0,c1").is_disjoint(&cats("c2,c3")));
        assert!(!cats("c0,c1").is_disjoint(&cats("c1.c3")));
        assert!(cats("c0,c1").overlaps(&cats("c1.c3")));
    }

    #[test]
    fn level_parse_and_render() {
        let level: Level = "s0:c1,c2".parse().unwrap();
        assert_eq!(level.sensitivity(), 0);
        assert_eq!(level.categories().iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(level.to_string(), "s0:c1,c2");
        assert_eq!("s3".parse::<Level>().unwrap().to_string(), "s3");
        assert!("s0:".parse::<Level>().is_err());
        assert!("x0".parse::<Level>().is_err());
    }

    #[test]
    fn level_range_parse() {
        let range: LevelRange = "s0-s0:c0.c1023".parse().unwrap();
        assert_eq!(range.low().to_string(), "s0");
        assert_eq!(range.high().unwrap().categories().len(), 1024);
        assert_eq!(range.to_string(), "s0-s0:c0.c1023");
        assert_eq!(range.categories().len(), 1024);
    }

    #[test]
    fn level_range_requires_dominance() {
        assert!("s1-s0".parse::<LevelRange>().is_err());
        assert!("s0:c1,c2-s0:c1".parse::<LevelRange>().is_err());
        assert!("".parse::<LevelRange>().is_err());
    }

    #[test]
    fn degenerate_range_is_plain_level() {
        let range: LevelRange = "s0:c0,c1-s0:c1,c0".parse().unwrap();
        assert_eq!(range.high(), None);
        assert_eq!(range, "s0:c0,c1".parse::<LevelRange>().unwrap());
        assert_eq!(range.to_string(), "s0:c0,c1");
    }
}
