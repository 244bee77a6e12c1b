//! Reserved-level registry and allocator
//!
//! All registry state sits behind a single mutex. The lock is held only for
//! lookup and mutation; parsing happens before it is taken and logging after
//! it is released.

use crate::range::McsRange;
use log::{debug, warn};
use seclabel_context::{CategorySet, Context, Level, LevelRange};
use seclabel_core::{LabelError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Process label used for allocated contexts unless another template is set
pub const DEFAULT_PROCESS_TEMPLATE: &str = "system_u:system_r:container_t:s0";

#[derive(Debug, Default)]
struct Registry {
    held: HashSet<LevelRange>,
    /// Live reservations per category, keyed by the low sensitivity
    usage: HashMap<u32, Vec<u32>>,
}

impl Registry {
    fn insert(&mut self, level: LevelRange) -> bool {
        let categories = level.categories();
        let sensitivity = level.low().sensitivity();
        if !self.held.insert(level) {
            return false;
        }
        let counts = self.usage.entry(sensitivity).or_default();
        for category in categories.iter() {
            let index = category as usize;
            if counts.len() <= index {
                counts.resize(index + 1, 0);
            }
            counts[index] += 1;
        }
        true
    }

    fn remove(&mut self, level: &LevelRange) -> bool {
        if !self.held.remove(level) {
            return false;
        }
        let sensitivity = level.low().sensitivity();
        if let Some(counts) = self.usage.get_mut(&sensitivity) {
            for category in level.categories().iter() {
                if let Some(count) = counts.get_mut(category as usize) {
                    *count = count.saturating_sub(1);
                }
            }
            if counts.iter().all(|&c| c == 0) {
                self.usage.remove(&sensitivity);
            }
        }
        true
    }

    fn in_use(&self, sensitivity: u32, category: u32) -> bool {
        self.usage
            .get(&sensitivity)
            .and_then(|counts| counts.get(category as usize))
            .is_some_and(|&count| count > 0)
    }

    /// Lowest free level, scanning sensitivities upward.
    ///
    /// Within a sensitivity, a set made only of categories no live
    /// reservation touches is preferred; otherwise the lowest set that is
    /// not held exactly.
    fn find_free(&self, range: &McsRange) -> Option<Level> {
        let per_level = range.categories_per_level as usize;
        for sensitivity in range.min_sensitivity..=range.max_sensitivity {
            let unused: Vec<u32> = (0..range.categories)
                .filter(|&c| !self.in_use(sensitivity, c))
                .take(per_level)
                .collect();
            if unused.len() == per_level {
                let level = level_of(sensitivity, unused)?;
                if !self.held.contains(&LevelRange::from(level.clone())) {
                    return Some(level);
                }
            }

            for members in Combinations::new(range.categories, range.categories_per_level) {
                let level = level_of(sensitivity, members)?;
                if !self.held.contains(&LevelRange::from(level.clone())) {
                    return Some(level);
                }
            }
        }
        None
    }
}

fn level_of(sensitivity: u32, members: Vec<u32>) -> Option<Level> {
    CategorySet::from_categories(members)
        .ok()
        .map(|set| Level::new(sensitivity, set))
}

/// k-element subsets of `0..n` in lexicographic order
struct Combinations {
    n: u32,
    indices: Vec<u32>,
    done: bool,
}

impl Combinations {
    fn new(n: u32, k: u32) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();
        let k = self.indices.len() as u32;
        // rightmost index that can still move up
        match (0..self.indices.len())
            .rev()
            .find(|&i| self.indices[i] < self.n - k + i as u32)
        {
            Some(i) => {
                self.indices[i] += 1;
                for j in i + 1..self.indices.len() {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
            }
            None => self.done = true,
        }
        Some(current)
    }
}

/// Process-wide registry of MCS levels in use.
///
/// Share one instance by `Arc` between every component that creates or
/// destroys labeled workloads.
#[derive(Debug)]
pub struct McsAllocator {
    range: McsRange,
    template: Context,
    registry: Mutex<Registry>,
}

impl Default for McsAllocator {
    fn default() -> Self {
        Self {
            range: McsRange::default(),
            template: Context::new(DEFAULT_PROCESS_TEMPLATE),
            registry: Mutex::new(Registry::default()),
        }
    }
}

impl McsAllocator {
    pub fn new(range: McsRange) -> Result<Self> {
        range.validate()?;
        Ok(Self {
            range,
            ..Default::default()
        })
    }

    /// Use `template` as the base context for [`McsAllocator::allocate`]
    pub fn with_template(mut self, template: Context) -> Self {
        self.template = template;
        self
    }

    pub fn range(&self) -> &McsRange {
        &self.range
    }

    /// Reserve the level of `label`.
    ///
    /// A label without a level field has nothing to reserve and succeeds.
    pub fn reserve(&self, label: &str) -> Result<()> {
        match Context::new(label).level_range()? {
            Some(level) => self.reserve_level(&level),
            None => {
                debug!("label '{}' has no level, nothing to reserve", label);
                Ok(())
            }
        }
    }

    /// Reserve an already parsed level.
    ///
    /// Fails with [`LabelError::McsAlreadyExists`] if it is held.
    pub fn reserve_level(&self, level: &LevelRange) -> Result<()> {
        let inserted = self.lock().insert(level.clone());
        if !inserted {
            warn!("MCS level {} is already reserved", level);
            return Err(LabelError::McsAlreadyExists(level.to_string()));
        }
        debug!("reserved MCS level {}", level);
        Ok(())
    }

    /// Return the level of `label` to the pool.
    ///
    /// Unheld or malformed levels are ignored so cleanup after a crash can
    /// release blindly.
    pub fn release(&self, label: &str) {
        match Context::new(label).level_range() {
            Ok(Some(level)) => {
                self.release_level(&level);
            }
            Ok(None) => {}
            Err(e) => debug!("not releasing '{}': {}", label, e),
        }
    }

    /// Release a parsed level, reporting whether it was held
    pub fn release_level(&self, level: &LevelRange) -> bool {
        let removed = self.lock().remove(level);
        if removed {
            debug!("released MCS level {}", level);
        }
        removed
    }

    /// Reserve and return the lowest free level
    pub fn allocate_level(&self) -> Result<Level> {
        let level = {
            let mut registry = self.lock();
            let level = registry
                .find_free(&self.range)
                .ok_or(LabelError::LevelsExhausted)?;
            registry.insert(LevelRange::from(level.clone()));
            level
        };
        debug!("allocated MCS level {}", level);
        Ok(level)
    }

    /// Reserve a level and stamp it onto the process template
    pub fn allocate(&self) -> Result<Context> {
        let level = self.allocate_level()?;
        Ok(self.template.with_level(&LevelRange::from(level)))
    }

    pub fn is_reserved(&self, label: &str) -> bool {
        match Context::new(label).level_range() {
            Ok(Some(level)) => self.lock().held.contains(&level),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of the held levels
    pub fn reserved(&self) -> Vec<LevelRange> {
        let mut levels: Vec<LevelRange> = self.lock().held.iter().cloned().collect();
        levels.sort();
        levels
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(s: &str) -> String {
        format!("system_u:system_r:container_t:{}", s)
    }

    #[test]
    fn combinations_are_lexicographic() {
        let all: Vec<Vec<u32>> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(2, 3).count(), 0);
        assert_eq!(Combinations::new(3, 3).count(), 1);
    }

    #[test]
    fn first_allocations_are_disjoint_pairs() {
        let alloc = McsAllocator::default();
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s0:c0,c1");
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s0:c2,c3");
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s0:c4,c5");
    }

    #[test]
    fn release_then_reuse() {
        let alloc = McsAllocator::default();
        let first = alloc.allocate().unwrap();
        let second = alloc.allocate().unwrap();
        assert_eq!(first.get(), "system_u:system_r:container_t:s0:c0,c1");
        assert_eq!(second.level(), Some("s0:c2,c3"));

        alloc.release(&first.get());
        let third = alloc.allocate().unwrap();
        assert_eq!(third, first);
    }

    #[test]
    fn reserve_twice_fails() {
        let alloc = McsAllocator::default();
        alloc.reserve(&level("s0:c1,c2")).unwrap();
        assert!(matches!(
            alloc.reserve(&level("s0:c1,c2")),
            Err(LabelError::McsAlreadyExists(_))
        ));
    }

    #[test]
    fn textual_forms_collide() {
        let alloc = McsAllocator::default();
        alloc.reserve(&level("s0:c0,c1,c2")).unwrap();
        assert!(alloc.is_reserved(&level("s0:c0.c2")));
        assert!(matches!(
            alloc.reserve(&level("s0:c0.c2")),
            Err(LabelError::McsAlreadyExists(_))
        ));
    }

    #[test]
    fn degenerate_range_collides_with_plain_level() {
        let alloc = McsAllocator::default();
        let allocated = alloc.allocate().unwrap();
        assert_eq!(allocated.level(), Some("s0:c0,c1"));
        assert!(matches!(
            alloc.reserve("system_u:system_r:container_t:s0:c0,c1-s0:c0,c1"),
            Err(LabelError::McsAlreadyExists(_))
        ));
        assert_eq!(alloc.len(), 1);

        alloc.release("system_u:system_r:container_t:s0:c0,c1-s0:c0,c1");
        assert!(alloc.is_empty());
    }

    #[test]
    fn release_of_unheld_level_is_noop() {
        let alloc = McsAllocator::default();
        alloc.release(&level("s0:c9,c10"));
        alloc.release("not a label");
        alloc.release(&level("s0:bogus"));
        assert!(alloc.is_empty());

        let a = alloc.allocate_level().unwrap();
        let b = alloc.allocate_level().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn reserve_without_level_is_noop() {
        let alloc = McsAllocator::default();
        alloc.reserve("system_u:system_r:container_t").unwrap();
        assert!(alloc.is_empty());
    }

    #[test]
    fn reserve_malformed_level_fails() {
        let alloc = McsAllocator::default();
        assert!(matches!(
            alloc.reserve(&level("s0:c5.c1")),
            Err(LabelError::Parse(_))
        ));
    }

    #[test]
    fn allocation_skips_externally_reserved_levels() {
        let alloc = McsAllocator::default();
        alloc.reserve(&level("s0:c0,c1")).unwrap();
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s0:c2,c3");
    }

    #[test]
    fn falls_back_to_overlapping_sets_when_categories_run_out() {
        let alloc = McsAllocator::new(McsRange::with_categories(4)).unwrap();
        let mut seen = HashSet::new();
        for _ in 0..6 {
            assert!(seen.insert(alloc.allocate_level().unwrap()));
        }
        let rendered: Vec<String> = alloc.reserved().iter().map(|l| l.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["s0:c0,c1", "s0:c0,c2", "s0:c0,c3", "s0:c1,c2", "s0:c1,c3", "s0:c2,c3"]
        );
        assert!(matches!(
            alloc.allocate_level(),
            Err(LabelError::LevelsExhausted)
        ));
    }

    #[test]
    fn moves_to_next_sensitivity_when_full() {
        let range = McsRange {
            max_sensitivity: 1,
            categories: 2,
            ..Default::default()
        };
        let alloc = McsAllocator::new(range).unwrap();
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s0:c0,c1");
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s1:c0,c1");
        assert!(alloc.allocate_level().is_err());
    }

    #[test]
    fn range_reservation_marks_categories_in_use() {
        let alloc = McsAllocator::default();
        alloc.reserve(&level("s0-s0:c0.c3")).unwrap();
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s0:c4,c5");
        alloc.release(&level("s0-s0:c0.c3"));
        assert_eq!(alloc.allocate_level().unwrap().to_string(), "s0:c0,c1");
    }

    #[test]
    fn custom_template() {
        let alloc = McsAllocator::default()
            .with_template(Context::new("system_u:system_r:spc_t:s0"));
        assert_eq!(
            alloc.allocate().unwrap().get(),
            "system_u:system_r:spc_t:s0:c0,c1"
        );
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let alloc = std::sync::Arc::new(McsAllocator::default());
        let clone = alloc.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock();
            panic!("poison the registry");
        })
        .join();
        assert!(alloc.allocate_level().is_ok());
    }
}
