//! Level space the allocator draws from

use seclabel_context::CATEGORY_LIMIT;
use seclabel_core::{LabelError, Result};

/// Sensitivities and categories available for allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McsRange {
    /// Lowest sensitivity handed out (`s0` by default)
    pub min_sensitivity: u32,
    /// Highest sensitivity handed out (`s0` by default)
    pub max_sensitivity: u32,
    /// Categories `c0` through `c{categories - 1}` are usable
    pub categories: u32,
    /// Categories in each allocated level
    pub categories_per_level: u32,
}

impl Default for McsRange {
    fn default() -> Self {
        Self {
            min_sensitivity: 0,
            max_sensitivity: 0,
            categories: CATEGORY_LIMIT,
            categories_per_level: 2,
        }
    }
}

impl McsRange {
    pub fn with_categories(categories: u32) -> Self {
        Self {
            categories,
            ..Default::default()
        }
    }

    pub fn with_sensitivities(min: u32, max: u32) -> Self {
        Self {
            min_sensitivity: min,
            max_sensitivity: max,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_sensitivity > self.max_sensitivity {
            return Err(LabelError::InvalidConfig(format!(
                "sensitivity range s{}-s{} is empty",
                self.min_sensitivity, self.max_sensitivity
            )));
        }
        if !(1..=CATEGORY_LIMIT).contains(&self.categories) {
            return Err(LabelError::InvalidConfig(format!(
                "category count must be between 1-{}",
                CATEGORY_LIMIT
            )));
        }
        if !(1..=self.categories).contains(&self.categories_per_level) {
            return Err(LabelError::InvalidConfig(format!(
                "categories per level must be between 1-{}",
                self.categories
            )));
        }
        Ok(())
    }
}
