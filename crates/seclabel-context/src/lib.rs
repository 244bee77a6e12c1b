//! seclabel-context: security context and MCS level model
//!
//! Pure data transforms with no host access:
//! - [`Context`]: the four-field `user:role:type:level` label
//! - [`Level`], [`LevelRange`] and [`CategorySet`]: the structured level component

pub mod context;
pub mod level;

pub use context::{Context, copy_level};
pub use level::{CATEGORY_LIMIT, CategorySet, Level, LevelRange};
