//! seclabel-core: shared types, errors, and host detection for seclabel
//!
//! This crate provides the foundational types used by all seclabel sub-crates:
//! - Error types and Result alias
//! - SELinux enforce mode
//! - Runtime detection of SELinux support on the host (selinuxfs, proc attributes)

pub mod capabilities;
pub mod error;
pub mod mode;

pub use capabilities::HostCapabilities;
pub use error::{LabelError, Result};
pub use mode::EnforceMode;
