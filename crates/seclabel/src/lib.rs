//! seclabel: SELinux labeling for container launchers
//!
//! Mints unique process/file label pairs for isolated workloads, reads and
//! writes host labels, and translates labels into launcher security options.
//!
//! # Modes
//!
//! - **SELinux host**: [`SelinuxLabeler`] talks to selinuxfs, procfs attributes
//!   and file xattrs, and allocates MCS levels from a shared [`McsAllocator`].
//! - **Any other host**: [`NoopLabeler`] succeeds at everything with empty results.
//!
//! [`detect`] probes the host once and returns the right one.
//!
//! # Example
//!
//! ```ignore
//! use seclabel::{LabelConfig, detect};
//!
//! let labeler = detect(&LabelConfig::default())?;
//! let (process_label, file_label) = labeler.container_labels()?;
//! // ... run the workload under process_label, label its files with file_label ...
//! labeler.release_label(&process_label);
//! ```

mod attr;
pub mod config;
pub mod labeler;
pub mod secopt;
pub mod selinux;

pub use config::{ContainerContexts, LabelConfig, PolicyConfig};
pub use labeler::{Labeler, NoopLabeler, detect, detect_with};
pub use secopt::{SecOpt, disable_sec_opt, dup_sec_opt, init_labels};
pub use selinux::SelinuxLabeler;

// Re-export sub-crate types for convenience
pub use nix::unistd::Pid;
pub use seclabel_context::{CategorySet, Context, Level, LevelRange, copy_level};
pub use seclabel_core::{
    self as core, EnforceMode, HostCapabilities, LabelError, Result, capabilities,
};
pub use seclabel_mcs::{McsAllocator, McsRange};
