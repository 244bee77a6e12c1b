//! Labeling capability interface and host selection
//!
//! The host is probed once; SELinux hosts get a [`SelinuxLabeler`], every
//! other host gets the [`NoopLabeler`], which succeeds at everything and
//! returns empty values. Callers cannot tell "feature absent" from
//! "nothing to report" through this interface.

use crate::config::LabelConfig;
use crate::selinux::SelinuxLabeler;
use log::info;
use nix::unistd::Pid;
use seclabel_core::{EnforceMode, HostCapabilities, Result};
use seclabel_mcs::McsAllocator;
use std::path::Path;
use std::sync::Arc;

/// Process and file labeling operations for workload launchers
pub trait Labeler: Send + Sync {
    /// Whether labels are actually applied on this host
    fn is_enabled(&self) -> bool;

    /// Label of the calling thread
    fn current_label(&self) -> Result<String>;

    /// Label of process `pid`
    fn pid_label(&self, pid: Pid) -> Result<String>;

    /// Label the next `execve` of the calling thread will run under
    fn exec_label(&self) -> Result<String>;

    /// Set the label for the next `execve`; `""` restores the default
    fn set_exec_label(&self, label: &str) -> Result<()>;

    /// Label given to filesystem objects the calling thread creates
    fn fs_create_label(&self) -> Result<String>;

    /// Set the label for new filesystem objects; `""` restores the default
    fn set_fs_create_label(&self, label: &str) -> Result<()>;

    /// Label of `path` itself (symlinks are not followed)
    fn file_label(&self, path: &Path) -> Result<String>;

    /// Relabel `path` itself (symlinks are not followed)
    fn set_file_label(&self, path: &Path, label: &str) -> Result<()>;

    /// Ask the loaded policy whether `label` is a valid context
    fn security_check_context(&self, label: &str) -> Result<()>;

    /// Context the kernel would actually use for `label`
    fn canonicalize_context(&self, label: &str) -> Result<String>;

    fn enforce_mode(&self) -> EnforceMode;

    /// Switch between enforcing and permissive. Disabling needs a reboot.
    fn set_enforce_mode(&self, mode: EnforceMode) -> Result<()>;

    /// Mode the host boots into
    fn default_enforce_mode(&self) -> EnforceMode;

    /// Allocate a fresh level and return the `(process, file)` labels carrying it.
    ///
    /// Call once per workload and pass the process label to
    /// [`Labeler::release_label`] when the workload ends.
    fn container_labels(&self) -> Result<(String, String)>;

    /// Mark the level of `label` as in use
    fn reserve_label(&self, label: &str) -> Result<()>;

    /// Return the level of `label` to the pool
    fn release_label(&self, label: &str);

    /// `dest` with the level of `src`
    fn copy_level(&self, src: &str, dest: &str) -> Result<String>;

    /// Label for read-only container content
    fn ro_file_label(&self) -> String;
}

/// Labeler for hosts without SELinux. Every operation succeeds with an empty result.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLabeler;

impl Labeler for NoopLabeler {
    fn is_enabled(&self) -> bool {
        false
    }

    fn current_label(&self) -> Result<String> {
        Ok(String::new())
    }

    fn pid_label(&self, _pid: Pid) -> Result<String> {
        Ok(String::new())
    }

    fn exec_label(&self) -> Result<String> {
        Ok(String::new())
    }

    fn set_exec_label(&self, _label: &str) -> Result<()> {
        Ok(())
    }

    fn fs_create_label(&self) -> Result<String> {
        Ok(String::new())
    }

    fn set_fs_create_label(&self, _label: &str) -> Result<()> {
        Ok(())
    }

    fn file_label(&self, _path: &Path) -> Result<String> {
        Ok(String::new())
    }

    fn set_file_label(&self, _path: &Path, _label: &str) -> Result<()> {
        Ok(())
    }

    fn security_check_context(&self, _label: &str) -> Result<()> {
        Ok(())
    }

    fn canonicalize_context(&self, _label: &str) -> Result<String> {
        Ok(String::new())
    }

    fn enforce_mode(&self) -> EnforceMode {
        EnforceMode::Disabled
    }

    fn set_enforce_mode(&self, _mode: EnforceMode) -> Result<()> {
        Ok(())
    }

    fn default_enforce_mode(&self) -> EnforceMode {
        EnforceMode::Disabled
    }

    fn container_labels(&self) -> Result<(String, String)> {
        Ok((String::new(), String::new()))
    }

    fn reserve_label(&self, _label: &str) -> Result<()> {
        Ok(())
    }

    fn release_label(&self, _label: &str) {}

    fn copy_level(&self, _src: &str, _dest: &str) -> Result<String> {
        Ok(String::new())
    }

    fn ro_file_label(&self) -> String {
        String::new()
    }
}

/// Probe the host and build the matching labeler with a new allocator
pub fn detect(config: &LabelConfig) -> Result<Arc<dyn Labeler>> {
    config.validate()?;
    let allocator = Arc::new(McsAllocator::new(config.mcs.clone())?);
    Ok(detect_with(config, allocator))
}

/// Probe the host and build the matching labeler around a shared allocator
pub fn detect_with(config: &LabelConfig, allocator: Arc<McsAllocator>) -> Arc<dyn Labeler> {
    if config.disabled {
        info!("SELinux labeling disabled by configuration");
        return Arc::new(NoopLabeler);
    }
    let caps = HostCapabilities::probe(&config.proc_root, &config.selinuxfs);
    match caps.selinuxfs.as_ref().filter(|_| caps.selinux_enabled()) {
        Some(selinuxfs) => {
            info!("SELinux enabled, selinuxfs at {}", selinuxfs.display());
            Arc::new(SelinuxLabeler::new(config, selinuxfs.clone(), allocator))
        }
        None => {
            info!("SELinux not available, labeling disabled");
            Arc::new(NoopLabeler)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn noop_returns_empty_values() {
        let labeler = NoopLabeler;
        assert!(!labeler.is_enabled());
        assert_eq!(labeler.current_label().unwrap(), "");
        assert_eq!(labeler.pid_label(Pid::from_raw(1)).unwrap(), "");
        assert_eq!(labeler.file_label(Path::new("/nonexistent")).unwrap(), "");
        assert_eq!(
            labeler.container_labels().unwrap(),
            (String::new(), String::new())
        );
        assert_eq!(labeler.enforce_mode(), EnforceMode::Disabled);
        assert_eq!(labeler.default_enforce_mode(), EnforceMode::Disabled);
        assert_eq!(labeler.ro_file_label(), "");
    }

    #[test]
    fn noop_setters_succeed() {
        let labeler = NoopLabeler;
        assert!(labeler.set_exec_label("anything").is_ok());
        assert!(labeler.set_file_label(Path::new(""), "anylabel").is_ok());
        assert!(labeler.set_enforce_mode(EnforceMode::Disabled).is_ok());
        assert!(labeler.security_check_context("garbage").is_ok());
        assert!(labeler.reserve_label("u:r:t:s0:c1,c2").is_ok());
        assert!(labeler.reserve_label("u:r:t:s0:c1,c2").is_ok());
        labeler.release_label("u:r:t:s0:c1,c2");
    }

    #[test]
    fn detect_without_selinuxfs_is_noop() {
        let proc_root = tempdir().unwrap();
        let config = LabelConfig::default()
            .with_proc_root(proc_root.path())
            .with_selinuxfs(proc_root.path().join("no-selinuxfs"));
        let labeler = detect(&config).unwrap();
        assert!(!labeler.is_enabled());
    }

    #[test]
    fn detect_with_fake_selinux_host() {
        let proc_root = tempdir().unwrap();
        let selinuxfs = tempdir().unwrap();
        fs::create_dir_all(proc_root.path().join("self/attr")).unwrap();
        fs::write(
            proc_root.path().join("self/attr/current"),
            "unconfined_u:unconfined_r:unconfined_t:s0\0",
        )
        .unwrap();
        fs::write(selinuxfs.path().join("enforce"), "1").unwrap();

        let config = LabelConfig::default()
            .with_proc_root(proc_root.path())
            .with_selinuxfs(selinuxfs.path());
        let labeler = detect(&config).unwrap();
        assert!(labeler.is_enabled());
        assert_eq!(labeler.enforce_mode(), EnforceMode::Enforcing);
    }

    #[test]
    fn disabled_config_skips_selinux_host() {
        let proc_root = tempdir().unwrap();
        let selinuxfs = tempdir().unwrap();
        fs::create_dir_all(proc_root.path().join("self/attr")).unwrap();
        fs::write(
            proc_root.path().join("self/attr/current"),
            "unconfined_u:unconfined_r:unconfined_t:s0\0",
        )
        .unwrap();
        fs::write(selinuxfs.path().join("enforce"), "1").unwrap();

        let config = LabelConfig::default()
            .with_proc_root(proc_root.path())
            .with_selinuxfs(selinuxfs.path())
            .with_disabled();
        let labeler = detect(&config).unwrap();
        assert!(!labeler.is_enabled());
        assert_eq!(
            labeler.container_labels().unwrap(),
            (String::new(), String::new())
        );
    }

    #[test]
    fn detect_rejects_invalid_range() {
        let config = LabelConfig::default()
            .with_mcs_range(seclabel_mcs::McsRange::with_sensitivities(3, 1));
        assert!(detect(&config).is_err());
    }
}
