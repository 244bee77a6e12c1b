//! Labeler for SELinux hosts

use crate::attr::{
    SELINUX_XATTR, lgetxattr, lsetxattr, read_attr, thread_attr, transact_attr, write_attr,
};
use crate::config::{ContainerContexts, LabelConfig, require_path};
use crate::labeler::Labeler;
use log::{debug, info, warn};
use nix::unistd::Pid;
use seclabel_context::{Context, LevelRange};
use seclabel_core::capabilities::trim_label;
use seclabel_core::{EnforceMode, LabelError, Result};
use seclabel_mcs::McsAllocator;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Applies labels through selinuxfs, procfs attributes and file xattrs
pub struct SelinuxLabeler {
    selinuxfs: PathBuf,
    proc_root: PathBuf,
    config: LabelConfig,
    contexts: ContainerContexts,
    allocator: Arc<McsAllocator>,
}

impl SelinuxLabeler {
    /// Build a labeler for the selinuxfs mounted at `selinuxfs`.
    ///
    /// Container contexts are read from the policy once; an unreadable policy
    /// file falls back to the built-in labels.
    pub fn new(config: &LabelConfig, selinuxfs: PathBuf, allocator: Arc<McsAllocator>) -> Self {
        let contexts = config.container_contexts().unwrap_or_else(|e| {
            warn!("Failed to read container contexts, using defaults: {}", e);
            ContainerContexts::default()
        });
        Self::with_contexts(config, selinuxfs, allocator, contexts)
    }

    pub fn with_contexts(
        config: &LabelConfig,
        selinuxfs: PathBuf,
        allocator: Arc<McsAllocator>,
        contexts: ContainerContexts,
    ) -> Self {
        Self {
            selinuxfs,
            proc_root: config.proc_root.clone(),
            config: config.clone(),
            contexts,
            allocator,
        }
    }

    pub fn allocator(&self) -> &Arc<McsAllocator> {
        &self.allocator
    }

    pub fn container_contexts(&self) -> &ContainerContexts {
        &self.contexts
    }

    fn read(&self, path: &Path) -> Result<String> {
        read_attr(path).map_err(|e| LabelError::attr(path, e))
    }

    fn write(&self, path: &Path, label: &str) -> Result<()> {
        write_attr(path, label).map_err(|e| LabelError::attr(path, e))
    }
}

impl Labeler for SelinuxLabeler {
    fn is_enabled(&self) -> bool {
        true
    }

    fn current_label(&self) -> Result<String> {
        self.read(&thread_attr(&self.proc_root, "current"))
    }

    fn pid_label(&self, pid: Pid) -> Result<String> {
        let path = self
            .proc_root
            .join(pid.as_raw().to_string())
            .join("attr/current");
        self.read(&path)
    }

    fn exec_label(&self) -> Result<String> {
        self.read(&thread_attr(&self.proc_root, "exec"))
    }

    fn set_exec_label(&self, label: &str) -> Result<()> {
        debug!("Setting exec label to '{}'", label);
        self.write(&thread_attr(&self.proc_root, "exec"), label)
    }

    fn fs_create_label(&self) -> Result<String> {
        self.read(&thread_attr(&self.proc_root, "fscreate"))
    }

    fn set_fs_create_label(&self, label: &str) -> Result<()> {
        debug!("Setting fscreate label to '{}'", label);
        self.write(&thread_attr(&self.proc_root, "fscreate"), label)
    }

    fn file_label(&self, path: &Path) -> Result<String> {
        require_path(path)?;
        let raw = lgetxattr(path, SELINUX_XATTR).map_err(|e| LabelError::attr(path, e))?;
        Ok(trim_label(&String::from_utf8_lossy(&raw)).to_string())
    }

    fn set_file_label(&self, path: &Path, label: &str) -> Result<()> {
        require_path(path)?;
        debug!("Labeling {} as '{}'", path.display(), label);
        lsetxattr(path, SELINUX_XATTR, label.as_bytes()).map_err(|e| LabelError::attr(path, e))
    }

    fn security_check_context(&self, label: &str) -> Result<()> {
        let path = self.selinuxfs.join("context");
        write_attr(&path, label).map_err(|e| {
            if e.raw_os_error() == Some(libc::EINVAL) {
                LabelError::InvalidContext(label.to_string())
            } else {
                LabelError::attr(&path, e)
            }
        })
    }

    fn canonicalize_context(&self, label: &str) -> Result<String> {
        let path = self.selinuxfs.join("context");
        transact_attr(&path, label).map_err(|e| {
            if e.raw_os_error() == Some(libc::EINVAL) {
                LabelError::InvalidContext(label.to_string())
            } else {
                LabelError::attr(&path, e)
            }
        })
    }

    fn enforce_mode(&self) -> EnforceMode {
        self.read(&self.selinuxfs.join("enforce"))
            .ok()
            .and_then(|value| value.trim().parse::<i32>().ok())
            .and_then(|value| EnforceMode::try_from(value).ok())
            .unwrap_or(EnforceMode::Disabled)
    }

    fn set_enforce_mode(&self, mode: EnforceMode) -> Result<()> {
        if mode == EnforceMode::Disabled {
            return Err(LabelError::InvalidMode(
                "disabling SELinux requires a boot-time configuration change".to_string(),
            ));
        }
        info!("Setting SELinux enforce mode to {}", mode);
        self.write(&self.selinuxfs.join("enforce"), &mode.as_i32().to_string())
    }

    fn default_enforce_mode(&self) -> EnforceMode {
        match self.config.policy_config() {
            Ok(policy) => policy.mode,
            Err(e) => {
                warn!("Failed to read SELinux config: {}", e);
                EnforceMode::Disabled
            }
        }
    }

    fn container_labels(&self) -> Result<(String, String)> {
        let level = LevelRange::from(self.allocator.allocate_level()?);
        let stamped = [&self.contexts.process, &self.contexts.file]
            .map(|ctx| ctx.with_level(&level).get());
        // a label that lost its level could never be released
        if let Some(bad) = stamped.iter().find(|label| Context::parse(label.as_str()).is_err()) {
            self.allocator.release_level(&level);
            return Err(LabelError::InvalidConfig(format!(
                "container context '{}' cannot carry level {}",
                bad, level
            )));
        }
        let [process, file] = stamped;
        info!("Allocated container labels {} / {}", process, file);
        Ok((process, file))
    }

    fn reserve_label(&self, label: &str) -> Result<()> {
        self.allocator.reserve(label)
    }

    fn release_label(&self, label: &str) {
        self.allocator.release(label)
    }

    fn copy_level(&self, src: &str, dest: &str) -> Result<String> {
        // structural check first so garbage never reaches the kernel
        Context::parse(src)?;
        Context::parse(dest)?;
        self.security_check_context(src)?;
        self.security_check_context(dest)?;
        seclabel_context::copy_level(src, dest)
    }

    fn ro_file_label(&self) -> String {
        self.contexts.ro_file.get()
    }
}
