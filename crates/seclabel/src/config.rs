//! Host paths, allocator range and policy configuration files

use log::{debug, warn};
use seclabel_context::Context;
use seclabel_core::capabilities::{DEFAULT_PROC_ROOT, DEFAULT_SELINUXFS};
use seclabel_core::{EnforceMode, LabelError, Result};
use seclabel_mcs::{DEFAULT_PROCESS_TEMPLATE, McsRange};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Usual location of the SELinux configuration directory
pub const DEFAULT_CONFIG_DIR: &str = "/etc/selinux";
/// Policy name assumed when the config file does not set `SELINUXTYPE`
pub const DEFAULT_POLICY_TYPE: &str = "targeted";

pub const DEFAULT_FILE_LABEL: &str = "system_u:object_r:container_file_t:s0";
pub const DEFAULT_RO_FILE_LABEL: &str = "system_u:object_r:container_ro_file_t:s0";
pub const DEFAULT_CONTENT_LABEL: &str = "system_u:object_r:virt_var_lib_t:s0";

const ENV_SELINUXFS: &str = "SECLABEL_SELINUXFS";
const ENV_PROC_ROOT: &str = "SECLABEL_PROC_ROOT";
const ENV_CONFIG_DIR: &str = "SECLABEL_CONFIG_DIR";
const ENV_DISABLED: &str = "SECLABEL_DISABLED";

/// Where the labeler finds the host's SELinux interfaces
#[derive(Debug, Clone)]
pub struct LabelConfig {
    /// selinuxfs mount to use when `/proc/self/mountinfo` cannot be read
    pub selinuxfs: PathBuf,
    pub proc_root: PathBuf,
    pub config_dir: PathBuf,
    /// Level space for container allocations
    pub mcs: McsRange,
    /// Skip the host probe and never label, even on SELinux hosts
    pub disabled: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            selinuxfs: env_path(ENV_SELINUXFS, DEFAULT_SELINUXFS),
            proc_root: env_path(ENV_PROC_ROOT, DEFAULT_PROC_ROOT),
            config_dir: env_path(ENV_CONFIG_DIR, DEFAULT_CONFIG_DIR),
            mcs: McsRange::default(),
            disabled: std::env::var(ENV_DISABLED).is_ok_and(|value| env_flag(&value)),
        }
    }
}

fn env_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes")
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

impl LabelConfig {
    pub fn with_selinuxfs(mut self, path: impl Into<PathBuf>) -> Self {
        self.selinuxfs = path.into();
        self
    }

    pub fn with_proc_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.proc_root = path.into();
        self
    }

    pub fn with_config_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_dir = path.into();
        self
    }

    pub fn with_mcs_range(mut self, range: McsRange) -> Self {
        self.mcs = range;
        self
    }

    /// Turn labeling off for this process regardless of host support
    pub fn with_disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.mcs.validate()
    }

    /// Parsed `<config_dir>/config`; a missing file yields the defaults
    pub fn policy_config(&self) -> Result<PolicyConfig> {
        let path = self.config_dir.join("config");
        match fs::read_to_string(&path) {
            Ok(content) => Ok(PolicyConfig::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PolicyConfig::default()),
            Err(e) => Err(LabelError::attr(&path, e)),
        }
    }

    /// `<config_dir>/<policy>/contexts/lxc_contexts`
    pub fn lxc_contexts_path(&self, policy: &PolicyConfig) -> PathBuf {
        self.config_dir
            .join(&policy.policy_type)
            .join("contexts")
            .join("lxc_contexts")
    }

    /// Container contexts of the active policy, falling back to the built-in
    /// labels for any key the policy does not provide
    pub fn container_contexts(&self) -> Result<ContainerContexts> {
        let policy = self.policy_config()?;
        let path = self.lxc_contexts_path(&policy);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(ContainerContexts::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not found, using default container labels", path.display());
                Ok(ContainerContexts::default())
            }
            Err(e) => Err(LabelError::attr(&path, e)),
        }
    }
}

/// Settings from the host's `/etc/selinux/config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Mode the kernel boots into (`SELINUX=`)
    pub mode: EnforceMode,
    /// Policy name (`SELINUXTYPE=`)
    pub policy_type: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: EnforceMode::Disabled,
            policy_type: DEFAULT_POLICY_TYPE.to_string(),
        }
    }
}

impl PolicyConfig {
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for (key, value) in key_values(content) {
            match key {
                "SELINUX" => config.mode = EnforceMode::from_config_value(value),
                "SELINUXTYPE" if !value.is_empty() => config.policy_type = value.to_string(),
                _ => {}
            }
        }
        config
    }
}

/// Labels the policy assigns to container processes and their files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerContexts {
    pub process: Context,
    pub file: Context,
    pub ro_file: Context,
    /// Runtime-owned storage backing container content
    pub content: Context,
}

impl Default for ContainerContexts {
    fn default() -> Self {
        Self {
            process: Context::new(DEFAULT_PROCESS_TEMPLATE),
            file: Context::new(DEFAULT_FILE_LABEL),
            ro_file: Context::new(DEFAULT_RO_FILE_LABEL),
            content: Context::new(DEFAULT_CONTENT_LABEL),
        }
    }
}

impl ContainerContexts {
    /// Parse `lxc_contexts` (`key = "label"` lines)
    pub fn parse(content: &str) -> Self {
        let mut contexts = Self::default();
        for (key, value) in key_values(content) {
            if value.is_empty() {
                continue;
            }
            let slot = match key {
                "process" => &mut contexts.process,
                "file" => &mut contexts.file,
                "ro_file" => &mut contexts.ro_file,
                "content" => &mut contexts.content,
                _ => continue,
            };
            match Context::parse(value) {
                Ok(ctx) => *slot = ctx,
                Err(e) => warn!("Ignoring lxc_contexts entry {}: {}", key, e),
            }
        }
        contexts
    }
}

/// `key = value` pairs, skipping blanks and `#`/`;` comments and stripping quotes
fn key_values(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), value.trim().trim_matches('"')))
    })
}

/// Check that `path` is non-empty before it reaches the host
pub(crate) fn require_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(LabelError::EmptyPath);
    }
    Ok(())
}
