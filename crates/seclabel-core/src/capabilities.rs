//! Runtime detection of SELinux support
//!
//! Probes the running kernel for a mounted selinuxfs and labeled process
//! attributes, so callers can pick the real labeler or the no-op one once at
//! startup.

use std::fs;
use std::path::{Path, PathBuf};

/// Usual selinuxfs mount point
pub const DEFAULT_SELINUXFS: &str = "/sys/fs/selinux";
/// Usual procfs mount point
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Detected SELinux capabilities of the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Writable selinuxfs mount, if any
    pub selinuxfs: Option<PathBuf>,
    /// `/proc/self/attr/current` is readable
    pub has_proc_attr: bool,
    /// Label of the calling process, as reported by the kernel
    pub current_label: Option<String>,
    /// Running as root (euid == 0)
    pub has_root: bool,
}

impl HostCapabilities {
    /// Detect capabilities using the standard mount points
    pub fn detect() -> Self {
        Self::probe(Path::new(DEFAULT_PROC_ROOT), Path::new(DEFAULT_SELINUXFS))
    }

    /// Detect capabilities against an arbitrary proc root and selinuxfs fallback
    pub fn probe(proc_root: &Path, fallback_selinuxfs: &Path) -> Self {
        let selinuxfs = find_selinuxfs(proc_root, fallback_selinuxfs);
        let current_label = fs::read_to_string(proc_root.join("self/attr/current"))
            .ok()
            .map(|raw| trim_label(&raw).to_string());
        let caps = Self {
            selinuxfs,
            has_proc_attr: current_label.is_some(),
            current_label,
            has_root: detect_root(),
        };
        log::debug!("host capabilities: {:?}", caps);
        caps
    }

    /// Whether SELinux labeling is usable on this host.
    ///
    /// A process still carrying the `kernel` label means no policy is loaded.
    pub fn selinux_enabled(&self) -> bool {
        self.selinuxfs.is_some()
            && self.has_proc_attr
            && self.current_label.as_deref() != Some("kernel")
    }

    /// Get a human-readable summary of capabilities
    pub fn summary(&self) -> String {
        let check = |available: bool| if available { "[ok]" } else { "[--]" };

        let mut lines = vec![
            format!("{} Root privileges", check(self.has_root)),
            format!(
                "{} selinuxfs mounted{}",
                check(self.selinuxfs.is_some()),
                self.selinuxfs
                    .as_ref()
                    .map(|p| format!(" at {}", p.display()))
                    .unwrap_or_default()
            ),
            format!("{} Process label attributes", check(self.has_proc_attr)),
        ];
        if let Some(label) = &self.current_label {
            lines.push(format!("     Current label: {}", label));
        }
        lines.push(format!(
            "{} SELinux labeling enabled",
            check(self.selinux_enabled())
        ));

        lines.join("\n")
    }
}

/// Strip the trailing NUL and newline the kernel appends to label attributes
pub fn trim_label(raw: &str) -> &str {
    raw.trim_end_matches(['\0', '\n'])
}

/// Locate a read-write selinuxfs mount.
///
/// `<proc_root>/self/mountinfo` is authoritative; when it cannot be read the
/// fallback directory is accepted if it exposes an `enforce` node.
pub fn find_selinuxfs(proc_root: &Path, fallback: &Path) -> Option<PathBuf> {
    match fs::read_to_string(proc_root.join("self/mountinfo")) {
        Ok(content) => selinuxfs_from_mountinfo(&content),
        Err(_) => fallback.join("enforce").exists().then(|| fallback.to_path_buf()),
    }
}

/// Find the first read-write selinuxfs entry in mountinfo content
pub fn selinuxfs_from_mountinfo(content: &str) -> Option<PathBuf> {
    content.lines().find_map(|line| {
        let (mount, fs_part) = line.split_once(" - ")?;
        let fstype = fs_part.split_whitespace().next()?;
        if fstype != "selinuxfs" {
            return None;
        }
        let fields: Vec<&str> = mount.split_whitespace().collect();
        let mount_point = fields.get(4)?;
        let options = fields.get(5)?;
        if options.split(',').any(|opt| opt == "ro") {
            return None;
        }
        Some(PathBuf::from(mount_point))
    })
}

fn detect_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MOUNTINFO: &str = "\
22 1 253:0 / / rw,relatime shared:1 - xfs /dev/mapper/root rw
23 22 0:21 / /proc rw,nosuid,nodev,noexec,relatime shared:5 - proc proc rw
24 22 0:22 / /sys rw,nosuid,nodev,noexec,relatime shared:6 - sysfs sysfs rw
25 24 0:23 / /sys/fs/selinux rw,relatime shared:7 - selinuxfs selinuxfs rw
";

    fn fake_proc(mountinfo: Option<&str>, current: Option<&str>) -> tempfile::TempDir {
        let tmp = tempdir().unwrap();
        let self_dir = tmp.path().join("self/attr");
        fs::create_dir_all(&self_dir).unwrap();
        if let Some(content) = mountinfo {
            fs::write(tmp.path().join("self/mountinfo"), content).unwrap();
        }
        if let Some(label) = current {
            fs::write(self_dir.join("current"), label).unwrap();
        }
        tmp
    }

    #[test]
    fn mountinfo_finds_selinuxfs() {
        assert_eq!(
            selinuxfs_from_mountinfo(MOUNTINFO),
            Some(PathBuf::from("/sys/fs/selinux"))
        );
    }

    #[test]
    fn mountinfo_skips_read_only_selinuxfs() {
        let ro = "25 24 0:23 / /sys/fs/selinux ro,relatime - selinuxfs selinuxfs ro\n";
        assert_eq!(selinuxfs_from_mountinfo(ro), None);
    }

    #[test]
    fn mountinfo_without_selinuxfs() {
        let content = MOUNTINFO
            .lines()
            .filter(|l| !l.contains("selinuxfs"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(selinuxfs_from_mountinfo(&content), None);
    }

    #[test]
    fn fallback_used_when_mountinfo_missing() {
        let proc_root = fake_proc(None, None);
        let selinuxfs = tempdir().unwrap();
        assert_eq!(find_selinuxfs(proc_root.path(), selinuxfs.path()), None);

        fs::write(selinuxfs.path().join("enforce"), "1").unwrap();
        assert_eq!(
            find_selinuxfs(proc_root.path(), selinuxfs.path()),
            Some(selinuxfs.path().to_path_buf())
        );
    }

    #[test]
    fn probe_enabled_with_labeled_process() {
        let proc_root = fake_proc(
            Some(MOUNTINFO),
            Some("unconfined_u:unconfined_r:unconfined_t:s0\0"),
        );
        let caps = HostCapabilities::probe(proc_root.path(), Path::new("/nonexistent"));
        assert!(caps.selinux_enabled());
        assert_eq!(
            caps.current_label.as_deref(),
            Some("unconfined_u:unconfined_r:unconfined_t:s0")
        );
    }

    #[test]
    fn probe_disabled_for_kernel_label() {
        let proc_root = fake_proc(Some(MOUNTINFO), Some("kernel\0"));
        let caps = HostCapabilities::probe(proc_root.path(), Path::new("/nonexistent"));
        assert!(!caps.selinux_enabled());
    }

    #[test]
    fn probe_disabled_without_attr() {
        let proc_root = fake_proc(Some(MOUNTINFO), None);
        let caps = HostCapabilities::probe(proc_root.path(), Path::new("/nonexistent"));
        assert!(!caps.has_proc_attr);
        assert!(!caps.selinux_enabled());
    }

    #[test]
    fn summary_produces_output() {
        let caps = HostCapabilities::detect();
        let summary = caps.summary();
        assert!(summary.contains("Root privileges"));
        assert!(summary.contains("selinuxfs mounted"));
    }

    #[test]
    fn trim_label_strips_nul_and_newline() {
        assert_eq!(trim_label("system_u:system_r:init_t:s0\0"), "system_u:system_r:init_t:s0");
        assert_eq!(trim_label("kernel\n"), "kernel");
    }

    #[test]
    fn root_detection_matches_euid() {
        let caps = HostCapabilities::detect();
        assert_eq!(caps.has_root, unsafe { libc::geteuid() == 0 });
    }
}
