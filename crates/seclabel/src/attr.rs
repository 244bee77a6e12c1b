//! Host label attributes: procfs attribute files and the `security.selinux` xattr

use nix::unistd::gettid;
use seclabel_core::capabilities::trim_label;
use std::ffi::CString;
use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

pub(crate) const SELINUX_XATTR: &str = "security.selinux";

/// Per-thread attribute node, e.g. `/proc/self/task/<tid>/attr/exec`.
///
/// Labels are per thread, so the calling thread's node is used rather than
/// `/proc/self/attr`.
pub(crate) fn thread_attr(proc_root: &Path, attr: &str) -> PathBuf {
    proc_root
        .join("self/task")
        .join(gettid().as_raw().to_string())
        .join("attr")
        .join(attr)
}

pub(crate) fn read_attr(path: &Path) -> io::Result<String> {
    let raw = fs::read_to_string(path)?;
    Ok(trim_label(&raw).to_string())
}

/// Write a label to an attribute node. An empty label resets it to the default.
pub(crate) fn write_attr(path: &Path, label: &str) -> io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).open(path)?;
    if label.is_empty() {
        // the kernel only resets on an actual zero-length write(2)
        nix::unistd::write(&file, &[])?;
        return Ok(());
    }
    file.write_all(label.as_bytes())
}

/// Write `value` and read back the kernel's answer on the same descriptor
pub(crate) fn transact_attr(path: &Path, value: &str) -> io::Result<String> {
    let mut file = fs::OpenOptions::new().read(true).write(true).open(path)?;
    file.write_all(value.as_bytes())?;
    let mut answer = String::new();
    file.read_to_string(&mut answer)?;
    Ok(trim_label(&answer).to_string())
}

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn c_name(name: &str) -> io::Result<CString> {
    CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// Read an extended attribute without following symlinks
pub(crate) fn lgetxattr(path: &Path, name: &str) -> io::Result<Vec<u8>> {
    let c_path = c_path(path)?;
    let c_name = c_name(name)?;
    loop {
        let size = unsafe {
            libc::lgetxattr(c_path.as_ptr(), c_name.as_ptr(), std::ptr::null_mut(), 0)
        };
        if size < 0 {
            return Err(io::Error::last_os_error());
        }
        let mut buf = vec![0u8; size as usize];
        let read = unsafe {
            libc::lgetxattr(
                c_path.as_ptr(),
                c_name.as_ptr(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if read >= 0 {
            buf.truncate(read as usize);
            return Ok(buf);
        }
        let err = io::Error::last_os_error();
        // value grew between the two calls
        if err.raw_os_error() != Some(libc::ERANGE) {
            return Err(err);
        }
    }
}

/// Set an extended attribute without following symlinks
pub(crate) fn lsetxattr(path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
    let c_path = c_path(path)?;
    let c_name = c_name(name)?;
    let ret = unsafe {
        libc::lsetxattr(
            c_path.as_ptr(),
            c_name.as_ptr(),
            value.as_ptr() as *const libc::c_void,
            value.len(),
            0,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn thread_attr_uses_calling_thread() {
        let path = thread_attr(Path::new("/proc"), "exec");
        let expected = format!("/proc/self/task/{}/attr/exec", gettid());
        assert_eq!(path, PathBuf::from(expected));
    }

    #[test]
    fn read_attr_trims_kernel_terminator() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("current");
        fs::write(&path, "system_u:system_r:container_t:s0:c1,c2\0").unwrap();
        assert_eq!(
            read_attr(&path).unwrap(),
            "system_u:system_r:container_t:s0:c1,c2"
        );
    }

    #[test]
    fn write_attr_issues_write_for_empty_label() {
        let full = Path::new("/dev/full");
        assert_eq!(
            write_attr(full, "system_u:system_r:container_t:s0").unwrap_err().kind(),
            io::ErrorKind::StorageFull
        );
        assert_eq!(
            write_attr(full, "").unwrap_err().kind(),
            io::ErrorKind::StorageFull
        );
    }

    #[test]
    fn write_attr_requires_existing_node() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("exec");
        assert_eq!(
            write_attr(&missing, "label").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        fs::write(&missing, "").unwrap();
        write_attr(&missing, "system_u:system_r:container_t:s0").unwrap();
        assert_eq!(
            fs::read_to_string(&missing).unwrap(),
            "system_u:system_r:container_t:s0"
        );
    }

    #[test]
    fn lgetxattr_missing_path() {
        let tmp = tempdir().unwrap();
        let err = lgetxattr(&tmp.path().join("absent"), SELINUX_XATTR).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn lsetxattr_missing_path() {
        let tmp = tempdir().unwrap();
        let err = lsetxattr(&tmp.path().join("absent"), SELINUX_XATTR, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn interior_nul_rejected() {
        let err = lgetxattr(Path::new("/tmp/a\0b"), SELINUX_XATTR).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
