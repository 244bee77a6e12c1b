use console::style;
use log::info;
use seclabel::{EnforceMode, HostCapabilities, Labeler, Pid};
use serde::Serialize;
use std::error::Error;
use std::path::Path;

type CmdResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Serialize)]
pub struct LabelPair {
    pub process: String,
    pub file: String,
}

pub fn check_requirements(caps: &HostCapabilities, labeler: &dyn Labeler) {
    info!("Checking SELinux support");
    println!("Checking SELinux support...\n");
    println!("{}", caps.summary());
    println!("\nEnforce mode:");
    println!("  Current: {}", labeler.enforce_mode());
    println!("  Boot:    {}", labeler.default_enforce_mode());
    if labeler.is_enabled() {
        println!("  RO file label: {}", labeler.ro_file_label());
    }
}

/// Allocate `count` label pairs. They are held until this process exits.
pub fn allocate_labels(
    labeler: &dyn Labeler,
    count: usize,
) -> Result<Vec<LabelPair>, Box<dyn Error>> {
    info!("Allocating {} label pair(s)", count);
    (0..count)
        .map(|_| -> Result<LabelPair, Box<dyn Error>> {
            let (process, file) = labeler.container_labels()?;
            Ok(LabelPair { process, file })
        })
        .collect()
}

pub fn print_labels(pairs: &[LabelPair], json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(pairs)?);
        return Ok(());
    }
    if pairs.iter().all(|p| p.process.is_empty()) {
        println!("{}", style("SELinux disabled, no labels allocated").dim());
        return Ok(());
    }
    for pair in pairs {
        println!(
            "{}={} | {}={}",
            style("process").dim(),
            style(&pair.process).bold(),
            style("file").dim(),
            style(&pair.file).bold()
        );
    }
    Ok(())
}

pub fn print_options(options: &[String]) {
    for opt in options {
        println!("{}", opt);
    }
}

pub fn copy_level(labeler: &dyn Labeler, src: &str, dest: &str) -> CmdResult {
    println!("{}", labeler.copy_level(src, dest)?);
    Ok(())
}

pub fn file_label(labeler: &dyn Labeler, path: &Path, set: Option<&str>) -> CmdResult {
    if let Some(label) = set {
        info!("Relabeling {}", path.display());
        labeler.set_file_label(path, label)?;
    }
    println!("{}", labeler.file_label(path)?);
    Ok(())
}

pub fn current_label(labeler: &dyn Labeler) -> CmdResult {
    println!("{}", labeler.current_label()?);
    Ok(())
}

pub fn pid_label(labeler: &dyn Labeler, pid: i32) -> CmdResult {
    println!("{}", labeler.pid_label(Pid::from_raw(pid))?);
    Ok(())
}

pub fn enforce(labeler: &dyn Labeler, set: Option<&str>) -> CmdResult {
    if let Some(mode) = set {
        let mode: EnforceMode = mode.parse()?;
        info!("Switching to {} mode", mode);
        labeler.set_enforce_mode(mode)?;
    }
    let mode = labeler.enforce_mode();
    println!("{} ({})", mode, mode.as_i32());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seclabel::NoopLabeler;

    #[test]
    fn allocate_on_disabled_host_gives_empty_pairs() {
        let pairs = allocate_labels(&NoopLabeler, 2).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.process.is_empty() && p.file.is_empty()));
    }

    #[test]
    fn label_pair_json_shape() {
        let pair = LabelPair {
            process: "system_u:system_r:container_t:s0:c0,c1".to_string(),
            file: "system_u:object_r:container_file_t:s0:c0,c1".to_string(),
        };
        let value = serde_json::to_value(&pair).unwrap();
        assert_eq!(value["process"], "system_u:system_r:container_t:s0:c0,c1");
        assert_eq!(value["file"], "system_u:object_r:container_file_t:s0:c0,c1");
    }

    #[test]
    fn enforce_rejects_unknown_mode() {
        assert!(enforce(&NoopLabeler, Some("strict")).is_err());
    }

    #[test]
    fn check_requirements_runs() {
        check_requirements(&HostCapabilities::detect(), &NoopLabeler);
    }
}
