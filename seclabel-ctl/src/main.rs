//! seclabel-ctl: inspect and allocate SELinux container labels

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use console::style;
use log::debug;
use seclabel::{HostCapabilities, LabelConfig, disable_sec_opt, dup_sec_opt};
use std::error::Error;

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = LabelConfig::default();
    if let Some(path) = cli.selinuxfs {
        config = config.with_selinuxfs(path);
    }
    if let Some(path) = cli.config_dir {
        config = config.with_config_dir(path);
    }
    debug!("Using {:?}", config);

    let labeler = seclabel::detect(&config)?;

    match cli.command {
        Commands::Check => {
            let caps = HostCapabilities::probe(&config.proc_root, &config.selinuxfs);
            commands::check_requirements(&caps, labeler.as_ref());
        }
        Commands::Labels { count, json } => {
            let pairs = commands::allocate_labels(labeler.as_ref(), count)?;
            commands::print_labels(&pairs, json)?;
        }
        Commands::Dup { label } => commands::print_options(&dup_sec_opt(&label)),
        Commands::Disable => commands::print_options(&disable_sec_opt()),
        Commands::CopyLevel { src, dest } => commands::copy_level(labeler.as_ref(), &src, &dest)?,
        Commands::FileLabel { path, set } => {
            commands::file_label(labeler.as_ref(), &path, set.as_deref())?
        }
        Commands::Current => commands::current_label(labeler.as_ref())?,
        Commands::Pid { pid } => commands::pid_label(labeler.as_ref(), pid)?,
        Commands::Enforce { set } => commands::enforce(labeler.as_ref(), set.as_deref())?,
    }
    Ok(())
}
