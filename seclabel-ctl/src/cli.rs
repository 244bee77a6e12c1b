use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seclabel-ctl")]
#[command(version, about = "Inspect and allocate SELinux container labels", long_about = None)]
#[command(after_help = "EXAMPLES:
    # What does this host support?
    seclabel-ctl check

    # Allocate labels for three containers
    seclabel-ctl labels --count 3
    seclabel-ctl labels --json

    # Security options to share a running container's context
    seclabel-ctl dup system_u:system_r:container_t:s0:c1,c2

    # Inspect and relabel files
    seclabel-ctl file-label /var/lib/containers/data
    seclabel-ctl file-label /var/lib/containers/data --set system_u:object_r:container_file_t:s0:c1,c2
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// selinuxfs mount to use when mountinfo is unreadable
    #[arg(long, value_name = "PATH", global = true)]
    pub selinuxfs: Option<PathBuf>,

    /// SELinux configuration directory
    #[arg(long, value_name = "PATH", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check SELinux support on this host
    Check,

    /// Allocate process/file label pairs
    Labels {
        /// Number of pairs to allocate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print security options that duplicate a label
    Dup {
        /// Label to duplicate
        label: String,
    },

    /// Print the security option that disables labeling
    Disable,

    /// Print DEST with the level of SRC
    CopyLevel { src: String, dest: String },

    /// Show or set the label of a file
    FileLabel {
        path: PathBuf,

        /// New label for the file
        #[arg(long, value_name = "LABEL")]
        set: Option<String>,
    },

    /// Show the label of this process
    Current,

    /// Show the label of another process
    Pid { pid: i32 },

    /// Show or set the enforce mode
    Enforce {
        /// enforcing or permissive
        #[arg(long, value_name = "MODE")]
        set: Option<String>,
    },
}
