use console::style;
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

/// Crates whose records `--verbose` raises to debug
const LABEL_TARGETS: [&str; 5] = [
    "seclabel",
    "seclabel_core",
    "seclabel_context",
    "seclabel_mcs",
    "seclabel_ctl",
];

/// Default filter when `RUST_LOG` is unset. Other crates stay at warn.
fn default_filter(verbose: bool) -> String {
    let mut directives = vec!["warn".to_string()];
    if verbose {
        directives.extend(LABEL_TARGETS.iter().map(|target| format!("{target}=debug")));
    }
    directives.join(",")
}

fn styled_level(level: Level) -> String {
    match level {
        Level::Error => style("error").red().bold().to_string(),
        Level::Warn => style("warn").yellow().bold().to_string(),
        Level::Info => style("info").green().to_string(),
        Level::Debug => style("debug").cyan().to_string(),
        Level::Trace => style("trace").dim().to_string(),
    }
}

/// Initialize logging; `RUST_LOG` wins over the built-in filter
pub fn init_logger(verbose: bool) {
    let env = Env::default().filter_or("RUST_LOG", default_filter(verbose));

    Builder::from_env(env)
        .format(|buf, record| {
            // seclabel_mcs::allocator -> mcs::allocator
            let target = record.target();
            let target = target.strip_prefix("seclabel_").unwrap_or(target);
            writeln!(
                buf,
                "{}: {} {}",
                styled_level(record.level()),
                style(target).dim(),
                record.args()
            )
        })
        .init();
}
