//! Security options handed to process launchers
//!
//! Options are `key:value` strings (`type:container_t`, `level:s0:c1,c2`) or
//! the bare sentinel `disable`.

use crate::labeler::Labeler;
use log::debug;
use seclabel_context::{Context, LevelRange};
use seclabel_core::{LabelError, Result};
use std::fmt;
use std::str::FromStr;

pub const DISABLE: &str = "disable";

/// One launcher security option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecOpt {
    User(String),
    Role(String),
    Type(String),
    Level(String),
    /// Run the workload unlabeled
    Disable,
}

impl fmt::Display for SecOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecOpt::User(v) => write!(f, "user:{}", v),
            SecOpt::Role(v) => write!(f, "role:{}", v),
            SecOpt::Type(v) => write!(f, "type:{}", v),
            SecOpt::Level(v) => write!(f, "level:{}", v),
            SecOpt::Disable => f.write_str(DISABLE),
        }
    }
}

impl FromStr for SecOpt {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self> {
        if s == DISABLE {
            return Ok(SecOpt::Disable);
        }
        let (key, value) = s
            .split_once(':')
            .ok_or_else(|| LabelError::Parse(format!("bad security option '{}'", s)))?;
        if value.is_empty() {
            return Err(LabelError::Parse(format!("empty value in option '{}'", s)));
        }
        match key {
            "user" => Ok(SecOpt::User(value.to_string())),
            "role" => Ok(SecOpt::Role(value.to_string())),
            "type" => Ok(SecOpt::Type(value.to_string())),
            "level" => Ok(SecOpt::Level(value.to_string())),
            _ => Err(LabelError::Parse(format!(
                "unknown security option '{}'",
                key
            ))),
        }
    }
}

/// Options that make another process run with the same context as `label`.
///
/// Empty or malformed labels give no options.
pub fn dup_sec_opt(label: &str) -> Vec<String> {
    let ctx = Context::new(label);
    let (Some(user), Some(role), Some(type_)) = (ctx.user(), ctx.role(), ctx.type_()) else {
        return Vec::new();
    };
    if user.is_empty() || role.is_empty() || type_.is_empty() {
        return Vec::new();
    }

    let mut opts = vec![
        SecOpt::User(user.to_string()),
        SecOpt::Role(role.to_string()),
        SecOpt::Type(type_.to_string()),
    ];
    match ctx.level() {
        Some(level) if !level.is_empty() => {
            if level.parse::<LevelRange>().is_err() {
                return Vec::new();
            }
            opts.push(SecOpt::Level(level.to_string()));
        }
        _ => {}
    }
    opts.iter().map(SecOpt::to_string).collect()
}

/// Option telling a launcher not to label the workload
pub fn disable_sec_opt() -> Vec<String> {
    vec![SecOpt::Disable.to_string()]
}

/// Turn launcher options into a `(process, file)` label pair.
///
/// `disable` yields empty labels without allocating. Otherwise a fresh pair
/// is allocated and the options override its fields; an overriding level is
/// reserved in place of the allocated one.
pub fn init_labels<S: AsRef<str>>(
    labeler: &dyn Labeler,
    options: &[S],
) -> Result<(String, String)> {
    let opts = options
        .iter()
        .map(|o| o.as_ref().parse::<SecOpt>())
        .collect::<Result<Vec<_>>>()?;
    if opts.contains(&SecOpt::Disable) {
        debug!("labeling disabled by security option");
        return Ok((String::new(), String::new()));
    }

    let (process, file) = labeler.container_labels()?;
    if process.is_empty() {
        return Ok((process, file));
    }

    let mut pcon = Context::new(&process);
    let mut fcon = Context::new(&file);
    for opt in &opts {
        match opt {
            SecOpt::User(v) => {
                pcon.set_user(v.as_str());
                fcon.set_user(v.as_str());
            }
            SecOpt::Role(v) => pcon.set_role(v.as_str()),
            SecOpt::Type(v) => pcon.set_type(v.as_str()),
            SecOpt::Level(v) => {
                pcon.set_level(v.as_str());
                fcon.set_level(v.as_str());
            }
            SecOpt::Disable => {}
        }
    }

    let new_process = pcon.get();
    let allocated = Context::new(&process).level_range().ok().flatten();
    if pcon.level_range().ok().flatten() != allocated {
        if let Err(e) = labeler.reserve_label(&new_process) {
            labeler.release_label(&process);
            return Err(e);
        }
        labeler.release_label(&process);
    }
    Ok((new_process, fcon.get()))
}
