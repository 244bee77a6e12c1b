//! Four-field SELinux security context

use crate::level::LevelRange;
use seclabel_core::{LabelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A security context `user:role:type:level`.
///
/// Fields absent from the source string stay `None`, so rendering reproduces
/// the input exactly. The level keeps any colons it contains (`s0:c1,c2`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Context {
    user: Option<String>,
    role: Option<String>,
    type_: Option<String>,
    level: Option<String>,
}

impl Context {
    /// Best-effort parse. Never fails: short labels yield a partial context and
    /// an empty string yields an empty one.
    pub fn new(label: &str) -> Self {
        if label.is_empty() {
            return Self::default();
        }
        let mut fields = label.splitn(4, ':').map(str::to_string);
        Self {
            user: fields.next(),
            role: fields.next(),
            type_: fields.next(),
            level: fields.next(),
        }
    }

    /// Strict parse: all four fields present, user/role/type non-empty and a
    /// well-formed level.
    pub fn parse(label: &str) -> Result<Self> {
        let ctx = Self::new(label);
        let named = [&ctx.user, &ctx.role, &ctx.type_];
        if named.iter().any(|f| f.as_deref().is_none_or(str::is_empty)) || ctx.level.is_none() {
            return Err(LabelError::Parse(format!(
                "'{}' is not of the form user:role:type:level",
                label
            )));
        }
        ctx.level_range()?;
        Ok(ctx)
    }

    /// Render fields in `user:role:type:level` order, skipping absent ones
    pub fn get(&self) -> String {
        [&self.user, &self.role, &self.type_, &self.level]
            .into_iter()
            .map_while(|field| field.as_deref())
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn type_(&self) -> Option<&str> {
        self.type_.as_deref()
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    /// Parsed level, or `None` when the context has no level field
    pub fn level_range(&self) -> Result<Option<LevelRange>> {
        self.level.as_deref().map(str::parse::<LevelRange>).transpose()
    }

    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = Some(user.into());
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = Some(role.into());
    }

    pub fn set_type(&mut self, type_: impl Into<String>) {
        self.type_ = Some(type_.into());
    }

    pub fn set_level(&mut self, level: impl Into<String>) {
        self.level = Some(level.into());
    }

    pub fn clear_level(&mut self) {
        self.level = None;
    }

    /// Same context with `level` in place of its own
    pub fn with_level(&self, level: &LevelRange) -> Self {
        let mut ctx = self.clone();
        ctx.set_level(level.to_string());
        ctx
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get())
    }
}

impl From<&str> for Context {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Context {
    fn from(label: String) -> Self {
        Self::new(&label)
    }
}

impl From<Context> for String {
    fn from(ctx: Context) -> Self {
        ctx.get()
    }
}

/// Return `dest` with its level replaced by the level of `src`
pub fn copy_level(src: &str, dest: &str) -> Result<String> {
    let src = Context::parse(src)?;
    let mut dest = Context::parse(dest)?;
    if let Some(level) = src.level() {
        dest.set_level(level);
    }
    Ok(dest.get())
}
