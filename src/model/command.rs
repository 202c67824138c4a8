use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Remote command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandName {
    Put,
    Rm,
    Cd,
    Mkdir,
    Find,
    Whoami,
    Login,
    Logout,
}

impl CommandName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Rm => "rm",
            Self::Cd => "cd",
            Self::Mkdir => "mkdir",
            Self::Find => "find",
            Self::Whoami => "whoami",
            Self::Login => "login",
            Self::Logout => "logout",
        }
    }

    /// Arguments of this command carry secrets and must not be echoed.
    #[must_use]
    pub const fn is_sensitive(self) -> bool {
        matches!(self, Self::Login)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured remote invocation.
///
/// Arguments stay unquoted here; each driver decides how to hand them to the
/// remote tool. Flags are rendered before positional arguments, in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: CommandName,
    pub positional_args: Vec<String>,
    pub flags: BTreeMap<String, Option<String>>,
}

impl CommandSpec {
    #[must_use]
    pub const fn new(name: CommandName) -> Self {
        Self {
            name,
            positional_args: Vec::new(),
            flags: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.positional_args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.positional_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Boolean switch: single-character keys render as `-k`, longer ones as `--key`.
    #[must_use]
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.flags.insert(key.into(), None);
        self
    }

    /// Valued option, rendered as `--key=value`.
    #[must_use]
    pub fn flag_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(key.into(), Some(value.into()));
        self
    }

    #[must_use]
    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    /// Argument vector after the command name.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.flags.len() + self.positional_args.len());
        for (key, value) in &self.flags {
            let rendered = match value {
                Some(value) => format!("--{key}={value}"),
                None if key.chars().count() == 1 => format!("-{key}"),
                None => format!("--{key}"),
            };
            argv.push(rendered);
        }
        argv.extend(self.positional_args.iter().cloned());
        argv
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())?;
        if self.name.is_sensitive() {
            if !self.positional_args.is_empty() {
                f.write_str(" [redacted]")?;
            }
            return Ok(());
        }
        let argv = self.argv();
        if !argv.is_empty() {
            write!(f, " {}", shell_words::join(&argv))?;
        }
        Ok(())
    }
}
