//! Error types

use thiserror::Error;

/// Errors raised while assembling a command tree.
///
/// These are programming mistakes in the tree declaration, never caused by
/// user input. The embedding program decides whether they are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("duplicate command {name:?} under {parent:?}")]
    DuplicateCommand { parent: String, name: String },

    #[error("branch {name:?} has no subcommands")]
    EmptyBranch { name: String },

    #[error("command {command:?}: invalid flag name {flag:?}")]
    InvalidFlagName { command: String, flag: String },

    #[error("command {command:?}: flag redefined: {flag}")]
    DuplicateFlag { command: String, flag: String },

    #[error("command {command:?}: flag name {flag:?} is reserved")]
    ReservedFlag { command: String, flag: String },
}

/// Errors returned by [`FlagSet::parse`](crate::FlagSet::parse).
///
/// The dispatcher reports these on the error stream together with the
/// command's help and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("flag provided but not defined: -{0}")]
    Undefined(String),

    #[error("invalid value {value:?} for flag -{flag}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("flag needs an argument: -{0}")]
    MissingValue(String),

    #[error("bad flag syntax: {0}")]
    Syntax(String),

    #[error("help requested")]
    HelpRequested,

    #[error("{0}")]
    Engine(String),
}

impl FlagError {
    /// Whether this error was an explicit `-h`/`-help` request
    pub fn is_help(&self) -> bool {
        matches!(self, Self::HelpRequested)
    }
}
