//! Per-command flag sets
//!
//! A [`FlagSet`] collects typed flag declarations for one command and parses
//! an argument slice against them. Flags use single-word names and may be
//! written with one or two dashes (`-l`, `--long`, `-fail=3`, `-fail 3`).
//! Scanning stops at the first positional argument or at `--`; everything
//! after that is handed back untouched.
//!
//! clap has no notion of single-dash long flags, so a small scanner splits
//! the arguments and rewrites each flag as `--name[=value]`. clap's builder
//! API then types and validates the values.

use std::fmt;

use clap::builder::BoolishValueParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{value_parser, Arg, ArgAction, ArgMatches, ColorChoice, Command};
use indexmap::IndexMap;

use crate::error::{BuildError, FlagError};

/// Clap id of the positional catch-all. Flag names cannot start with a dash,
/// so this never collides with a declaration.
const POSITIONAL_ID: &str = "-positional";

/// The type of value a flag holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Bool,
    Int,
    Uint,
    Float,
    String,
}

impl FlagKind {
    /// Placeholder shown after the flag name in help output
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Bool => "",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

/// A parsed or default flag value
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::Bool(_) => FlagKind::Bool,
            Self::Int(_) => FlagKind::Int,
            Self::Uint(_) => FlagKind::Uint,
            Self::Float(_) => FlagKind::Float,
            Self::String(_) => FlagKind::String,
        }
    }

    /// Whether this is the zero value of its kind
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Int(n) => *n == 0,
            Self::Uint(n) => *n == 0,
            Self::Float(n) => *n == 0.0,
            Self::String(s) => s.is_empty(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Uint(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

/// One declared flag: name, default value and help text
#[derive(Debug, Clone, PartialEq)]
pub struct FlagDeclaration {
    name: String,
    default: FlagValue,
    help: String,
}

impl FlagDeclaration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FlagKind {
        self.default.kind()
    }

    pub fn default_value(&self) -> &FlagValue {
        &self.default
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Split the help text into a value placeholder and the text to print.
    ///
    /// A back-quoted word in the help names the placeholder and loses its
    /// quotes: "path to `file`" gives ("file", "path to file").
    pub fn placeholder_and_help(&self) -> (String, String) {
        if let Some(start) = self.help.find('`') {
            if let Some(len) = self.help[start + 1..].find('`') {
                let end = start + 1 + len;
                let name = self.help[start + 1..end].to_string();
                let help = format!(
                    "{}{}{}",
                    &self.help[..start],
                    name,
                    &self.help[end + 1..]
                );
                return (name, help);
            }
        }
        (self.kind().placeholder().to_string(), self.help.clone())
    }

    fn to_arg(&self) -> Arg {
        let arg = Arg::new(self.name.clone())
            .long(self.name.clone())
            .action(ArgAction::Set);

        match self.kind() {
            FlagKind::Bool => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(BoolishValueParser::new()),
            FlagKind::Int => arg.value_name("int").value_parser(value_parser!(i64)),
            FlagKind::Uint => arg.value_name("uint").value_parser(value_parser!(u64)),
            FlagKind::Float => arg.value_name("float").value_parser(value_parser!(f64)),
            FlagKind::String => arg.value_name("string").value_parser(value_parser!(String)),
        }
    }
}

/// Flag values produced by a successful parse, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagValues {
    values: IndexMap<String, FlagValue>,
    explicit: Vec<String>,
}

impl FlagValues {
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FlagValue::as_bool)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FlagValue::as_int)
    }

    pub fn get_uint(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FlagValue::as_uint)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FlagValue::as_float)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FlagValue::as_str)
    }

    /// Whether the flag appeared in the input rather than taking its default
    pub fn is_set(&self, name: &str) -> bool {
        self.explicit.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of [`FlagSet::parse`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub flags: FlagValues,
    pub args: Vec<String>,
}

/// Typed flag declarations for a single command
#[derive(Debug, Clone)]
pub struct FlagSet {
    name: String,
    declarations: Vec<FlagDeclaration>,
    error: Option<BuildError>,
}

impl FlagSet {
    /// Create an empty flag set. `name` is the full command path, used in
    /// parse errors and declaration errors.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bool(&mut self, name: &str, default: bool, help: &str) -> &mut Self {
        self.declare(name, FlagValue::Bool(default), help)
    }

    pub fn int(&mut self, name: &str, default: i64, help: &str) -> &mut Self {
        self.declare(name, FlagValue::Int(default), help)
    }

    pub fn uint(&mut self, name: &str, default: u64, help: &str) -> &mut Self {
        self.declare(name, FlagValue::Uint(default), help)
    }

    pub fn float(&mut self, name: &str, default: f64, help: &str) -> &mut Self {
        self.declare(name, FlagValue::Float(default), help)
    }

    pub fn string(&mut self, name: &str, default: &str, help: &str) -> &mut Self {
        self.declare(name, FlagValue::String(default.to_string()), help)
    }

    /// Declare a flag. Invalid or repeated names are recorded and reported by
    /// [`FlagSet::check`]; the first problem wins.
    pub fn declare(&mut self, name: &str, default: FlagValue, help: &str) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        if !valid_flag_name(name) {
            self.error = Some(BuildError::InvalidFlagName {
                command: self.name.clone(),
                flag: name.to_string(),
            });
            return self;
        }

        if self.get(name).is_some() {
            self.error = Some(BuildError::DuplicateFlag {
                command: self.name.clone(),
                flag: name.to_string(),
            });
            return self;
        }

        self.declarations.push(FlagDeclaration {
            name: name.to_string(),
            default,
            help: help.to_string(),
        });
        self
    }

    /// Report the first declaration problem, if any
    pub fn check(&self) -> Result<(), BuildError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FlagDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Declared flags in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &FlagDeclaration> {
        self.declarations.iter()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Parse `args`, returning the flag values and the remaining positional
    /// arguments. Parse failures come back as errors; nothing is printed.
    pub fn parse(&self, args: &[String]) -> Result<Parsed, FlagError> {
        let mut normalized = Vec::with_capacity(args.len() + 1);
        for token in Scanner::new(self, args) {
            match token? {
                Token::Flag { name, value: Some(value) } => {
                    normalized.push(format!("--{}={}", name, value));
                }
                Token::Flag { name, value: None } => normalized.push(format!("--{}", name)),
                Token::Positional(rest) => {
                    normalized.push("--".to_string());
                    normalized.extend(rest.iter().cloned());
                }
            }
        }

        tracing::trace!(command = %self.name, args = ?normalized, "parsing flags");

        let matches = self
            .command()
            .try_get_matches_from(normalized)
            .map_err(engine_error)?;

        self.collect(&matches)
    }

    /// Whether the bool flag `name` is switched on in the flag region of
    /// `args`. Tokens after the first problem are not considered.
    pub fn requested(&self, args: &[String], name: &str) -> bool {
        let mut on = false;
        for token in Scanner::new(self, args) {
            match token {
                Ok(Token::Flag { name: n, value }) if n == name => {
                    on = match value {
                        None => true,
                        Some(v) => parse_bool(v).unwrap_or(false),
                    };
                }
                Ok(Token::Flag { .. }) => {}
                Ok(Token::Positional(_)) | Err(_) => break,
            }
        }
        on
    }

    /// Append the default listing of every declared flag to `out`
    pub fn write_defaults(&self, out: &mut String) {
        for decl in &self.declarations {
            let (placeholder, help) = decl.placeholder_and_help();

            let mut line = format!("  -{}", decl.name);
            if !placeholder.is_empty() {
                line.push(' ');
                line.push_str(&placeholder);
            }

            // Single-letter bool flags keep their help on the same line
            if line.len() <= 4 {
                line.push('\t');
            } else {
                line.push_str("\n    \t");
            }
            line.push_str(&help.replace('\n', "\n    \t"));

            if !decl.default.is_zero() {
                match &decl.default {
                    FlagValue::String(s) => line.push_str(&format!(" (default {:?})", s)),
                    other => line.push_str(&format!(" (default {})", other)),
                }
            }

            out.push_str(&line);
            out.push('\n');
        }
    }

    fn command(&self) -> Command {
        let positional = Arg::new(POSITIONAL_ID)
            .num_args(0..)
            .action(ArgAction::Append)
            .value_parser(value_parser!(String));

        self.declarations.iter().fold(
            Command::new(self.name.clone())
                .no_binary_name(true)
                .disable_help_flag(true)
                .disable_version_flag(true)
                .args_override_self(true)
                .color(ColorChoice::Never)
                .arg(positional),
            |cmd, decl| cmd.arg(decl.to_arg()),
        )
    }

    fn collect(&self, matches: &ArgMatches) -> Result<Parsed, FlagError> {
        let mut flags = FlagValues::default();

        for decl in &self.declarations {
            let id = decl.name.as_str();
            let parsed = match decl.kind() {
                FlagKind::Bool => typed::<bool>(matches, id)?.map(FlagValue::Bool),
                FlagKind::Int => typed::<i64>(matches, id)?.map(FlagValue::Int),
                FlagKind::Uint => typed::<u64>(matches, id)?.map(FlagValue::Uint),
                FlagKind::Float => typed::<f64>(matches, id)?.map(FlagValue::Float),
                FlagKind::String => typed::<String>(matches, id)?.map(FlagValue::String),
            };

            let value = match parsed {
                Some(value) => {
                    flags.explicit.push(decl.name.clone());
                    value
                }
                None => decl.default.clone(),
            };
            flags.values.insert(decl.name.clone(), value);
        }

        let args = matches
            .try_get_many::<String>(POSITIONAL_ID)
            .map_err(|e| FlagError::Engine(e.to_string()))?
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        Ok(Parsed { flags, args })
    }
}

fn typed<T>(matches: &ArgMatches, id: &str) -> Result<Option<T>, FlagError>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .try_get_one::<T>(id)
        .map(|v| v.cloned())
        .map_err(|e| FlagError::Engine(e.to_string()))
}

fn valid_flag_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.contains('=')
        && !name.chars().any(char::is_whitespace)
}

/// Same literals as clap's `BoolishValueParser`
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Translate a clap failure into a flag error. Unknown flags and help
/// requests never reach clap, so this is mostly about bad values.
fn engine_error(err: clap::Error) -> FlagError {
    let context = |kind| match err.get(kind) {
        Some(ContextValue::String(s)) => Some(s.clone()),
        _ => None,
    };

    match err.kind() {
        ErrorKind::InvalidValue | ErrorKind::ValueValidation => {
            let flag = context(ContextKind::InvalidArg)
                .map(|arg| {
                    arg.trim_start_matches('-')
                        .split(['=', ' '])
                        .next()
                        .unwrap_or_default()
                        .to_string()
                })
                .unwrap_or_default();
            let value = context(ContextKind::InvalidValue).unwrap_or_default();
            let reason = std::error::Error::source(&err)
                .map(|source| source.to_string())
                .unwrap_or_else(|| "parse error".to_string());
            FlagError::InvalidValue {
                flag,
                value,
                reason,
            }
        }
        _ => {
            let rendered = err.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            FlagError::Engine(first.trim_start_matches("error: ").to_string())
        }
    }
}

enum Token<'a> {
    Flag { name: &'a str, value: Option<&'a str> },
    Positional(&'a [String]),
}

/// Walks the flag region of an argument slice
struct Scanner<'a> {
    set: &'a FlagSet,
    args: &'a [String],
    pos: usize,
    done: bool,
}

impl<'a> Scanner<'a> {
    fn new(set: &'a FlagSet, args: &'a [String]) -> Self {
        Self {
            set,
            args,
            pos: 0,
            done: false,
        }
    }

    fn finish(&mut self, item: Result<Token<'a>, FlagError>) -> Option<Result<Token<'a>, FlagError>> {
        self.done = true;
        Some(item)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>, FlagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let args = self.args;
        let arg = args.get(self.pos)?;

        // "-" on its own is a positional argument
        let body = match arg.strip_prefix('-') {
            Some(rest) if !rest.is_empty() => rest,
            _ => return self.finish(Ok(Token::Positional(&args[self.pos..]))),
        };
        self.pos += 1;

        let body = match body.strip_prefix('-') {
            Some("") => return self.finish(Ok(Token::Positional(&args[self.pos..]))),
            Some(rest) => rest,
            None => body,
        };

        if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
            return self.finish(Err(FlagError::Syntax(arg.clone())));
        }

        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };

        let Some(decl) = self.set.get(name) else {
            if name == "h" || name == "help" {
                return self.finish(Err(FlagError::HelpRequested));
            }
            return self.finish(Err(FlagError::Undefined(name.to_string())));
        };

        if value.is_none() && decl.kind() != FlagKind::Bool {
            return match args.get(self.pos) {
                Some(next) => {
                    self.pos += 1;
                    Some(Ok(Token::Flag {
                        name,
                        value: Some(next.as_str()),
                    }))
                }
                None => self.finish(Err(FlagError::MissingValue(name.to_string()))),
            };
        }

        Some(Ok(Token::Flag { name, value }))
    }
}
