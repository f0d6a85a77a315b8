//! Argument resolution and dispatch
//!
//! Starting at the root, each command gets a fresh flag set and parses the
//! remaining arguments. A leaf runs with whatever positional arguments are
//! left. A branch takes the first positional argument as the name of a
//! child and recurses into it. Every user mistake ends in help text on the
//! error stream and status 1.

use std::ffi::OsString;
use std::path::Path;

use tracing::debug;

use crate::command::{Node, Tree, VERSION_FLAG};
use crate::config::Config;
use crate::context::{ExecutionContext, Shared, Streams};

/// Generic usage-error status
pub const EXIT_USAGE: i32 = 1;

impl<S> Tree<S> {
    /// Run against the process arguments and standard streams.
    ///
    /// Returns the exit status; exiting the process is left to the caller.
    pub fn run(&self, config: &Config, scope: &S) -> i32 {
        let args = std::env::args_os().map(lossy);
        self.run_args(config, args, scope)
    }

    /// Run against `args`, where `args[0]` is the program path
    pub fn run_args<I, T>(&self, config: &Config, args: I, scope: &S) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.run_with(config, args, scope, &Streams::stdio())
    }

    /// Run against `args` writing to `streams`
    pub fn run_with<I, T>(&self, config: &Config, args: I, scope: &S, streams: &Streams) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let argv0 = args.next();
        let rest: Vec<String> = args.collect();

        let name = config
            .program_name()
            .map(str::to_string)
            .or_else(|| argv0.as_deref().and_then(display_name))
            .unwrap_or_else(|| self.root().name().to_string());

        let shared = Shared {
            version: config.version(),
            scope,
            streams,
        };

        resolve(self.root(), &rest, name, None, shared)
    }
}

/// File name of the program path, as shown in usage lines
fn display_name(argv0: &str) -> Option<String> {
    Path::new(argv0)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn lossy(arg: OsString) -> String {
    arg.to_string_lossy().into_owned()
}

fn resolve<'a, S>(
    node: &'a Node<S>,
    args: &[String],
    full_path: String,
    parent: Option<&'a ExecutionContext<'a, S>>,
    shared: Shared<'a, S>,
) -> i32 {
    let is_root = parent.is_none();

    let mut flag_set = node.spec().flag_set(&full_path);
    if is_root {
        flag_set.bool(VERSION_FLAG, false, "Print version and exit.");
    }
    debug!(path = %full_path, flags = flag_set.len(), "resolving command");

    let mut ctx = ExecutionContext::new(full_path, node, flag_set, parent, shared);

    if is_root && ctx.flag_set.requested(args, VERSION_FLAG) {
        debug!(version = shared.version, "version requested");
        shared.streams.write_out(&format!("{}\n", shared.version));
        return 0;
    }

    let parsed = match ctx.flag_set.parse(args) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(path = %ctx.full_path, error = %err, "flag parsing failed");
            let mut text = String::new();
            if !err.is_help() {
                text.push_str(&format!("{}\n", err));
            }
            text.push_str(&ctx.help_text());
            shared.streams.write_err(&text);
            return EXIT_USAGE;
        }
    };
    ctx.flags = parsed.flags;

    match node {
        Node::Leaf(leaf) => {
            debug!(path = %ctx.full_path, args = ?parsed.args, "running command");
            let status = leaf.invoke(&ctx, &parsed.args);
            debug!(path = %ctx.full_path, status, "command finished");
            status
        }
        Node::Branch(branch) => {
            let Some(name) = parsed.args.first() else {
                debug!(path = %ctx.full_path, "no subcommand given");
                return ctx.help("please provide a subcommand");
            };

            match branch.child(name) {
                Some(child) => {
                    debug!(path = %ctx.full_path, subcommand = %name, "selected subcommand");
                    let child_path = format!("{} {}", ctx.full_path, name);
                    resolve(child, &parsed.args[1..], child_path, Some(&ctx), shared)
                }
                None => {
                    debug!(path = %ctx.full_path, subcommand = %name, "unknown subcommand");
                    ctx.help(format_args!("unknown subcommand: {:?}", name))
                }
            }
        }
    }
}
