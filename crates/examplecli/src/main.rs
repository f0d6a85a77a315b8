//! examplecli - A small program built on cmdtree
//!
//! Usage:
//!   examplecli [-fail N] ls [-l] <dir>
//!
//! `ls` shells out to the system `ls` under a ten second timeout. The
//! timeout runs on a tokio runtime whose handle is the command scope.

use std::io::Write;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use cmdtree::{BuildError, CommandSpec, Config, ExecutionContext, Tree};
use colored::Colorize;
use tokio::process::Command;
use tokio::runtime::{Handle, Runtime};
use tracing_subscriber::EnvFilter;

const LS_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the commands
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    let tree = build_tree().context("invalid command tree")?;
    let config = Config::new().with_version(version());

    let status = tree.run(&config, runtime.handle());
    std::process::exit(status);
}

/// Release builds can stamp a version with `EXAMPLECLI_VERSION=...`
fn version() -> &'static str {
    option_env!("EXAMPLECLI_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

fn build_tree() -> Result<Tree<Handle>, BuildError> {
    Tree::branch(
        CommandSpec::new("examplecli")
            .description("my awesome description.")
            .flags(|f| {
                f.int("fail", 0, "exit with given status");
            }),
        |root| {
            root.leaf(
                CommandSpec::new("ls")
                    .args_usage("<dir>")
                    .description("my super awesome desc.")
                    .flags(|f| {
                        f.bool("l", false, "long declaration");
                    }),
                ls,
            )?;
            Ok(())
        },
    )
}

fn ls(ctx: &ExecutionContext<'_, Handle>, args: &[String]) -> i32 {
    if args.len() != 1 {
        return ctx.help("you must provide a single argument");
    }

    let mut cmd = Command::new("ls");
    if ctx.flags().get_bool("l").unwrap_or(false) {
        cmd.arg("-l");
    }
    cmd.arg(&args[0])
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    tracing::debug!(dir = %args[0], "running ls");

    let outcome: std::io::Result<Option<ExitStatus>> = ctx.scope().block_on(async {
        let mut child = cmd.spawn()?;
        match tokio::time::timeout(LS_TIMEOUT, child.wait()).await {
            Ok(status) => status.map(Some),
            // Child is killed when dropped
            Err(_) => Ok(None),
        }
    });

    let status = match outcome {
        Ok(Some(status)) => status,
        Ok(None) => {
            report(
                &mut *ctx.stderr(),
                format_args!("ls timed out after {} seconds", LS_TIMEOUT.as_secs()),
            );
            return 1;
        }
        Err(err) => {
            report(&mut *ctx.stderr(), format_args!("failed to run ls: {}", err));
            return 1;
        }
    };

    if !status.success() {
        return status.code().unwrap_or(1);
    }
    ctx.lookup_flag("fail")
        .and_then(|v| v.as_int())
        .map_or(0, exit_code)
}

/// Map a requested `-fail` value onto a process exit status. Values outside
/// 0..=255 would wrap, so they collapse to 1.
fn exit_code(fail: i64) -> i32 {
    u8::try_from(fail).map_or(1, i32::from)
}

fn report(out: &mut dyn Write, msg: std::fmt::Arguments<'_>) {
    if let Err(err) = writeln!(out, "{} {}", "error:".red(), msg) {
        tracing::warn!(error = %err, "failed to write error message");
    }
}
