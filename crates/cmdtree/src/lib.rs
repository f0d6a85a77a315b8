//! cmdtree - Declarative command trees for command-line programs
//!
//! Declare commands once, as a tree of branches and leaves, and get argument
//! dispatch, per-command flag parsing and generated help text from the same
//! declarations.
//!
//! ```no_run
//! use cmdtree::{CommandSpec, Config, Tree};
//!
//! let tree = Tree::branch(CommandSpec::new("app").description("An example."), |c| {
//!     c.leaf(
//!         CommandSpec::new("ls")
//!             .args_usage("<dir>")
//!             .flags(|f| {
//!                 f.bool("l", false, "long listing");
//!             }),
//!         |ctx, args| {
//!             println!("ls -l={:?} {:?}", ctx.flags().get_bool("l"), args);
//!             0
//!         },
//!     )?;
//!     Ok(())
//! })?;
//!
//! let status = tree.run(&Config::new().with_version("1.0.0"), &());
//! std::process::exit(status);
//! # Ok::<(), cmdtree::BuildError>(())
//! ```

pub mod command;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod flags;
pub mod help;

pub use command::{Branch, Children, CommandSpec, Leaf, Node, RunFn, Tree};
pub use config::Config;
pub use context::{Buffer, ExecutionContext, Streams};
pub use dispatch::EXIT_USAGE;
pub use error::{BuildError, FlagError};
pub use flags::{FlagDeclaration, FlagKind, FlagSet, FlagValue, FlagValues, Parsed};
