//! Command lifecycle and subcommand routing.
//!
//! A command declares the single-character options it accepts through
//! [`OptionHandlers`], parses its argv in [`Command::validate`] and does its
//! work in [`Command::run`]. Routers are commands too: they resolve the first
//! positional argument to a [`Subcommand`] and delegate to it, so command trees
//! can nest to any depth.
//!
//! ```rust,ignore
//! use cryptocompat_command::{Command, CommandType, OptionHandlers, ToolRunner, validate_options};
//!
//! #[derive(Default)]
//! struct Hello {
//!     loud: bool,
//!     arguments: Vec<String>,
//! }
//!
//! impl CommandType for Hello {
//!     fn command_name() -> String {
//!         "hello".to_string()
//!     }
//!
//!     fn command_usage() -> String {
//!         "hello [-l] name".to_string()
//!     }
//!
//!     fn options() -> OptionHandlers<Self> {
//!         OptionHandlers::<Self>::new().flag('l', |cmd| cmd.loud = true)
//!     }
//! }
//!
//! impl Command for Hello {
//!     fn validate(&mut self, argv: &[String]) -> bool {
//!         match validate_options(self, argv) {
//!             Some(arguments) if arguments.len() == 1 => {
//!                 self.arguments = arguments;
//!                 true
//!             }
//!             _ => false,
//!         }
//!     }
//!
//!     fn run(&mut self, _runner: &ToolRunner) -> anyhow::Result<()> {
//!         println!("hello {}", self.arguments[0]);
//!         Ok(())
//!     }
//!
//!     fn arguments(&self) -> &[String] {
//!         &self.arguments
//!     }
//! }
//! ```

mod command;
mod error;
mod router;
mod runner;

pub use command::{ArgFn, Command, CommandType, FlagFn, OptionHandlers, validate_options};
pub use error::{RunError, error_line};
pub use router::{CommandRouter, Router, Subcommand, usage_lines, validate_router};
pub use runner::ToolRunner;

/// Drop the program name from a process argument list.
pub fn options_and_arguments<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().skip(1).collect()
}
