use anyhow::Result;

use cryptocompat_getopt::ArgOrder;

use crate::command::{Command, CommandType, apply_options};
use crate::error::RunError;
use crate::runner::ToolRunner;

/// A command type a router can dispatch to.
///
/// Holds the type's name, usage and constructor; nothing is instantiated
/// until the name is matched.
#[derive(Clone, Copy)]
pub struct Subcommand {
    name: fn() -> String,
    usage: fn() -> String,
    make: fn() -> Box<dyn Command>,
}

impl Subcommand {
    pub fn of<C: CommandType>() -> Self {
        Self {
            name: C::command_name,
            usage: C::command_usage,
            make: instantiate::<C>,
        }
    }

    pub fn name(&self) -> String {
        (self.name)()
    }

    pub fn usage(&self) -> String {
        (self.usage)()
    }
}

fn instantiate<C: CommandType>() -> Box<dyn Command> {
    Box::new(C::default())
}

/// Newline-joined usage of every subcommand.
pub fn usage_lines(subcommands: &[Subcommand]) -> String {
    subcommands
        .iter()
        .map(Subcommand::usage)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dispatch state embedded in a routing command.
#[derive(Default)]
pub struct Router {
    selected: Option<(String, Box<dyn Command>)>,
    arguments: Vec<String>,
}

impl Router {
    /// Resolve `arguments[0]` against `subcommands` and validate the match
    /// with the remaining arguments.
    ///
    /// Matching is exact and case-sensitive. Fails when there is no name,
    /// no match, or the subcommand rejects its arguments.
    pub fn resolve(&mut self, subcommands: &[Subcommand], arguments: Vec<String>) -> bool {
        let Some((name, rest)) = arguments.split_first() else {
            tracing::debug!("missing subcommand name");
            return false;
        };
        let Some(entry) = subcommands.iter().find(|s| s.name() == *name) else {
            tracing::debug!(subcommand = %name, "unknown subcommand");
            return false;
        };

        tracing::debug!(subcommand = %name, args = rest.len(), "dispatching");
        let mut command = (entry.make)();
        if !command.validate(rest) {
            tracing::debug!(subcommand = %name, "subcommand rejected its arguments");
            return false;
        }

        self.selected = Some((name.clone(), command));
        self.arguments = arguments;
        true
    }

    /// Run the resolved subcommand.
    pub fn run(&mut self, runner: &ToolRunner) -> Result<()> {
        let Some((name, command)) = self.selected.as_mut() else {
            return Err(RunError::NotValidated.into());
        };
        tracing::debug!(subcommand = %name, "running");
        command.run(runner)
    }

    pub fn subcommand(&self) -> Option<&dyn Command> {
        self.selected.as_ref().map(|(_, command)| &**command)
    }

    pub fn subcommand_name(&self) -> Option<&str> {
        self.selected.as_ref().map(|(name, _)| name.as_str())
    }

    /// Positional arguments of the router itself, subcommand name first.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

/// A command whose positional arguments name one of its subcommands.
pub trait CommandRouter: CommandType {
    fn subcommands() -> Vec<Subcommand>;

    fn router(&self) -> &Router;

    fn router_mut(&mut self) -> &mut Router;

    /// Usage of every subcommand, one per line.
    ///
    /// Nested routers contribute their own flattened listing.
    fn router_usage() -> String {
        usage_lines(&Self::subcommands())
    }
}

/// Shared validation for routers: strip the router's own options, then
/// resolve and validate the subcommand.
///
/// The router's options end at the subcommand name; everything after it is
/// left for the subcommand.
pub fn validate_router<R: CommandRouter>(cmd: &mut R, argv: &[String]) -> bool {
    let Some(arguments) = apply_options(cmd, argv, ArgOrder::RequireOrder) else {
        return false;
    };
    cmd.router_mut().resolve(&R::subcommands(), arguments)
}
