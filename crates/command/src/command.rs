use anyhow::Result;
use cryptocompat_getopt::{ArgOrder, OptionTable, ParsedOption, Scanner};
use indexmap::IndexMap;

use crate::runner::ToolRunner;

/// Handler for an option without an argument.
pub type FlagFn<C> = fn(&mut C);

/// Handler for an option with an argument; `false` rejects the argument.
pub type ArgFn<C> = fn(&mut C, &str) -> bool;

/// A single command's runtime contract.
///
/// An instance is single-use: `validate` once, then `run` once if validation
/// succeeded.
pub trait Command {
    /// Parse options and arguments. `false` means a usage error.
    fn validate(&mut self, argv: &[String]) -> bool;

    /// Execute the command. Only called after `validate` returned `true`.
    ///
    /// Do not check usage here; that belongs in `validate`.
    fn run(&mut self, runner: &ToolRunner) -> Result<()>;

    /// Positional arguments left after option parsing.
    ///
    /// Empty until `validate` succeeds.
    fn arguments(&self) -> &[String];
}

/// Static identity of a concrete command type.
pub trait CommandType: Command + Default + 'static {
    fn command_name() -> String;

    fn command_usage() -> String;

    /// Options this command accepts. Defaults to none.
    fn options() -> OptionHandlers<Self> {
        OptionHandlers::new()
    }
}

/// Maps option characters to the handlers that apply them.
pub struct OptionHandlers<C> {
    flags: IndexMap<char, FlagFn<C>>,
    with_arg: IndexMap<char, ArgFn<C>>,
}

impl<C> Default for OptionHandlers<C> {
    fn default() -> Self {
        Self {
            flags: IndexMap::new(),
            with_arg: IndexMap::new(),
        }
    }
}

impl<C> OptionHandlers<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `-c` without an argument.
    pub fn flag(mut self, option: char, handler: FlagFn<C>) -> Self {
        self.with_arg.shift_remove(&option);
        self.flags.insert(option, handler);
        self
    }

    /// Register `-c value`.
    pub fn with_arg(mut self, option: char, handler: ArgFn<C>) -> Self {
        self.flags.shift_remove(&option);
        self.with_arg.insert(option, handler);
        self
    }

    /// The `getopt` spec string: flags first, then one `c:` per argument option.
    pub fn short_spec(&self) -> String {
        let mut spec: String = self.flags.keys().collect();
        for c in self.with_arg.keys() {
            spec.push(*c);
            spec.push(':');
        }
        spec
    }

    fn apply(&self, cmd: &mut C, key: &str, parsed: &ParsedOption) -> bool {
        let mut chars = key.chars();
        let (Some(option), None) = (chars.next(), chars.next()) else {
            tracing::debug!(option = key, "option key is not a single character");
            return false;
        };

        if let Some(handler) = self.flags.get(&option) {
            tracing::trace!(%option, "applying flag");
            handler(cmd);
            return true;
        }
        if let Some(handler) = self.with_arg.get(&option) {
            let argument = parsed.value.as_deref().unwrap_or("");
            tracing::trace!(%option, argument, "applying option");
            let accepted = handler(cmd, argument);
            if !accepted {
                tracing::debug!(%option, argument, "option argument rejected");
            }
            return accepted;
        }

        tracing::debug!(%option, "no handler registered for option");
        false
    }
}

/// Shared option processing for every command.
///
/// Scans `argv` against `C::options()`, applies each parsed option through its
/// handler and returns the remaining positional arguments. Returns `None` on
/// any scan error, rejected argument or unhandled option.
pub fn validate_options<C: CommandType>(cmd: &mut C, argv: &[String]) -> Option<Vec<String>> {
    apply_options(cmd, argv, ArgOrder::Permute)
}

pub(crate) fn apply_options<C: CommandType>(
    cmd: &mut C,
    argv: &[String],
    order: ArgOrder,
) -> Option<Vec<String>> {
    let handlers = C::options();
    let table = OptionTable::from_short(&handlers.short_spec());
    let outcome = Scanner::new(&table).order(order).scan(argv, 0);

    if !outcome.is_clean() {
        for error in &outcome.errors {
            tracing::debug!(command = %C::command_name(), "{error}");
        }
        return None;
    }

    for (key, parsed) in &outcome.options {
        if !handlers.apply(cmd, key, parsed) {
            return None;
        }
    }

    Some(outcome.positionals)
}
