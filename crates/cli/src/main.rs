mod algorithm;
mod digests;
mod encode;
mod files;
mod key_derivation;

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use cryptocompat_command::{
    Command, CommandRouter, CommandType, OptionHandlers, Router, Subcommand, ToolRunner,
    error_line, options_and_arguments, validate_router,
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::digests::{Digest, Hmac};
use crate::encode::{Base64Decode, Base64Encode};
use crate::key_derivation::Pbkdf2KeyDerivation;

/// Top-level router: `<prog> [-v] [-d] subcommand ...`.
#[derive(Default)]
struct MainCommand {
    verbose: bool,
    debug: bool,
    router: Router,
}

impl CommandType for MainCommand {
    fn command_name() -> String {
        program_name()
    }

    fn command_usage() -> String {
        format!(
            "{} [-v] [-d] subcommand\n\nSubcommands:\n\n{}",
            Self::command_name(),
            Self::router_usage()
        )
    }

    fn options() -> OptionHandlers<Self> {
        OptionHandlers::<Self>::new()
            .flag('v', |cmd| cmd.verbose = true)
            .flag('d', |cmd| cmd.debug = true)
    }
}

impl CommandRouter for MainCommand {
    fn subcommands() -> Vec<Subcommand> {
        vec![
            Subcommand::of::<Base64Encode>(),
            Subcommand::of::<Base64Decode>(),
            Subcommand::of::<Digest>(),
            Subcommand::of::<Hmac>(),
            Subcommand::of::<Pbkdf2KeyDerivation>(),
        ]
    }

    fn router(&self) -> &Router {
        &self.router
    }

    fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}

impl Command for MainCommand {
    fn validate(&mut self, argv: &[String]) -> bool {
        validate_router(self, argv)
    }

    fn run(&mut self, runner: &ToolRunner) -> Result<()> {
        self.router.run(runner)
    }

    fn arguments(&self) -> &[String] {
        self.router.arguments()
    }
}

fn lossy(arg: OsString) -> String {
    arg.to_string_lossy().into_owned()
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

fn main() -> Result<ExitCode> {
    // A missing .env file is fine; it only supplies RUST_LOG.
    let _ = dotenvy::dotenv();
    init_tracing();

    let argv = options_and_arguments(std::env::args_os().map(lossy));

    let mut command = MainCommand::default();
    if argv.is_empty() || !command.validate(&argv) {
        eprint!("usage: {}\n\n", MainCommand::command_usage());
        return Ok(ExitCode::FAILURE);
    }

    let mut runner = ToolRunner::new()?;
    runner.set_run_inline(command.debug);
    tracing::debug!(
        subcommand = command.router().subcommand_name().unwrap_or_default(),
        inline = runner.runs_inline(),
        "executing command"
    );

    match command.run(&runner) {
        Ok(()) => {
            if command.verbose {
                eprintln!("Success!");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!("{err:#}");
            eprintln!("{}", error_line(&program_name(), &err));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
