use anyhow::Result;

use cryptocompat_command::{
    Command, CommandType, OptionHandlers, RunError, ToolRunner, validate_options,
};

use crate::algorithm::Algorithm;
use crate::files;

fn set_algorithm(slot: &mut Algorithm, name: &str) -> bool {
    match Algorithm::from_name(name) {
        Some(algorithm) => {
            *slot = algorithm;
            true
        }
        None => {
            tracing::debug!(algorithm = name, "unsupported algorithm");
            false
        }
    }
}

#[derive(Default)]
pub struct Digest {
    algorithm: Algorithm,
    arguments: Vec<String>,
}

impl CommandType for Digest {
    fn command_name() -> String {
        "digest".to_string()
    }

    fn command_usage() -> String {
        format!("digest -a {} file", Algorithm::CHOICES)
    }

    fn options() -> OptionHandlers<Self> {
        OptionHandlers::<Self>::new()
            .with_arg('a', |cmd, arg| set_algorithm(&mut cmd.algorithm, arg))
    }
}

impl Command for Digest {
    fn validate(&mut self, argv: &[String]) -> bool {
        match validate_options(self, argv) {
            Some(arguments) if arguments.len() == 1 => {
                self.arguments = arguments;
                true
            }
            _ => false,
        }
    }

    fn run(&mut self, runner: &ToolRunner) -> Result<()> {
        let [path] = self.arguments.as_slice() else {
            return Err(RunError::NotValidated.into());
        };
        let path = path.clone();
        let algorithm = self.algorithm;

        tracing::debug!(algorithm = algorithm.name(), file = %path, "digest");
        runner.run_to_completion(move || {
            let data = files::read_file(&path)?;
            files::write_hex_line(&algorithm.digest(&data))?;
            Ok(())
        })
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

#[derive(Default)]
pub struct Hmac {
    algorithm: Algorithm,
    key: Option<Vec<u8>>,
    arguments: Vec<String>,
}

impl CommandType for Hmac {
    fn command_name() -> String {
        "hmac".to_string()
    }

    fn command_usage() -> String {
        format!("hmac -a {} -k keyHexStr file", Algorithm::CHOICES)
    }

    fn options() -> OptionHandlers<Self> {
        OptionHandlers::<Self>::new()
            .with_arg('a', |cmd, arg| set_algorithm(&mut cmd.algorithm, arg))
            .with_arg('k', |cmd, arg| {
                cmd.key = files::parse_hex(arg);
                cmd.key.is_some()
            })
    }
}

impl Command for Hmac {
    fn validate(&mut self, argv: &[String]) -> bool {
        match validate_options(self, argv) {
            Some(arguments) if arguments.len() == 1 && self.key.is_some() => {
                self.arguments = arguments;
                true
            }
            _ => false,
        }
    }

    fn run(&mut self, runner: &ToolRunner) -> Result<()> {
        let ([path], Some(key)) = (self.arguments.as_slice(), self.key.clone()) else {
            return Err(RunError::NotValidated.into());
        };
        let path = path.clone();
        let algorithm = self.algorithm;

        tracing::debug!(algorithm = algorithm.name(), file = %path, "hmac");
        runner.run_to_completion(move || {
            let data = files::read_file(&path)?;
            files::write_hex_line(&algorithm.hmac(&key, &data)?)?;
            Ok(())
        })
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }
}
