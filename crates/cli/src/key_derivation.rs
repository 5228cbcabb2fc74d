use std::time::{Duration, Instant};

use anyhow::Result;

use cryptocompat_command::{
    Command, CommandType, OptionHandlers, RunError, ToolRunner, validate_options,
};

use crate::algorithm::Algorithm;
use crate::files;

/// Derived key size when `-z` is absent or zero.
pub const DEFAULT_KEY_LENGTH: usize = 16;

/// Largest derived key `-z` accepts.
pub const MAX_KEY_LENGTH: usize = 64 * 1024;

/// Target derivation time when `-r` is absent or zero.
pub const DEFAULT_DERIVATION_TIME: Duration = Duration::from_millis(100);

const TRIAL_ROUNDS: u32 = 1_000;

/// Rounds needed for one derivation to take roughly `target` on this machine.
///
/// Times a trial derivation with inputs of the given sizes and scales it.
/// The result is at least 1 and never exceeds `i32::MAX`.
pub fn calibrate_rounds(
    algorithm: Algorithm,
    password_len: usize,
    salt_len: usize,
    key_len: usize,
    target: Duration,
) -> u32 {
    let target = target.max(Duration::from_millis(1));
    let password = vec![0u8; password_len];
    let salt = vec![0u8; salt_len.clamp(1, 128)];
    let mut out = vec![0u8; key_len];

    let started = Instant::now();
    algorithm.pbkdf2(&password, &salt, TRIAL_ROUNDS, &mut out);
    let elapsed = started.elapsed().max(Duration::from_nanos(1));

    let scaled = target.as_secs_f64() / elapsed.as_secs_f64() * f64::from(TRIAL_ROUNDS);
    let rounds = scaled.clamp(1.0, f64::from(i32::MAX)) as u32;
    tracing::debug!(
        algorithm = algorithm.name(),
        ?elapsed,
        rounds,
        "calibrated pbkdf2"
    );
    rounds
}

/// Derive a key, calibrating the round count when `rounds` is zero.
///
/// Returns the key and the rounds actually used.
pub fn derive_key(
    algorithm: Algorithm,
    password: &str,
    salt: &[u8],
    rounds: u32,
    key_len: usize,
) -> (Vec<u8>, u32) {
    let rounds = match rounds {
        0 => calibrate_rounds(
            algorithm,
            password.len(),
            salt.len(),
            key_len,
            DEFAULT_DERIVATION_TIME,
        ),
        n => n,
    };
    let mut key = vec![0u8; key_len];
    algorithm.pbkdf2(password.as_bytes(), salt, rounds, &mut key);
    (key, rounds)
}

/// Parse a non-negative count that fits in an `i32`.
fn parse_count(text: &str) -> Option<u32> {
    text.parse::<u32>()
        .ok()
        .filter(|&n| i32::try_from(n).is_ok())
}

fn parse_key_length(text: &str) -> Option<usize> {
    parse_count(text)
        .map(|n| n as usize)
        .filter(|&n| n <= MAX_KEY_LENGTH)
}

#[derive(Default)]
pub struct Pbkdf2KeyDerivation {
    algorithm: Algorithm,
    password: Option<String>,
    salt: Option<Vec<u8>>,
    rounds: u32,
    key_length: usize,
    arguments: Vec<String>,
}

impl CommandType for Pbkdf2KeyDerivation {
    fn command_name() -> String {
        "pbkdf2-key-derivation".to_string()
    }

    fn command_usage() -> String {
        format!(
            "pbkdf2-key-derivation -a {} -p passwordStr -s saltHexStr [-r rounds] [-z derivedKeyLength]",
            Algorithm::CHOICES
        )
    }

    fn options() -> OptionHandlers<Self> {
        OptionHandlers::<Self>::new()
            .with_arg('a', |cmd, arg| match Algorithm::from_name(arg) {
                Some(algorithm) => {
                    cmd.algorithm = algorithm;
                    true
                }
                None => false,
            })
            .with_arg('p', |cmd, arg| {
                cmd.password = Some(arg.to_string());
                true
            })
            .with_arg('s', |cmd, arg| {
                cmd.salt = files::parse_hex(arg);
                cmd.salt.is_some()
            })
            .with_arg('r', |cmd, arg| match parse_count(arg) {
                Some(rounds) => {
                    cmd.rounds = rounds;
                    true
                }
                None => false,
            })
            .with_arg('z', |cmd, arg| match parse_key_length(arg) {
                Some(length) => {
                    cmd.key_length = length;
                    true
                }
                None => false,
            })
    }
}

impl Command for Pbkdf2KeyDerivation {
    fn validate(&mut self, argv: &[String]) -> bool {
        let Some(arguments) = validate_options(self, argv) else {
            return false;
        };
        if !arguments.is_empty() {
            tracing::debug!(count = arguments.len(), "unexpected positional arguments");
            return false;
        }
        if self.password.is_none() || self.salt.is_none() {
            tracing::debug!("password and salt are required");
            return false;
        }
        self.arguments = arguments;
        true
    }

    fn run(&mut self, runner: &ToolRunner) -> Result<()> {
        let (Some(password), Some(salt)) = (self.password.clone(), self.salt.clone()) else {
            return Err(RunError::NotValidated.into());
        };
        let algorithm = self.algorithm;
        let rounds = self.rounds;
        let key_length = match self.key_length {
            0 => DEFAULT_KEY_LENGTH,
            n => n,
        };

        runner.run_to_completion(move || {
            let (key, used) = derive_key(algorithm, &password, &salt, rounds, key_length);
            tracing::debug!(algorithm = algorithm.name(), rounds = used, "derived key");
            files::write_hex_line(&key)?;
            Ok(())
        })
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }
}
