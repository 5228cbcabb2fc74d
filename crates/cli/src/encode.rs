use anyhow::Result;
use base64::Engine as _;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};

use cryptocompat_command::{
    Command, CommandType, OptionHandlers, RunError, ToolRunner, validate_options,
};

use crate::files;

/// Line width used by `base64-encode -l`.
pub const LINE_WIDTH: usize = 64;

/// Accepts input with or without padding and with non-zero trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Base64 text for `data`, optionally wrapped, with a final newline unless empty.
pub fn encode(data: &[u8], line_breaks: bool) -> String {
    let encoded = STANDARD.encode(data);
    if encoded.is_empty() {
        return encoded;
    }
    if !line_breaks {
        return encoded + "\n";
    }

    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 1);
    // The alphabet is ASCII, so byte chunks are char boundaries.
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.extend(line.iter().map(|&b| b as char));
        out.push('\n');
    }
    out
}

fn in_alphabet(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

/// Decode Base64 text, skipping anything outside the alphabet.
pub fn decode(text: &str) -> Result<Vec<u8>, RunError> {
    let filtered: String = text.chars().filter(|&c| in_alphabet(c)).collect();
    LENIENT.decode(filtered).map_err(|err| {
        tracing::debug!("base64 decode failed: {err}");
        RunError::CorruptInput
    })
}

fn single_argument(cmd_arguments: &mut Vec<String>, arguments: Vec<String>) -> bool {
    if arguments.len() != 1 {
        tracing::debug!(count = arguments.len(), "expected one file argument");
        return false;
    }
    *cmd_arguments = arguments;
    true
}

#[derive(Default)]
pub struct Base64Encode {
    line_breaks: bool,
    arguments: Vec<String>,
}

impl CommandType for Base64Encode {
    fn command_name() -> String {
        "base64-encode".to_string()
    }

    fn command_usage() -> String {
        "base64-encode [-l] file".to_string()
    }

    fn options() -> OptionHandlers<Self> {
        OptionHandlers::<Self>::new().flag('l', |cmd| cmd.line_breaks = true)
    }
}

impl Command for Base64Encode {
    fn validate(&mut self, argv: &[String]) -> bool {
        match validate_options(self, argv) {
            Some(arguments) => single_argument(&mut self.arguments, arguments),
            None => false,
        }
    }

    fn run(&mut self, runner: &ToolRunner) -> Result<()> {
        let [path] = self.arguments.as_slice() else {
            return Err(RunError::NotValidated.into());
        };
        let path = path.clone();
        let line_breaks = self.line_breaks;

        runner.run_to_completion(move || {
            let data = files::read_file(&path)?;
            files::write_stdout(encode(&data, line_breaks).as_bytes())?;
            Ok(())
        })
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

#[derive(Default)]
pub struct Base64Decode {
    arguments: Vec<String>,
}

impl CommandType for Base64Decode {
    fn command_name() -> String {
        "base64-decode".to_string()
    }

    fn command_usage() -> String {
        "base64-decode file".to_string()
    }
}

impl Command for Base64Decode {
    fn validate(&mut self, argv: &[String]) -> bool {
        match validate_options(self, argv) {
            Some(arguments) => single_argument(&mut self.arguments, arguments),
            None => false,
        }
    }

    fn run(&mut self, runner: &ToolRunner) -> Result<()> {
        let [path] = self.arguments.as_slice() else {
            return Err(RunError::NotValidated.into());
        };
        let path = path.clone();

        runner.run_to_completion(move || {
            let text = files::read_text(&path)?;
            files::write_stdout(&decode(&text)?)?;
            Ok(())
        })
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn encodes_with_trailing_newline() {
        assert_eq!(encode(b"hello", false), "aGVsbG8=\n");
        assert_eq!(encode(b"", false), "");
        assert_eq!(encode(b"", true), "");
    }

    #[test]
    fn wraps_at_line_width() {
        let data = vec![0u8; 96];
        let text = encode(&data, true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), LINE_WIDTH);
        assert_eq!(lines[1].len(), 128 - LINE_WIDTH);
        assert!(text.ends_with('\n'));

        // Exactly one full line does not get an extra blank line.
        let text = encode(&[0u8; 48], true);
        assert_eq!(text.len(), LINE_WIDTH + 1);
    }

    #[test]
    fn decode_skips_foreign_characters() {
        assert_eq!(decode("aGVs\r\nbG8=\n").unwrap(), b"hello");
        assert_eq!(decode("  aGVsbG8  ").unwrap(), b"hello");
        assert_eq!(decode("a*G!V@s#b$G%8").unwrap(), b"hello");
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_impossible_lengths() {
        assert!(matches!(decode("a"), Err(RunError::CorruptInput)));
        assert!(matches!(decode("aG=Vs"), Err(RunError::CorruptInput)));
    }

    #[test]
    fn encode_validation() {
        let mut cmd = Base64Encode::default();
        assert!(cmd.validate(&argv(&["-l", "in.bin"])));
        assert!(cmd.line_breaks);
        assert_eq!(cmd.arguments(), ["in.bin"]);

        assert!(!Base64Encode::default().validate(&argv(&["-l"])));
        assert!(!Base64Encode::default().validate(&argv(&["a", "b"])));
        assert!(!Base64Encode::default().validate(&argv(&["-x", "a"])));
    }

    #[test]
    fn decode_takes_no_options() {
        assert!(Base64Decode::default().validate(&argv(&["in.b64"])));
        assert!(!Base64Decode::default().validate(&argv(&["-l", "in.b64"])));
    }

    #[test]
    fn decode_round_trips_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.b64");
        std::fs::write(&path, encode(b"round trip", true)).unwrap();
        let text = files::read_text(path.to_str().unwrap()).unwrap();
        assert_eq!(decode(&text).unwrap(), b"round trip");
    }
}
