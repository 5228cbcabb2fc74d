use std::fs;
use std::io::Write;
use std::path::Path;

use cryptocompat_command::RunError;

pub fn read_file(path: &str) -> Result<Vec<u8>, RunError> {
    fs::read(path).map_err(|source| RunError::Read {
        path: Path::new(path).to_path_buf(),
        source,
    })
}

/// Read a UTF-8 text file; other encodings count as corrupt input.
pub fn read_text(path: &str) -> Result<String, RunError> {
    String::from_utf8(read_file(path)?).map_err(|_| RunError::CorruptInput)
}

pub fn write_stdout(bytes: &[u8]) -> Result<(), RunError> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(RunError::Write)
}

/// Write `bytes` as lowercase hex followed by a newline.
pub fn write_hex_line(bytes: &[u8]) -> Result<(), RunError> {
    write_stdout(format!("{}\n", hex::encode(bytes)).as_bytes())
}

/// Parse an even-length hex string (either case, no separators).
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    hex::decode(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_accepts_either_case() {
        assert_eq!(parse_hex("0aFf"), Some(vec![0x0a, 0xff]));
        assert_eq!(parse_hex(""), Some(vec![]));
        assert_eq!(parse_hex("abc"), None);
        assert_eq!(parse_hex("zz"), None);
        assert_eq!(parse_hex("0a 0b"), None);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");
        let err = read_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, RunError::Read { .. }));
        assert_eq!(err.domain(), "io");
    }

    #[test]
    fn non_utf8_text_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bytes.b64");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = read_text(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, RunError::CorruptInput));
    }
}
