//! Input file preparation.
//!
//! A run works on the base64 transcoding of a single input file. The
//! transcoding and the checkpoint live next to the input as `<input>.txt`
//! and `<input>.offset`.

use crate::checkpoint::CheckpointStore;
use crate::error::{Result, TeleTypeError};
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Paths derived from the input file for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub input: PathBuf,
    pub encoded: PathBuf,
    pub checkpoint: PathBuf,
}

impl RunArtifacts {
    /// Derive artifact paths from an input path, made absolute first.
    pub fn for_input(input: impl AsRef<Path>) -> Result<Self> {
        let input = std::path::absolute(input.as_ref())
            .map_err(|e| TeleTypeError::setup("resolving the input path", e))?;
        Ok(Self {
            encoded: with_suffix(&input, ".txt"),
            checkpoint: with_suffix(&input, ".offset"),
            input,
        })
    }

    /// Remove the transcoding and the checkpoint, including any temp file
    /// left by an interrupted checkpoint write. Missing files are fine.
    pub fn cleanup(&self) -> Result<()> {
        match fs::remove_file(&self.encoded) {
            Ok(()) => debug!(path = %self.encoded.display(), "removed artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.encoded.display(), error = %e, "failed to remove artifact");
                return Err(e.into());
            }
        }
        CheckpointStore::new(self.checkpoint.clone()).clear()
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// The base64 text being typed. Only holds characters from the standard
/// alphabet plus `=` padding, so every position is a single byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    text: String,
}

impl EncodedPayload {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let invalid = text.chars().enumerate().find(|(_, c)| !is_base64_char(*c));
        if let Some((position, found)) = invalid {
            return Err(TeleTypeError::InvalidPayload { position, found });
        }
        Ok(Self { text })
    }

    /// Encode raw bytes with the standard padded alphabet.
    pub fn encode(data: &[u8]) -> Self {
        Self {
            text: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<char> {
        self.text.as_bytes().get(index).map(|b| char::from(*b))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

pub fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

/// Everything the session needs from the setup phase.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub artifacts: RunArtifacts,
    pub payload: EncodedPayload,
    pub content_hash: String,
    pub input_size: u64,
    pub encoded_size: u64,
}

/// Hash the input, write its transcoding next to it and read it back.
pub fn prepare(input: impl AsRef<Path>) -> Result<PreparedRun> {
    let artifacts = RunArtifacts::for_input(input)?;

    let content_hash = sha256_file(&artifacts.input)
        .map_err(|e| TeleTypeError::setup("hashing the input file", e))?;
    let input_size = fs::metadata(&artifacts.input)
        .map_err(|e| TeleTypeError::setup("reading input file information", e))?
        .len();

    write_encoded(&artifacts.input, &artifacts.encoded)
        .map_err(|e| TeleTypeError::setup("creating the base64 file", e))?;
    let encoded_size = fs::metadata(&artifacts.encoded)
        .map_err(|e| TeleTypeError::setup("reading base64 file information", e))?
        .len();

    let payload = read_encoded(&artifacts.encoded)?;

    info!(
        input = %artifacts.input.display(),
        input_size,
        encoded_len = payload.len(),
        "prepared payload"
    );

    Ok(PreparedRun {
        artifacts,
        payload,
        content_hash,
        input_size,
        encoded_size,
    })
}

/// SHA-256 of a file as lowercase hex, streamed rather than read whole.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn write_encoded(input: &Path, output: &Path) -> io::Result<()> {
    let data = fs::read(input)?;
    fs::write(output, EncodedPayload::encode(&data).as_str())
}

/// Load a transcoding file. Trailing whitespace (an editor's newline) is ignored.
pub fn read_encoded(path: &Path) -> Result<EncodedPayload> {
    let text = fs::read_to_string(path)
        .map_err(|e| TeleTypeError::setup("reading the base64 file", e))?;
    EncodedPayload::new(text.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_are_adjacent() {
        let artifacts = RunArtifacts::for_input("/tmp/data/archive.zip").unwrap();
        assert_eq!(artifacts.input, PathBuf::from("/tmp/data/archive.zip"));
        assert_eq!(artifacts.encoded, PathBuf::from("/tmp/data/archive.zip.txt"));
        assert_eq!(
            artifacts.checkpoint,
            PathBuf::from("/tmp/data/archive.zip.offset")
        );
    }

    #[test]
    fn test_relative_input_becomes_absolute() {
        let artifacts = RunArtifacts::for_input("some/file.bin").unwrap();
        assert!(artifacts.input.is_absolute());
        assert!(artifacts.encoded.ends_with("file.bin.txt"));
    }

    #[test]
    fn test_encode_pads() {
        assert_eq!(EncodedPayload::encode(b"abc").as_str(), "YWJj");
        assert_eq!(EncodedPayload::encode(b"ab").as_str(), "YWI=");
        assert_eq!(EncodedPayload::encode(b"a").as_str(), "YQ==");
        assert!(EncodedPayload::encode(b"").is_empty());
    }

    #[test]
    fn test_payload_rejects_foreign_characters() {
        let err = EncodedPayload::new("YW-j").unwrap_err();
        assert!(matches!(
            err,
            TeleTypeError::InvalidPayload {
                position: 2,
                found: '-'
            }
        ));
    }

    #[test]
    fn test_payload_indexing() {
        let payload = EncodedPayload::new("a+/=").unwrap();
        assert_eq!(payload.len(), 4);
        assert_eq!(payload.get(1), Some('+'));
        assert_eq!(payload.get(3), Some('='));
        assert_eq!(payload.get(4), None);
    }

    #[test]
    fn test_sha256_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_read_encoded_trims_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.txt");
        fs::write(&path, "YWJj\n").unwrap();
        assert_eq!(read_encoded(&path).unwrap().as_str(), "YWJj");
    }

    #[test]
    fn test_cleanup_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = RunArtifacts::for_input(dir.path().join("gone.bin")).unwrap();
        assert!(artifacts.cleanup().is_ok());
    }

    #[test]
    fn test_cleanup_removes_checkpoint_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bin");
        fs::write(&input, b"abc").unwrap();
        let artifacts = RunArtifacts::for_input(&input).unwrap();
        fs::write(&artifacts.encoded, "YWJj").unwrap();
        fs::write(&artifacts.checkpoint, "2").unwrap();
        let temp = dir.path().join("in.bin.offset.tmp");
        fs::write(&temp, "3").unwrap();

        artifacts.cleanup().unwrap();

        assert!(!artifacts.encoded.exists());
        assert!(!artifacts.checkpoint.exists());
        assert!(!temp.exists());
        assert!(input.exists());
    }
}
