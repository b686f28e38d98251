use anyhow::{Context, Result};
use sha2::{Digest, Sha256, Sha512};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::error::FetchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    /// Pick the algorithm from the length of a hex digest.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            64 => Some(Algorithm::Sha256),
            128 => Some(Algorithm::Sha512),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub algorithm: Algorithm,
    /// Lowercase hex.
    pub digest: String,
}

/// Expected digests keyed by filename, parsed from a `sha256sum`-style file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    pub entries: BTreeMap<String, ChecksumEntry>,
}

impl ChecksumManifest {
    pub fn get(&self, filename: &str) -> Option<&ChecksumEntry> {
        self.entries.get(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse lines of `<hex digest>  <filename>`; a `*` before the filename
/// (binary mode) is accepted. Blank lines and `#` comments are skipped.
pub fn parse_checksum_manifest(text: &str) -> Result<ChecksumManifest, FetchError> {
    let mut entries = BTreeMap::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad = |reason: &str| FetchError::BadManifestLine {
            line: idx + 1,
            reason: reason.to_string(),
        };

        let (digest, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| bad("expected `<digest>  <filename>`"))?;
        let filename = rest.trim_start().trim_start_matches('*');
        if filename.is_empty() {
            return Err(bad("missing filename"));
        }
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad("digest is not hex"));
        }
        let algorithm =
            Algorithm::from_hex_len(digest.len()).ok_or_else(|| bad("unsupported digest length"))?;

        entries.insert(
            filename.to_string(),
            ChecksumEntry {
                algorithm,
                digest: digest.to_ascii_lowercase(),
            },
        );
    }
    Ok(ChecksumManifest { entries })
}

/// Hex digest of the file at `path`.
pub fn file_digest(path: &Path, algorithm: Algorithm) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let digest = match algorithm {
        Algorithm::Sha256 => hash_reader::<Sha256, _>(reader)?,
        Algorithm::Sha512 => hash_reader::<Sha512, _>(reader)?,
    };
    Ok(digest)
}

fn hash_reader<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn parses_text_and_binary_mode_lines() -> Result<()> {
        let text = format!(
            "# PERM disclosure files\n{}  perm_2020.xlsx\n\n{} *perm_2021.xlsx\n",
            HELLO_SHA256,
            HELLO_SHA256.to_uppercase()
        );
        let manifest = parse_checksum_manifest(&text)?;
        assert_eq!(manifest.len(), 2);
        let entry = manifest.get("perm_2021.xlsx").expect("binary-mode entry");
        assert_eq!(entry.algorithm, Algorithm::Sha256);
        assert_eq!(entry.digest, HELLO_SHA256);
        Ok(())
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = parse_checksum_manifest("abc123  short.xlsx\n").unwrap_err();
        assert!(matches!(err, FetchError::BadManifestLine { line: 1, .. }));

        let err = parse_checksum_manifest(&format!("ok\n{}\n", HELLO_SHA256)).unwrap_err();
        assert!(matches!(err, FetchError::BadManifestLine { line: 1, .. }));

        let err = parse_checksum_manifest(&format!("{}\n", HELLO_SHA256)).unwrap_err();
        assert!(matches!(err, FetchError::BadManifestLine { .. }));
    }

    #[test]
    fn digest_matches_known_value() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(b"hello")?;
        assert_eq!(file_digest(tmp.path(), Algorithm::Sha256)?, HELLO_SHA256);
        assert_eq!(file_digest(tmp.path(), Algorithm::Sha512)?.len(), 128);
        Ok(())
    }
}
