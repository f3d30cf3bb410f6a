//! MD5 content digests used to detect changed files between packing runs

use md5::{Digest, Md5};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// MD5 digest of a file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
    /// Compute the digest of in-memory data
    pub fn from_data(data: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(data);
        Self::from_hasher(hasher)
    }

    /// Compute the digest of everything a reader yields
    pub fn from_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut hasher = Md5::new();
        io::copy(reader, &mut hasher)?;
        Ok(Self::from_hasher(hasher))
    }

    /// Compute the digest of a file on disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut file = File::open(path)?;
        Self::from_reader(&mut file)
    }

    /// Parse digest from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Lowercase hex form, as stored in entry records
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn from_hasher(hasher: Md5) -> Self {
        let result = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
