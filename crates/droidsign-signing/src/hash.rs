//! SHA-256 digests for before/after integrity records

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, SigningError};

/// Read size used while hashing
const CHUNK_SIZE: usize = 4096;

/// Compute the lowercase hex SHA-256 of a file.
///
/// The file is streamed in 4 KiB chunks and never held in memory as a whole.
pub fn digest(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| SigningError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| SigningError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
