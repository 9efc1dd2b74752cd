//! Merge the installer's verbose log into the service log

use std::path::Path;
use tracing::{info, warn};

const UTF16LE_BOM: [u8; 2] = [0xff, 0xfe];
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Decode a verbose log: UTF-16LE when it starts with the UTF-16LE BOM,
/// otherwise UTF-8 (lossy, BOM stripped)
pub fn decode(raw: &[u8]) -> String {
    if let Some(body) = raw.strip_prefix(&UTF16LE_BOM) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let body = raw.strip_prefix(&UTF8_BOM).unwrap_or(raw);
    String::from_utf8_lossy(body).into_owned()
}

/// Log every line of `path` as `MSIEXEC: <line>`; returns the number of lines
pub fn merge(path: &Path) -> usize {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read installer log {:?}: {}", path, e);
            return 0;
        }
    };

    let text = decode(&raw);
    let mut count = 0;
    for line in text.lines() {
        info!(target: "msiexec", "MSIEXEC: {}", line);
        count += 1;
    }
    count
}
