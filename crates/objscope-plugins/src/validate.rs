//! Candidate-module authenticity check.
//!
//! A file is accepted as a plugin only if it carries the reserved
//! file-description marker in its embedded version information. The probe
//! scans the raw file image for the marker's UTF-16 byte representation, so
//! nothing is ever loaded into the process to make the decision. Any read
//! or map failure counts as "not a plugin".

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use objscope_plugin_api::OBJSCOPE_PLUGIN_FILE_DESCRIPTION;

use crate::error::{Error, Result};

/// True when `path` embeds the reserved plugin file description.
pub fn has_plugin_description(path: &Path) -> Result<bool> {
    let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    let len = file.metadata().map_err(|e| Error::io_at(path, e))?.len();
    if len == 0 {
        return Ok(false);
    }
    // SAFETY: read-only mapping; the probe only scans the bytes and the map
    // is dropped before any load decision acts on the file.
    let map = unsafe { Mmap::map(&file) }.map_err(|e| Error::io_at(path, e))?;
    Ok(contains_marker(&map))
}

fn marker_needle() -> Vec<u8> {
    OBJSCOPE_PLUGIN_FILE_DESCRIPTION
        .encode_utf16()
        .flat_map(u16::to_ne_bytes)
        .collect()
}

fn contains_marker(haystack: &[u8]) -> bool {
    let needle = marker_needle();
    if haystack.len() < needle.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_with_marker_is_accepted() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("candidate.bin");

        let mut bytes = vec![0x7fu8, b'E', b'L', b'F', 0, 0, 0, 0];
        bytes.extend_from_slice(&marker_needle());
        bytes.extend_from_slice(b"trailing image bytes");
        std::fs::write(&path, &bytes).expect("write candidate");

        assert!(has_plugin_description(&path).expect("probe candidate"));
    }

    #[test]
    fn file_without_marker_is_rejected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("unrelated.bin");
        std::fs::write(&path, b"just some library that is not ours").expect("write candidate");

        assert!(!has_plugin_description(&path).expect("probe candidate"));
    }

    #[test]
    fn empty_and_missing_files_fail_closed() {
        let dir = tempfile::tempdir().expect("create temp dir");

        let empty = dir.path().join("empty.bin");
        std::fs::write(&empty, b"").expect("write empty file");
        assert!(!has_plugin_description(&empty).expect("probe empty file"));

        assert!(has_plugin_description(&dir.path().join("missing.bin")).is_err());
    }

    #[test]
    fn partial_marker_is_not_enough() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("partial.bin");
        let needle = marker_needle();
        std::fs::write(&path, &needle[..needle.len() - 2]).expect("write truncated marker");

        assert!(!has_plugin_description(&path).expect("probe candidate"));
    }
}
