//! A filesystem-backed [`Host`] implementation (§6): resolves `#include`/
//! `require` targets relative to the including file and a configured
//! search-path list, and reads source files with UTF-16 BOM sniffing.

use std::path::Path;

use anyhow::Context;
use precomp_core::{Host, PreprocessorConfig};

pub struct FileSystemHost {
    config: PreprocessorConfig,
}

impl FileSystemHost {
    pub fn new(config: PreprocessorConfig) -> Self {
        Self { config }
    }

    fn candidate_names(filename: &str, extensions: &[&str]) -> Vec<String> {
        if extensions.iter().any(|ext| filename.ends_with(&format!(".{ext}"))) {
            vec![filename.to_string()]
        } else {
            extensions.iter().map(|ext| format!("{filename}.{ext}")).collect()
        }
    }
}

impl Host for FileSystemHost {
    fn resolve_file(
        &self,
        filename: &str,
        from: &str,
        extensions: &[&str],
        search_paths: &[String],
    ) -> Option<String> {
        let candidates = Self::candidate_names(filename, extensions);
        let from_dir = Path::new(from).parent().unwrap_or_else(|| Path::new("."));

        for candidate in &candidates {
            let path = from_dir.join(candidate);
            if path.is_file() {
                return Some(normalize(&path));
            }
        }
        for search_path in search_paths {
            for candidate in &candidates {
                let path = Path::new(search_path).join(candidate);
                if path.is_file() {
                    return Some(normalize(&path));
                }
            }
        }
        None
    }

    fn read_file(&self, normalized_path: &str) -> Option<String> {
        read_source_file(Path::new(normalized_path)).ok()
    }

    fn exists(&self, normalized_path: &str) -> bool {
        Path::new(normalized_path).is_file()
    }

    fn file_name_to_uri(&self, path: &str) -> String {
        path.replace('\\', "/")
    }

    fn uri_to_file_name(&self, uri: &str) -> String {
        uri.to_string()
    }

    fn config(&self) -> PreprocessorConfig {
        self.config.clone()
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Reads `path`, decoding UTF-16 BOM-prefixed files the way game-script
/// toolchains commonly emit them, falling back to plain UTF-8.
fn read_source_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read source file at {path:?}"))?;

    if bytes.starts_with(&[0xFE, 0xFF]) {
        let words: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| (pair[0] as u16) << 8 | pair[1] as u16)
            .collect();
        String::from_utf16(&words).context("encoding error in UTF-16 (big-endian) file")
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        let words: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| pair[0] as u16 | (pair[1] as u16) << 8)
            .collect();
        String::from_utf16(&words).context("encoding error in UTF-16 (little-endian) file")
    } else {
        String::from_utf8(bytes).context("encoding error in UTF-8 file")
    }
}
