//! An in-memory [`Host`] double for end-to-end scenario tests (§8), so
//! these tests exercise the whole pipeline without touching the filesystem.

use std::collections::HashMap;

use precomp_core::{Host, PreprocessorConfig};

pub struct InMemoryHost {
    files: HashMap<String, String>,
    config: PreprocessorConfig,
}

impl InMemoryHost {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files.iter().map(|(name, text)| (name.to_string(), text.to_string())).collect(),
            config: PreprocessorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PreprocessorConfig) -> Self {
        self.config = config;
        self
    }
}

impl Host for InMemoryHost {
    fn resolve_file(
        &self,
        filename: &str,
        _from: &str,
        extensions: &[&str],
        _search_paths: &[String],
    ) -> Option<String> {
        if self.files.contains_key(filename) {
            return Some(filename.to_string());
        }
        for ext in extensions {
            let candidate = format!("{filename}.{ext}");
            if self.files.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn read_file(&self, normalized_path: &str) -> Option<String> {
        self.files.get(normalized_path).cloned()
    }

    fn exists(&self, normalized_path: &str) -> bool {
        self.files.contains_key(normalized_path)
    }

    fn file_name_to_uri(&self, path: &str) -> String {
        path.to_string()
    }

    fn uri_to_file_name(&self, uri: &str) -> String {
        uri.to_string()
    }

    fn config(&self) -> PreprocessorConfig {
        self.config.clone()
    }
}
