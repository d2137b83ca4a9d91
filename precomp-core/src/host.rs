//! The external Host capability set (§6): the only surface the core
//! touches outside its own types. A filesystem-backed implementation lives
//! in `precomp-cli`; tests use an in-memory double (`tests/support.rs`).

/// The three host-configurable knobs (§6 `config.get`); `Default` matches
/// the documented defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessorConfig {
    pub enabled: bool,
    pub include_paths: Vec<String>,
    pub max_include_depth: u32,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_paths: vec![".".to_string()],
            max_include_depth: 5,
        }
    }
}

pub trait Host {
    /// Resolution policy (search order, extension matching) is entirely
    /// host-defined; the core only asks "given this spelling, relative to
    /// this file, with these candidate extensions and search paths, what
    /// normalized path does it name?".
    fn resolve_file(
        &self,
        filename: &str,
        from: &str,
        extensions: &[&str],
        search_paths: &[String],
    ) -> Option<String>;

    fn read_file(&self, normalized_path: &str) -> Option<String>;

    fn exists(&self, normalized_path: &str) -> bool;

    fn file_name_to_uri(&self, path: &str) -> String;

    fn uri_to_file_name(&self, uri: &str) -> String;

    /// Used only to improve provenance formatting; a host with no notion of
    /// workspaces returns an empty list.
    fn list_workspace_folders(&self) -> Vec<String> {
        Vec::new()
    }

    fn config(&self) -> PreprocessorConfig;
}
