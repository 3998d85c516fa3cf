/// Completion settings and their loading.
///
/// Settings are layered: the user file
/// (`<config dir>/cppcomplete/config.toml`), then the workspace file
/// (`<workspace>/.cppcomplete.toml`), then the client's
/// `initializationOptions`.  Later layers override earlier ones key by
/// key at the top level of the table.  A layer that cannot be read or
/// parsed is skipped with a warning.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde::Deserialize;
use thiserror::Error;

/// Name of the per-workspace settings file.
pub const WORKSPACE_CONFIG_FILE: &str = ".cppcomplete.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid client settings: {0}")]
    Client(String),
}

/// How typed text is matched against candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseSensitivity {
    Full,
    #[default]
    FirstLetter,
    Insensitive,
}

/// A user-defined snippet offered in global completion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Snippet {
    pub trigger: String,
    /// Body in LSP snippet syntax (`$1`, `${2:name}`, `$0`).
    pub body: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub auto_insert_brackets: bool,
    pub space_after_function_name: bool,
    pub auto_insert_matching_characters: bool,
    pub case_sensitivity: CaseSensitivity,
    /// Identifier length that starts completion without an operator.
    pub character_threshold: usize,
    pub qt_signal_slot_completion: bool,
    /// Recognise `signals`, `slots` and `emit`.
    pub qt_keywords: bool,
    pub objc_enabled: bool,
    pub header_paths: Vec<PathBuf>,
    /// Extensions offered by include completion; names without an
    /// extension are always offered.
    pub header_suffixes: Vec<String>,
    /// Macros of the configuration unit, `NAME` or `NAME=value`.
    pub predefined_macros: Vec<String>,
    /// Namespace → alias used when proposing qualified names.
    pub namespace_aliases: BTreeMap<String, String>,
    pub snippets: Vec<Snippet>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            auto_insert_brackets: true,
            space_after_function_name: false,
            auto_insert_matching_characters: true,
            case_sensitivity: CaseSensitivity::FirstLetter,
            character_threshold: 3,
            qt_signal_slot_completion: true,
            qt_keywords: true,
            objc_enabled: true,
            header_paths: Vec::new(),
            header_suffixes: ["h", "hh", "hpp", "hxx", "h++", "inl", "tcc"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            predefined_macros: Vec::new(),
            namespace_aliases: BTreeMap::new(),
            snippets: Vec::new(),
        }
    }
}

impl CompletionSettings {
    /// Names of the predefined macros.
    pub fn predefined_macro_names(&self) -> impl Iterator<Item = &str> {
        self.predefined_macros.iter().filter_map(|def| {
            let def = def.trim().trim_start_matches("#define").trim();
            let end = def
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(def.len());
            (end > 0).then(|| &def[..end])
        })
    }

    /// Header paths with relative entries anchored at `root`.
    pub fn resolved_header_paths(&self, root: Option<&Path>) -> Vec<PathBuf> {
        self.header_paths
            .iter()
            .map(|p| match root {
                Some(root) if p.is_relative() => root.join(p),
                _ => p.clone(),
            })
            .collect()
    }
}

/// Path of the per-user settings file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("cppcomplete").join("config.toml"))
}

/// Load settings for `workspace_root`, overlaying `client` options last.
pub fn load(
    workspace_root: Option<&Path>,
    client: Option<&serde_json::Value>,
) -> CompletionSettings {
    let mut layers: Vec<PathBuf> = Vec::new();
    layers.extend(user_config_path());
    if let Some(root) = workspace_root {
        layers.push(root.join(WORKSPACE_CONFIG_FILE));
    }

    let mut merged = toml::Table::new();
    for path in &layers {
        match read_layer(path) {
            Ok(Some(table)) => {
                tracing::debug!("cppcomplete: loaded settings from {}", path.display());
                merged.extend(table);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("cppcomplete: {e}"),
        }
    }
    if let Some(options) = client.filter(|v| !v.is_null()) {
        match client_layer(options) {
            Ok(table) => merged.extend(table),
            Err(e) => tracing::warn!("cppcomplete: {e}"),
        }
    }
    from_table(merged)
}

/// Parse settings from TOML text, for callers that manage files
/// themselves.
pub fn parse(text: &str, origin: &Path) -> Result<CompletionSettings, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })
}

fn read_layer(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let table: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(table))
}

fn client_layer(options: &serde_json::Value) -> Result<toml::Table, ConfigError> {
    serde_json::from_value(options.clone()).map_err(|e| ConfigError::Client(e.to_string()))
}

/// Deserialize a merged table, falling back to defaults when a value has
/// the wrong shape.
fn from_table(table: toml::Table) -> CompletionSettings {
    let text = match toml::to_string(&table) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("cppcomplete: could not re-serialize settings: {e}");
            return CompletionSettings::default();
        }
    };
    match toml::from_str(&text) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("cppcomplete: invalid settings, using defaults: {e}");
            CompletionSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = parse(
            "character_threshold = 2\ncase_sensitivity = \"insensitive\"\n",
            Path::new("x.toml"),
        )
        .unwrap();
        assert_eq!(settings.character_threshold, 2);
        assert_eq!(settings.case_sensitivity, CaseSensitivity::Insensitive);
        assert!(settings.auto_insert_brackets);
        assert!(settings.header_suffixes.iter().any(|s| s == "hpp"));
    }

    #[test]
    fn test_syntax_error_is_reported_with_path() {
        let err = parse("character_threshold = ", Path::new("/w/.cppcomplete.toml")).unwrap_err();
        assert!(err.to_string().contains("/w/.cppcomplete.toml"), "got: {err}");
    }

    #[test]
    fn test_workspace_file_and_client_options_layer() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        std::fs::write(
            dir.join(WORKSPACE_CONFIG_FILE),
            "auto_insert_brackets = false\nheader_paths = [\"include\"]\n",
        )
        .unwrap();
        let client = serde_json::json!({ "space_after_function_name": true });
        let settings = load(Some(&dir), Some(&client));
        assert!(!settings.auto_insert_brackets);
        assert!(settings.space_after_function_name);
        assert_eq!(
            settings.resolved_header_paths(Some(&dir)),
            vec![dir.join("include")]
        );
    }

    #[test]
    fn test_predefined_macro_names() {
        let settings = CompletionSettings {
            predefined_macros: vec![
                "QT_CORE_LIB".into(),
                "VERSION=3".into(),
                "#define MAX(a, b) ((a) > (b) ? (a) : (b))".into(),
            ],
            ..CompletionSettings::default()
        };
        let names: Vec<&str> = settings.predefined_macro_names().collect();
        assert_eq!(names, vec!["QT_CORE_LIB", "VERSION", "MAX"]);
    }
}
