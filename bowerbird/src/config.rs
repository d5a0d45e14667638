use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use swatch::error::{Chainable, Result};
use swatch::value::Dict;

pub const CONFIG_FILE: &str = "config.toml";

/// Build settings, loaded from `config.toml` in the input directory.
/// Every field has a default; unknown keys become build globals.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Glob selecting pattern sources, relative to the input directory.
    pub patterns: String,
    /// Template directory, relative to the input directory.
    pub templates: String,
    /// Root key under which pattern ids are rooted; also the name of
    /// the source directory component the ids start from.
    pub root: String,
    /// Dot-path of the collection layout within the template tree.
    pub layout: String,
    /// Build-wide data exposed to templates and render contexts.
    #[serde(flatten)]
    pub globals: Dict,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            patterns: "patterns/**/*.html".into(),
            templates: "templates".into(),
            root: "patterns".into(),
            layout: "collection".into(),
            globals: Dict::new(),
        }
    }
}

impl Settings {
    pub fn load(input: &Path) -> Result<Settings> {
        let path = input.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).chain_with(|| swatch::error! {
                "failed to parse build settings",
                "file path" => path.display(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }
}
