use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Desired schema state of one index, read from the migration base dir:
///
/// ```text
/// schema/<index>/settings.json   (optional)
/// schema/<index>/mapping.json
/// schema/<index>/synonyms.txt
/// schema/<index>/stopwords.txt
/// scripts/<index>/*.json
/// templates/*.json
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBundle {
    pub settings: Option<Map<String, Value>>,
    pub mappings: Value,
    pub synonyms: Vec<String>,
    pub stopwords: Vec<String>,
    pub scripts: BTreeMap<String, Value>,
    pub templates: BTreeMap<String, Value>,
}

impl SchemaBundle {
    pub fn load(base_dir: &Path, index_name: &str) -> AppResult<Self> {
        let schema_dir = base_dir.join("schema").join(index_name);

        let settings_path = schema_dir.join("settings.json");
        let settings = if settings_path.exists() {
            match read_json(&settings_path)? {
                Value::Object(map) => Some(map),
                other => {
                    return Err(AppError::Config(format!(
                        "{} must hold a JSON object, found {}",
                        settings_path.display(),
                        type_name(&other)
                    )));
                }
            }
        } else {
            tracing::warn!("No settings file at {}", settings_path.display());
            None
        };

        Ok(Self {
            settings,
            mappings: read_json(&schema_dir.join("mapping.json"))?,
            synonyms: parse_synonyms(&read_text(&schema_dir.join("synonyms.txt"))?),
            stopwords: parse_stopwords(&read_text(&schema_dir.join("stopwords.txt"))?),
            scripts: read_json_dir(&base_dir.join("scripts").join(index_name))?,
            templates: read_json_dir(&base_dir.join("templates"))?,
        })
    }
}

/// One synonym rule per non-blank line.
pub fn parse_synonyms(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Comma-separated words on any number of lines, trimmed and de-duplicated
/// in first-seen order.
pub fn parse_stopwords(text: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in text.lines().flat_map(|line| line.split(',')).map(str::trim) {
        if !word.is_empty() && !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
    }
    words
}

fn read_text(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))
}

fn read_json(path: &Path) -> AppResult<Value> {
    Ok(serde_json::from_str(&read_text(path)?)?)
}

/// Every `*.json` file in `dir`, keyed by file stem.
fn read_json_dir(dir: &Path) -> AppResult<BTreeMap<String, Value>> {
    let entries = std::fs::read_dir(dir).map_err(|e| AppError::io(dir, e))?;
    let mut files = BTreeMap::new();

    for entry in entries {
        let path: PathBuf = entry.map_err(|e| AppError::io(dir, e))?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        files.insert(name.to_string(), read_json(&path)?);
    }
    Ok(files)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
