//! Pure transforms that turn on-disk schema definitions into the payloads the
//! engine accepts for an existing index.

use serde_json::{Map, Value, json};

/// Settings that can only be given when an index is created.
pub const NON_UPDATEABLE_SETTINGS: &[&str] = &[
    "index.knn",
    "index.number_of_shards",
    "index.codec",
    "index.mapping.single_type",
    "index.soft_deletes.enabled",
    "index.hidden",
];

/// Needs the analysis-phonetic plugin, which the cluster may not have.
pub const PHONETIC_ANALYZER: &str = "phonetic_analyzer";
/// Referenced by [`PHONETIC_ANALYZER`].
pub const METAPHONE_FILTER: &str = "metaphone_filter";
/// Sub-field name of the phonetic multi-field in mappings.
pub const PHONETIC_SUBFIELD: &str = "ph";

pub const SYNONYM_FILTER: &str = "synonym_filter";
pub const STOP_FILTER: &str = "stop_filter";

/// Quoted tokens in query templates that become mustache JSON interpolations.
pub const TEMPLATE_PLACEHOLDERS: &[&str] = &[
    "QUERY_VECTOR",
    "QUERY_FILTERS",
    "QUERY_MUSTS",
    "QUERY_SHOULDS",
    "QUERY_FMNOS",
    "QUERY_WORDS",
];

fn analysis_section<'a>(
    settings: &'a mut Map<String, Value>,
    section: &str,
) -> Option<&'a mut Map<String, Value>> {
    settings
        .get_mut("analysis")?
        .as_object_mut()?
        .get_mut(section)?
        .as_object_mut()
}

/// Removes the phonetic analyzer and then the filter it references.
/// Returns the names that were removed.
pub fn strip_plugin_analysis(settings: &mut Map<String, Value>) -> Vec<&'static str> {
    let mut removed = Vec::new();
    if let Some(analyzers) = analysis_section(settings, "analyzer")
        && analyzers.remove(PHONETIC_ANALYZER).is_some()
    {
        removed.push(PHONETIC_ANALYZER);
    }
    if let Some(filters) = analysis_section(settings, "filter")
        && filters.remove(METAPHONE_FILTER).is_some()
    {
        removed.push(METAPHONE_FILTER);
    }
    removed
}

/// Sets the word list of `filter` when the filter is defined.
fn set_filter_words(settings: &mut Map<String, Value>, filter: &str, key: &str, words: &[String]) {
    if let Some(definition) = analysis_section(settings, "filter")
        .and_then(|filters| filters.get_mut(filter))
        .and_then(Value::as_object_mut)
    {
        definition.insert(key.to_string(), json!(words));
    }
}

/// Removes a dotted setting whether it is written flat (`"index.codec"`),
/// nested (`{"index": {"codec": ..}}`) or anything in between.
pub fn remove_setting(settings: &mut Map<String, Value>, dotted: &str) -> bool {
    let mut removed = settings.remove(dotted).is_some();

    for (split, _) in dotted.match_indices('.') {
        let (head, rest) = (&dotted[..split], &dotted[split + 1..]);
        if let Some(Value::Object(child)) = settings.get_mut(head) {
            removed |= remove_setting(child, rest);
        }
    }
    removed
}

/// Settings for index creation: everything on disk except the plugin
/// dependent analysis, with empty synonym and stopword lists.
pub fn creation_settings(settings: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = settings.clone();
    for name in strip_plugin_analysis(&mut settings) {
        tracing::info!("Removing {name} from index creation (phonetic plugin may not be available)");
    }
    set_filter_words(&mut settings, SYNONYM_FILTER, "synonyms", &[]);
    set_filter_words(&mut settings, STOP_FILTER, "stopwords", &[]);
    settings
}

/// Settings for an update of an existing index.
pub fn reconcile_settings(
    settings: &Map<String, Value>,
    synonyms: &[String],
    stopwords: &[String],
) -> Map<String, Value> {
    let mut settings = settings.clone();

    for key in NON_UPDATEABLE_SETTINGS {
        if remove_setting(&mut settings, key) {
            tracing::info!("Skipping non-updateable setting: {key}");
        }
    }

    for name in strip_plugin_analysis(&mut settings) {
        tracing::info!("Removing {name} (phonetic plugin not available)");
    }

    set_filter_words(&mut settings, SYNONYM_FILTER, "synonyms", synonyms);
    set_filter_words(&mut settings, STOP_FILTER, "stopwords", stopwords);
    settings
}

/// Drops the phonetic sub-field from every `fields` block in a mapping tree.
/// A `fields` block left empty by the removal is dropped too.
pub fn strip_phonetic_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(strip_object(map)),
        Value::Array(items) => Value::Array(items.iter().map(strip_phonetic_fields).collect()),
        scalar => scalar.clone(),
    }
}

fn strip_object(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());
    for (key, child) in map {
        match (key.as_str(), strip_phonetic_fields(child)) {
            ("fields", Value::Object(mut fields)) if fields.contains_key(PHONETIC_SUBFIELD) => {
                fields.retain(|name, _| name != PHONETIC_SUBFIELD);
                if !fields.is_empty() {
                    out.insert(key.clone(), Value::Object(fields));
                }
            }
            (_, cleaned) => {
                out.insert(key.clone(), cleaned);
            }
        }
    }
    out
}

/// Wraps a query template as a stored mustache script for `index_name`.
pub fn render_template(index_name: &str, template: &Value) -> Result<Value, serde_json::Error> {
    let mut source = serde_json::to_string(template)?;
    for placeholder in TEMPLATE_PLACEHOLDERS {
        source = source.replace(
            &format!("\"{placeholder}\""),
            &format!("{{{{#toJson}}}}{placeholder}{{{{/toJson}}}}"),
        );
    }

    Ok(json!({
        "script": {
            "lang": "mustache",
            "index": index_name,
            "source": source
        }
    }))
}
