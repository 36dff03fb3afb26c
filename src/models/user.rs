use serde::Serialize;
use serde_json::Value;

/// Outcome of one fetch-and-index run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub success: bool,
    pub total_users: usize,
    pub indexed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexReport {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            total_users: 0,
            indexed_count: 0,
            index_name: None,
            errors: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Accepts either `{"results": [...]}` or a bare array.
pub fn extract_records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Stable id from `login.uuid`, or `user_<position>` when the record has none.
pub fn document_id(record: &Value, position: usize) -> String {
    record["login"]["uuid"]
        .as_str()
        .filter(|uuid| !uuid.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("user_{position}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uses_login_uuid_when_present() {
        let user = json!({"login": {"uuid": "2f1c6f5e-aaaa", "username": "bluecat"}});
        assert_eq!(document_id(&user, 3), "2f1c6f5e-aaaa");
    }

    #[test]
    fn falls_back_to_position() {
        assert_eq!(document_id(&json!({"email": "a@b.c"}), 7), "user_7");
        assert_eq!(document_id(&json!({"login": {"uuid": null}}), 0), "user_0");
        assert_eq!(document_id(&json!({"login": {"uuid": 42}}), 1), "user_1");
    }

    #[test]
    fn extracts_results_envelope_and_bare_arrays() {
        let wrapped = json!({"results": [{"a": 1}, {"a": 2}], "info": {"seed": "x"}});
        assert_eq!(extract_records(wrapped).len(), 2);
        assert_eq!(extract_records(json!([{"a": 1}])).len(), 1);
        assert!(extract_records(json!({"info": {}})).is_empty());
        assert!(extract_records(json!("nope")).is_empty());
    }

    #[test]
    fn failed_report_omits_optional_fields() {
        let report = serde_json::to_value(IndexReport::failed("boom")).unwrap();
        assert_eq!(
            report,
            json!({"success": false, "total_users": 0, "indexed_count": 0, "error": "boom"})
        );
    }
}
