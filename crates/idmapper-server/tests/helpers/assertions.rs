//! Custom assertions para tests.

use serde_json::Value;

/// Verifica el cuerpo de error `{"error", "message"}`.
pub fn assert_error_body(json: &Value, error: &str) {
    assert_eq!(json["error"], error, "Unexpected error body: {}", json);
    assert!(
        json["message"].is_string(),
        "'message' should be a string: {}",
        json
    );
}

/// Verifica que el estado de un mapper tenga todos sus campos.
pub fn assert_mapper_status_schema(json: &Value) {
    let obj = json.as_object().expect("Status should be a JSON object");

    for field in [
        "name",
        "entries",
        "generation",
        "last_reload_age_secs",
        "failure_count",
        "last_error",
        "healthy",
        "interval_secs",
        "lookups",
    ] {
        assert!(obj.contains_key(field), "Missing '{}' field", field);
    }

    assert!(obj["name"].is_string(), "'name' should be a string");
    assert!(obj["entries"].is_u64(), "'entries' should be a number");
    assert!(obj["generation"].is_u64(), "'generation' should be a number");
    assert!(obj["healthy"].is_boolean(), "'healthy' should be a boolean");
    assert!(
        obj["last_error"].is_null() || obj["last_error"].is_string(),
        "'last_error' should be null or string"
    );
    assert!(obj["lookups"]["hits"].is_u64(), "'lookups.hits' should be a number");
}
