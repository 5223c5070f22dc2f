//! Lightweight structural JSON Schema validation.
//!
//! Checks that the input is an object (when the schema says so), that
//! required fields are present, and that declared property types match.
//! This is intentionally not a full JSON Schema implementation — it
//! catches the obvious shape errors before a tool ever runs.

/// Validate `input` against a tool's `parameter_schema`.
///
/// Returns a human-readable message on the first violation found.
pub fn validate(input: &serde_json::Value, schema: &serde_json::Value) -> Result<(), String> {
    let Some(schema_obj) = schema.as_object() else {
        return Ok(());
    };

    if let Some(serde_json::Value::String(ty)) = schema_obj.get("type")
        && ty == "object"
        && !input.is_object()
    {
        return Err("expected object input".to_string());
    }

    let Some(input_obj) = input.as_object() else {
        return Ok(());
    };

    if let Some(serde_json::Value::Array(required)) = schema_obj.get("required") {
        for field in required {
            if let Some(field_name) = field.as_str()
                && !input_obj.contains_key(field_name)
            {
                return Err(format!("missing required field: {field_name}"));
            }
        }
    }

    if let Some(serde_json::Value::Object(properties)) = schema_obj.get("properties") {
        for (field_name, prop_schema) in properties {
            if let Some(value) = input_obj.get(field_name)
                && let Some(serde_json::Value::String(expected_type)) = prop_schema.get("type")
                && !json_type_matches(value, expected_type)
            {
                return Err(format!(
                    "field '{field_name}' expected type '{expected_type}', got {}",
                    json_type_name(value)
                ));
            }
        }
    }

    Ok(())
}

fn json_type_matches(value: &serde_json::Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
