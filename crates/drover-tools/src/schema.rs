//! JSON-Schema derivation for tool parameters.
//!
//! The LLM tool-call protocol describes tools as JSON Schema objects. This
//! module derives those schemas from declared [`ParameterSpec`]s and recovers
//! specs back from schemas advertised by remote servers.

use serde_json::{json, Map, Value};

use drover_core::{ParameterSpec, Tool};

/// Derive the JSON Schema object for a tool's parameters, propagating
/// `enum`, `items`, `required` and `default` from the declared specs.
pub fn json_schema(tool: &dyn Tool) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, spec) in tool.parameters() {
        if spec.required {
            required.push(Value::String(name.clone()));
        }
        properties.insert(name, property_schema(&spec));
    }

    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": required,
    })
}

fn property_schema(spec: &ParameterSpec) -> Value {
    let mut prop = Map::new();
    prop.insert("type".into(), Value::String(spec.kind.clone()));
    prop.insert(
        "description".into(),
        Value::String(spec.description.clone()),
    );
    if let Some(default) = &spec.default {
        prop.insert("default".into(), default.clone());
    }
    if let Some(values) = &spec.allowed_values {
        prop.insert("enum".into(), Value::Array(values.clone()));
    }
    if let Some(items) = &spec.items {
        prop.insert("items".into(), property_schema(items));
    }
    Value::Object(prop)
}

/// Recover parameter specs from a JSON Schema object (the inverse used for
/// remote tool descriptors). Unknown or non-object schemas yield an empty
/// map; individual malformed properties are skipped.
pub fn parameters_from_schema(schema: &Value) -> std::collections::BTreeMap<String, ParameterSpec> {
    let mut params = std::collections::BTreeMap::new();

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return params;
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for (name, prop) in properties {
        let Some(spec) = spec_from_property(prop) else {
            continue;
        };
        let required = required.contains(&name.as_str());
        params.insert(name.clone(), ParameterSpec { required, ..spec });
    }

    params
}

fn spec_from_property(prop: &Value) -> Option<ParameterSpec> {
    let kind = prop.get("type")?.as_str()?.to_string();
    let description = prop
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut spec = ParameterSpec::optional(kind, description);
    if let Some(default) = prop.get("default") {
        spec.default = Some(default.clone());
    }
    if let Some(values) = prop.get("enum").and_then(Value::as_array) {
        spec.allowed_values = Some(values.clone());
    }
    if let Some(items) = prop.get("items").and_then(spec_from_property) {
        spec.items = Some(Box::new(items));
    }
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drover_core::{RequestContext, Result};
    use std::collections::BTreeMap;

    struct WeatherTool;

    #[async_trait]
    impl Tool for WeatherTool {
        fn name(&self) -> &str {
            "weather"
        }

        fn description(&self) -> &str {
            "Looks up the weather"
        }

        fn parameters(&self) -> BTreeMap<String, ParameterSpec> {
            BTreeMap::from([
                (
                    "city".to_string(),
                    ParameterSpec::required("string", "City name"),
                ),
                (
                    "units".to_string(),
                    ParameterSpec::optional("string", "Unit system")
                        .with_default(json!("metric"))
                        .with_allowed_values(vec![json!("metric"), json!("imperial")]),
                ),
                (
                    "days".to_string(),
                    ParameterSpec::optional("array", "Forecast days")
                        .with_items(ParameterSpec::required("number", "Day offset")),
                ),
            ])
        }

        async fn execute(&self, _ctx: &RequestContext, _args: &str) -> Result<String> {
            Ok("sunny".into())
        }
    }

    #[test]
    fn schema_propagates_required_default_enum_and_items() {
        let schema = json_schema(&WeatherTool);

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["city"]));
        assert_eq!(schema["properties"]["city"]["type"], "string");
        assert_eq!(schema["properties"]["units"]["default"], "metric");
        assert_eq!(
            schema["properties"]["units"]["enum"],
            json!(["metric", "imperial"])
        );
        assert_eq!(schema["properties"]["days"]["items"]["type"], "number");
    }

    #[test]
    fn schema_round_trips_back_to_specs() {
        let schema = json_schema(&WeatherTool);
        let params = parameters_from_schema(&schema);

        assert_eq!(params.len(), 3);
        assert!(params["city"].required);
        assert!(!params["units"].required);
        assert_eq!(params["units"].default, Some(json!("metric")));
        assert_eq!(params["days"].items.as_ref().unwrap().kind, "number");
    }

    #[test]
    fn malformed_schema_yields_empty_parameters() {
        assert!(parameters_from_schema(&json!("not a schema")).is_empty());
        assert!(parameters_from_schema(&json!({"properties": 3})).is_empty());
    }
}
