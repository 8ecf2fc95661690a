//! Tool catalog: static tool definitions and parameter validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{GatewayError, GatewayResult};

pub const CREATE_PAYMENT: &str = "create-payment";
pub const CHECK_PAYMENT_STATUS: &str = "check-payment-status";

/// Primitive type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: Option<String>,
    pub required: bool,
}

/// Wire form of a parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    pub r#type: String,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

/// Wire form of a catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// Immutable tool definition
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), params: Vec::new() }
    }

    pub fn required(self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.param(name, param_type, description, true)
    }

    pub fn optional(self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.param(name, param_type, description, false)
    }

    fn param(mut self, name: &str, param_type: ParamType, description: &str, required: bool) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            param_type,
            description: (!description.is_empty()).then(|| description.to_string()),
            required,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    pub fn input_schema(&self) -> ToolInputSchema {
        let mut properties = Map::new();
        for p in &self.params {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(p.param_type.as_str().into()));
            if let Some(desc) = &p.description {
                prop.insert("description".into(), Value::String(desc.clone()));
            }
            properties.insert(p.name.clone(), Value::Object(prop));
        }
        ToolInputSchema {
            r#type: "object".into(),
            properties,
            required: self.required_params().map(|p| p.name.clone()).collect(),
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }

    /// Check `arguments` against the schema.
    ///
    /// Required parameters must be present and non-null; any declared
    /// parameter that is present must have a compatible type. Undeclared
    /// parameters are ignored. Returns every violation, not just the first.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        for p in &self.params {
            match arguments.get(&p.name) {
                None | Some(Value::Null) => {
                    if p.required {
                        violations.push(format!("missing required parameter '{}'", p.name));
                    }
                }
                Some(v) if !p.param_type.accepts(v) => violations.push(format!(
                    "parameter '{}' must be of type {}",
                    p.name,
                    p.param_type.as_str()
                )),
                Some(_) => {}
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Ordered, immutable set of tool definitions
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
}

impl ToolCatalog {
    /// Build a catalog; tool names must be unique and non-empty
    pub fn new(tools: Vec<ToolDefinition>) -> GatewayResult<Self> {
        let mut seen = HashSet::new();
        for t in &tools {
            if t.name.trim().is_empty() {
                return Err(GatewayError::Config("tool name must not be empty".into()));
            }
            if !seen.insert(t.name.as_str()) {
                return Err(GatewayError::Config(format!("duplicate tool name '{}'", t.name)));
            }
        }
        Ok(Self { tools })
    }

    /// All tools in registration order
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(ToolDefinition::descriptor).collect()
    }
}

/// The two Gotas Commerce payment tools
pub fn payment_catalog() -> ToolCatalog {
    let tools = vec![
        ToolDefinition::new(CREATE_PAYMENT, "Creates a new payment in the Gotas Commerce API")
            .required("amount", ParamType::Number, "Payment amount (e.g., 100.50)")
            .required("currency", ParamType::String, "Currency code (e.g., \"USDT\")")
            .required("return_url", ParamType::String, "URL to redirect customer after payment")
            .optional("description", ParamType::String, "Optional description of the payment"),
        ToolDefinition::new(CHECK_PAYMENT_STATUS, "Checks the status of an existing payment")
            .required("payment_id", ParamType::String, "Identifier of the payment to check"),
    ];
    // Static names above are unique
    ToolCatalog { tools }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_payment_catalog_shape() {
        let catalog = payment_catalog();
        let names: Vec<_> = catalog.list().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec![CREATE_PAYMENT, CHECK_PAYMENT_STATUS]);

        let create = catalog.get(CREATE_PAYMENT).unwrap().input_schema();
        assert_eq!(create.r#type, "object");
        assert_eq!(create.required, vec!["amount", "currency", "return_url"]);
        assert_eq!(create.properties["amount"]["type"], json!("number"));
        assert!(create.properties.contains_key("description"));

        let check = catalog.get(CHECK_PAYMENT_STATUS).unwrap().input_schema();
        assert_eq!(check.required, vec!["payment_id"]);
    }

    #[test]
    fn test_descriptor_wire_shape() {
        let catalog = payment_catalog();
        let wire = serde_json::to_value(catalog.get(CHECK_PAYMENT_STATUS).unwrap().descriptor())
            .unwrap();
        assert_eq!(
            wire,
            json!({
                "name": "check-payment-status",
                "description": "Checks the status of an existing payment",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "payment_id": {
                            "type": "string",
                            "description": "Identifier of the payment to check"
                        }
                    },
                    "required": ["payment_id"]
                }
            })
        );
    }

    #[test]
    fn test_list_is_stable() {
        let catalog = payment_catalog();
        assert_eq!(catalog.descriptors(), catalog.descriptors());
    }

    #[test]
    fn test_validate_reports_all_violations() {
        let catalog = payment_catalog();
        let tool = catalog.get(CREATE_PAYMENT).unwrap();

        let errs = tool
            .validate(&args(json!({"amount": "100", "currency": null})))
            .unwrap_err();
        assert_eq!(errs.len(), 3);
        assert!(errs.iter().any(|e| e.contains("'amount' must be of type number")));
        assert!(errs.iter().any(|e| e.contains("missing required parameter 'currency'")));
        assert!(errs.iter().any(|e| e.contains("missing required parameter 'return_url'")));
    }

    #[test]
    fn test_validate_optional_and_extra_params() {
        let catalog = payment_catalog();
        let tool = catalog.get(CREATE_PAYMENT).unwrap();

        let ok = args(json!({
            "amount": 100.5, "currency": "USDT", "return_url": "https://x", "memo": 1
        }));
        assert!(tool.validate(&ok).is_ok());

        let bad_optional = args(json!({
            "amount": 1, "currency": "USDT", "return_url": "https://x", "description": 5
        }));
        assert_eq!(tool.validate(&bad_optional).unwrap_err().len(), 1);
    }

    #[test]
    fn test_integer_type() {
        assert!(ParamType::Integer.accepts(&json!(3)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
        assert!(ParamType::Number.accepts(&json!(3)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ToolCatalog::new(vec![
            ToolDefinition::new("a", "first"),
            ToolDefinition::new("a", "second"),
        ]);
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
