use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Declared shape of a single capability parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Value>,
    #[serde(skip)]
    pub required: bool,
}

impl Parameter {
    pub fn string<D: Into<String>>(description: D) -> Self {
        Self::typed("string", description)
    }

    pub fn integer<D: Into<String>>(description: D) -> Self {
        Self::typed("integer", description)
    }

    fn typed<D: Into<String>>(kind: &str, description: D) -> Self {
        Parameter {
            kind: Some(kind.to_string()),
            description: description.into(),
            allowed: Vec::new(),
            required: false,
        }
    }

    /// A parameter restricted to a fixed list of values
    pub fn one_of<D, I, V>(description: D, values: I) -> Self
    where
        D: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Parameter {
            kind: None,
            description: description.into(),
            allowed: values.into_iter().map(Into::into).collect(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A capability as advertised to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique within one invocation
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, Parameter>,
}

impl CapabilityDescriptor {
    pub fn new<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        CapabilityDescriptor {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter<S: Into<String>>(mut self, name: S, parameter: Parameter) -> Self {
        self.parameters.insert(name.into(), parameter);
        self
    }

    /// Render the parameters as a JSON schema object
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, parameter) in &self.parameters {
            properties.insert(name.clone(), json!(parameter));
        }

        let required: Vec<&String> = self
            .parameters
            .iter()
            .filter(|(_, parameter)| parameter.required)
            .map(|(name, _)| name)
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}
