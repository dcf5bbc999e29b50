//! Template loading.
//!
//! Parses a CloudFormation/SAM template (YAML or JSON) into a flat list of
//! resource declarations. YAML short-form intrinsics (`!Ref`, `!GetAtt`, `!Sub`,
//! ...) are rewritten into their long JSON form while loading, so everything
//! downstream only ever sees plain `serde_json::Value` trees.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use serde_yaml::value::TaggedValue;
use serde_yaml::Value as YamlValue;
use thiserror::Error;

/// Errors raised while loading a template. All of them abort the batch.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed YAML.
    #[error("template is not well-formed YAML")]
    Yaml(#[from] serde_yaml::Error),

    /// The document looked like JSON but is not well-formed JSON.
    #[error("template is not well-formed JSON")]
    Json(#[from] serde_json::Error),

    #[error("template does not contain a `Resources` mapping")]
    MissingResources,

    #[error("resource `{name}` is malformed: {reason}")]
    InvalidResource { name: String, reason: String },
}

impl TemplateError {
    /// True when the document itself could not be parsed as structured data.
    pub fn is_format_error(&self) -> bool {
        matches!(self, TemplateError::Yaml(_) | TemplateError::Json(_))
    }
}

pub type TemplateResult<T> = Result<T, TemplateError>;

/// One entry of the template's `Resources` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub logical_name: String,
    pub declared_type: String,
    /// The `Properties` mapping; an empty object when the declaration has none.
    pub properties: Value,
}

impl ResourceDecl {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A parsed template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    /// Declarations, ordered by logical name.
    pub resources: Vec<ResourceDecl>,
    /// Names declared under `Parameters`. These are inputs, never resources.
    pub parameters: BTreeSet<String>,
}

impl Template {
    /// Read and parse a template file.
    pub fn from_path(path: impl AsRef<Path>) -> TemplateResult<Self> {
        let path = path.as_ref();
        let body = fs::read_to_string(path)
            .map_err(|source| TemplateError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&body)
    }

    /// Parse a template document held in memory.
    pub fn parse(source: &str) -> TemplateResult<Self> {
        let doc = if source.trim_start().starts_with('{') {
            serde_json::from_str::<Value>(source)?
        } else {
            let yaml: YamlValue = serde_yaml::from_str(source)?;
            yaml_to_json(yaml)
        };

        let resources = doc
            .get("Resources")
            .and_then(Value::as_object)
            .ok_or(TemplateError::MissingResources)?;

        let mut decls = Vec::with_capacity(resources.len());
        for (name, body) in resources {
            decls.push(parse_declaration(name, body)?);
        }

        let parameters = doc
            .get("Parameters")
            .and_then(Value::as_object)
            .map(|params| params.keys().cloned().collect())
            .unwrap_or_default();

        Ok(Self { resources: decls, parameters })
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDecl> {
        self.resources.iter().find(|r| r.logical_name == name)
    }

    pub fn declared_type(&self, name: &str) -> Option<&str> {
        self.get(name).map(|r| r.declared_type.as_str())
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.parameters.contains(name)
    }
}

fn parse_declaration(name: &str, body: &Value) -> TemplateResult<ResourceDecl> {
    let invalid = |reason: &str| TemplateError::InvalidResource {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let body = body.as_object().ok_or_else(|| invalid("declaration is not a mapping"))?;
    let declared_type = body
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string `Type`"))?;

    let properties = match body.get("Properties") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(props @ Value::Object(_)) => props.clone(),
        Some(_) => return Err(invalid("`Properties` is not a mapping")),
    };

    Ok(ResourceDecl {
        logical_name: name.to_string(),
        declared_type: declared_type.to_string(),
        properties,
    })
}

/// Convert a YAML tree to JSON, expanding short-form intrinsic tags.
fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut out = Map::new();
            for (key, value) in mapping {
                out.insert(yaml_key(&key), yaml_to_json(value));
            }
            Value::Object(out)
        }
        YamlValue::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            let tag = tag.to_string();
            expand_short_form(tag.trim_start_matches('!'), yaml_to_json(value))
        }
    }
}

fn yaml_key(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(other).map(|s| s.trim().to_string()).unwrap_or_default(),
    }
}

/// `!Ref X` -> `{"Ref": X}`, `!GetAtt A.B` -> `{"Fn::GetAtt": ["A", "B"]}`,
/// `!Condition C` -> `{"Condition": C}`, any other `!Name v` -> `{"Fn::Name": v}`.
fn expand_short_form(tag: &str, value: Value) -> Value {
    let (key, value) = match tag {
        "Ref" => ("Ref".to_string(), value),
        "Condition" => ("Condition".to_string(), value),
        "GetAtt" => {
            let value = match value {
                Value::String(s) => {
                    let parts = match s.split_once('.') {
                        Some((name, attr)) => vec![Value::from(name), Value::from(attr)],
                        None => vec![Value::from(s.as_str())],
                    };
                    Value::Array(parts)
                }
                other => other,
            };
            ("Fn::GetAtt".to_string(), value)
        }
        other => (format!("Fn::{other}"), value),
    };
    let mut map = Map::new();
    map.insert(key, value);
    Value::Object(map)
}
