use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::Deserialize;
use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;

use crate::CasError;

/// A decoded extra attribute. `Null` stands for an empty value.
pub type AttributeValue = Value;

pub type ExtraAttributes = BTreeMap<String, AttributeValue>;

/// How the server serialized extra attribute values.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeEncoding {
    #[default]
    Yaml,
    Json,
    Raw,
}

impl Display for AttributeEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AttributeEncoding::Yaml => write!(f, "yaml"),
            AttributeEncoding::Json => write!(f, "json"),
            AttributeEncoding::Raw => write!(f, "raw"),
        }
    }
}

impl FromStr for AttributeEncoding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yaml" => Ok(AttributeEncoding::Yaml),
            "json" => Ok(AttributeEncoding::Json),
            "raw" => Ok(AttributeEncoding::Raw),
            _ => Err(()),
        }
    }
}

/// Decodes one serialized attribute value.
///
/// JSON that fails to parse falls back to the raw string; YAML that fails to
/// parse is an error. Scalars other than booleans come back as strings, while
/// sequences and mappings keep their structure.
pub fn decode_attribute_value(
    name: &str,
    value: &str,
    encoding: AttributeEncoding,
) -> Result<AttributeValue, CasError> {
    if value.is_empty() {
        return Ok(Value::Null);
    }

    let decoded = match encoding {
        AttributeEncoding::Raw => return Ok(Value::String(value.into())),
        AttributeEncoding::Json => {
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.into()))
        }
        AttributeEncoding::Yaml => serde_yaml::from_str(value)
            .map(from_yaml)
            .map_err(|source| CasError::InvalidAttribute {
                name: name.into(),
                value: value.into(),
                source,
            })?,
    };

    Ok(match decoded {
        Value::Number(number) => Value::String(number.to_string()),
        other => other,
    })
}

fn from_yaml(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(flag) => Value::Bool(flag),
        YamlValue::Number(number) => from_yaml_number(&number),
        YamlValue::String(text) => Value::String(text),
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(from_yaml).collect()),
        YamlValue::Mapping(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (yaml_key(key), from_yaml(value)))
                .collect::<Map<_, _>>(),
        ),
        YamlValue::Tagged(tagged) => from_yaml(tagged.value),
    }
}

// JSON numbers are finite; infinities and NaN are kept as their usual names.
fn from_yaml_number(number: &serde_yaml::Number) -> Value {
    if let Some(n) = number.as_u64() {
        return Value::from(n);
    }
    if let Some(n) = number.as_i64() {
        return Value::from(n);
    }
    let float = number.as_f64().unwrap_or(f64::NAN);
    match Number::from_f64(float) {
        Some(n) => Value::Number(n),
        None if float.is_nan() => Value::String("NaN".into()),
        None if float > 0.0 => Value::String("Infinity".into()),
        None => Value::String("-Infinity".into()),
    }
}

fn yaml_key(key: YamlValue) -> String {
    match from_yaml(key) {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
