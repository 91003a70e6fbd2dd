//! Format bridge: YAML, JSON and TOML conversion for templates
//!
//! The fallible core (`encode`, `decode`, `decode_map`, `decode_seq`,
//! `decode_documents`) returns `Result<_, BridgeError>` for Rust callers.
//! The template-facing functions wrap it and never fail the call; a
//! failure is folded back into the returned data instead:
//!
//! | Function | On failure |
//! |---|---|
//! | `to_yaml`, `to_json` | empty string |
//! | `to_toml` | the error description |
//! | `from_yaml`, `from_json` | `{"Error": description}` |
//! | `from_yaml_array`, `from_json_array` | `[description]` |
//! | `from_yaml_document` | `[{"Error": description}]` |
//!
//! Decoders build values through `serde_json::Value`, so map keys are
//! always strings and YAML is read the way a YAML-to-JSON conversion
//! would read it: scalar keys are stringified and a repeated key keeps its
//! last value.

use minijinja::Value;
use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, IgnoredAny, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::ser::Error as _;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::error::BridgeError;

/// Reserved key carrying the error description in map-shaped results
pub const ERROR_KEY: &str = "Error";

/// Lookahead used to decide whether a document stream is JSON or YAML
const SNIFF_LEN: usize = 256;

/// A decoded mapping document
pub type Object = Map<String, JsonValue>;

/// Textual interchange formats understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

/// Encode a value to text in the given format.
///
/// YAML and TOML are produced from the value's JSON form, so all three
/// reject the same inputs (for example map keys that are sequences). TOML
/// has no null: `null` map entries are left out of the document.
pub fn encode(value: &Value, format: Format) -> Result<String, BridgeError> {
    match format {
        Format::Yaml => {
            let json = serde_json::to_value(value)?;
            Ok(serde_yaml::to_string(&json)?)
        }
        Format::Json => Ok(serde_json::to_string(value)?),
        Format::Toml => {
            let mut json = serde_json::to_value(value).map_err(toml::ser::Error::custom)?;
            drop_null_entries(&mut json);
            Ok(toml::to_string(&json)?)
        }
    }
}

/// Decode a single document into its JSON tree.
///
/// Empty (or whitespace-only) YAML decodes to `null`.
pub fn decode(text: &str, format: Format) -> Result<JsonValue, BridgeError> {
    match format {
        Format::Yaml => {
            if text.trim().is_empty() {
                return Ok(JsonValue::Null);
            }
            let YamlTree(json) = serde_yaml::from_str(text)?;
            Ok(json)
        }
        Format::Json => Ok(serde_json::from_str(text)?),
        Format::Toml => Ok(toml::from_str(text)?),
    }
}

/// Decode a single document that must be a mapping. `null` yields an empty map.
pub fn decode_map(text: &str, format: Format) -> Result<Object, BridgeError> {
    decode(text, format).and_then(into_object)
}

/// Decode a single document that must be a sequence. `null` yields an empty sequence.
pub fn decode_seq(text: &str, format: Format) -> Result<Vec<JsonValue>, BridgeError> {
    match decode(text, format)? {
        JsonValue::Array(items) => Ok(items),
        JsonValue::Null => Ok(Vec::new()),
        other => Err(BridgeError::Shape {
            expected: "sequence",
            found: json_kind(&other),
        }),
    }
}

/// Decode every document of a YAML or JSON stream into mappings.
///
/// The first non-whitespace byte within the lookahead window picks the
/// syntax: `{` means a stream of concatenated JSON objects, anything else a
/// YAML stream separated by `---` lines. Blank chunks between separators
/// are skipped; a chunk holding only comments decodes to an empty map.
/// Decoding stops at the first error.
pub fn decode_documents(text: &str) -> Result<Vec<Object>, BridgeError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    if looks_like_json(text) {
        for document in serde_json::Deserializer::from_str(text).into_iter::<JsonValue>() {
            documents.push(into_object(document?)?);
        }
    } else {
        for chunk in yaml_chunks(text) {
            let YamlTree(json) = serde_yaml::from_str(chunk)?;
            documents.push(into_object(json)?);
        }
    }

    Ok(documents)
}

// ============ Template functions ============

/// Convert a value to YAML, or `""` if it cannot be encoded
///
/// Usage: {{ toYaml(values.config) }}
pub fn to_yaml(value: Value) -> String {
    swallow("toYaml", encode(&value, Format::Yaml))
}

/// Convert a value to JSON, or `""` if it cannot be encoded
///
/// Usage: {{ toJson(values.config) }}
pub fn to_json(value: Value) -> String {
    swallow("toJson", encode(&value, Format::Json))
}

/// Convert a value to TOML. On failure the error description is returned
/// in place of the document.
///
/// Usage: {{ toToml(values.config) }}
pub fn to_toml(value: Value) -> String {
    encode(&value, Format::Toml).unwrap_or_else(|err| {
        tracing::debug!(function = "toToml", error = %err, "returning encode error as text");
        err.to_string()
    })
}

/// Parse a YAML mapping
///
/// Usage: {{ fromYaml(files.get("config.yaml")).port }}
pub fn from_yaml(text: String) -> Value {
    map_or_error("fromYaml", decode_map(&text, Format::Yaml))
}

/// Parse a YAML sequence
pub fn from_yaml_array(text: String) -> Value {
    seq_or_error("fromYamlArray", decode_seq(&text, Format::Yaml))
}

/// Parse every document of a YAML (or JSON) stream into a list of mappings
///
/// Usage: {% for doc in fromYamlDocument(manifest) %}{{ doc.kind }}{% endfor %}
pub fn from_yaml_document(text: String) -> Value {
    let documents = decode_documents(&text).unwrap_or_else(|err| {
        tracing::debug!(function = "fromYamlDocument", error = %err, "discarding document stream");
        vec![error_object(&err)]
    });
    Value::from_serialize(documents)
}

/// Parse a JSON object
pub fn from_json(text: String) -> Value {
    map_or_error("fromJson", decode_map(&text, Format::Json))
}

/// Parse a JSON array
pub fn from_json_array(text: String) -> Value {
    seq_or_error("fromJsonArray", decode_seq(&text, Format::Json))
}

// ============ Error folding ============

fn swallow(function: &'static str, result: Result<String, BridgeError>) -> String {
    match result {
        Ok(mut text) => {
            if text.ends_with('\n') {
                text.pop();
            }
            text
        }
        Err(err) => {
            tracing::debug!(function, error = %err, "swallowing encode error");
            String::new()
        }
    }
}

fn map_or_error(function: &'static str, result: Result<Object, BridgeError>) -> Value {
    let object = result.unwrap_or_else(|err| {
        tracing::debug!(function, error = %err, "embedding decode error");
        error_object(&err)
    });
    Value::from_serialize(JsonValue::Object(object))
}

fn seq_or_error(function: &'static str, result: Result<Vec<JsonValue>, BridgeError>) -> Value {
    let items = result.unwrap_or_else(|err| {
        tracing::debug!(function, error = %err, "embedding decode error");
        vec![JsonValue::String(err.to_string())]
    });
    Value::from_serialize(JsonValue::Array(items))
}

fn error_object(err: &BridgeError) -> Object {
    let mut object = Object::new();
    object.insert(ERROR_KEY.to_string(), JsonValue::String(err.to_string()));
    object
}

// ============ YAML to JSON ============

fn looks_like_json(text: &str) -> bool {
    text.as_bytes()
        .iter()
        .take(SNIFF_LEN)
        .find(|b| !b.is_ascii_whitespace())
        == Some(&b'{')
}

fn into_object(value: JsonValue) -> Result<Object, BridgeError> {
    match value {
        JsonValue::Object(object) => Ok(object),
        JsonValue::Null => Ok(Object::new()),
        other => Err(BridgeError::Shape {
            expected: "map",
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "map",
    }
}

fn drop_null_entries(value: &mut JsonValue) {
    match value {
        JsonValue::Object(object) => {
            object.retain(|_, entry| !entry.is_null());
            object.values_mut().for_each(drop_null_entries);
        }
        JsonValue::Array(items) => items.iter_mut().for_each(drop_null_entries),
        _ => {}
    }
}

/// Split a YAML stream on `---` lines, dropping chunks with no content.
///
/// A separator line may carry a trailing comment. Anything else after the
/// marker stays in the chunk for the parser to judge.
fn yaml_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if is_separator(line) {
            chunks.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    chunks.push(&text[start..]);

    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

fn is_separator(line: &str) -> bool {
    line.strip_prefix("---").is_some_and(|rest| {
        let rest = rest.trim();
        rest.is_empty() || rest.starts_with('#')
    })
}

/// JSON tree read straight from a YAML document
struct YamlTree(JsonValue);

impl<'de> Deserialize<'de> for YamlTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TreeVisitor).map(YamlTree)
    }
}

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a YAML value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<JsonValue, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonValue, E> {
        Ok(JsonValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonValue, E> {
        Ok(JsonValue::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonValue, E> {
        serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .ok_or_else(|| E::custom(BridgeError::NonFiniteNumber(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<JsonValue, A::Error> {
        let mut items = Vec::new();
        while let Some(YamlTree(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JsonValue, A::Error> {
        let mut object = Object::new();
        // Last occurrence of a key wins
        while let Some((YamlKey(key), YamlTree(value))) = map.next_entry()? {
            object.insert(key, value);
        }
        Ok(JsonValue::Object(object))
    }

    // Custom tags are dropped, the tagged content is kept
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<JsonValue, A::Error> {
        let (IgnoredAny, variant) = data.variant::<IgnoredAny>()?;
        variant.newtype_variant::<YamlTree>().map(|YamlTree(value)| value)
    }
}

/// Scalar mapping key in its JSON string form
struct YamlKey(String);

impl<'de> Deserialize<'de> for YamlKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KeyVisitor).map(YamlKey)
    }
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a scalar mapping key")
    }

    fn visit_unit<E: de::Error>(self) -> Result<String, E> {
        Ok("null".to_string())
    }

    fn visit_none<E: de::Error>(self) -> Result<String, E> {
        Ok("null".to_string())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<String, A::Error> {
        Err(de::Error::custom(BridgeError::NonScalarKey { found: "sequence" }))
    }

    fn visit_map<A: MapAccess<'de>>(self, _map: A) -> Result<String, A::Error> {
        Err(de::Error::custom(BridgeError::NonScalarKey { found: "map" }))
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<String, A::Error> {
        let (IgnoredAny, variant) = data.variant::<IgnoredAny>()?;
        variant.newtype_variant::<YamlKey>().map(|YamlKey(key)| key)
    }
}
