//! Contract driven JSON serialization of wire records.
//!
//! Every wire record implements [`Contract`], describing its fields together with
//! [`FieldType`] flags. [`Serializer`] walks that description. It never fails: missing
//! required fields, reference cycles and values without a contract are logged and degrade
//! to partial output.

use crate::diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity};
use serde_json::{json, Map, Value};
use std::{fmt, ops::BitOr};

/// Flags of a contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType(u8);

impl FieldType {
    /// Optional field.
    pub const DEFAULT: FieldType = FieldType(0);
    /// Field that must be present.
    pub const REQUIRED: FieldType = FieldType(1);
    /// Field holding a list of records.
    pub const ARRAY: FieldType = FieldType(2);
    /// Field that is never written.
    pub const HIDDEN: FieldType = FieldType(4);

    /// Whether all flags of `other` are set.
    pub fn contains(self, other: FieldType) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FieldType {
    type Output = FieldType;

    fn bitor(self, rhs: FieldType) -> FieldType {
        FieldType(self.0 | rhs.0)
    }
}

/// Value of a contract field.
#[derive(Clone)]
pub enum FieldValue<'a> {
    /// Not set.
    Absent,
    /// Explicit JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Num(f64),
    /// String.
    Str(&'a str),
    /// Nested record.
    Object(&'a dyn Contract),
    /// List of nested records.
    Objects(Vec<&'a dyn Contract>),
    /// Free-form map without a contract, e.g. `properties`.
    Map(&'a Map<String, Value>),
    /// Free-form JSON without a contract.
    Json(&'a Value),
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Absent => f.write_str("Absent"),
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            FieldValue::Int(value) => f.debug_tuple("Int").field(value).finish(),
            FieldValue::Num(value) => f.debug_tuple("Num").field(value).finish(),
            FieldValue::Str(value) => f.debug_tuple("Str").field(value).finish(),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::Objects(objects) => write!(f, "Objects({} items)", objects.len()),
            FieldValue::Map(map) => f.debug_tuple("Map").field(map).finish(),
            FieldValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl<'a> From<Option<&'a str>> for FieldValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Str)
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Str(value)
    }
}

impl<'a> From<Option<&'a Map<String, Value>>> for FieldValue<'a> {
    fn from(value: Option<&'a Map<String, Value>>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Map)
    }
}

impl From<Option<f64>> for FieldValue<'_> {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Num)
    }
}

impl From<Option<i64>> for FieldValue<'_> {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Int)
    }
}

impl From<Option<bool>> for FieldValue<'_> {
    fn from(value: Option<bool>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Bool)
    }
}

/// One field of a [`Contract`].
#[derive(Debug)]
pub struct Field<'a> {
    /// JSON name.
    pub name: &'static str,
    /// Flags, evaluated when the contract is requested so they may depend on the value.
    pub kind: FieldType,
    /// Current value.
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    /// Create a field.
    pub fn new(name: &'static str, kind: FieldType, value: impl Into<FieldValue<'a>>) -> Self {
        Self {
            name,
            kind,
            value: value.into(),
        }
    }
}

/// Schema of a wire record.
pub trait Contract {
    /// Fields in serialization order.
    fn fields(&self) -> Vec<Field<'_>>;

    /// Name of the implementing type. A nested record may share its parent's address, so
    /// records in progress are told apart by address and type.
    #[doc(hidden)]
    fn contract_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Walks [`Contract`]s and produces JSON.
#[derive(Debug)]
pub struct Serializer<'l> {
    logger: &'l DiagnosticLogger,
}

impl<'l> Serializer<'l> {
    /// Create a serializer reporting problems to `logger`.
    pub fn new(logger: &'l DiagnosticLogger) -> Self {
        Self { logger }
    }

    /// Serialize `input` to a JSON string.
    pub fn serialize(&self, input: &dyn Contract) -> String {
        self.serialize_to_value(input).to_string()
    }

    /// Serialize `input` to a JSON value.
    pub fn serialize_to_value(&self, input: &dyn Contract) -> Value {
        let mut walk = Walk {
            logger: self.logger,
            in_progress: Vec::new(),
        };
        Value::Object(walk.object(input, "root"))
    }
}

struct Walk<'l> {
    logger: &'l DiagnosticLogger,
    /// Records currently being written, by address and type.
    in_progress: Vec<(*const (), &'static str)>,
}

impl Walk<'_> {
    fn object(&mut self, source: &dyn Contract, name: &str) -> Map<String, Value> {
        let key = (source as *const _ as *const (), source.contract_type());
        if self.in_progress.contains(&key) {
            self.logger.throw_internal(
                LoggingSeverity::Warning,
                InternalMessageId::CircularReferenceDetected,
                "Circular reference detected while serializing object",
                Some(json!({ "name": name })),
                true,
            );
            return Map::new();
        }

        self.in_progress.push(key);
        let mut output = Map::new();
        for field in source.fields() {
            let is_required = field.kind.contains(FieldType::REQUIRED);
            let is_hidden = field.kind.contains(FieldType::HIDDEN);
            let is_array = field.kind.contains(FieldType::ARRAY);
            let is_present = !matches!(field.value, FieldValue::Absent);

            if is_required && !is_present && !is_array {
                self.logger.throw_internal(
                    LoggingSeverity::Critical,
                    InternalMessageId::MissingRequiredFieldSpecification,
                    "Missing required field specification. The field is required but not present on source",
                    Some(json!({ "field": field.name, "name": name })),
                    false,
                );
                continue;
            }
            if is_hidden {
                continue;
            }

            if let Some(value) = self.field(field.value, is_array, field.name) {
                output.insert(field.name.to_string(), value);
            }
        }
        self.in_progress.pop();
        output
    }

    fn field(&mut self, value: FieldValue<'_>, is_array: bool, name: &str) -> Option<Value> {
        match value {
            FieldValue::Absent => None,
            FieldValue::Null => Some(Value::Null),
            FieldValue::Bool(b) => Some(Value::Bool(b)),
            FieldValue::Int(i) => Some(Value::from(i)),
            FieldValue::Num(n) => Some(Value::from(n)),
            FieldValue::Str(s) => Some(Value::from(s)),
            FieldValue::Objects(items) => Some(self.array(&items, name)),
            FieldValue::Json(Value::Array(items)) => Some(self.json_array(items, name)),
            FieldValue::Json(primitive) if !primitive.is_object() => Some(primitive.clone()),
            _ if is_array => {
                self.logger.throw_internal(
                    LoggingSeverity::Critical,
                    InternalMessageId::ItemNotInArray,
                    "This field was specified as an array in the contract but the item is not an array.\r\n",
                    Some(json!({ "name": name })),
                    true,
                );
                None
            }
            FieldValue::Object(object) => Some(Value::Object(self.object(object, name))),
            FieldValue::Map(map) => Some(self.without_contract(map, name)),
            FieldValue::Json(value) => match value {
                Value::Object(map) => Some(self.without_contract(map, name)),
                primitive => Some(primitive.clone()),
            },
        }
    }

    fn array(&mut self, items: &[&dyn Contract], name: &str) -> Value {
        Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| Value::Object(self.object(*item, &format!("{}[{}]", name, i))))
                .collect(),
        )
    }

    fn json_array(&mut self, items: &[Value], name: &str) -> Value {
        Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let name = format!("{}[{}]", name, i);
                    match item {
                        Value::Null => {
                            self.cannot_serialize(&name);
                            Value::Object(Map::new())
                        }
                        Value::Array(nested) => self.json_array(nested, &name),
                        Value::Object(map) => self.without_contract(map, &name),
                        primitive => {
                            self.non_serializable(&name);
                            primitive.clone()
                        }
                    }
                })
                .collect(),
        )
    }

    fn without_contract(&mut self, map: &Map<String, Value>, name: &str) -> Value {
        match name {
            "measurements" => Value::Object(number_map(map)),
            "properties" | "tags" => Value::Object(string_map(map)),
            _ => {
                self.non_serializable(name);
                Value::Object(map.clone())
            }
        }
    }

    fn cannot_serialize(&self, name: &str) {
        self.logger.throw_internal(
            LoggingSeverity::Critical,
            InternalMessageId::CannotSerializeObject,
            "cannot serialize object because it is null or undefined",
            Some(json!({ "name": name })),
            true,
        );
    }

    fn non_serializable(&self, name: &str) {
        self.logger.throw_internal(
            LoggingSeverity::Warning,
            InternalMessageId::CannotSerializeObjectNonSerializable,
            "Attempting to serialize an object which does not implement ISerializable",
            Some(json!({ "name": name })),
            true,
        );
    }
}

fn string_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::Null => "null".to_string(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), Value::String(text))
        })
        .collect()
}

fn number_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let number = match value {
                Value::Null => Value::from("null"),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.is_finite() => Value::Number(n.clone()),
                    _ => Value::from("NaN"),
                },
                // Infinite values have no JSON number and are written as null.
                Value::String(s) => match parse_float(s) {
                    Some(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
                    None => Value::from("NaN"),
                },
                Value::Bool(_) | Value::Array(_) | Value::Object(_) => Value::from("NaN"),
            };
            (key.clone(), number)
        })
        .collect()
}

/// Longest numeric prefix of `s`, read the way a lenient float parser does. `Infinity` is
/// accepted with an optional sign.
fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if s[end..].starts_with("Infinity") {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_digits = digits(end + 1 + sign);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }
    s[..end].parse().ok()
}
