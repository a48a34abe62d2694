//! Typed values and their JSON interchange encoding.
//!
//! Script arguments, script results and event payloads all travel as JSON
//! objects of the form `{"type": "<Type>", "value": ...}`. [`Value`] is the
//! tagged in-memory form; [`Value::from_json`] and [`Value::to_json`] are the
//! codec.

use std::fmt;

use serde_json::{json, Map, Value as Json};

use crate::address::Address;
use crate::error::{Error, Result};

/// Number of decimal places of the fixed-point types.
pub const FIX64_SCALE: usize = 8;

/// Numeric type tags. All numbers are kept in their decimal string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberType {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Word8,
    Word16,
    Word32,
    Word64,
    Fix64,
    UFix64,
}

impl NumberType {
    const ALL: [NumberType; 20] = [
        NumberType::Int,
        NumberType::Int8,
        NumberType::Int16,
        NumberType::Int32,
        NumberType::Int64,
        NumberType::Int128,
        NumberType::Int256,
        NumberType::UInt,
        NumberType::UInt8,
        NumberType::UInt16,
        NumberType::UInt32,
        NumberType::UInt64,
        NumberType::UInt128,
        NumberType::UInt256,
        NumberType::Word8,
        NumberType::Word16,
        NumberType::Word32,
        NumberType::Word64,
        NumberType::Fix64,
        NumberType::UFix64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumberType::Int => "Int",
            NumberType::Int8 => "Int8",
            NumberType::Int16 => "Int16",
            NumberType::Int32 => "Int32",
            NumberType::Int64 => "Int64",
            NumberType::Int128 => "Int128",
            NumberType::Int256 => "Int256",
            NumberType::UInt => "UInt",
            NumberType::UInt8 => "UInt8",
            NumberType::UInt16 => "UInt16",
            NumberType::UInt32 => "UInt32",
            NumberType::UInt64 => "UInt64",
            NumberType::UInt128 => "UInt128",
            NumberType::UInt256 => "UInt256",
            NumberType::Word8 => "Word8",
            NumberType::Word16 => "Word16",
            NumberType::Word32 => "Word32",
            NumberType::Word64 => "Word64",
            NumberType::Fix64 => "Fix64",
            NumberType::UFix64 => "UFix64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    fn signed(self) -> bool {
        matches!(
            self,
            NumberType::Int
                | NumberType::Int8
                | NumberType::Int16
                | NumberType::Int32
                | NumberType::Int64
                | NumberType::Int128
                | NumberType::Int256
                | NumberType::Fix64
        )
    }

    /// Inclusive bounds for types that fit in an i128, None for unbounded or wider types.
    fn bounds(self) -> Option<(i128, i128)> {
        match self {
            NumberType::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            NumberType::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            NumberType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            NumberType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            NumberType::UInt8 | NumberType::Word8 => Some((0, u8::MAX as i128)),
            NumberType::UInt16 | NumberType::Word16 => Some((0, u16::MAX as i128)),
            NumberType::UInt32 | NumberType::Word32 => Some((0, u32::MAX as i128)),
            NumberType::UInt64 | NumberType::Word64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }

    /// Maximum number of decimal digits for the wide fixed-width types.
    fn max_digits(self) -> Option<usize> {
        match self {
            NumberType::Int128 | NumberType::UInt128 => Some(39),
            NumberType::Int256 | NumberType::UInt256 => Some(78),
            _ => None,
        }
    }

    fn fixed_point(self) -> bool {
        matches!(self, NumberType::Fix64 | NumberType::UFix64)
    }

    /// Validate a literal and return its canonical string form.
    pub fn normalize(self, literal: &str) -> Result<String> {
        let literal = literal.trim();
        let bad = |reason: &str| {
            Error::parse(
                format!("{} value", self.name()),
                format!("'{}' {}", literal, reason),
            )
        };

        let (negative, digits) = match literal.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, literal),
        };
        if negative && !self.signed() {
            return Err(bad("must not be negative"));
        }

        if self.fixed_point() {
            let (int_part, frac_part) = match digits.split_once('.') {
                Some((i, f)) => (i, f),
                None => (digits, ""),
            };
            if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad("is not a decimal number"));
            }
            if !frac_part.bytes().all(|b| b.is_ascii_digit()) || frac_part.len() > FIX64_SCALE {
                return Err(bad("must have at most 8 decimal places"));
            }
            let int_value: u64 = int_part.parse().map_err(|_| bad("is out of range"))?;
            let limit = if self == NumberType::Fix64 { 92_233_720_368u64 } else { 184_467_440_737u64 };
            if int_value > limit {
                return Err(bad("is out of range"));
            }
            let sign = if negative { "-" } else { "" };
            return Ok(format!(
                "{}{}.{:0<width$}",
                sign,
                int_value,
                frac_part,
                width = FIX64_SCALE
            ));
        }

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad("is not an integer"));
        }
        let trimmed = digits.trim_start_matches('0');
        let trimmed = if trimmed.is_empty() { "0" } else { trimmed };

        if let Some((min, max)) = self.bounds() {
            let magnitude: i128 = trimmed.parse().map_err(|_| bad("is out of range"))?;
            let value = if negative { -magnitude } else { magnitude };
            if value < min || value > max {
                return Err(bad("is out of range"));
            }
        } else if let Some(max_digits) = self.max_digits() {
            if trimmed.len() > max_digits {
                return Err(bad("is out of range"));
            }
        }

        if negative && trimmed != "0" {
            Ok(format!("-{}", trimmed))
        } else {
            Ok(trimmed.to_string())
        }
    }
}

/// Kinds of composite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Struct,
    Resource,
    Event,
    Contract,
    Enum,
}

impl CompositeKind {
    pub fn name(self) -> &'static str {
        match self {
            CompositeKind::Struct => "Struct",
            CompositeKind::Resource => "Resource",
            CompositeKind::Event => "Event",
            CompositeKind::Contract => "Contract",
            CompositeKind::Enum => "Enum",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Struct" => Some(CompositeKind::Struct),
            "Resource" => Some(CompositeKind::Resource),
            "Event" => Some(CompositeKind::Event),
            "Contract" => Some(CompositeKind::Contract),
            "Enum" => Some(CompositeKind::Enum),
            _ => None,
        }
    }
}

/// A typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Optional(Option<Box<Value>>),
    Bool(bool),
    String(String),
    Character(String),
    Address(Address),
    Number(NumberType, String),
    Array(Vec<Value>),
    Dictionary(Vec<(Value, Value)>),
    Composite {
        kind: CompositeKind,
        id: String,
        fields: Vec<(String, Value)>,
    },
    Path {
        domain: String,
        identifier: String,
    },
    Type(String),
    Capability {
        path: String,
        address: Address,
        borrow_type: String,
    },
}

impl Value {
    /// Build a number after validating the literal.
    pub fn number(ty: NumberType, literal: &str) -> Result<Self> {
        Ok(Value::Number(ty, ty.normalize(literal)?))
    }

    /// Byte array as `[UInt8]`.
    pub fn bytes(bytes: &[u8]) -> Self {
        Value::Array(
            bytes
                .iter()
                .map(|b| Value::Number(NumberType::UInt8, b.to_string()))
                .collect(),
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "Void",
            Value::Optional(_) => "Optional",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Character(_) => "Character",
            Value::Address(_) => "Address",
            Value::Number(ty, _) => ty.name(),
            Value::Array(_) => "Array",
            Value::Dictionary(_) => "Dictionary",
            Value::Composite { kind, .. } => kind.name(),
            Value::Path { .. } => "Path",
            Value::Type(_) => "Type",
            Value::Capability { .. } => "Capability",
        }
    }

    /// Full static type, as written in a parameter list.
    ///
    /// Element types of empty containers cannot be inferred and fall back to
    /// `AnyStruct`.
    pub fn type_id(&self) -> String {
        match self {
            Value::Optional(Some(inner)) => format!("{}?", inner.type_id()),
            Value::Optional(None) => "AnyStruct?".to_string(),
            Value::Array(items) => match items.first() {
                Some(first) => format!("[{}]", first.type_id()),
                None => "[AnyStruct]".to_string(),
            },
            Value::Dictionary(entries) => match entries.first() {
                Some((k, v)) => format!("{{{}: {}}}", k.type_id(), v.type_id()),
                None => "{String: AnyStruct}".to_string(),
            },
            Value::Composite { id, .. } => id.clone(),
            Value::Capability { borrow_type, .. } => format!("Capability<{}>", borrow_type),
            other => other.type_name().to_string(),
        }
    }

    /// Field of a composite value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Composite { fields, .. } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Unwrap optionals to the inner value.
    pub fn unwrap_optional(&self) -> Option<&Value> {
        match self {
            Value::Optional(Some(inner)) => inner.unwrap_optional(),
            Value::Optional(None) => None,
            other => Some(other),
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self.unwrap_optional()? {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_optional()? {
            Value::String(s) | Value::Character(s) => Some(s),
            Value::Number(_, s) => Some(s),
            _ => None,
        }
    }

    // ===== JSON codec =====

    pub fn to_json(&self) -> Json {
        match self {
            Value::Void => json!({ "type": "Void" }),
            Value::Optional(inner) => json!({
                "type": "Optional",
                "value": inner.as_ref().map(|v| v.to_json()),
            }),
            Value::Bool(b) => json!({ "type": "Bool", "value": b }),
            Value::String(s) => json!({ "type": "String", "value": s }),
            Value::Character(s) => json!({ "type": "Character", "value": s }),
            Value::Address(a) => json!({ "type": "Address", "value": a.hex_with_prefix() }),
            Value::Number(ty, s) => json!({ "type": ty.name(), "value": s }),
            Value::Array(items) => json!({
                "type": "Array",
                "value": items.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
            Value::Dictionary(entries) => json!({
                "type": "Dictionary",
                "value": entries
                    .iter()
                    .map(|(k, v)| json!({ "key": k.to_json(), "value": v.to_json() }))
                    .collect::<Vec<_>>(),
            }),
            Value::Composite { kind, id, fields } => json!({
                "type": kind.name(),
                "value": {
                    "id": id,
                    "fields": fields
                        .iter()
                        .map(|(n, v)| json!({ "name": n, "value": v.to_json() }))
                        .collect::<Vec<_>>(),
                },
            }),
            Value::Path { domain, identifier } => json!({
                "type": "Path",
                "value": { "domain": domain, "identifier": identifier },
            }),
            Value::Type(static_type) => json!({
                "type": "Type",
                "value": { "staticType": static_type },
            }),
            Value::Capability { path, address, borrow_type } => json!({
                "type": "Capability",
                "value": {
                    "path": path,
                    "address": address.hex_with_prefix(),
                    "borrowType": borrow_type,
                },
            }),
        }
    }

    /// Encode to JSON bytes, the form carried by scripts and transactions.
    pub fn encode(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let json: Json = serde_json::from_slice(bytes).map_err(|e| Error::parse("JSON value", e))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &Json) -> Result<Self> {
        let obj = json
            .as_object()
            .ok_or_else(|| Error::parse("JSON value", "expected an object with a type field"))?;
        let ty = obj
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| Error::parse("JSON value", "missing type field"))?;
        let value = obj.get("value").unwrap_or(&Json::Null);

        if let Some(number) = NumberType::from_name(ty) {
            let literal = value
                .as_str()
                .ok_or_else(|| Error::parse(ty, "value must be a string"))?;
            return Value::number(number, literal);
        }
        if let Some(kind) = CompositeKind::from_name(ty) {
            return decode_composite(kind, value);
        }

        match ty {
            "Void" => Ok(Value::Void),
            "Optional" => {
                if value.is_null() {
                    Ok(Value::Optional(None))
                } else {
                    Ok(Value::Optional(Some(Box::new(Value::from_json(value)?))))
                }
            }
            "Bool" => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| Error::parse("Bool", "value must be a JSON boolean")),
            "String" => Ok(Value::String(expect_str(ty, value)?.to_string())),
            "Character" => {
                let s = expect_str(ty, value)?;
                if s.chars().count() != 1 {
                    return Err(Error::parse("Character", "value must be a single character"));
                }
                Ok(Value::Character(s.to_string()))
            }
            "Address" => Ok(Value::Address(decode_address(value)?)),
            "Array" => {
                let items = value
                    .as_array()
                    .ok_or_else(|| Error::parse("Array", "value must be a JSON array"))?;
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            "Dictionary" => {
                let entries = value
                    .as_array()
                    .ok_or_else(|| Error::parse("Dictionary", "value must be a JSON array"))?;
                entries
                    .iter()
                    .map(|entry| {
                        let key = entry
                            .get("key")
                            .ok_or_else(|| Error::parse("Dictionary", "entry missing key"))?;
                        let val = entry
                            .get("value")
                            .ok_or_else(|| Error::parse("Dictionary", "entry missing value"))?;
                        Ok((Value::from_json(key)?, Value::from_json(val)?))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Dictionary)
            }
            "Path" => {
                let domain = field_str(value, "domain", "Path")?;
                let identifier = field_str(value, "identifier", "Path")?;
                Ok(Value::Path { domain, identifier })
            }
            "Type" => {
                let static_type = match value.get("staticType") {
                    Some(Json::String(s)) => s.clone(),
                    Some(Json::Object(t)) => t
                        .get("typeID")
                        .and_then(Json::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    _ => String::new(),
                };
                Ok(Value::Type(static_type))
            }
            "Capability" => {
                let path = match value.get("path") {
                    Some(Json::String(s)) => s.clone(),
                    Some(p @ Json::Object(_)) => Value::from_json(p)?.to_string(),
                    _ => String::new(),
                };
                let address = decode_address(value.get("address").unwrap_or(&Json::Null))?;
                let borrow_type = match value.get("borrowType") {
                    Some(Json::String(s)) => s.clone(),
                    Some(Json::Object(t)) => t
                        .get("typeID")
                        .and_then(Json::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    _ => String::new(),
                };
                Ok(Value::Capability { path, address, borrow_type })
            }
            other => Err(Error::parse("JSON value", format!("unsupported type '{}'", other))),
        }
    }
}

fn expect_str<'a>(ty: &str, value: &'a Json) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::parse(ty, "value must be a string"))
}

fn field_str(value: &Json, field: &str, ty: &str) -> Result<String> {
    value
        .get(field)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::parse(ty, format!("missing {} field", field)))
}

fn decode_address(value: &Json) -> Result<Address> {
    let s = expect_str("Address", value)?;
    Address::from_hex(s).map_err(|e| Error::parse("Address", e))
}

fn decode_composite(kind: CompositeKind, value: &Json) -> Result<Value> {
    let obj: &Map<String, Json> = value
        .as_object()
        .ok_or_else(|| Error::parse(kind.name(), "value must be an object"))?;
    let id = obj
        .get("id")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::parse(kind.name(), "missing id"))?
        .to_string();
    let fields = match obj.get("fields") {
        Some(Json::Array(items)) => items
            .iter()
            .map(|f| {
                let name = f
                    .get("name")
                    .and_then(Json::as_str)
                    .ok_or_else(|| Error::parse(kind.name(), "field missing name"))?;
                let val = f
                    .get("value")
                    .ok_or_else(|| Error::parse(kind.name(), "field missing value"))?;
                Ok((name.to_string(), Value::from_json(val)?))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };
    Ok(Value::Composite { kind, id, fields })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("()"),
            Value::Optional(None) => f.write_str("nil"),
            Value::Optional(Some(v)) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) | Value::Character(s) => write!(f, "{:?}", s),
            Value::Address(a) => f.write_str(&a.hex_with_prefix()),
            Value::Number(_, s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Dictionary(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Composite { id, fields, .. } => {
                write!(f, "{}(", id)?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                f.write_str(")")
            }
            Value::Path { domain, identifier } => write!(f, "/{}/{}", domain, identifier),
            Value::Type(t) => write!(f, "Type<{}>()", t),
            Value::Capability { path, address, borrow_type } => write!(
                f,
                "Capability<{}>(address: {}, path: {})",
                borrow_type,
                address.hex_with_prefix(),
                path
            ),
        }
    }
}
