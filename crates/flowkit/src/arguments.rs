//! Script and transaction arguments from the command line.
//!
//! Inline arguments are `Type:Value` pairs (`String:hello`, `UFix64:1.5`,
//! `Address:f8d6e0586b0a20c7`); JSON arguments are an array in the value
//! interchange format. When both are given JSON wins.

use serde_json::{json, Value as Json};

use flow_types::{Error, Result, Value};

/// Parse `Type:Value` arguments.
pub fn parse_inline(args: &[String]) -> Result<Vec<Value>> {
    args.iter().map(|arg| parse_inline_one(arg)).collect()
}

fn parse_inline_one(arg: &str) -> Result<Value> {
    let (ty, raw) = arg.split_once(':').ok_or_else(|| {
        Error::InvalidArgument(format!(
            "argument {:?} is not in the Type:Value format",
            arg
        ))
    })?;
    let ty = ty.trim();

    let value = match ty {
        "Bool" => {
            let flag: bool = raw.trim().parse().map_err(|_| {
                Error::InvalidArgument(format!("{:?} is not a Bool (expected true or false)", raw))
            })?;
            Json::Bool(flag)
        }
        "Address" => {
            let raw = raw.trim();
            if raw.starts_with("0x") {
                Json::String(raw.to_string())
            } else {
                Json::String(format!("0x{}", raw))
            }
        }
        _ => Json::String(raw.to_string()),
    };

    Value::from_json(&json!({ "type": ty, "value": value }))
        .map_err(|e| Error::InvalidArgument(format!("argument {:?}: {}", arg, e)))
}

/// Parse a JSON array of `{"type": ..., "value": ...}` objects.
pub fn parse_json(raw: &str) -> Result<Vec<Value>> {
    let json: Json = serde_json::from_str(raw).map_err(|e| Error::parse("JSON arguments", e))?;
    let items = json
        .as_array()
        .ok_or_else(|| Error::parse("JSON arguments", "expected an array"))?;
    items.iter().map(Value::from_json).collect()
}

/// Inline or JSON arguments, preferring JSON when it is non-empty.
pub fn parse_arguments(inline: &[String], json: &str) -> Result<Vec<Value>> {
    if !json.trim().is_empty() {
        parse_json(json)
    } else {
        parse_inline(inline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_types::value::NumberType;
    use flow_types::Address;

    fn inline(args: &[&str]) -> Result<Vec<Value>> {
        parse_inline(&args.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_inline_arguments() {
        let values = inline(&[
            "String:hello:world",
            "Bool:true",
            "Address:f8d6e0586b0a20c7",
            "Address:0x01cf0e2f2f715450",
            "UFix64:10",
            "Int:-42",
        ])
        .unwrap();

        assert_eq!(values[0], Value::String("hello:world".into()));
        assert_eq!(values[1], Value::Bool(true));
        assert_eq!(values[2], Value::Address(Address::from_hex("f8d6e0586b0a20c7").unwrap()));
        assert_eq!(values[3], Value::Address(Address::from_hex("01cf0e2f2f715450").unwrap()));
        assert_eq!(values[4], Value::Number(NumberType::UFix64, "10.00000000".into()));
        assert_eq!(values[5], Value::Number(NumberType::Int, "-42".into()));
    }

    #[test]
    fn test_inline_errors() {
        assert!(matches!(inline(&["hello"]), Err(Error::InvalidArgument(_))));
        assert!(matches!(inline(&["Bool:yes"]), Err(Error::InvalidArgument(_))));
        assert!(matches!(inline(&["UInt8:256"]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_json_arguments() {
        let values = parse_json(
            r#"[{"type": "String", "value": "hi"}, {"type": "Array", "value": [{"type": "UInt8", "value": "1"}]}]"#,
        )
        .unwrap();
        assert_eq!(values[0], Value::String("hi".into()));
        assert_eq!(values[1], Value::bytes(&[1]));

        assert!(parse_json(r#"{"type": "String"}"#).is_err());
    }

    #[test]
    fn test_json_preferred() {
        let values = parse_arguments(
            &["String:inline".to_string()],
            r#"[{"type": "String", "value": "json"}]"#,
        )
        .unwrap();
        assert_eq!(values, vec![Value::String("json".into())]);

        let values = parse_arguments(&["String:inline".to_string()], "  ").unwrap();
        assert_eq!(values, vec![Value::String("inline".into())]);
    }
}
