//! Fragment directive wire format
//!
//! A directive wraps rendered output in a pair of HTML comments:
//!
//! ```text
//! <!-- cachetop: unfragment:PAYLOAD -->OUTPUT<!-- cachetop: end -->
//! <!-- cachetop: fragment:ID:PAYLOAD -->OUTPUT<!-- cachetop: end -->
//! ```
//!
//! where `PAYLOAD` is base64 encoded JSON naming the function to call and
//! its arguments.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// Closing marker shared by every directive
pub const END_MARKER: &str = "<!-- cachetop: end -->";

/// Directive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Re-rendered on the read path only, never replayed from the store
    Fragment,
    /// Persisted in the stored body and replayed on every hit
    Unfragment,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Fragment => "fragment",
            DirectiveKind::Unfragment => "unfragment",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectiveKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fragment" => Ok(DirectiveKind::Fragment),
            "unfragment" => Ok(DirectiveKind::Unfragment),
            other => Err(DomainError::malformed_directive(format!(
                "Unknown directive kind: {}",
                other
            ))),
        }
    }
}

/// Function reference and arguments carried by a directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentPayload {
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// When set, the function receives all arguments as a single array
    #[serde(
        rename = "arr_arg",
        alias = "passArgsAsArray",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pass_args_as_array: Option<bool>,
}

impl FragmentPayload {
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            args,
            pass_args_as_array: None,
        }
    }

    pub fn with_args_as_array(mut self, pass_args_as_array: bool) -> Self {
        self.pass_args_as_array = Some(pass_args_as_array);
        self
    }

    /// Arguments as the function should receive them
    pub fn call_args(&self) -> Vec<Value> {
        if self.pass_args_as_array.unwrap_or(false) {
            vec![Value::Array(self.args.clone())]
        } else {
            self.args.clone()
        }
    }

    /// Encodes the payload as base64(JSON)
    pub fn encode(&self) -> Result<String, DomainError> {
        let json = serde_json::to_vec(self).map_err(|e| {
            DomainError::internal(format!("Failed to serialize fragment payload: {}", e))
        })?;

        Ok(STANDARD.encode(json))
    }

    /// Decodes a base64(JSON) payload
    pub fn decode(encoded: &str) -> Result<Self, DomainError> {
        let json = STANDARD.decode(encoded.trim()).map_err(|e| {
            DomainError::malformed_directive(format!("Payload is not valid base64: {}", e))
        })?;

        let payload: Self = serde_json::from_slice(&json).map_err(|e| {
            DomainError::malformed_directive(format!("Payload is not valid JSON: {}", e))
        })?;

        if payload.function.is_empty() {
            return Err(DomainError::malformed_directive(
                "Payload does not name a function",
            ));
        }

        Ok(payload)
    }
}

/// A parsed or to-be-emitted directive
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDirective {
    pub kind: DirectiveKind,
    pub id: Option<String>,
    pub payload: FragmentPayload,
}

impl FragmentDirective {
    pub fn fragment(id: impl Into<String>, payload: FragmentPayload) -> Self {
        Self {
            kind: DirectiveKind::Fragment,
            id: Some(id.into()),
            payload,
        }
    }

    pub fn unfragment(payload: FragmentPayload) -> Self {
        Self {
            kind: DirectiveKind::Unfragment,
            id: None,
            payload,
        }
    }

    /// Renders the opening comment
    pub fn opening_marker(&self) -> Result<String, DomainError> {
        let encoded = self.payload.encode()?;

        Ok(match &self.id {
            Some(id) => format!("<!-- cachetop: {}:{}:{} -->", self.kind, id, encoded),
            None => format!("<!-- cachetop: {}:{} -->", self.kind, encoded),
        })
    }

    /// Wraps rendered output in opening and closing markers
    pub fn wrap(&self, output: &str) -> Result<String, DomainError> {
        Ok(format!("{}{}{}", self.opening_marker()?, output, END_MARKER))
    }

    /// Parses the text between `cachetop:` and `-->`,
    /// e.g. `unfragment:PAYLOAD` or `fragment:ID:PAYLOAD`
    pub fn parse_header(header: &str) -> Result<Self, DomainError> {
        let mut parts = header.trim().splitn(3, ':');
        let kind: DirectiveKind = parts.next().unwrap_or_default().parse()?;

        let (id, encoded) = match kind {
            DirectiveKind::Fragment => {
                let id = parts.next().map(str::trim).filter(|id| !id.is_empty());
                (id, parts.next())
            }
            DirectiveKind::Unfragment => (None, parts.next()),
        };

        let encoded = encoded
            .map(str::trim)
            .filter(|encoded| !encoded.is_empty())
            .ok_or_else(|| DomainError::malformed_directive("Directive has no payload"))?;

        Ok(Self {
            kind,
            id: id.map(str::to_string),
            payload: FragmentPayload::decode(encoded)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_json_shape() {
        let payload = FragmentPayload::new("greet", vec![json!("Ada")]).with_args_as_array(false);
        let encoded = payload.encode().unwrap();
        let json: Value = serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();

        assert_eq!(json, json!({"fn": "greet", "args": ["Ada"], "arr_arg": false}));
    }

    #[test]
    fn test_fragment_payload_omits_array_flag() {
        let payload = FragmentPayload::new("now", vec![]);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json, json!({"fn": "now", "args": []}));
    }

    #[test]
    fn test_decode_accepts_long_flag_name() {
        let encoded =
            STANDARD.encode(r#"{"fn":"sum","args":[1,2],"passArgsAsArray":true}"#.as_bytes());
        let payload = FragmentPayload::decode(&encoded).unwrap();

        assert_eq!(payload.pass_args_as_array, Some(true));
        assert_eq!(payload.call_args(), vec![json!([1, 2])]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            FragmentPayload::decode("not base64!"),
            Err(DomainError::MalformedDirective { .. })
        ));

        let not_json = STANDARD.encode(b"hello");
        assert!(FragmentPayload::decode(&not_json).is_err());

        let no_fn = STANDARD.encode(br#"{"fn":"","args":[]}"#);
        assert!(FragmentPayload::decode(&no_fn).is_err());
    }

    #[test]
    fn test_opening_marker_formats() {
        let payload = FragmentPayload::new("now", vec![]);
        let encoded = payload.encode().unwrap();

        let unfragment = FragmentDirective::unfragment(payload.clone());
        assert_eq!(
            unfragment.opening_marker().unwrap(),
            format!("<!-- cachetop: unfragment:{} -->", encoded)
        );

        let fragment = FragmentDirective::fragment("clock", payload);
        assert_eq!(
            fragment.opening_marker().unwrap(),
            format!("<!-- cachetop: fragment:clock:{} -->", encoded)
        );
    }

    #[test]
    fn test_parse_header() {
        let payload = FragmentPayload::new("now", vec![json!(1)]);
        let encoded = payload.encode().unwrap();

        let parsed = FragmentDirective::parse_header(&format!(" unfragment:{} ", encoded)).unwrap();
        assert_eq!(parsed.kind, DirectiveKind::Unfragment);
        assert_eq!(parsed.id, None);
        assert_eq!(parsed.payload, payload);

        let parsed = FragmentDirective::parse_header(&format!("fragment:clock:{}", encoded)).unwrap();
        assert_eq!(parsed.kind, DirectiveKind::Fragment);
        assert_eq!(parsed.id.as_deref(), Some("clock"));
    }

    #[test]
    fn test_parse_header_errors() {
        assert!(FragmentDirective::parse_header("unfragment:").is_err());
        assert!(FragmentDirective::parse_header("refresh:abc").is_err());
        assert!(FragmentDirective::parse_header("").is_err());
    }
}
