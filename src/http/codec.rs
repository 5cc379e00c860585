//! Body encoders and response decoders

use crate::http::error::{DecodeError, EncodeError};
use crate::http::request::RequestSpec;
use crate::http::response::Response;
use crate::types::TypeDescription;
use crate::types::universe::{BYTE_STREAM, BYTES, OBJECT, STRING, VOID};
use crate::value::{Value, ValueShape};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";
const APPLICATION_JSON: &str = "application/json";

/// Writes a body argument into the request
pub trait Encoder: Send + Sync {
    fn encode(&self, value: &Value, request: &mut RequestSpec) -> Result<(), EncodeError>;
}

/// Turns a response into a value of the requested type
pub trait Decoder: Send + Sync {
    fn decode(&self, response: Response, target: &TypeDescription) -> Result<Value, DecodeError>;
}

fn set_default_content_type(request: &mut RequestSpec, content_type: &str) {
    if !request.headers().contains("content-type") {
        request.headers_mut().set("Content-Type", content_type);
    }
}

fn shape_name(value: &Value) -> String {
    match value.shape() {
        ValueShape::Scalar => "scalar".to_string(),
        ValueShape::List => "list".to_string(),
        ValueShape::Map => "map".to_string(),
        ValueShape::Bean => match value {
            Value::Bean(bean) => format!("bean {}", bean.type_name()),
            _ => "bean".to_string(),
        },
    }
}

/// Encodes scalars as UTF-8 text and bytes as-is. Composite values are
/// rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringEncoder;

impl Encoder for StringEncoder {
    fn encode(&self, value: &Value, request: &mut RequestSpec) -> Result<(), EncodeError> {
        match value {
            Value::Null => Ok(()),
            Value::Bytes(bytes) => {
                set_default_content_type(request, OCTET_STREAM);
                request.set_body(bytes.clone());
                Ok(())
            }
            Value::List(_) | Value::Map(_) | Value::Bean(_) => Err(EncodeError::Unsupported {
                encoder: "StringEncoder",
                kind: shape_name(value),
            }),
            scalar => {
                let text = scalar.to_scalar_string().unwrap_or_default();
                set_default_content_type(request, TEXT_PLAIN);
                request.set_body(text.into_bytes());
                Ok(())
            }
        }
    }
}

/// Encodes any value as JSON; bytes are sent unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, value: &Value, request: &mut RequestSpec) -> Result<(), EncodeError> {
        match value {
            Value::Null => Ok(()),
            Value::Bytes(bytes) => {
                set_default_content_type(request, OCTET_STREAM);
                request.set_body(bytes.clone());
                Ok(())
            }
            other => {
                let json = other
                    .to_json()
                    .map_err(|e| EncodeError::Serialization(e.to_string()))?;
                let body = serde_json::to_vec(&json)
                    .map_err(|e| EncodeError::Serialization(e.to_string()))?;
                set_default_content_type(request, APPLICATION_JSON);
                request.set_body(body);
                Ok(())
            }
        }
    }
}

/// Decodes text and raw bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct StringDecoder;

impl Decoder for StringDecoder {
    fn decode(
        &self,
        mut response: Response,
        target: &TypeDescription,
    ) -> Result<Value, DecodeError> {
        let class = target.erasure();
        if class.is(VOID) {
            response.close();
            return Ok(Value::Null);
        }
        if class.is(BYTES) || class.is(BYTE_STREAM) {
            return Ok(Value::Bytes(response.take_body().unwrap_or_default()));
        }
        if class.is(STRING) || class.is(OBJECT) {
            if response.body().is_none_or(<[u8]>::is_empty) {
                return Ok(Value::Null);
            }
            return response.text().map(Value::Str);
        }
        Err(DecodeError::Unsupported {
            decoder: "StringDecoder",
            target: target.to_string(),
        })
    }
}

/// Decodes JSON bodies into [`Value`]s. `Void` discards the body; bytes and
/// byte streams are returned raw.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(
        &self,
        mut response: Response,
        target: &TypeDescription,
    ) -> Result<Value, DecodeError> {
        let class = target.erasure();
        if class.is(VOID) {
            response.close();
            return Ok(Value::Null);
        }
        if class.is(BYTES) || class.is(BYTE_STREAM) {
            return Ok(Value::Bytes(response.take_body().unwrap_or_default()));
        }
        let Some(body) = response.take_body().filter(|b| !b.is_empty()) else {
            return Ok(Value::Null);
        };
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        if target.is_collection_like() && !(json.is_array() || json.is_null()) {
            return Err(DecodeError::Body(format!(
                "expected a JSON array for {target}"
            )));
        }
        Ok(Value::from_json(json))
    }
}
