//! HTTP collaborators: request and response models, transport, codecs and
//! interceptors

pub mod codec;
pub mod error;
pub mod headers;
pub mod interceptor;
pub mod method;
pub mod request;
pub mod response;
pub mod transport;

pub use codec::{Decoder, Encoder, JsonDecoder, JsonEncoder, StringDecoder, StringEncoder};
pub use error::{DecodeError, EncodeError, InterceptorError, TransportError};
pub use headers::Headers;
pub use interceptor::{BasicAuthInterceptor, HeaderInterceptor, RequestInterceptor};
pub use method::{HttpMethod, UnknownMethod};
pub use request::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, RequestSpec};
pub use response::Response;
pub use transport::{ReqwestTransport, Transport};

#[cfg(test)]
pub use transport::MockTransport;
