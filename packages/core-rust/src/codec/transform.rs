//! Byte-level transfer encodings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::HeaderValue;

use super::{ByteCodec, CodecError};
use crate::message::{Message, HEADER_CONTENT_TRANSFER_ENCODING};

const BASE64: &str = "base64";

/// Base64-encodes message bodies and marks them with
/// `Content-Transfer-Encoding: base64`.
///
/// Encoding an already-marked message and decoding an unmarked one are both
/// `NotSupported`, so the layer is skipped rather than applied twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

fn is_marked(message: &Message) -> bool {
    message
        .headers()
        .get(HEADER_CONTENT_TRANSFER_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case(BASE64))
}

impl ByteCodec for Base64Codec {
    fn encode_bytes(&self, message: &Message) -> Result<Message, CodecError> {
        if message.headers().contains_key(HEADER_CONTENT_TRANSFER_ENCODING) {
            return Err(CodecError::NotSupported);
        }
        let mut headers = message.headers().clone();
        headers.insert(
            HEADER_CONTENT_TRANSFER_ENCODING,
            HeaderValue::from_static(BASE64),
        );
        Ok(Message::new(headers, STANDARD.encode(message.body())))
    }

    fn decode_bytes(&self, message: &Message) -> Result<Message, CodecError> {
        if !is_marked(message) {
            return Err(CodecError::NotSupported);
        }
        let body = STANDARD.decode(message.body())?;
        let mut headers = message.headers().clone();
        headers.remove(HEADER_CONTENT_TRANSFER_ENCODING);
        Ok(Message::new(headers, body))
    }
}
