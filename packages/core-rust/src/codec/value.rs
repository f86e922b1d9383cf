//! Value codecs: unit, raw bytes, JSON and MsgPack.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};

use super::{CodecError, MessageCodec, Payload, PayloadSlot};
use crate::message::{media_type, Message};

const OCTET_STREAM: &str = "application/octet-stream";
const JSON: &str = "application/json";
const MSGPACK: &str = "application/msgpack";

fn with_content_type(content_type: &'static str, body: impl Into<Bytes>) -> Message {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    Message::new(headers, body)
}

fn has_media_type(message: &Message, expected: &str) -> bool {
    message
        .content_type()
        .is_some_and(|value| media_type(value) == expected)
}

// ---------------------------------------------------------------------------
// NilCodec
// ---------------------------------------------------------------------------

/// Unit <-> empty message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NilCodec;

impl MessageCodec for NilCodec {
    fn encode(&self, value: &dyn Payload) -> Result<Message, CodecError> {
        if value.as_any().is::<()>() {
            Ok(Message::empty())
        } else {
            Err(CodecError::NotSupported)
        }
    }

    fn decode(&self, message: &Message, target: &mut dyn PayloadSlot) -> Result<(), CodecError> {
        if !message.is_empty() {
            return Err(CodecError::NotSupported);
        }
        // Targets that cannot represent "nothing" are left to the rest of the chain.
        target.fill_empty().map_err(|_| CodecError::NotSupported)
    }
}

// ---------------------------------------------------------------------------
// BytesCodec
// ---------------------------------------------------------------------------

/// `Vec<u8>` / [`Bytes`] <-> `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl MessageCodec for BytesCodec {
    fn encode(&self, value: &dyn Payload) -> Result<Message, CodecError> {
        let any = value.as_any();
        if let Some(raw) = any.downcast_ref::<Vec<u8>>() {
            return Ok(with_content_type(OCTET_STREAM, raw.clone()));
        }
        if let Some(raw) = any.downcast_ref::<Bytes>() {
            return Ok(with_content_type(OCTET_STREAM, raw.clone()));
        }
        Err(CodecError::NotSupported)
    }

    fn decode(&self, message: &Message, target: &mut dyn PayloadSlot) -> Result<(), CodecError> {
        if !has_media_type(message, OCTET_STREAM) {
            return Err(CodecError::NotSupported);
        }
        let any = target.as_any_mut();
        if let Some(slot) = any.downcast_mut::<Option<Vec<u8>>>() {
            *slot = Some(message.body().to_vec());
            return Ok(());
        }
        if let Some(slot) = any.downcast_mut::<Option<Bytes>>() {
            *slot = Some(message.body().clone());
            return Ok(());
        }
        Err(CodecError::NotSupported)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// Any serializable value <-> `application/json`.
///
/// Decoding also accepts structured-syntax types such as `application/problem+json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

fn is_json(message: &Message) -> bool {
    message.content_type().is_some_and(|value| {
        let media = media_type(value);
        media == JSON || media.ends_with("+json")
    })
}

impl MessageCodec for JsonCodec {
    fn encode(&self, value: &dyn Payload) -> Result<Message, CodecError> {
        Ok(with_content_type(JSON, value.to_json()?))
    }

    fn decode(&self, message: &Message, target: &mut dyn PayloadSlot) -> Result<(), CodecError> {
        if !is_json(message) {
            return Err(CodecError::NotSupported);
        }
        target.fill_json(message.body())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MsgPackCodec
// ---------------------------------------------------------------------------

/// Any serializable value <-> `application/msgpack`. Not in the default chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl MessageCodec for MsgPackCodec {
    fn encode(&self, value: &dyn Payload) -> Result<Message, CodecError> {
        Ok(with_content_type(MSGPACK, value.to_msgpack()?))
    }

    fn decode(&self, message: &Message, target: &mut dyn PayloadSlot) -> Result<(), CodecError> {
        if !has_media_type(message, MSGPACK) {
            return Err(CodecError::NotSupported);
        }
        target.fill_msgpack(message.body())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    fn message_with(content_type: &'static str, body: &'static str) -> Message {
        with_content_type(content_type, body)
    }

    #[test]
    fn nil_only_handles_unit() {
        assert!(NilCodec.encode(&()).unwrap().is_empty());
        assert!(NilCodec.encode(&0u8).unwrap_err().is_not_supported());

        let mut unit: Option<()> = None;
        NilCodec.decode(&Message::empty(), &mut unit).unwrap();
        assert_eq!(unit, Some(()));

        let mut number: Option<i64> = None;
        assert!(NilCodec
            .decode(&Message::empty(), &mut number)
            .unwrap_err()
            .is_not_supported());
        assert!(NilCodec
            .decode(&message_with(JSON, "1"), &mut unit)
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn bytes_declines_other_types() {
        assert!(BytesCodec.encode(&"text").unwrap_err().is_not_supported());
        let mut slot: Option<String> = None;
        assert!(BytesCodec
            .decode(&message_with(OCTET_STREAM, "abc"), &mut slot)
            .unwrap_err()
            .is_not_supported());
    }

    #[test]
    fn bytes_decode_requires_octet_stream() {
        let mut slot: Option<Vec<u8>> = None;
        assert!(BytesCodec
            .decode(&message_with(JSON, "[1]"), &mut slot)
            .unwrap_err()
            .is_not_supported());
        BytesCodec
            .decode(&message_with(OCTET_STREAM, "abc"), &mut slot)
            .unwrap();
        assert_eq!(slot.as_deref(), Some(b"abc".as_slice()));
    }

    #[test]
    fn json_accepts_structured_suffix_and_parameters() {
        let mut slot: Option<Point> = None;
        JsonCodec
            .decode(
                &message_with("application/problem+json", r#"{"x":1,"y":2}"#),
                &mut slot,
            )
            .unwrap();
        assert_eq!(slot, Some(Point { x: 1, y: 2 }));

        let mut slot: Option<Point> = None;
        JsonCodec
            .decode(
                &message_with("application/json; charset=utf-8", r#"{"x":3,"y":4}"#),
                &mut slot,
            )
            .unwrap();
        assert_eq!(slot, Some(Point { x: 3, y: 4 }));
    }

    #[test]
    fn json_decode_error_is_hard() {
        let mut slot: Option<Point> = None;
        let err = JsonCodec
            .decode(&message_with(JSON, "not json"), &mut slot)
            .unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn msgpack_round_trip() {
        let message = MsgPackCodec.encode(&Point { x: 5, y: -1 }).unwrap();
        assert_eq!(message.content_type(), Some(MSGPACK));
        let mut slot: Option<Point> = None;
        MsgPackCodec.decode(&message, &mut slot).unwrap();
        assert_eq!(slot, Some(Point { x: 5, y: -1 }));
        assert!(MsgPackCodec
            .decode(&message_with(JSON, "{}"), &mut slot)
            .unwrap_err()
            .is_not_supported());
    }
}
