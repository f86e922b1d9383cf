//! Ordered codec chains.
//!
//! Value and failure chains are first-match: encoding tries codecs
//! first-to-last, decoding last-to-first, and the first result that is not
//! `NotSupported` wins (including a hard error). Byte chains are layered:
//! every layer is applied first-to-last on encode and undone last-to-first
//! on decode, and a layer answering `NotSupported` is skipped. In both
//! cases the most recently applied encoding is the first one undone.

use std::sync::Arc;

use super::{ByteCodec, CodecError, FailureCodec, MessageCodec, Payload, PayloadSlot};
use crate::failure::Failure;
use crate::message::Message;

// ---------------------------------------------------------------------------
// MessageCodecChain
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MessageCodecChain(Vec<Arc<dyn MessageCodec>>);

impl MessageCodecChain {
    #[must_use]
    pub fn new(codecs: Vec<Arc<dyn MessageCodec>>) -> Self {
        Self(codecs)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl MessageCodec for MessageCodecChain {
    fn encode(&self, value: &dyn Payload) -> Result<Message, CodecError> {
        for codec in &self.0 {
            match codec.encode(value) {
                Err(CodecError::NotSupported) => {}
                result => return result,
            }
        }
        Err(CodecError::NoCodecMatched)
    }

    fn decode(&self, message: &Message, target: &mut dyn PayloadSlot) -> Result<(), CodecError> {
        for codec in self.0.iter().rev() {
            match codec.decode(message, target) {
                Err(CodecError::NotSupported) => {}
                result => return result,
            }
        }
        Err(CodecError::NoCodecMatched)
    }
}

// ---------------------------------------------------------------------------
// ByteCodecChain
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct ByteCodecChain(Vec<Arc<dyn ByteCodec>>);

impl ByteCodecChain {
    #[must_use]
    pub fn new(layers: Vec<Arc<dyn ByteCodec>>) -> Self {
        Self(layers)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies every layer in order.
    ///
    /// # Errors
    ///
    /// The first layer error other than `NotSupported`.
    pub fn encode(&self, message: Message) -> Result<Message, CodecError> {
        let mut current = message;
        for layer in &self.0 {
            match layer.encode_bytes(&current) {
                Ok(next) => current = next,
                Err(CodecError::NotSupported) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(current)
    }

    /// Undoes every layer in reverse order.
    ///
    /// # Errors
    ///
    /// The first layer error other than `NotSupported`.
    pub fn decode(&self, message: Message) -> Result<Message, CodecError> {
        let mut current = message;
        for layer in self.0.iter().rev() {
            match layer.decode_bytes(&current) {
                Ok(next) => current = next,
                Err(CodecError::NotSupported) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// FailureCodecChain
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct FailureCodecChain(Vec<Arc<dyn FailureCodec>>);

impl FailureCodecChain {
    #[must_use]
    pub fn new(codecs: Vec<Arc<dyn FailureCodec>>) -> Self {
        Self(codecs)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FailureCodec for FailureCodecChain {
    fn to_failure(&self, error: &anyhow::Error) -> Result<Failure, CodecError> {
        for codec in &self.0 {
            match codec.to_failure(error) {
                Err(CodecError::NotSupported) => {}
                result => return result,
            }
        }
        Err(CodecError::NoCodecMatched)
    }

    fn from_failure(&self, failure: &Failure) -> Result<anyhow::Error, CodecError> {
        for codec in self.0.iter().rev() {
            match codec.from_failure(failure) {
                Err(CodecError::NotSupported) => {}
                result => return result,
            }
        }
        Err(CodecError::NoCodecMatched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{HeaderMap, HeaderValue};

    use super::*;

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl Log {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    /// Records every call and either declines or answers with its tag.
    struct Recording {
        tag: &'static str,
        accepts: bool,
        log: Log,
    }

    impl Recording {
        fn new(tag: &'static str, accepts: bool, log: &Log) -> Arc<Self> {
            Arc::new(Self {
                tag,
                accepts,
                log: log.clone(),
            })
        }

        fn tagged(&self) -> Message {
            let mut headers = HeaderMap::new();
            headers.insert("x-codec", HeaderValue::from_static(self.tag));
            Message::new(headers, self.tag)
        }
    }

    impl MessageCodec for Recording {
        fn encode(&self, _value: &dyn Payload) -> Result<Message, CodecError> {
            self.log.push(format!("encode:{}", self.tag));
            if self.accepts {
                Ok(self.tagged())
            } else {
                Err(CodecError::NotSupported)
            }
        }

        fn decode(
            &self,
            _message: &Message,
            target: &mut dyn PayloadSlot,
        ) -> Result<(), CodecError> {
            self.log.push(format!("decode:{}", self.tag));
            if self.accepts {
                target.fill_json(format!("\"{}\"", self.tag).as_bytes())?;
                Ok(())
            } else {
                Err(CodecError::NotSupported)
            }
        }
    }

    impl ByteCodec for Recording {
        fn encode_bytes(&self, message: &Message) -> Result<Message, CodecError> {
            self.log.push(format!("encode_bytes:{}", self.tag));
            if !self.accepts {
                return Err(CodecError::NotSupported);
            }
            let mut body = message.body().to_vec();
            body.extend_from_slice(self.tag.as_bytes());
            Ok(Message::new(message.headers().clone(), body))
        }

        fn decode_bytes(&self, message: &Message) -> Result<Message, CodecError> {
            self.log.push(format!("decode_bytes:{}", self.tag));
            if !self.accepts {
                return Err(CodecError::NotSupported);
            }
            let body = message
                .body()
                .strip_suffix(self.tag.as_bytes())
                .ok_or(CodecError::Empty)?
                .to_vec();
            Ok(Message::new(message.headers().clone(), body))
        }
    }

    #[test]
    fn encode_tries_first_to_last_and_stops_at_first_match() {
        let log = Log::default();
        let chain = MessageCodecChain::new(vec![
            Recording::new("a", false, &log),
            Recording::new("b", true, &log),
            Recording::new("c", true, &log),
        ]);
        let message = chain.encode(&1u8).unwrap();
        assert_eq!(message.headers().get("x-codec").unwrap(), "b");
        assert_eq!(log.entries(), vec!["encode:a", "encode:b"]);
    }

    #[test]
    fn decode_tries_last_to_first_and_stops_at_first_match() {
        let log = Log::default();
        let chain = MessageCodecChain::new(vec![
            Recording::new("a", true, &log),
            Recording::new("b", true, &log),
            Recording::new("c", false, &log),
        ]);
        let mut slot: Option<String> = None;
        chain.decode(&Message::empty(), &mut slot).unwrap();
        assert_eq!(slot.as_deref(), Some("b"));
        assert_eq!(log.entries(), vec!["decode:c", "decode:b"]);
    }

    #[test]
    fn all_declining_yields_no_codec_matched() {
        let log = Log::default();
        let chain = MessageCodecChain::new(vec![
            Recording::new("a", false, &log),
            Recording::new("b", false, &log),
        ]);
        assert!(matches!(chain.encode(&()), Err(CodecError::NoCodecMatched)));
        let mut slot: Option<String> = None;
        assert!(matches!(
            chain.decode(&Message::empty(), &mut slot),
            Err(CodecError::NoCodecMatched)
        ));
        assert!(matches!(
            MessageCodecChain::default().encode(&()),
            Err(CodecError::NoCodecMatched)
        ));
    }

    #[test]
    fn byte_layers_apply_in_order_and_unwind_in_reverse() {
        let log = Log::default();
        let chain = ByteCodecChain::new(vec![
            Recording::new("1", true, &log),
            Recording::new("x", false, &log),
            Recording::new("2", true, &log),
        ]);
        let encoded = chain.encode(Message::new(HeaderMap::new(), "v")).unwrap();
        assert_eq!(encoded.body().as_ref(), b"v12");

        let decoded = chain.decode(encoded).unwrap();
        assert_eq!(decoded.body().as_ref(), b"v");
        assert_eq!(
            log.entries(),
            vec![
                "encode_bytes:1",
                "encode_bytes:x",
                "encode_bytes:2",
                "decode_bytes:2",
                "decode_bytes:x",
                "decode_bytes:1",
            ]
        );
    }

    #[test]
    fn empty_byte_chain_is_identity() {
        let chain = ByteCodecChain::default();
        let message = chain.encode(Message::new(HeaderMap::new(), "v")).unwrap();
        assert_eq!(chain.decode(message).unwrap().body().as_ref(), b"v");
    }

    struct Declines;

    impl FailureCodec for Declines {
        fn to_failure(&self, _error: &anyhow::Error) -> Result<Failure, CodecError> {
            Err(CodecError::NotSupported)
        }

        fn from_failure(&self, _failure: &Failure) -> Result<anyhow::Error, CodecError> {
            Err(CodecError::NotSupported)
        }
    }

    #[test]
    fn failure_chain_falls_through_declining_codecs() {
        let chain = FailureCodecChain::new(vec![
            Arc::new(Declines),
            Arc::new(crate::codec::DefaultFailureCodec),
            Arc::new(Declines),
        ]);
        let failure = chain.to_failure(&anyhow::anyhow!("boom")).unwrap();
        assert_eq!(failure.message, "boom");
        let error = chain.from_failure(&failure).unwrap();
        assert_eq!(error.to_string(), "boom");

        let empty = FailureCodecChain::new(vec![Arc::new(Declines)]);
        assert!(matches!(
            empty.to_failure(&anyhow::anyhow!("boom")),
            Err(CodecError::NoCodecMatched)
        ));
    }
}
