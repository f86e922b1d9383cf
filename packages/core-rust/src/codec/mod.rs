//! Codecs: bidirectional transforms between typed values and [`Message`]s.
//!
//! Three independent families, each composed into its own chain:
//!
//! - [`MessageCodec`]: value <-> message ([`MessageCodecChain`])
//! - [`ByteCodec`]: message <-> message, for layered wire transforms such
//!   as transfer encodings ([`ByteCodecChain`])
//! - [`FailureCodec`]: application error <-> [`Failure`] ([`FailureCodecChain`])
//!
//! A codec that does not handle a value or message returns
//! [`CodecError::NotSupported`]; chains treat that as "try the next one"
//! rather than as a failure. [`Codec`] bundles one chain of each kind and is
//! passed explicitly to every component that encodes or decodes.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::failure::Failure;
use crate::message::Message;

pub mod chain;
pub mod failure;
pub mod payload;
pub mod transform;
pub mod value;

pub use chain::{ByteCodecChain, FailureCodecChain, MessageCodecChain};
pub use failure::DefaultFailureCodec;
pub use payload::{Payload, PayloadSlot};
pub use transform::Base64Codec;
pub use value::{BytesCodec, JsonCodec, MsgPackCodec, NilCodec};

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// Errors produced by codecs and chains.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The codec does not handle this value or message. Chains skip it.
    #[error("encoding not supported")]
    NotSupported,
    /// Every codec in a chain declined.
    #[error("no codec matched")]
    NoCodecMatched,
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("msgpack encode: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),
    #[error("msgpack decode: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// A codec reported success without producing a value.
    #[error("codec produced no value")]
    Empty,
}

impl CodecError {
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported)
    }
}

// ---------------------------------------------------------------------------
// Codec traits
// ---------------------------------------------------------------------------

/// Converts between values and messages.
pub trait MessageCodec: Send + Sync {
    /// Encodes `value`, or returns `NotSupported` if it is outside this codec's domain.
    ///
    /// # Errors
    ///
    /// `NotSupported`, or the underlying serializer's error.
    fn encode(&self, value: &dyn Payload) -> Result<Message, CodecError>;

    /// Decodes `message` into `target`, or returns `NotSupported` if the
    /// message or the target type is outside this codec's domain.
    ///
    /// # Errors
    ///
    /// `NotSupported`, or the underlying deserializer's error.
    fn decode(&self, message: &Message, target: &mut dyn PayloadSlot) -> Result<(), CodecError>;
}

/// A reversible transform applied to an already-encoded message.
pub trait ByteCodec: Send + Sync {
    /// # Errors
    ///
    /// `NotSupported` to leave the message untouched, or a transform error.
    fn encode_bytes(&self, message: &Message) -> Result<Message, CodecError>;

    /// # Errors
    ///
    /// `NotSupported` when the message does not carry this layer, or a transform error.
    fn decode_bytes(&self, message: &Message) -> Result<Message, CodecError>;
}

/// Converts between application errors and wire failures.
pub trait FailureCodec: Send + Sync {
    /// # Errors
    ///
    /// `NotSupported` if this codec does not describe this error.
    fn to_failure(&self, error: &anyhow::Error) -> Result<Failure, CodecError>;

    /// # Errors
    ///
    /// `NotSupported` if this codec does not understand this failure.
    fn from_failure(&self, failure: &Failure) -> Result<anyhow::Error, CodecError>;
}

// ---------------------------------------------------------------------------
// Codec bundle
// ---------------------------------------------------------------------------

/// The active codec configuration: one chain of each family.
#[derive(Clone)]
pub struct Codec {
    pub messages: MessageCodecChain,
    pub bytes: ByteCodecChain,
    pub failures: FailureCodecChain,
}

impl Codec {
    #[must_use]
    pub fn new(
        messages: MessageCodecChain,
        bytes: ByteCodecChain,
        failures: FailureCodecChain,
    ) -> Self {
        Self {
            messages,
            bytes,
            failures,
        }
    }

    /// Encodes a value through the message chain, then applies the byte layers.
    ///
    /// # Errors
    ///
    /// `NoCodecMatched` if every message codec declined, or the first hard error.
    pub fn encode(&self, value: &dyn Payload) -> Result<Message, CodecError> {
        let message = self.messages.encode(value)?;
        self.bytes.encode(message)
    }

    /// Undoes the byte layers, then decodes through the message chain.
    ///
    /// # Errors
    ///
    /// `NoCodecMatched` if every message codec declined, or the first hard error.
    pub fn decode<T>(&self, message: Message) -> Result<T, CodecError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let message = self.bytes.decode(message)?;
        let mut slot: Option<T> = None;
        self.messages.decode(&message, &mut slot)?;
        slot.ok_or(CodecError::Empty)
    }

    /// # Errors
    ///
    /// `NoCodecMatched` if no failure codec described the error.
    pub fn to_failure(&self, error: &anyhow::Error) -> Result<Failure, CodecError> {
        self.failures.to_failure(error)
    }

    /// # Errors
    ///
    /// `NoCodecMatched` if no failure codec understood the failure.
    pub fn from_failure(&self, failure: &Failure) -> Result<anyhow::Error, CodecError> {
        self.failures.from_failure(failure)
    }
}

impl Default for Codec {
    /// `[NilCodec, BytesCodec, JsonCodec]`, no byte layers, `DefaultFailureCodec`.
    fn default() -> Self {
        Self {
            messages: MessageCodecChain::new(vec![
                Arc::new(NilCodec),
                Arc::new(BytesCodec),
                Arc::new(JsonCodec),
            ]),
            bytes: ByteCodecChain::default(),
            failures: FailureCodecChain::new(vec![Arc::new(DefaultFailureCodec)]),
        }
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("messages", &self.messages.len())
            .field("bytes", &self.bytes.len())
            .field("failures", &self.failures.len())
            .finish()
    }
}
