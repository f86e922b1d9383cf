//! Type-erased views of values so codecs and chains stay object-safe.
//!
//! [`Payload`] is the read side (a value about to be encoded) and
//! [`PayloadSlot`] the write side (a destination a codec decodes into). Both
//! are implemented generically, so any `serde` type can flow through a
//! `dyn MessageCodec` without the codec knowing the type. Codecs with a
//! narrower domain (unit, raw bytes) inspect the concrete type through `Any`.

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value that can be offered to a codec chain.
pub trait Payload: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// JSON encoding of the value.
    ///
    /// # Errors
    ///
    /// Propagates the serializer's error.
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;

    /// `MsgPack` encoding of the value, with named struct fields.
    ///
    /// # Errors
    ///
    /// Propagates the serializer's error.
    fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error>;
}

impl<T> Payload for T
where
    T: Serialize + Any + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }
}

/// A destination that a codec fills with a decoded value.
///
/// Implemented for `Option<T>`: `None` until a codec succeeds.
pub trait PayloadSlot: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Fills the slot from a JSON document.
    ///
    /// # Errors
    ///
    /// Propagates the deserializer's error.
    fn fill_json(&mut self, body: &[u8]) -> serde_json::Result<()>;

    /// Fills the slot from a `MsgPack` document.
    ///
    /// # Errors
    ///
    /// Propagates the deserializer's error.
    fn fill_msgpack(&mut self, body: &[u8]) -> Result<(), rmp_serde::decode::Error>;

    /// Fills the slot with the target type's notion of "nothing".
    ///
    /// # Errors
    ///
    /// Fails for types that cannot be built from `null` (anything but unit,
    /// `Option` and similar).
    fn fill_empty(&mut self) -> serde_json::Result<()>;

    fn is_filled(&self) -> bool;
}

impl<T> PayloadSlot for Option<T>
where
    T: DeserializeOwned + Any + Send,
{
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn fill_json(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = Some(serde_json::from_slice(body)?);
        Ok(())
    }

    fn fill_msgpack(&mut self, body: &[u8]) -> Result<(), rmp_serde::decode::Error> {
        *self = Some(rmp_serde::from_slice(body)?);
        Ok(())
    }

    fn fill_empty(&mut self) -> serde_json::Result<()> {
        *self = Some(serde_json::from_value(serde_json::Value::Null)?);
        Ok(())
    }

    fn is_filled(&self) -> bool {
        self.is_some()
    }
}
