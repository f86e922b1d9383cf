//! Default mapping between application errors and wire failures.

use super::{CodecError, FailureCodec};
use crate::failure::Failure;

/// Uses the error's display chain as the failure message.
///
/// An error that already wraps a [`Failure`] (for instance one produced by
/// [`FailureCodec::from_failure`]) is returned unchanged, metadata included.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFailureCodec;

impl FailureCodec for DefaultFailureCodec {
    fn to_failure(&self, error: &anyhow::Error) -> Result<Failure, CodecError> {
        if let Some(failure) = error.downcast_ref::<Failure>() {
            return Ok(failure.clone());
        }
        Ok(Failure::new(format!("{error:#}")))
    }

    fn from_failure(&self, failure: &Failure) -> Result<anyhow::Error, CodecError> {
        Ok(anyhow::Error::new(failure.clone()))
    }
}
