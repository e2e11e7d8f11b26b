use std::fmt::Debug;

/// Transforms raw record bytes before they are shown or searched
///
/// Implementations must be cheap to share between search tasks.
pub trait Decoder: Debug + Send + Sync {
    fn decode(&self, topic: &str, data: &[u8]) -> Result<Vec<u8>, DecodeError>;
}

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(reason: impl ToString) -> Self {
        Self(reason.to_string())
    }
}

/// The default decoder, hands back the bytes untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainDecoder;

impl Decoder for PlainDecoder {
    fn decode(&self, _topic: &str, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(data.to_vec())
    }
}
