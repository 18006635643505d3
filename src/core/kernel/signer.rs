use crate::core::errors::ExchangeError;

/// Signer trait for authentication payloads
///
/// The private stream hands the signer the exact payload it is about to send
/// and embeds the returned signature in the auth request unchanged.
pub trait Signer: Send + Sync {
    /// Sign `payload` and return the encoded signature
    fn sign_payload(&self, payload: &str) -> Result<String, ExchangeError>;
}

/// Any `Fn(&str) -> String` can sign, for callers that keep keys elsewhere.
impl<F> Signer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn sign_payload(&self, payload: &str) -> Result<String, ExchangeError> {
        Ok(self(payload))
    }
}
