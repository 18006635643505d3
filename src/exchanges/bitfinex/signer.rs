use crate::core::errors::ExchangeError;
use crate::core::kernel::Signer;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha384;

type HmacSha384 = Hmac<Sha384>;

/// Bitfinex HMAC-SHA384 signer, hex encoded
#[derive(Debug, Clone)]
pub struct BitfinexSigner {
    secret_key: Secret<String>,
}

impl BitfinexSigner {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key: Secret::new(secret_key),
        }
    }
}

impl Signer for BitfinexSigner {
    fn sign_payload(&self, payload: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha384::new_from_slice(self.secret_key.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;

        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
