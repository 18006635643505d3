use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{TungsteniteWs, WsConfig};
use crate::exchanges::bitfinex::codec::{BitfinexCodec, BitfinexPrivateCodec};
use crate::exchanges::bitfinex::private::BitfinexPrivateWs;
use crate::exchanges::bitfinex::public::BitfinexPublicWs;
use crate::exchanges::bitfinex::signer::BitfinexSigner;

const EXCHANGE_NAME: &str = "bitfinex";

fn ws_config(config: &ExchangeConfig) -> WsConfig {
    WsConfig {
        tls_skip_verify: config.tls_skip_verify,
        ..WsConfig::default()
    }
}

/// Create an unconnected public market data stream
pub fn build_public_ws(config: &ExchangeConfig) -> BitfinexPublicWs<TungsteniteWs<BitfinexCodec>> {
    let ws = TungsteniteWs::new(
        config.websocket_url().to_string(),
        EXCHANGE_NAME.to_string(),
        BitfinexCodec,
    )
    .with_config(ws_config(config));

    BitfinexPublicWs::new(ws)
}

/// Create a private account stream signed with the configured secret
pub fn build_private_ws(
    config: &ExchangeConfig,
) -> Result<BitfinexPrivateWs<TungsteniteWs<BitfinexPrivateCodec>, BitfinexSigner>, ExchangeError>
{
    if !config.has_credentials() {
        return Err(ExchangeError::AuthError(
            "Private stream requires API credentials".to_string(),
        ));
    }

    let ws = TungsteniteWs::new(
        config.websocket_url().to_string(),
        EXCHANGE_NAME.to_string(),
        BitfinexPrivateCodec,
    )
    .with_config(ws_config(config));

    let signer = BitfinexSigner::new(config.secret_key().to_string());
    Ok(BitfinexPrivateWs::new(
        ws,
        config.api_key().to_string(),
        signer,
    ))
}
