use bfx_stream::core::config::ExchangeConfig;
use bfx_stream::core::types::{is_snapshot, row_channel, DEFAULT_SINK_CAPACITY};
use bfx_stream::exchanges::bitfinex::{build_private_ws, build_public_ws, pairs, TopicKind};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Credentials are optional; without them only the public stream runs
    let config = ExchangeConfig::from_env_auto("BITFINEX").unwrap_or_else(|e| {
        warn!("No credentials loaded ({}), running public stream only", e);
        ExchangeConfig::read_only()
    });

    let mut public = build_public_ws(&config);
    let (book_tx, mut book_rx) = row_channel(DEFAULT_SINK_CAPACITY);
    let (ticker_tx, mut ticker_rx) = row_channel(DEFAULT_SINK_CAPACITY);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), book_tx);
    public.add_subscribe(TopicKind::Ticker, pairs::BTCUSD, None, ticker_tx);
    public.connect().await?;
    let public_task = public.spawn();

    if config.has_credentials() {
        let (term_tx, mut term_rx) = mpsc::channel(DEFAULT_SINK_CAPACITY);
        build_private_ws(&config)?.spawn(term_tx);
        tokio::spawn(async move {
            while let Some(record) = term_rx.recv().await {
                if record.has_error() {
                    warn!("Private stream error: {}", record.error.unwrap_or_default());
                } else {
                    info!(term = %record.term, data = ?record.data, "Account event");
                }
            }
        });
    }

    tokio::spawn(async move {
        while let Some(rows) = ticker_rx.recv().await {
            info!(?rows, "BTCUSD ticker");
        }
    });

    tokio::spawn(async move {
        while let Some(rows) = book_rx.recv().await {
            if is_snapshot(&rows) {
                info!(levels = rows.len() - 1, "BTCUSD book snapshot");
            } else {
                info!(?rows, "BTCUSD book update");
            }
        }
    });

    public_task.await??;
    Ok(())
}
