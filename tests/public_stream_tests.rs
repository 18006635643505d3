mod support;

use bfx_stream::core::errors::ExchangeError;
use bfx_stream::core::types::row_channel;
use bfx_stream::exchanges::bitfinex::{pairs, BitfinexCodec, BitfinexPublicWs, TopicKind};
use serde_json::Value;
use std::time::Duration;
use support::ScriptedWs;
use tokio::time::timeout;

const BOOK_BTCUSD_SUBSCRIBED: &str =
    r#"{"event":"subscribed","channel":"book","pair":"BTCUSD","chanId":5}"#;

async fn connected(ws: ScriptedWs<BitfinexCodec>) -> BitfinexPublicWs<ScriptedWs<BitfinexCodec>> {
    let mut public = BitfinexPublicWs::new(ws);
    public.connect().await.unwrap();
    public
}

#[tokio::test]
async fn test_book_snapshot_then_update() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            BOOK_BTCUSD_SUBSCRIBED,
            "[5,[[100.0,2,0.5],[99.5,1,1.2]]]",
            "[5,[99.0,3,-0.4]]",
        ],
    );
    let log = ws.log();
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(16);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    let result = public.subscribe().await;
    assert!(matches!(result, Err(ExchangeError::ConnectionClosed)));

    let session_log = log.lock().unwrap();
    let sent = &session_log.sent;
    assert_eq!(sent.len(), 1);
    let request: Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(request["event"], "subscribe");
    assert_eq!(request["channel"], "book");
    assert_eq!(request["pair"], "BTCUSD");
    assert_eq!(request["len"], "25");

    assert_eq!(public.registry().bound_channel(TopicKind::Book, "BTCUSD"), Some(5));
    assert_eq!(
        rx.try_recv().unwrap(),
        vec![
            vec![0.0, 0.0, 0.0],
            vec![100.0, 2.0, 0.5],
            vec![99.5, 1.0, 1.2]
        ]
    );
    assert_eq!(rx.try_recv().unwrap(), vec![vec![99.0, 3.0, -0.4]]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_distinct_topics_route_to_own_sinks() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            r#"{"event":"info","version":1}"#,
            r#"{"event":"subscribed","channel":"book","pair":"ETHUSD","chanId":6}"#,
            BOOK_BTCUSD_SUBSCRIBED,
            r#"{"event":"subscribed","channel":"ticker","pair":"BTCUSD","chanId":7}"#,
            "[6,10.5,4,1.0]",
            "[5,20.5,2,-1.0]",
            "[7,236.1,0.1,236.2,0.2,-1.5,-0.01,236.0,1000.0,240.0,230.0]",
        ],
    );
    let mut public = connected(ws).await;
    let (btc_tx, mut btc_rx) = row_channel(16);
    let (eth_tx, mut eth_rx) = row_channel(16);
    let (ticker_tx, mut ticker_rx) = row_channel(16);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), btc_tx);
    public.add_subscribe(TopicKind::Book, pairs::ETHUSD, Some(25), eth_tx);
    public.add_subscribe(TopicKind::Ticker, pairs::BTCUSD, None, ticker_tx);

    let _ = public.subscribe().await;

    assert_eq!(public.router().len(), 3);
    assert_eq!(btc_rx.try_recv().unwrap(), vec![vec![20.5, 2.0, -1.0]]);
    assert_eq!(eth_rx.try_recv().unwrap(), vec![vec![10.5, 4.0, 1.0]]);
    assert_eq!(ticker_rx.try_recv().unwrap()[0].len(), 10);
    assert!(btc_rx.try_recv().is_err());
    assert!(eth_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_duplicate_topics_all_bound() {
    let ws = ScriptedWs::new(BitfinexCodec, &[BOOK_BTCUSD_SUBSCRIBED, "[5,1.0,2,3.0]"]);
    let mut public = connected(ws).await;
    let (first_tx, mut first_rx) = row_channel(4);
    let (second_tx, mut second_rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), first_tx);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), second_tx);

    let _ = public.subscribe().await;

    assert_eq!(public.router().binding(5).unwrap().sink_count(), 2);
    assert_eq!(first_rx.try_recv().unwrap(), vec![vec![1.0, 2.0, 3.0]]);
    assert_eq!(second_rx.try_recv().unwrap(), vec![vec![1.0, 2.0, 3.0]]);
}

#[tokio::test]
async fn test_compact_tuple_delivers_single_row() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            r#"{"event":"subscribed","channel":"trades","pair":"BTCUSD","chanId":2}"#,
            r#"[2,"te","1234-BTCUSD",1443659698,236.42,0.49064538]"#,
        ],
    );
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(4);
    public.add_subscribe(TopicKind::Trades, pairs::BTCUSD, None, sink);

    let _ = public.subscribe().await;

    assert_eq!(
        rx.try_recv().unwrap(),
        vec![vec![1_443_659_698.0, 236.42, 0.490_645_38]]
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unbound_channel_is_dropped_not_fatal() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &["[5,1.0,1,1.0]", "[9,1.0,1,1.0]", BOOK_BTCUSD_SUBSCRIBED, "[5,2.0,2,2.0]"],
    );
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    let result = public.subscribe().await;

    assert!(matches!(result, Err(ExchangeError::ConnectionClosed)));
    assert_eq!(rx.try_recv().unwrap(), vec![vec![2.0, 2.0, 2.0]]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_malformed_frames_are_skipped() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            BOOK_BTCUSD_SUBSCRIBED,
            "not json at all",
            r#"{"event":"subscribed","chanId":"#,
            r#"[5,"hb"]"#,
            r#"{"event":"error","msg":"Unknown pair","code":10300}"#,
            "[5,4.0,4,4.0]",
        ],
    );
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    let _ = public.subscribe().await;

    assert_eq!(rx.try_recv().unwrap(), vec![vec![4.0, 4.0, 4.0]]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_second_confirmation_does_not_rebind() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            BOOK_BTCUSD_SUBSCRIBED,
            r#"{"event":"subscribed","channel":"book","pair":"BTCUSD","chanId":8}"#,
            "[8,1.0,1,1.0]",
            "[5,3.0,3,3.0]",
        ],
    );
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    let _ = public.subscribe().await;

    assert!(!public.router().is_bound(8));
    assert_eq!(rx.try_recv().unwrap(), vec![vec![3.0, 3.0, 3.0]]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_transport_error_ends_loop() {
    let ws = ScriptedWs::new(BitfinexCodec, &[BOOK_BTCUSD_SUBSCRIBED])
        .then_error(ExchangeError::NetworkError("WebSocket error: reset".to_string()))
        .then_text("[5,1.0,1,1.0]");
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    let result = public.subscribe().await;

    match result {
        Err(ExchangeError::NetworkError(message)) => assert!(message.contains("reset")),
        other => panic!("Expected network error, got {:?}", other),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_subscribe_requires_connection() {
    let mut public = BitfinexPublicWs::new(ScriptedWs::new(BitfinexCodec, &[]));
    let (sink, _rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    assert!(matches!(
        public.subscribe().await,
        Err(ExchangeError::NetworkError(_))
    ));
}

#[tokio::test]
async fn test_clear_subscriptions_sends_nothing() {
    let ws = ScriptedWs::new(BitfinexCodec, &[BOOK_BTCUSD_SUBSCRIBED, "[5,1.0,1,1.0]"]);
    let log = ws.log();
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);
    public.clear_subscriptions();

    let _ = public.subscribe().await;

    assert!(log.lock().unwrap().sent.is_empty());
    assert!(public.router().is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_full_sink_applies_backpressure_in_order() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            BOOK_BTCUSD_SUBSCRIBED,
            "[5,1.0,1,1.0]",
            "[5,2.0,2,2.0]",
            "[5,3.0,3,3.0]",
        ],
    );
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(1);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    let handle = public.spawn();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished(), "loop should wait on the full sink");

    for expected in [1.0, 2.0, 3.0] {
        let batch = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch, vec![vec![expected, expected, expected]]);
    }

    let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    assert!(matches!(result, Err(ExchangeError::ConnectionClosed)));
}

#[tokio::test]
async fn test_float_channel_id_confirmation_binds() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            r#"{"event":"subscribed","channel":"book","pair":"BTCUSD","chanId":5.0}"#,
            "[5.0,6.0,6,6.0]",
        ],
    );
    let mut public = connected(ws).await;
    let (sink, mut rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);

    let _ = public.subscribe().await;

    assert_eq!(public.registry().bound_channel(TopicKind::Book, "BTCUSD"), Some(5));
    assert_eq!(rx.try_recv().unwrap(), vec![vec![6.0, 6.0, 6.0]]);
}

#[tokio::test]
async fn test_closed_sink_keeps_binding_for_connection() {
    let ws = ScriptedWs::new(
        BitfinexCodec,
        &[
            BOOK_BTCUSD_SUBSCRIBED,
            "[5,1.0,1,1.0]",
            "[5,2.0,2,2.0]",
            BOOK_BTCUSD_SUBSCRIBED,
        ],
    );
    let mut public = connected(ws).await;
    let (sink, rx) = row_channel(4);
    public.add_subscribe(TopicKind::Book, pairs::BTCUSD, Some(25), sink);
    drop(rx);

    let result = public.subscribe().await;

    assert!(matches!(result, Err(ExchangeError::ConnectionClosed)));
    assert!(public.router().is_bound(5));
    assert_eq!(public.router().binding(5).unwrap().sink_count(), 0);
}
