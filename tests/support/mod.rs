#![allow(dead_code)]

use async_trait::async_trait;
use bfx_stream::core::errors::ExchangeError;
use bfx_stream::core::kernel::{WsCodec, WsSession};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_tungstenite::tungstenite::Message;

/// What a scripted session observed from the code under test
#[derive(Debug, Default)]
pub struct SessionLog {
    pub sent: Vec<String>,
    pub connects: u32,
    pub closed: bool,
}

/// In-memory session replaying a fixed list of inbound frames.
///
/// The stream ends (`None`) once the script is exhausted.
pub struct ScriptedWs<C: WsCodec> {
    codec: C,
    script: VecDeque<Result<Message, ExchangeError>>,
    log: Arc<Mutex<SessionLog>>,
    connected: bool,
    fail_connect: bool,
}

impl<C: WsCodec> ScriptedWs<C> {
    pub fn new(codec: C, frames: &[&str]) -> Self {
        Self {
            codec,
            script: frames
                .iter()
                .map(|frame| Ok(Message::Text((*frame).to_string())))
                .collect(),
            log: Arc::new(Mutex::new(SessionLog::default())),
            connected: false,
            fail_connect: false,
        }
    }

    pub fn unreachable(codec: C) -> Self {
        Self {
            fail_connect: true,
            ..Self::new(codec, &[])
        }
    }

    pub fn then_text(mut self, frame: &str) -> Self {
        self.script.push_back(Ok(Message::Text(frame.to_string())));
        self
    }

    pub fn then_error(mut self, error: ExchangeError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for ScriptedWs<C> {
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        if self.fail_connect {
            return Err(ExchangeError::NetworkError(
                "WebSocket connection failed: connection refused".to_string(),
            ));
        }
        self.connected = true;
        self.log.lock().unwrap().connects += 1;
        Ok(())
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        if !self.connected {
            return Err(ExchangeError::NetworkError(
                "WebSocket not connected".to_string(),
            ));
        }
        if let Message::Text(text) = msg {
            self.log.lock().unwrap().sent.push(text);
        }
        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        if !self.connected {
            return Some(Err(ExchangeError::NetworkError(
                "WebSocket not connected".to_string(),
            )));
        }
        let next = self.script.pop_front();
        if !matches!(next, Some(Ok(_))) {
            self.connected = false;
        }
        next
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        self.connected = false;
        self.log.lock().unwrap().closed = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn codec(&self) -> &C {
        &self.codec
    }
}
