// ============================================================================
// LIVE SESSION — status model for the real-time voice conversation
// ============================================================================
//
// Audio streaming itself belongs to the transport. This module only tracks
// the connection lifecycle and reports each status change to the UI.

use std::fmt;

use crate::error::CanvasResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LiveStatus {
    #[default]
    Disconnected,
    Connecting,
    Live,
    Error,
}

impl fmt::Display for LiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LiveStatus::Connecting => "Connecting…",
            LiveStatus::Live => "Live",
            LiveStatus::Disconnected => "Disconnected",
            LiveStatus::Error => "Error",
        };
        f.write_str(text)
    }
}

/// Opens and closes the audio connection.
pub trait LiveTransport {
    fn connect(&mut self) -> CanvasResult<()>;
    fn disconnect(&mut self);
}

pub type StatusCallback = Box<dyn FnMut(LiveStatus) + Send>;

pub struct LiveSession<T> {
    transport: T,
    status: LiveStatus,
    on_status: Option<StatusCallback>,
}

impl<T: LiveTransport> LiveSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            status: LiveStatus::Disconnected,
            on_status: None,
        }
    }

    pub fn on_status(mut self, callback: impl FnMut(LiveStatus) + Send + 'static) -> Self {
        self.on_status = Some(Box::new(callback));
        self
    }

    pub fn status(&self) -> LiveStatus {
        self.status
    }

    /// Connect. Already live or connecting is a no-op.
    pub fn start(&mut self) {
        if matches!(self.status, LiveStatus::Live | LiveStatus::Connecting) {
            return;
        }
        self.set_status(LiveStatus::Connecting);
        match self.transport.connect() {
            Ok(()) => self.set_status(LiveStatus::Live),
            Err(e) => {
                tracing::warn!("live session failed to connect: {e}");
                self.set_status(LiveStatus::Error);
            }
        }
    }

    pub fn stop(&mut self) {
        if self.status == LiveStatus::Live {
            self.transport.disconnect();
        }
        if self.status != LiveStatus::Disconnected {
            self.set_status(LiveStatus::Disconnected);
        }
    }

    fn set_status(&mut self, status: LiveStatus) {
        tracing::info!(%status, "live session");
        self.status = status;
        if let Some(cb) = self.on_status.as_mut() {
            cb(status);
        }
    }
}
