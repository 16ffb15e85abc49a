use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

/// Write half of a transport.
pub trait FrameSink: Send + 'static {
    /// Write one binary message.
    fn send(&mut self, message: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Close with a normal-closure code. Closing an already closed sink is
    /// not an error.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Read half of a transport.
pub trait FrameSource: Send + 'static {
    /// Wait for the next binary message.
    ///
    /// Returns `Err(TransportError::Closed { .. })` once the transport is
    /// closed; every later call returns the same kind of error. Any other
    /// error is transient and the caller may keep reading.
    fn recv(&mut self) -> impl Future<Output = Result<Bytes>> + Send;
}

/// A connected transport that can be split into independent halves.
pub trait Transport: Send + 'static {
    type Sink: FrameSink;
    type Source: FrameSource;

    fn split(self) -> (Self::Sink, Self::Source);
}

/// Opens transports to an endpoint URL.
pub trait Dialer: Send + Sync + 'static {
    type Transport: Transport;

    fn dial(&self, url: &str) -> impl Future<Output = Result<Self::Transport>> + Send;
}
