// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Channel-backed sockets
//!
//! A [Socket] is a pair of channels carrying [Frame]s to and from an I/O task
//! (see [crate::ws]) or directly to a peer socket ([Socket::pair]), so that
//! teardown is a single drop rather than a set of listener removals.

use tokio::sync::mpsc;

use crate::Error;

/// Normal closure code
pub const CLOSE_NORMAL: u16 = 1000;

/// Frame queue depth per direction
const QUEUE_LEN: usize = 16;

/// Socket frames (in either direction)
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Binary message (zero-length messages are peer pings)
    Data(Vec<u8>),
    /// Socket closed
    Closed {
        /// Close handshake completed
        clean: bool,
        /// Close code, where provided
        code: Option<u16>,
    },
}

impl Frame {
    /// Normal (clean) closure frame
    pub const fn close() -> Self {
        Frame::Closed {
            clean: true,
            code: Some(CLOSE_NORMAL),
        }
    }
}

/// Socket send half, cheap to clone
#[derive(Clone, Debug)]
pub struct SocketSender(mpsc::Sender<Frame>);

impl SocketSender {
    /// Send a data frame
    pub async fn send(&self, data: Vec<u8>) -> Result<(), Error> {
        log::trace!("tx {} bytes", data.len());

        self.0
            .send(Frame::Data(data))
            .await
            .map_err(|_| Error::SessionClosed {
                clean: false,
                code: None,
            })
    }

    /// Close the socket, this is a no-op if the socket is already closed
    pub async fn close(&self) {
        let _ = self.0.send(Frame::close()).await;
    }

    /// Check whether the peer / I/O task has gone away
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Socket receive half
#[derive(Debug)]
pub struct SocketReceiver(mpsc::Receiver<Frame>);

impl SocketReceiver {
    /// Receive the next frame, a dropped peer is reported as an unclean close
    pub async fn recv(&mut self) -> Frame {
        match self.0.recv().await {
            Some(f) => {
                if let Frame::Data(d) = &f {
                    log::trace!("rx {} bytes", d.len());
                }
                f
            }
            None => Frame::Closed {
                clean: false,
                code: None,
            },
        }
    }
}

/// Bidirectional socket
#[derive(Debug)]
pub struct Socket {
    tx: SocketSender,
    rx: SocketReceiver,
}

impl Socket {
    /// Create a socket from raw channels
    pub fn from_channels(tx: mpsc::Sender<Frame>, rx: mpsc::Receiver<Frame>) -> Self {
        Self {
            tx: SocketSender(tx),
            rx: SocketReceiver(rx),
        }
    }

    /// Create a new pair of connected in-memory sockets
    pub fn pair() -> (Socket, Socket) {
        let (a_tx, b_rx) = mpsc::channel(QUEUE_LEN);
        let (b_tx, a_rx) = mpsc::channel(QUEUE_LEN);

        (
            Socket::from_channels(a_tx, a_rx),
            Socket::from_channels(b_tx, b_rx),
        )
    }

    /// Create channels for an I/O task, returning the socket
    /// and the (frame sender, frame receiver) for the task side
    pub fn channel() -> (Socket, mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        let (out_tx, out_rx) = mpsc::channel(QUEUE_LEN);
        let (in_tx, in_rx) = mpsc::channel(QUEUE_LEN);

        (Socket::from_channels(out_tx, in_rx), in_tx, out_rx)
    }

    /// Send a data frame
    pub async fn send(&self, data: Vec<u8>) -> Result<(), Error> {
        self.tx.send(data).await
    }

    /// Receive the next frame
    pub async fn recv(&mut self) -> Frame {
        self.rx.recv().await
    }

    /// Close the socket
    pub async fn close(&self) {
        self.tx.close().await
    }

    /// Fetch a handle to the send half
    pub fn sender(&self) -> SocketSender {
        self.tx.clone()
    }

    /// Split into send and receive halves
    pub fn split(self) -> (SocketSender, SocketReceiver) {
        (self.tx, self.rx)
    }
}
