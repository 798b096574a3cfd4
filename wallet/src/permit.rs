// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Single connection gate, only one wallet session may be active at a time
///
/// Permits are released on drop, so every exit path from a session
/// (including errors and cancellation) frees the gate.
#[derive(Clone, Debug)]
pub struct ConnectionPermit(Arc<Semaphore>);

impl Default for ConnectionPermit {
    fn default() -> Self {
        Self(Arc::new(Semaphore::new(1)))
    }
}

impl ConnectionPermit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the gate to become available
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        // The semaphore is never closed
        loop {
            if let Ok(p) = self.0.clone().acquire_owned().await {
                return p;
            }
        }
    }

    /// Attempt to acquire the gate without waiting
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.0.clone().try_acquire_owned().ok()
    }
}
