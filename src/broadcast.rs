//! Announcement fan-out
//!
//! Takes each message the tracker produces and delivers it to every
//! configured destination through a [`Courier`]. A destination that
//! rejects a delivery gets a log line and nothing else; the rest of the
//! fan-out, and the poll loop behind it, carry on.

use std::sync::Arc;

use async_trait::async_trait;
use match_tracker::Announcer;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::destinations::{Destination, DestinationBook};

#[derive(Debug, Error)]
#[error("delivery to {channel} failed: {reason}")]
pub struct DeliveryError {
    pub channel: String,
    pub reason:  String,
}

/// One outbound transport. A chat integration implements this; the stock
/// build ships with the log-only courier below.
#[async_trait]
pub trait Courier: Send + Sync {
    async fn deliver(&self, channel: &str, message: &str) -> Result<(), DeliveryError>;
}

/// Writes every announcement to the log instead of a chat service. Useful
/// headless, and as the stand-in until a real transport is wired up.
pub struct LogCourier;

#[async_trait]
impl Courier for LogCourier {
    async fn deliver(&self, channel: &str, message: &str) -> Result<(), DeliveryError> {
        info!(channel, "{message}");
        Ok(())
    }
}

pub struct Broadcaster {
    courier:      Arc<dyn Courier>,
    destinations: Arc<RwLock<DestinationBook>>,
}

impl Broadcaster {
    pub fn new(courier: Arc<dyn Courier>, destinations: Arc<RwLock<DestinationBook>>) -> Self {
        Self {
            courier,
            destinations,
        }
    }

    async fn send(&self, dest: &Destination, message: &str) {
        if let Err(e) = self.courier.deliver(dest.target_channel(), message).await {
            error!(destination = %dest.id, "{e}");
        }
    }
}

#[async_trait]
impl Announcer for Broadcaster {
    async fn match_started(&self, message: &str) {
        let book = self.destinations.read().await;
        for dest in book.iter() {
            self.send(dest, message).await;
        }
    }

    async fn match_finished(&self, full_message: &str, reduced_message: &str) {
        let book = self.destinations.read().await;
        for dest in book.iter() {
            if !dest.victory_messages {
                continue;
            }
            let message = if dest.show_result {
                full_message
            } else {
                reduced_message
            };
            self.send(dest, message).await;
        }
    }
}

// ====================================================================
