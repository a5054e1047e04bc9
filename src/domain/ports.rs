use crate::domain::model::{AnnouncementRecord, NotificationPayload, PriceQuote};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Pricing collaborator: one quote (or one failure) per product id.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_quote(&self, product_id: &str) -> Result<PriceQuote>;
}

/// Notification channel. The outcome is an opaque success/failure; the core
/// never inspects channel-specific state.
#[async_trait]
pub trait DealNotifier: Send + Sync {
    async fn send_deal(&self, payload: &NotificationPayload) -> Result<()>;
}

/// Durable announcement storage: point lookup by key, atomic upsert-by-key,
/// range deletion by age. Upserts for the same product id must be serialized;
/// distinct ids must not couple.
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn load(&self, product_id: &str) -> Result<Option<AnnouncementRecord>>;
    async fn upsert(&self, record: AnnouncementRecord) -> Result<()>;
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
