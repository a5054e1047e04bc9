pub mod cycle;
pub mod evaluate;
pub mod normalize;
pub mod pacing;
pub mod tax;
pub mod tracker;

pub use crate::domain::model::{
    AnnouncementRecord, CatalogEntry, Currency, CycleReport, DealDecision, NotificationPayload,
    PriceQuote,
};
pub use crate::domain::ports::{AnnouncementStore, DealNotifier, PriceSource};
pub use crate::utils::error::Result;
