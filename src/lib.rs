pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{CsvCatalog, HttpPriceSource, JsonFileStore, TelegramNotifier};
pub use crate::config::Settings;
pub use crate::core::cycle::CycleEngine;
pub use crate::core::evaluate::evaluate;
pub use crate::core::normalize::PriceNormalizer;
pub use crate::core::pacing::DispatchPacer;
pub use crate::core::tax::{TaxBracket, TaxSchedule};
pub use crate::core::tracker::DuplicateTracker;
pub use crate::domain::model::{CatalogEntry, CycleReport, DealDecision, PriceQuote};
pub use crate::domain::ports::{AnnouncementStore, DealNotifier, PriceSource};
pub use crate::utils::error::{DealError, Result};
