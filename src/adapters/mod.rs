pub mod catalog;
pub mod pricing;
pub mod store;
pub mod telegram;

pub use catalog::CsvCatalog;
pub use pricing::HttpPriceSource;
pub use store::JsonFileStore;
pub use telegram::TelegramNotifier;
