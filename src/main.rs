use clap::Parser;
use dealwatch::adapters::pricing::fetch_exchange_rate;
use dealwatch::config::cli::CliArgs;
use dealwatch::utils::{logger, validation::Validate};
use dealwatch::{
    CsvCatalog, CycleEngine, DispatchPacer, DuplicateTracker, HttpPriceSource, JsonFileStore,
    PriceNormalizer, TelegramNotifier,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting dealwatch");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let mut settings = match args.resolve_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if args.fetch_rate {
        if let Some(endpoint) = settings.rate_api_endpoint.clone() {
            settings.exchange_rate =
                fetch_exchange_rate(&endpoint, &settings.display_currency, settings.exchange_rate)
                    .await;
        }
    }

    if let Err(e) = settings.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    tracing::info!("  Catalog: {}", settings.catalog_path);
    tracing::info!("  Channel: {}", settings.telegram_chat_id);
    tracing::info!("  Min discount: {}%", settings.min_discount_percent);
    tracing::info!("  State file: {}", settings.state_path);

    let store = Arc::new(JsonFileStore::new(settings.state_path.clone()));
    let tracker = DuplicateTracker::new(
        store,
        settings.duplicate_window_hours,
        settings.price_repeat_window_hours,
        settings.price_repeat_tolerance,
    );
    let normalizer = PriceNormalizer::new(
        settings.display_currency(),
        settings.exchange_rate,
        settings.tax_schedule()?,
    )?;
    let pacer = DispatchPacer::from_seconds(
        settings.message_delay_seconds,
        settings.inter_batch_delay_seconds,
    );
    let source = Arc::new(HttpPriceSource::new(settings.price_api_endpoint.clone()));
    let notifier = Arc::new(TelegramNotifier::new(
        settings.telegram_bot_token.clone(),
        settings.telegram_chat_id.clone(),
    ));

    if !args.dry_run && !notifier.test_connection().await {
        tracing::warn!("Telegram connection check failed, dispatches may not go through");
    }

    let engine = CycleEngine::new(
        normalizer,
        tracker,
        pacer,
        source,
        notifier,
        settings.min_discount_percent,
        settings.max_deals_per_run,
        settings.batch_size,
        args.dry_run,
    );

    // Ctrl-C flips the flag; the engine honors it between batches, so every
    // record already written stays durable.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Shutdown requested");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    loop {
        let catalog = match CsvCatalog::from_path(&settings.catalog_path, &settings.catalog_category)
        {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("Failed to read catalog: {}", e);
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        };

        match engine.run_cycle(&catalog, &cancel).await {
            Ok(report) => {
                println!(
                    "✅ Cycle complete: {} checked, {} sent, {} duplicate, {} no-deal, {} failed",
                    report.checked,
                    report.sent,
                    report.skipped_duplicate,
                    report.skipped_no_deal,
                    report.failed
                );
            }
            Err(e) => {
                tracing::error!("Cycle aborted: {}", e);
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        }

        if let Some(days) = args.prune_days {
            match engine.prune(days).await {
                Ok(deleted) => tracing::info!("Pruned {} stale records", deleted),
                Err(e) => tracing::error!("Prune failed: {}", e),
            }
        }

        if !args.continuous || cancel.load(Ordering::Relaxed) {
            break;
        }

        tracing::info!("Next check in {} hours", args.interval_hours);
        let interval = Duration::from_secs_f64(args.interval_hours.max(0.0) * 3600.0);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = wait_for_cancel(&cancel) => break,
        }
    }

    Ok(())
}

async fn wait_for_cancel(cancel: &AtomicBool) {
    while !cancel.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
