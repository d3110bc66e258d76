use std::sync::Arc;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::repositories::{ReadingRepository, RuleStore};
use crate::services::{AlarmService, CollectorService, LogNotifier};

pub mod configs;
pub mod models;
pub mod repositories;
pub mod services;

pub async fn run(settings: &Arc<Settings>) {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .unwrap(),
    );
    let readings = Arc::new(ReadingRepository::new(storage.clone()));

    let alarm_service = Arc::new(AlarmService::new(
        settings.alarm.clone(),
        RuleStore::new(&settings.alarm.rules_path),
        readings.clone(),
        Arc::new(LogNotifier),
    ));
    let collector = CollectorService::new(settings.node.clone(), readings.clone());

    let collector_stop = collector.start();
    let alarm_stop = alarm_service.clone().start();

    tokio::signal::ctrl_c()
        .await
        .expect("failed to install the shutdown signal handler");

    tracing::info!("shutdown signal received");

    let _ = collector_stop.send(());
    let _ = alarm_stop.send(());
}
