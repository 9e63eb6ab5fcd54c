// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use fundcrawl::config::settings::Settings;
use fundcrawl::domain::services::manifest_validator::{ManifestValidator, ValidatorOptions};
use fundcrawl::engines::reqwest_engine::ReqwestFetchClient;
use fundcrawl::infrastructure::data_files;
use fundcrawl::infrastructure::database::connection;
use fundcrawl::infrastructure::metrics;
use fundcrawl::infrastructure::repositories::manifest_repo_impl::ManifestRepositoryImpl;
use fundcrawl::utils::telemetry;
use fundcrawl::workers::CrawlManager;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// 主函数
///
/// 执行一轮爬取：读取到期清单、抓取校验、写回存储，Ctrl-C 时优雅停止
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(settings.log.json);
    info!("Starting fundcrawl...");
    metrics::init_metrics(&settings.metrics)?;

    // 3. Connect to database
    let db = Arc::new(connection::create_pool(&settings.database).await?);

    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Schema tables and collaborators
    let tables = Arc::new(data_files::load_schema_tables(&settings.schema)?);
    let validator = Arc::new(ManifestValidator::new(
        ValidatorOptions::from(&settings.schema),
        tables,
    ));
    let fetcher = Arc::new(ReqwestFetchClient::new(&settings.http)?);
    let repo = Arc::new(ManifestRepositoryImpl::new(db.clone()));

    let manager = CrawlManager::new(settings.crawl.clone(), repo, fetcher, validator);

    // 5. Stop on Ctrl-C; in-flight jobs finish first
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, finishing in-flight manifests");
                let _ = stop_tx.send(true);
            }
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    });

    let summary = manager.run(stop_rx).await;
    info!(
        processed = summary.processed(),
        stored = summary.stored,
        failed = summary.fetch_failed + summary.invalid,
        "fundcrawl finished"
    );

    Ok(())
}
