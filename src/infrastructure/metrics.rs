// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{AddrParseError, SocketAddr};
use tracing::{info, warn};

/// 初始化指标系统
///
/// 启用时在 `listen_addr` 上提供 Prometheus 抓取端点。未启用时指标宏为空操作。
pub fn init_metrics(settings: &MetricsSettings) -> Result<(), AddrParseError> {
    if !settings.enabled {
        info!("metrics exporter disabled");
        return Ok(());
    }

    let addr: SocketAddr = settings.listen_addr.parse()?;

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return Ok(());
    }

    describe_counter!(
        "manifest_crawl_outcomes_total",
        "Crawled manifests by outcome (stored, skipped, invalid, ...)"
    );
    describe_counter!("fetch_retries_total", "HTTP requests retried after a transient failure");
    describe_counter!(
        "fetch_rate_limited_hosts_total",
        "Hosts skipped for the rest of the run after answering 429"
    );

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
