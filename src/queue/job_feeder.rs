// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlSettings;
use crate::domain::models::crawl_job::CrawlJob;
use crate::domain::repositories::manifest_repository::ManifestRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// 等待停止信号
///
/// 发送端被丢弃时视为永远不会停止。
pub async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// 任务投放器
///
/// 按 ID 分页读取到期清单并放入有界队列。读到空页时关闭队列退出；
/// 存储出错时等待 `store_retry_interval` 后重试，等待期间可被停止信号打断。
pub struct JobFeeder<R: ManifestRepository + 'static> {
    /// 清单仓库
    repo: Arc<R>,
    max_age: chrono::Duration,
    batch_size: u64,
    retry_interval: Duration,
}

impl<R: ManifestRepository + 'static> JobFeeder<R> {
    /// 创建新的任务投放器
    ///
    /// # 参数
    ///
    /// * `repo` - 清单仓库
    /// * `settings` - 爬取调度配置
    pub fn new(repo: Arc<R>, settings: &CrawlSettings) -> Self {
        Self {
            repo,
            max_age: settings.manifest_age(),
            batch_size: settings.batch_size.max(1),
            retry_interval: settings.store_retry_interval(),
        }
    }

    /// 运行投放循环
    ///
    /// 返回时 `tx` 被丢弃，队列随之关闭。
    ///
    /// # 返回值
    ///
    /// 投放的任务数
    pub async fn run(self, tx: mpsc::Sender<CrawlJob>, mut stop: watch::Receiver<bool>) -> u64 {
        let mut offset_id = 0;
        let mut queued = 0u64;

        'pages: loop {
            if *stop.borrow() {
                info!("stop requested, job feeder exiting");
                break;
            }

            let jobs = match self
                .repo
                .list_due_jobs(self.max_age, offset_id, self.batch_size)
                .await
            {
                Ok(jobs) => jobs,
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_secs = self.retry_interval.as_secs(),
                        "error fetching due manifests from the store"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_interval) => continue,
                        _ = stop_requested(&mut stop) => {
                            info!("stop requested while waiting to retry the store");
                            break;
                        }
                    }
                }
            };

            let (first_id, last_id) = match (jobs.first(), jobs.last()) {
                (Some(first), Some(last)) => (first.id, last.id),
                _ => {
                    info!(queued, "no more manifests to crawl");
                    break;
                }
            };

            info!(count = jobs.len(), first_id, last_id, "queueing manifests");
            offset_id = last_id;

            for job in jobs {
                let id = job.id;
                tokio::select! {
                    res = tx.send(job) => {
                        if res.is_err() {
                            debug!("job queue closed by the workers");
                            break 'pages;
                        }
                        queued += 1;
                    }
                    _ = stop_requested(&mut stop) => {
                        info!(id, "stop requested, job feeder exiting");
                        break 'pages;
                    }
                }
            }
        }

        queued
    }
}
