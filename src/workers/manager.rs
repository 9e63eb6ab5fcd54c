// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlSettings;
use crate::domain::models::manifest::ManifestDocument;
use crate::domain::repositories::manifest_repository::ManifestRepository;
use crate::domain::services::manifest_validator::ManifestValidator;
use crate::domain::services::update_hook::ManifestUpdateHook;
use crate::engines::traits::FetchClient;
use crate::queue::job_feeder::JobFeeder;
use crate::workers::crawl_worker::{CrawlError, CrawlSummary, CrawlWorker};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info};
use url::Url;

/// 爬取管理器
///
/// 一个投放器加 N 个 worker，通过容量为 `batch_size` 的有界队列连接。
pub struct CrawlManager<R, F>
where
    R: ManifestRepository + 'static,
    F: FetchClient + 'static,
{
    settings: CrawlSettings,
    repo: Arc<R>,
    fetcher: Arc<F>,
    validator: Arc<ManifestValidator>,
    hook: Option<Arc<dyn ManifestUpdateHook>>,
}

impl<R, F> CrawlManager<R, F>
where
    R: ManifestRepository + 'static,
    F: FetchClient + 'static,
{
    pub fn new(
        settings: CrawlSettings,
        repo: Arc<R>,
        fetcher: Arc<F>,
        validator: Arc<ManifestValidator>,
    ) -> Self {
        Self {
            settings,
            repo,
            fetcher,
            validator,
            hook: None,
        }
    }

    /// 设置更新回调
    pub fn with_hook(mut self, hook: Arc<dyn ManifestUpdateHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// 执行一轮爬取
    ///
    /// 投放器读完所有到期清单并关闭队列、且所有 worker 处理完队列后返回；
    /// 收到停止信号时，正在处理的任务完成后返回。
    ///
    /// # 参数
    ///
    /// * `stop` - 停止信号，值变为 true 时停止
    ///
    /// # 返回值
    ///
    /// 本轮的结果统计
    pub async fn run(&self, stop: watch::Receiver<bool>) -> CrawlSummary {
        let capacity = self.settings.batch_size.max(1) as usize;
        let num_workers = self.settings.workers.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        info!(workers = num_workers, queue_capacity = capacity, "starting crawl");

        let feeder = JobFeeder::new(self.repo.clone(), &self.settings);
        let feeder_handle = tokio::spawn(feeder.run(tx, stop.clone()));

        let worker = Arc::new(CrawlWorker::new(
            &self.settings,
            self.repo.clone(),
            self.fetcher.clone(),
            self.validator.clone(),
            self.hook.clone(),
        ));
        let rx = Arc::new(Mutex::new(rx));

        let handles: Vec<_> = (0..num_workers)
            .map(|id| tokio::spawn(worker.clone().run(id, rx.clone(), stop.clone())))
            .collect();

        let mut summary = CrawlSummary::default();
        for res in join_all(handles).await {
            match res {
                Ok(s) => summary += s,
                Err(e) => error!(error = %e, "crawl worker panicked"),
            }
        }

        match feeder_handle.await {
            Ok(queued) => summary.queued = queued,
            Err(e) => error!(error = %e, "job feeder panicked"),
        }

        info!(
            queued = summary.queued,
            stored = summary.stored,
            skipped = summary.skipped,
            rate_limited = summary.rate_limited,
            invalid = summary.invalid,
            fetch_failed = summary.fetch_failed,
            commit_failed = summary.commit_failed,
            "crawl finished"
        );
        summary
    }

    /// 抓取并校验单个清单，不写入存储
    ///
    /// 供提交和校验流程使用。
    pub async fn fetch_manifest(&self, url: &Url) -> Result<ManifestDocument, CrawlError> {
        let body = self.fetcher.get(url).await?;
        let doc = self.validator.parse_manifest(&body, url, Some(url))?;
        Ok(doc)
    }
}
