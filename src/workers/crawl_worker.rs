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

use crate::config::settings::CrawlSettings;
use crate::domain::models::crawl_job::{CrawlJob, ManifestStatus};
use crate::domain::models::manifest::ManifestDocument;
use crate::domain::repositories::manifest_repository::ManifestRepository;
use crate::domain::services::manifest_validator::{verify_attestation, ManifestValidator};
use crate::domain::services::update_hook::ManifestUpdateHook;
use crate::engines::traits::{FetchClient, FetchError};
use crate::queue::job_feeder::stop_requested;
use crate::utils::url_utils::{host_key, manifest_guid};
use crate::utils::validators::ValidationError;
use metrics::counter;
use std::ops::AddAssign;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

/// 单个任务的失败原因
#[derive(Error, Debug)]
pub enum CrawlError {
    /// 抓取失败
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// 清单不合法
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// 任务处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobOutcome {
    /// 已校验并写入
    Stored,
    /// 远程未修改，跳过
    Skipped,
    /// 主机已被限流，跳过且不计错误
    RateLimited,
    /// 校验失败，已记录错误
    Invalid,
    /// 抓取失败，已记录错误
    FetchFailed,
    /// 写入存储失败，等待下一轮
    CommitFailed,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Stored => "stored",
            JobOutcome::Skipped => "skipped",
            JobOutcome::RateLimited => "rate_limited",
            JobOutcome::Invalid => "invalid",
            JobOutcome::FetchFailed => "fetch_failed",
            JobOutcome::CommitFailed => "commit_failed",
        }
    }
}

/// 一轮爬取的结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// 投放到队列的任务数
    pub queued: u64,
    pub stored: u64,
    pub skipped: u64,
    pub rate_limited: u64,
    pub invalid: u64,
    pub fetch_failed: u64,
    pub commit_failed: u64,
}

impl CrawlSummary {
    pub fn record(&mut self, outcome: JobOutcome) {
        let slot = match outcome {
            JobOutcome::Stored => &mut self.stored,
            JobOutcome::Skipped => &mut self.skipped,
            JobOutcome::RateLimited => &mut self.rate_limited,
            JobOutcome::Invalid => &mut self.invalid,
            JobOutcome::FetchFailed => &mut self.fetch_failed,
            JobOutcome::CommitFailed => &mut self.commit_failed,
        };
        *slot += 1;
    }

    /// 已处理的任务数
    pub fn processed(&self) -> u64 {
        self.stored
            + self.skipped
            + self.rate_limited
            + self.invalid
            + self.fetch_failed
            + self.commit_failed
    }
}

impl AddAssign for CrawlSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.queued += rhs.queued;
        self.stored += rhs.stored;
        self.skipped += rhs.skipped;
        self.rate_limited += rhs.rate_limited;
        self.invalid += rhs.invalid;
        self.fetch_failed += rhs.fetch_failed;
        self.commit_failed += rhs.commit_failed;
    }
}

/// 爬取工作者
///
/// 对每个任务依次执行：HEAD 探测、抓取、解析校验、（可选）远程来源校验、
/// 生成 GUID、写入存储、触发更新回调。失败时由存储记录错误并决定是否禁用。
pub struct CrawlWorker<R, F>
where
    R: ManifestRepository,
    F: FetchClient,
{
    repo: Arc<R>,
    fetcher: Arc<F>,
    validator: Arc<ManifestValidator>,
    hook: Option<Arc<dyn ManifestUpdateHook>>,
    max_crawl_errors: i32,
    manifest_uri: String,
    check_provenance: bool,
}

impl<R, F> CrawlWorker<R, F>
where
    R: ManifestRepository,
    F: FetchClient,
{
    /// 创建新的爬取工作者
    ///
    /// # 参数
    ///
    /// * `settings` - 爬取调度配置
    /// * `repo` - 清单仓库
    /// * `fetcher` - 抓取客户端
    /// * `validator` - 清单校验器
    /// * `hook` - 可选的更新回调
    pub fn new(
        settings: &CrawlSettings,
        repo: Arc<R>,
        fetcher: Arc<F>,
        validator: Arc<ManifestValidator>,
        hook: Option<Arc<dyn ManifestUpdateHook>>,
    ) -> Self {
        Self {
            repo,
            fetcher,
            validator,
            hook,
            max_crawl_errors: settings.max_crawl_errors,
            manifest_uri: settings.manifest_uri.clone(),
            check_provenance: settings.check_provenance,
        }
    }

    /// 运行工作循环
    ///
    /// 队列关闭或收到停止信号时退出；正在处理的任务会先完成。
    pub async fn run(
        self: Arc<Self>,
        worker_id: usize,
        queue: Arc<Mutex<mpsc::Receiver<CrawlJob>>>,
        mut stop: watch::Receiver<bool>,
    ) -> CrawlSummary {
        debug!(worker_id, "crawl worker started");
        let mut summary = CrawlSummary::default();

        loop {
            if *stop.borrow() {
                info!(worker_id, "stop requested, worker exiting");
                break;
            }

            let job = {
                let mut rx = queue.lock().await;
                tokio::select! {
                    job = rx.recv() => job,
                    _ = stop_requested(&mut stop) => None,
                }
            };

            let Some(job) = job else {
                break;
            };

            let outcome = self.process_job(&job).await;
            counter!("manifest_crawl_outcomes_total", "outcome" => outcome.as_str()).increment(1);
            summary.record(outcome);
        }

        debug!(worker_id, processed = summary.processed(), "crawl worker finished");
        summary
    }

    /// 处理单个任务
    #[instrument(skip(self, job), fields(id = job.id, url = %job.url))]
    pub async fn process_job(&self, job: &CrawlJob) -> JobOutcome {
        if self.fetcher.is_rate_limited(&host_key(&job.url)) {
            debug!("host is rate limited, skipping");
            return JobOutcome::RateLimited;
        }

        match self.crawl(job).await {
            Ok(None) => {
                debug!("manifest not modified, skipping");
                JobOutcome::Skipped
            }
            Ok(Some(doc)) => self.commit(job, doc).await,
            Err(CrawlError::Fetch(FetchError::RateLimited { host })) => {
                debug!(host = %host, "host became rate limited, skipping");
                JobOutcome::RateLimited
            }
            Err(e) => self.fail(job, e).await,
        }
    }

    async fn crawl(&self, job: &CrawlJob) -> Result<Option<ManifestDocument>, CrawlError> {
        let head = self.fetcher.head(&job.url).await?;
        if head
            .last_modified
            .is_some_and(|remote| remote <= job.last_modified)
        {
            return Ok(None);
        }

        let body = self.fetcher.get(&job.url).await?;
        let doc = self
            .validator
            .parse_manifest(&body, &job.url, Some(&job.url))?;

        if self.check_provenance {
            self.check_remote_provenance(&doc).await?;
        }

        Ok(Some(doc))
    }

    /// 获取每个证明文档，确认其中列出了清单 URL
    async fn check_remote_provenance(&self, doc: &ManifestDocument) -> Result<(), ValidationError> {
        for (tag, wk) in self.validator.attestations(&doc.manifest) {
            let body = self
                .fetcher
                .get(&wk)
                .await
                .map_err(|e| ValidationError::Provenance {
                    tag: tag.clone(),
                    reason: e.to_string(),
                })?;
            verify_attestation(&tag, &body, &doc.url)?;
        }
        Ok(())
    }

    async fn commit(&self, job: &CrawlJob, doc: ManifestDocument) -> JobOutcome {
        let guid = manifest_guid(&job.url, &self.manifest_uri);

        match self.repo.upsert(Some(job.id), &doc, &guid, job.status).await {
            Ok(id) => {
                info!(manifest_id = id, guid = %guid, "manifest updated");
                self.notify(job, Some(&doc), job.status);
                JobOutcome::Stored
            }
            Err(e) => {
                error!(error = %e, "error saving manifest");
                JobOutcome::CommitFailed
            }
        }
    }

    async fn fail(&self, job: &CrawlJob, err: CrawlError) -> JobOutcome {
        let outcome = match err {
            CrawlError::Fetch(_) => JobOutcome::FetchFailed,
            CrawlError::Validation(_) => JobOutcome::Invalid,
        };
        warn!(error = %err, "error crawling manifest");

        match self
            .repo
            .record_crawl_error(job.id, &err.to_string(), self.max_crawl_errors)
            .await
        {
            Ok(status) => {
                if status == ManifestStatus::Disabled && job.status != ManifestStatus::Disabled {
                    warn!(
                        max_crawl_errors = self.max_crawl_errors,
                        "manifest disabled after repeated crawl errors"
                    );
                }
                self.notify(job, None, status);
                outcome
            }
            Err(e) => {
                error!(error = %e, "error recording crawl error");
                JobOutcome::CommitFailed
            }
        }
    }

    fn notify(&self, job: &CrawlJob, doc: Option<&ManifestDocument>, status: ManifestStatus) {
        if let Some(hook) = &self.hook {
            hook.on_manifest_update(job, doc, status);
        }
    }
}
