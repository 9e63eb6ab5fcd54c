// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fundcrawl::domain::models::crawl_job::{CrawlJob, ManifestStatus};
use fundcrawl::domain::models::manifest::ManifestDocument;
use fundcrawl::domain::repositories::manifest_repository::{
    ManifestRepository, RepositoryError,
};
use fundcrawl::domain::services::update_hook::ManifestUpdateHook;
use std::sync::Mutex;
use url::Url;

#[derive(Debug, Clone)]
pub struct StoredManifest {
    pub id: i32,
    pub url: Url,
    pub guid: String,
    pub status: ManifestStatus,
    pub body: Option<String>,
    pub crawl_errors: i32,
    pub crawl_message: String,
    pub updated_at: DateTime<Utc>,
}

/// 内存清单仓库
///
/// 记录写入次数，禁用阈值与数据库实现一致。
#[derive(Default)]
pub struct MemoryManifestRepository {
    rows: Mutex<Vec<StoredManifest>>,
    writes: Mutex<usize>,
}

impl MemoryManifestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, url: &str, status: ManifestStatus, errors: i32) -> i32 {
        self.add_at(url, status, errors, Utc::now() - chrono::Duration::days(2))
    }

    pub fn add_at(
        &self,
        url: &str,
        status: ManifestStatus,
        errors: i32,
        updated_at: DateTime<Utc>,
    ) -> i32 {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i32 + 1;
        rows.push(StoredManifest {
            id,
            url: Url::parse(url).unwrap(),
            guid: String::new(),
            status,
            body: None,
            crawl_errors: errors,
            crawl_message: String::new(),
            updated_at,
        });
        id
    }

    pub fn get(&self, id: i32) -> StoredManifest {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .unwrap()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl ManifestRepository for MemoryManifestRepository {
    async fn list_due_jobs(
        &self,
        max_age: chrono::Duration,
        offset_id: i32,
        limit: u64,
    ) -> Result<Vec<CrawlJob>, RepositoryError> {
        let cutoff = Utc::now() - max_age;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.status.is_crawlable() && r.updated_at < cutoff && r.id > offset_id)
            .take(limit as usize)
            .map(|r| CrawlJob {
                id: r.id,
                url: r.url.clone(),
                status: r.status,
                last_modified: r.updated_at,
            })
            .collect())
    }

    async fn upsert(
        &self,
        id: Option<i32>,
        doc: &ManifestDocument,
        guid: &str,
        status: ManifestStatus,
    ) -> Result<i32, RepositoryError> {
        *self.writes.lock().unwrap() += 1;
        let mut rows = self.rows.lock().unwrap();

        if let Some(id) = id {
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(RepositoryError::NotFound)?;
            row.body = Some(doc.body.clone());
            row.status = status;
            row.crawl_errors = 0;
            row.crawl_message.clear();
            row.updated_at = Utc::now();
            if row.guid.is_empty() {
                row.guid = guid.to_string();
            }
            return Ok(row.id);
        }

        let id = rows.len() as i32 + 1;
        rows.push(StoredManifest {
            id,
            url: doc.url.clone(),
            guid: guid.to_string(),
            status,
            body: Some(doc.body.clone()),
            crawl_errors: 0,
            crawl_message: String::new(),
            updated_at: Utc::now(),
        });
        Ok(id)
    }

    async fn record_crawl_error(
        &self,
        id: i32,
        message: &str,
        max_errors: i32,
    ) -> Result<ManifestStatus, RepositoryError> {
        *self.writes.lock().unwrap() += 1;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;

        row.crawl_errors += 1;
        row.crawl_message = message.to_string();
        if row.crawl_errors > max_errors && row.status != ManifestStatus::Blocked {
            row.status = ManifestStatus::Disabled;
        }
        Ok(row.status)
    }
}

/// 记录每次回调的 (id, 是否带清单, 状态)
#[derive(Default)]
pub struct RecordingHook {
    pub calls: Mutex<Vec<(i32, bool, ManifestStatus)>>,
}

impl RecordingHook {
    pub fn calls(&self) -> Vec<(i32, bool, ManifestStatus)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ManifestUpdateHook for RecordingHook {
    fn on_manifest_update(
        &self,
        job: &CrawlJob,
        doc: Option<&ManifestDocument>,
        status: ManifestStatus,
    ) {
        self.calls
            .lock()
            .unwrap()
            .push((job.id, doc.is_some(), status));
    }
}
