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

use crate::domain::models::crawl_job::{CrawlJob, ManifestStatus};
use crate::domain::models::manifest::ManifestDocument;
use crate::domain::repositories::manifest_repository::{ManifestRepository, RepositoryError};
use crate::infrastructure::database::entities::manifest as manifest_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// 清单仓库实现
///
/// 基于SeaORM实现的清单数据访问层
#[derive(Clone)]
pub struct ManifestRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ManifestRepositoryImpl {
    /// 创建新的清单仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<manifest_entity::Model> for CrawlJob {
    type Error = RepositoryError;

    fn try_from(model: manifest_entity::Model) -> Result<Self, Self::Error> {
        let url = Url::parse(&model.url).map_err(|e| {
            RepositoryError::InvalidData(format!("manifest {} url: {}", model.id, e))
        })?;

        Ok(Self {
            id: model.id,
            url,
            status: parse_status(&model)?,
            last_modified: model.updated_at.with_timezone(&Utc),
        })
    }
}

fn parse_status(model: &manifest_entity::Model) -> Result<ManifestStatus, RepositoryError> {
    model.status.parse().map_err(|_| {
        RepositoryError::InvalidData(format!(
            "manifest {} status: unknown value `{}`",
            model.id, model.status
        ))
    })
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().into()
}

#[async_trait]
impl ManifestRepository for ManifestRepositoryImpl {
    async fn list_due_jobs(
        &self,
        max_age: chrono::Duration,
        offset_id: i32,
        limit: u64,
    ) -> Result<Vec<CrawlJob>, RepositoryError> {
        let cutoff: DateTime<FixedOffset> = (Utc::now() - max_age).into();
        let statuses = ManifestStatus::CRAWLABLE.iter().map(|s| s.to_string());

        let models = manifest_entity::Entity::find()
            .filter(manifest_entity::Column::Status.is_in(statuses))
            .filter(manifest_entity::Column::UpdatedAt.lt(cutoff))
            .filter(manifest_entity::Column::Id.gt(offset_id))
            .order_by_asc(manifest_entity::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        // A bad row must not stall paging, so it is logged and dropped.
        let jobs = models
            .into_iter()
            .filter_map(|m| match CrawlJob::try_from(m) {
                Ok(job) => Some(job),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable manifest row");
                    None
                }
            })
            .collect();

        Ok(jobs)
    }

    async fn upsert(
        &self,
        id: Option<i32>,
        doc: &ManifestDocument,
        guid: &str,
        status: ManifestStatus,
    ) -> Result<i32, RepositoryError> {
        let body: serde_json::Value = serde_json::from_str(&doc.body)
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;
        let now = now();

        let txn = self.db.begin().await?;

        let id = match id {
            Some(id) => {
                let model = manifest_entity::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;

                // The stored url is the row's identity; the parsed one may differ in spelling.
                let mut model: manifest_entity::ActiveModel = model.into();
                model.body = Set(body);
                model.status = Set(status.to_string());
                model.crawl_errors = Set(0);
                model.crawl_message = Set(String::new());
                model.updated_at = Set(now);
                model.update(&txn).await?.id
            }
            None => {
                let model = manifest_entity::ActiveModel {
                    guid: Set(guid.to_string()),
                    url: Set(doc.url.to_string()),
                    status: Set(status.to_string()),
                    body: Set(body),
                    crawl_errors: Set(0),
                    crawl_message: Set(String::new()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                model.insert(&txn).await?.id
            }
        };

        txn.commit().await?;
        Ok(id)
    }

    async fn record_crawl_error(
        &self,
        id: i32,
        message: &str,
        max_errors: i32,
    ) -> Result<ManifestStatus, RepositoryError> {
        let txn = self.db.begin().await?;

        let model = manifest_entity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let errors = model.crawl_errors + 1;
        let mut status = parse_status(&model)?;
        if errors > max_errors && status != ManifestStatus::Blocked {
            status = ManifestStatus::Disabled;
        }

        let mut model: manifest_entity::ActiveModel = model.into();
        model.crawl_errors = Set(errors);
        model.crawl_message = Set(message.to_string());
        model.status = Set(status.to_string());
        model.update(&txn).await?;

        txn.commit().await?;
        Ok(status)
    }
}
