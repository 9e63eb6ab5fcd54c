// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::{CrawlJob, ManifestStatus};
use crate::domain::models::manifest::ManifestDocument;
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 存储中的数据无法转换为领域模型
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// 清单仓库特质
///
/// 爬取流程访问存储的全部接口：读取到期任务、写入校验通过的清单、
/// 记录爬取错误。实现方负责自身的并发控制。
#[async_trait]
pub trait ManifestRepository: Send + Sync {
    /// 按 ID 升序读取 `offset_id` 之后、超过 `max_age` 未更新的可爬取清单
    async fn list_due_jobs(
        &self,
        max_age: chrono::Duration,
        offset_id: i32,
        limit: u64,
    ) -> Result<Vec<CrawlJob>, RepositoryError>;

    /// 写入或更新清单，并清零错误计数
    ///
    /// `id` 为 `Some` 时更新该记录（URL 与 GUID 保持不变），记录不存在时返回
    /// [`RepositoryError::NotFound`]；为 `None` 时插入新记录。
    ///
    /// 返回清单记录的 ID
    async fn upsert(
        &self,
        id: Option<i32>,
        doc: &ManifestDocument,
        guid: &str,
        status: ManifestStatus,
    ) -> Result<i32, RepositoryError>;

    /// 错误计数加一；超过 `max_errors` 时禁用清单
    ///
    /// 返回记录后的状态
    async fn record_crawl_error(
        &self,
        id: i32,
        message: &str,
        max_errors: i32,
    ) -> Result<ManifestStatus, RepositoryError>;
}
