// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::{CrawlJob, ManifestStatus};
use crate::domain::models::manifest::ManifestDocument;

/// 清单更新回调
///
/// 每个任务得到最终结果（已写入、校验失败、抓取失败）时由 worker 同步调用一次，
/// 跳过的任务和写入失败的任务不会触发。失败时 `doc` 为 `None`，
/// `status` 为存储返回的新状态。
///
/// 实现方应尽快返回，耗时工作请自行派发到后台任务。
pub trait ManifestUpdateHook: Send + Sync {
    fn on_manifest_update(
        &self,
        job: &CrawlJob,
        doc: Option<&ManifestDocument>,
        status: ManifestStatus,
    );
}
