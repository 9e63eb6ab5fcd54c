// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// 清单状态枚举
///
/// 状态只由存储层在写入或记录错误时修改：
/// Pending → Active，连续失败超过阈值后 → Disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    /// 待审核，已提交但尚未被确认
    #[default]
    Pending,
    /// 活跃中
    Active,
    /// 即将过期
    Expiring,
    /// 已禁用，爬取失败次数超过阈值
    Disabled,
    /// 已屏蔽
    Blocked,
}

impl ManifestStatus {
    /// 需要周期性重新爬取的状态
    pub const CRAWLABLE: [ManifestStatus; 3] = [
        ManifestStatus::Pending,
        ManifestStatus::Active,
        ManifestStatus::Expiring,
    ];

    pub fn is_crawlable(&self) -> bool {
        Self::CRAWLABLE.contains(self)
    }
}

impl fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ManifestStatus::Pending => write!(f, "pending"),
            ManifestStatus::Active => write!(f, "active"),
            ManifestStatus::Expiring => write!(f, "expiring"),
            ManifestStatus::Disabled => write!(f, "disabled"),
            ManifestStatus::Blocked => write!(f, "blocked"),
        }
    }
}

impl FromStr for ManifestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ManifestStatus::Pending),
            "active" => Ok(ManifestStatus::Active),
            "expiring" => Ok(ManifestStatus::Expiring),
            "disabled" => Ok(ManifestStatus::Disabled),
            "blocked" => Ok(ManifestStatus::Blocked),
            _ => Err(()),
        }
    }
}

/// 爬取任务
///
/// 存储中一条已登记清单 URL 的快照，由调度器分发给 worker。
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    /// 存储分配的 ID，调度器按此分页
    pub id: i32,
    /// 清单 URL，登记时已校验
    pub url: Url,
    /// 当前状态
    pub status: ManifestStatus,
    /// 最近一次成功校验的时间
    pub last_modified: DateTime<Utc>,
}
