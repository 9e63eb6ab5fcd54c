// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use url::Url;

/// 实体类型
pub const ENTITY_TYPES: &[&str] = &["individual", "group", "organisation", "other"];
/// 实体角色
pub const ENTITY_ROLES: &[&str] = &["owner", "steward", "maintainer", "contributor", "other"];
/// 资助渠道类型
pub const CHANNEL_TYPES: &[&str] = &["bank", "gateway", "cheque", "cash", "other"];
/// 资助计划频率
pub const PLAN_FREQUENCIES: &[&str] = &["one-time", "weekly", "fortnightly", "monthly", "yearly", "other"];
/// 资助计划状态
pub const PLAN_STATUSES: &[&str] = &["active", "inactive"];

/// 带 well-known 证明的 URL 字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestUrl {
    pub url: String,
    /// 证明 URL，与清单同主机时可为空
    pub well_known: String,
}

/// 负责项目的实体：个人、组织等
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub role: String,
    pub name: String,
    pub email: String,
    pub telephone: String,
    pub description: String,
    pub webpage_url: ManifestUrl,
}

/// 开源项目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub webpage_url: ManifestUrl,
    pub repository_url: ManifestUrl,
    /// 许可证，`spdx:<id>` 形式时需在 SPDX 表中
    pub license: String,
    /// 编程语言或框架，`lang:<id>` 形式时需在语言表中
    pub frameworks: Vec<String>,
    pub tags: Vec<String>,
}

/// 资助渠道，例如银行、现金或支付网关
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub address: String,
    pub description: String,
}

/// 资助计划
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plan {
    pub id: String,
    pub status: String,
    pub name: String,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub frequency: String,
    /// 引用的渠道 ID，必须在同一清单中声明
    pub channels: Vec<String>,
}

/// 年度收支概况
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryItem {
    pub year: i32,
    pub income: f64,
    pub expenses: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Funding {
    pub channels: Vec<Channel>,
    pub plans: Vec<Plan>,
    pub history: Vec<HistoryItem>,
}

/// 资助清单
///
/// 项目在固定 URL 发布的资助声明文档，包含实体、项目、资助渠道、
/// 资助计划和历史收支。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub version: String,
    pub entity: Entity,
    pub projects: Vec<Project>,
    pub funding: Funding,
}

/// 一次抓取得到并通过校验的清单
///
/// 每次抓取新建，校验通过后不再修改；校验失败则整个文档被丢弃。
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    /// 清单来源 URL
    pub url: Url,
    /// 原始 JSON 内容
    pub body: String,
    /// 解析后的清单
    pub manifest: Manifest,
}
