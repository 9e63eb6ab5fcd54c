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

use crate::config::settings::SchemaSettings;
use crate::domain::models::manifest::{
    Channel, Entity, HistoryItem, Manifest, ManifestDocument, ManifestUrl, Plan, Project,
    CHANNEL_TYPES, ENTITY_ROLES, ENTITY_TYPES, PLAN_FREQUENCIES, PLAN_STATUSES,
};
use crate::utils::validators::{
    check_items, check_len, in_list, in_range, in_table, is_email, is_id, is_tag, well_known_url,
    ValidationError,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;

/// 金额和收支的上限
const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// 远程证明文档中只查看前若干行
pub const ATTESTATION_MAX_LINES: usize = 100;

const SPDX_PREFIX: &str = "spdx:";
const LANG_PREFIX: &str = "lang:";

/// 校验选项
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// 接受的清单版本，必须完全相等
    pub version: String,
    /// well-known 证明路径后缀
    pub well_known_uri: String,
    /// URL 最大长度
    pub max_url_len: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            version: "v1.0.0".to_string(),
            well_known_uri: "/.well-known/funding-manifest-urls".to_string(),
            max_url_len: 1024,
        }
    }
}

impl From<&SchemaSettings> for ValidatorOptions {
    fn from(s: &SchemaSettings) -> Self {
        Self {
            version: s.version.clone(),
            well_known_uri: s.wellknown_uri.clone(),
            max_url_len: s.max_url_len,
        }
    }
}

/// 校验用的查找表
#[derive(Debug, Clone, Default)]
pub struct SchemaTables {
    /// SPDX ID -> 许可证名称
    pub licenses: HashMap<String, String>,
    /// 语言 ID -> 名称
    pub languages: HashMap<String, String>,
    /// 货币代码 -> 名称
    pub currencies: HashMap<String, String>,
}

/// 清单结构校验器
///
/// 对清单做一次线性、遇错即停的校验，所有 URL 字段都经过
/// [`well_known_url`] 的来源校验。
#[derive(Debug, Clone)]
pub struct ManifestValidator {
    opts: ValidatorOptions,
    tables: Arc<SchemaTables>,
}

impl ManifestValidator {
    /// 创建新的校验器
    ///
    /// # 参数
    ///
    /// * `opts` - 校验选项
    /// * `tables` - 许可证、语言和货币查找表
    pub fn new(opts: ValidatorOptions, tables: Arc<SchemaTables>) -> Self {
        Self { opts, tables }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.opts
    }

    /// 解析并校验清单 JSON
    ///
    /// # 参数
    ///
    /// * `body` - 原始响应体
    /// * `url` - 清单 URL
    /// * `origin` - 来源校验所用的清单 URL，为 `None` 时只校验格式
    ///
    /// # 返回值
    ///
    /// * `Ok(ManifestDocument)` - 通过校验的文档
    /// * `Err(ValidationError)` - 第一个不合法的字段
    pub fn parse_manifest(
        &self,
        body: &[u8],
        url: &Url,
        origin: Option<&Url>,
    ) -> Result<ManifestDocument, ValidationError> {
        let text =
            std::str::from_utf8(body).map_err(|e| ValidationError::Parse(e.to_string()))?;
        let manifest: Manifest =
            serde_json::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;

        let manifest = self.validate(manifest, origin)?;

        Ok(ManifestDocument {
            url: url.clone(),
            body: text.to_string(),
            manifest,
        })
    }

    /// 校验已解析的清单
    pub fn validate(
        &self,
        manifest: Manifest,
        origin: Option<&Url>,
    ) -> Result<Manifest, ValidationError> {
        if manifest.version != self.opts.version {
            return Err(ValidationError::Version {
                expected: self.opts.version.clone(),
                found: manifest.version,
            });
        }

        self.validate_entity(&manifest.entity, origin)?;

        for (n, p) in manifest.projects.iter().enumerate() {
            self.validate_project(p, n, origin)?;
        }

        let mut channel_ids = HashSet::with_capacity(manifest.funding.channels.len());
        for (n, c) in manifest.funding.channels.iter().enumerate() {
            self.validate_channel(c, n)?;
            channel_ids.insert(c.id.as_str());
        }

        check_items("plans", &manifest.funding.plans, 1, 30)?;
        for (n, p) in manifest.funding.plans.iter().enumerate() {
            self.validate_plan(p, n, &channel_ids)?;
        }

        check_items("history", &manifest.funding.history, 0, 50)?;
        for (n, h) in manifest.funding.history.iter().enumerate() {
            self.validate_history(h, n)?;
        }

        Ok(manifest)
    }

    /// 列出清单中所有带证明 URL 的字段
    ///
    /// 返回 `(字段路径, 证明 URL)`，证明 URL 无法解析的字段被忽略
    /// （它们在结构校验阶段已被拒绝）。
    pub fn attestations(&self, manifest: &Manifest) -> Vec<(String, Url)> {
        let mut fields = vec![("entity.webpageUrl".to_string(), &manifest.entity.webpage_url)];
        for (n, p) in manifest.projects.iter().enumerate() {
            fields.push((format!("projects[{}].webpageUrl", n), &p.webpage_url));
            fields.push((format!("projects[{}].repositoryUrl", n), &p.repository_url));
        }

        fields
            .into_iter()
            .filter(|(_, u)| !u.well_known.is_empty())
            .filter_map(|(tag, u)| Url::parse(&u.well_known).ok().map(|wk| (tag, wk)))
            .collect()
    }

    fn check_url(
        &self,
        tag: &str,
        origin: Option<&Url>,
        field: &ManifestUrl,
    ) -> Result<(), ValidationError> {
        well_known_url(
            tag,
            origin,
            &field.url,
            &field.well_known,
            &self.opts.well_known_uri,
            self.opts.max_url_len,
        )
        .map(|_| ())
    }

    fn validate_entity(&self, o: &Entity, origin: Option<&Url>) -> Result<(), ValidationError> {
        in_list("entity.type", &o.entity_type, ENTITY_TYPES)?;
        in_list("entity.role", &o.role, ENTITY_ROLES)?;
        check_len("entity.name", &o.name, 2, 128)?;
        is_email("entity.email", &o.email, 128)?;
        check_len("entity.telephone", &o.telephone, 0, 24)?;
        check_len("entity.description", &o.description, 0, 2048)?;
        self.check_url("entity.webpageUrl", origin, &o.webpage_url)
    }

    fn validate_project(
        &self,
        o: &Project,
        n: usize,
        origin: Option<&Url>,
    ) -> Result<(), ValidationError> {
        check_len(&format!("projects[{}].name", n), &o.name, 1, 256)?;
        check_len(&format!("projects[{}].description", n), &o.description, 1, 1024)?;
        self.check_url(&format!("projects[{}].webpageUrl", n), origin, &o.webpage_url)?;
        self.check_url(
            &format!("projects[{}].repositoryUrl", n),
            origin,
            &o.repository_url,
        )?;

        let license_tag = format!("projects[{}].license", n);
        check_len(&license_tag, &o.license, 2, 64)?;
        if let Some(id) = o.license.strip_prefix(SPDX_PREFIX) {
            in_table(&license_tag, "SPDX license list", id, &self.tables.licenses)?;
        }

        let frameworks_tag = format!("projects[{}].frameworks", n);
        check_items(&frameworks_tag, &o.frameworks, 0, 5)?;
        for (i, f) in o.frameworks.iter().enumerate() {
            let tag = format!("{}[{}]", frameworks_tag, i);
            check_len(&tag, f, 2, 64)?;
            if let Some(id) = f.strip_prefix(LANG_PREFIX) {
                in_table(&tag, "programming language list", id, &self.tables.languages)?;
            }
        }

        let tags_tag = format!("projects[{}].tags", n);
        check_items(&tags_tag, &o.tags, 1, 10)?;
        for (i, t) in o.tags.iter().enumerate() {
            is_tag(&format!("{}[{}]", tags_tag, i), t, 2, 32)?;
        }

        Ok(())
    }

    fn validate_channel(&self, o: &Channel, n: usize) -> Result<(), ValidationError> {
        is_id(&format!("channels[{}].id", n), &o.id, 3, 32)?;
        in_list(&format!("channels[{}].type", n), &o.channel_type, CHANNEL_TYPES)?;
        check_len(&format!("channels[{}].address", n), &o.address, 0, 128)?;
        check_len(&format!("channels[{}].description", n), &o.description, 0, 1024)
    }

    fn validate_plan(
        &self,
        o: &Plan,
        n: usize,
        channel_ids: &HashSet<&str>,
    ) -> Result<(), ValidationError> {
        is_id(&format!("plans[{}].id", n), &o.id, 3, 32)?;
        in_list(&format!("plans[{}].status", n), &o.status, PLAN_STATUSES)?;
        check_len(&format!("plans[{}].name", n), &o.name, 3, 128)?;
        check_len(&format!("plans[{}].description", n), &o.description, 0, 1024)?;
        in_range(&format!("plans[{}].amount", n), o.amount, 0.0, MAX_AMOUNT)?;
        in_table(
            &format!("plans[{}].currency", n),
            "currency list",
            &o.currency,
            &self.tables.currencies,
        )?;
        in_list(&format!("plans[{}].frequency", n), &o.frequency, PLAN_FREQUENCIES)?;

        if let Some(unknown) = o.channels.iter().find(|c| !channel_ids.contains(c.as_str())) {
            return Err(ValidationError::UnknownChannel {
                tag: format!("plans[{}].channels", n),
                channel: unknown.clone(),
            });
        }

        Ok(())
    }

    fn validate_history(&self, o: &HistoryItem, n: usize) -> Result<(), ValidationError> {
        in_range(&format!("history[{}].year", n), o.year, 1970, 2075)?;
        in_range(&format!("history[{}].income", n), o.income, 0.0, MAX_AMOUNT)?;
        in_range(&format!("history[{}].expenses", n), o.expenses, 0.0, MAX_AMOUNT)?;
        check_len(&format!("history[{}].description", n), &o.description, 0, 1024)
    }
}

/// 检查远程证明文档是否列出了清单 URL
///
/// 证明文档每行一个 URL，只查看前 [`ATTESTATION_MAX_LINES`] 行。
pub fn verify_attestation(
    tag: &str,
    body: &[u8],
    manifest_url: &Url,
) -> Result<(), ValidationError> {
    let text = String::from_utf8_lossy(body);
    let wanted = manifest_url.as_str();

    let listed = text
        .lines()
        .take(ATTESTATION_MAX_LINES)
        .map(str::trim)
        .any(|line| line == wanted);

    if !listed {
        return Err(ValidationError::Provenance {
            tag: tag.to_string(),
            reason: format!("manifest URL {} is not listed", wanted),
        });
    }
    Ok(())
}
