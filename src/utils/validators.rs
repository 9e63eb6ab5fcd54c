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

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;
use url::Url;
use validator::ValidateEmail;

static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}[\p{L}\d-]*\p{L}$").expect("tag pattern is a valid regex"));
static RE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("id pattern is a valid regex"));

/// URL 的最小长度
const MIN_URL_LEN: usize = 10;

/// 验证错误类型
///
/// 每个错误都带有出错字段的路径（例如 `projects[2].webpageUrl.url`），
/// 提交界面据此定位具体字段。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// JSON 解析失败
    #[error("error parsing JSON body: {0}")]
    Parse(String),

    /// 清单版本不匹配
    #[error("`version` should be {expected}, got `{found}`")]
    Version { expected: String, found: String },

    /// 字符串长度越界
    #[error("`{tag}` should be of length {min} - {max}")]
    Length { tag: String, min: usize, max: usize },

    /// 数值越界
    #[error("`{tag}` should be between {min} and {max}")]
    Range {
        tag: String,
        min: String,
        max: String,
    },

    /// 列表元素数量越界
    #[error("`{tag}` should have {min} - {max} items")]
    ItemCount { tag: String, min: usize, max: usize },

    /// 值不在允许的枚举中
    #[error("`{tag}` should be one of: {options}")]
    NotInList { tag: String, options: String },

    /// 值不在查找表中
    #[error("`{tag}` was not found in the {table}")]
    NotInTable { tag: String, table: &'static str },

    /// 邮箱无效
    #[error("`{tag}` is not a valid e-mail")]
    InvalidEmail { tag: String },

    /// URL 无效
    #[error("`{tag}` is not a valid URL")]
    InvalidUrl { tag: String },

    /// 标签格式无效
    #[error("`{tag}` should be alpha-numeric-dashes, start and end with a letter, and be of length {min} - {max}")]
    InvalidTag { tag: String, min: usize, max: usize },

    /// ID 格式无效
    #[error("`{tag}` should be lowercase alpha-numeric-dashes and length {min} - {max}")]
    InvalidId { tag: String, min: usize, max: usize },

    /// 计划引用了未声明的渠道
    #[error("`{tag}` refers to an unknown channel id `{channel}`")]
    UnknownChannel { tag: String, channel: String },

    /// 与清单不同主机的 URL 缺少 well-known 证明
    #[error("`{tag}.url` and manifest hostnames do not match. `{tag}.wellKnown` should be {expected}")]
    WellKnownRequired { tag: String, expected: String },

    /// well-known URL 后缀不正确
    #[error("`{tag}.wellKnown` should end in {suffix}")]
    WellKnownSuffix { tag: String, suffix: String },

    /// well-known URL 与目标 URL 主机不一致
    #[error("`{tag}.url` and `{tag}.wellKnown` hostnames do not match")]
    WellKnownHost { tag: String },

    /// 目标为站点根时，well-known URL 也必须在根下
    #[error("`{tag}.url` and `{tag}.wellKnown` paths do not match. Should be {expected}")]
    WellKnownRoot { tag: String, expected: String },

    /// well-known URL 的路径不在目标路径之下
    #[error("`{tag}.url` and `{tag}.wellKnown` paths do not match")]
    WellKnownPath { tag: String },

    /// 远程 well-known 文档中没有列出清单 URL
    #[error("`{tag}.wellKnown` does not vouch for the manifest: {reason}")]
    Provenance { tag: String, reason: String },
}

impl ValidationError {
    /// 出错字段的路径（解析、版本错误返回固定字段名）
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Parse(_) => "body",
            ValidationError::Version { .. } => "version",
            ValidationError::Length { tag, .. }
            | ValidationError::Range { tag, .. }
            | ValidationError::ItemCount { tag, .. }
            | ValidationError::NotInList { tag, .. }
            | ValidationError::NotInTable { tag, .. }
            | ValidationError::InvalidEmail { tag }
            | ValidationError::InvalidUrl { tag }
            | ValidationError::InvalidTag { tag, .. }
            | ValidationError::InvalidId { tag, .. }
            | ValidationError::UnknownChannel { tag, .. }
            | ValidationError::WellKnownRequired { tag, .. }
            | ValidationError::WellKnownSuffix { tag, .. }
            | ValidationError::WellKnownHost { tag }
            | ValidationError::WellKnownRoot { tag, .. }
            | ValidationError::WellKnownPath { tag }
            | ValidationError::Provenance { tag, .. } => tag,
        }
    }

    /// 是否为来源（provenance）相关的错误
    pub fn is_provenance(&self) -> bool {
        matches!(
            self,
            ValidationError::WellKnownRequired { .. }
                | ValidationError::WellKnownSuffix { .. }
                | ValidationError::WellKnownHost { .. }
                | ValidationError::WellKnownRoot { .. }
                | ValidationError::WellKnownPath { .. }
                | ValidationError::Provenance { .. }
        )
    }
}

/// 检查字符串长度（按字符计）是否在 [min, max] 之间
pub fn check_len(tag: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::Length {
            tag: tag.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// 检查数值是否在 [min, max] 之间
pub fn in_range<T>(tag: &str, num: T, min: T, max: T) -> Result<(), ValidationError>
where
    T: PartialOrd + Display + Copy,
{
    // NaN fails both comparisons, so reject it explicitly.
    if !(num >= min && num <= max) {
        return Err(ValidationError::Range {
            tag: tag.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

/// 检查列表元素数量是否在 [min, max] 之间
pub fn check_items<T>(tag: &str, items: &[T], min: usize, max: usize) -> Result<(), ValidationError> {
    if items.len() < min || items.len() > max {
        return Err(ValidationError::ItemCount {
            tag: tag.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// 检查值是否为枚举之一
pub fn in_list(tag: &str, item: &str, items: &[&str]) -> Result<(), ValidationError> {
    if !items.contains(&item) {
        return Err(ValidationError::NotInList {
            tag: tag.to_string(),
            options: items.join(", "),
        });
    }
    Ok(())
}

/// 检查键是否存在于查找表中
pub fn in_table(
    tag: &str,
    table_name: &'static str,
    key: &str,
    table: &HashMap<String, String>,
) -> Result<(), ValidationError> {
    if !table.contains_key(key) {
        return Err(ValidationError::NotInTable {
            tag: tag.to_string(),
            table: table_name,
        });
    }
    Ok(())
}

/// 检查邮箱格式
pub fn is_email(tag: &str, value: &str, max_len: usize) -> Result<(), ValidationError> {
    check_len(tag, value, 3, max_len)?;
    if !value.validate_email() {
        return Err(ValidationError::InvalidEmail {
            tag: tag.to_string(),
        });
    }
    Ok(())
}

/// 检查并解析绝对的 http/https URL
pub fn is_url(tag: &str, value: &str, max_len: usize) -> Result<Url, ValidationError> {
    check_len(tag, value, MIN_URL_LEN, max_len)?;

    let invalid = || ValidationError::InvalidUrl {
        tag: tag.to_string(),
    };
    let url = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    Ok(url)
}

/// 检查自由标签（Unicode 字母/数字/连字符，首尾为字母，不含 `--`）
pub fn is_tag(tag: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    check_len(tag, value, min, max)?;
    if !RE_TAG.is_match(value) || value.contains("--") {
        return Err(ValidationError::InvalidTag {
            tag: tag.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// 检查 ID（小写字母数字和连字符，首尾为字母数字，不含 `--`）
pub fn is_id(tag: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    check_len(tag, value, min, max)?;
    if !RE_ID.is_match(value) || value.contains("--") {
        return Err(ValidationError::InvalidId {
            tag: tag.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

fn same_authority(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// 校验目标 URL 与其 well-known 证明 URL
///
/// 防止清单声明不属于自己的 URL（例如别人的仓库）：目标 URL 要么与清单同主机，
/// 要么提供位于目标主机 `.well-known` 路径下、且路径包含目标路径的证明 URL。
///
/// # 参数
///
/// * `tag` - 字段路径，例如 `projects[0].repositoryUrl`
/// * `manifest` - 清单自身的 URL；为 `None` 时只做格式校验
/// * `target_url` - 被声明的 URL
/// * `well_known_url` - 证明 URL，可为空
/// * `suffix` - well-known 路径后缀
/// * `max_len` - URL 最大长度
///
/// # 返回值
///
/// 解析后的目标 URL 和证明 URL（若提供），供调用方复用
pub fn well_known_url(
    tag: &str,
    manifest: Option<&Url>,
    target_url: &str,
    well_known_url: &str,
    suffix: &str,
    max_len: usize,
) -> Result<(Url, Option<Url>), ValidationError> {
    let target = is_url(&format!("{}.url", tag), target_url, max_len)?;
    let target_path = target.path().trim_end_matches('/');

    if well_known_url.is_empty() {
        return match manifest {
            Some(m) if !same_authority(m, &target) => Err(ValidationError::WellKnownRequired {
                tag: tag.to_string(),
                expected: format!(
                    "{}{}{}",
                    target.origin().ascii_serialization(),
                    target_path,
                    suffix
                ),
            }),
            _ => Ok((target, None)),
        };
    }

    let wk = is_url(&format!("{}.wellKnown", tag), well_known_url, max_len)?;

    if !wk.path().ends_with(suffix) {
        return Err(ValidationError::WellKnownSuffix {
            tag: tag.to_string(),
            suffix: suffix.to_string(),
        });
    }

    if !same_authority(&wk, &target) {
        return Err(ValidationError::WellKnownHost {
            tag: tag.to_string(),
        });
    }

    let wk_path = wk.path().trim_end_matches('/');

    if target_path.is_empty() {
        // Target is the host root, so the attestation must sit directly under it.
        if wk_path.strip_suffix(suffix) != Some("") {
            return Err(ValidationError::WellKnownRoot {
                tag: tag.to_string(),
                expected: format!("{}{}", target.origin().ascii_serialization(), suffix),
            });
        }
    } else {
        // github.com/user ~= github.com/user/project/blob/main/.well-known/...
        // github.com/use !~= github.com/user/project/blob/main/.well-known/...
        let contained = wk_path.starts_with(target_path)
            && wk_path.as_bytes().get(target_path.len()) == Some(&b'/');
        if !contained {
            return Err(ValidationError::WellKnownPath {
                tag: tag.to_string(),
            });
        }
    }

    Ok((target, Some(wk)))
}
