// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// GUID 路径部分保留的最大段数
pub const GUID_MAX_SEGMENTS: usize = 4;

/// GUID 路径部分的最大字符数（超出后截断并追加 `/**`）
pub const GUID_MAX_PATH_LEN: usize = 50;

/// 截断标记
const TRUNCATION_MARKER: &str = "/**";

// host/owner/repo/{blob,raw,src}/... on the known code forges. GitLab puts a `-/` before the view.
static RE_FORGE_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:www\.)?(github\.com|gitlab\.com|codeberg\.org|bitbucket\.org)/([^/]+)/([^/]+)/(?:-/)?(?:blob|raw|src)/",
    )
    .expect("forge file pattern is a valid regex")
});

/// 从 URL 生成简短、可展示的 GUID
///
/// 规则：
/// 1. 代码托管平台上的文件视图（blob/raw）折叠为仓库根：`@github.com/user/repo`
/// 2. 否则保留路径的前 4 个非空段
/// 3. 路径超过 50 个字符时截断并追加 `/**`
/// 4. 结果为 `@host/path`，路径为空时仅为 `@host`
///
/// 纯函数，同一 URL 总是得到相同结果。
pub fn make_guid(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let full = format!("{}{}", host, url.path());

    if let Some(caps) = RE_FORGE_FILE.captures(&full) {
        return format!("@{}/{}/{}", &caps[1], &caps[2], &caps[3]);
    }

    let path = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .take(GUID_MAX_SEGMENTS)
        .collect::<Vec<_>>()
        .join("/");

    let path = if path.chars().count() > GUID_MAX_PATH_LEN {
        let mut cut: String = path.chars().take(GUID_MAX_PATH_LEN).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    } else {
        path
    };

    if path.is_empty() {
        format!("@{}", host)
    } else {
        format!("@{}/{}", host, path)
    }
}

/// 生成清单记录的 GUID
///
/// 在 [`make_guid`] 的基础上去掉清单文件名后缀（例如 `/funding.json`），
/// 使 `https://example.com/funding.json` 得到 `@example.com`。
pub fn manifest_guid(url: &Url, manifest_uri: &str) -> String {
    let guid = make_guid(url);
    if manifest_uri.is_empty() {
        return guid;
    }

    match guid.strip_suffix(manifest_uri) {
        // Never strip the host itself away.
        Some(stripped) if stripped.len() > 1 => stripped.to_string(),
        _ => guid,
    }
}

/// 限流记录所用的主机键（含非默认端口）
pub fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// 解析绝对的 http/https URL
///
/// 要求存在主机名，并去掉查询参数和片段。
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}
