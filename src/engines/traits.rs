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

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求失败（连接、超时、读取等）
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 非 2xx 响应
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    /// 响应体超过上限
    #[error("response body exceeds {max} bytes")]
    TooLarge { max: usize },
    /// 主机在本轮中已被限流，请求未发出
    #[error("host {host} is rate limited")]
    RateLimited { host: String },
}

impl FetchError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 超时、连接错误、5xx 和 429 返回 true
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::TooLarge { .. } | FetchError::RateLimited { .. } => false,
        }
    }
}

/// HEAD 探测结果
#[derive(Debug, Clone, PartialEq)]
pub struct FetchHead {
    /// HTTP状态码
    pub status: u16,
    /// `Last-Modified` 响应头，缺失或无法解析时为 `None`
    pub last_modified: Option<DateTime<Utc>>,
}

/// 解析 HTTP 日期（例如 `Wed, 21 Oct 2015 07:28:00 GMT`）
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// 抓取客户端特质
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// 获取响应体，只接受 2xx 响应
    async fn get(&self, url: &Url) -> Result<Bytes, FetchError>;

    /// 发送 HEAD 请求
    async fn head(&self, url: &Url) -> Result<FetchHead, FetchError>;

    /// 主机是否已被限流跳过
    fn is_rate_limited(&self, host: &str) -> bool;
}
