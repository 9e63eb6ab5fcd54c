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

use crate::config::settings::HttpSettings;
use crate::engines::traits::{parse_http_date, FetchClient, FetchError, FetchHead};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils::host_key;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use metrics::counter;
use reqwest::header::LAST_MODIFIED;
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

/// 抓取客户端
///
/// 基于 reqwest 实现，所有 worker 共享一个连接池。
/// 超时、连接错误和 5xx 按 [`RetryPolicy`] 重试；启用 `skip_ratelimited_host`
/// 时，收到 429 的主机在本轮剩余时间内不再请求。
pub struct ReqwestFetchClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    max_bytes: usize,
    skip_ratelimited_host: bool,
    rate_limited: DashMap<String, ()>,
}

impl ReqwestFetchClient {
    /// 根据 HTTP 配置创建客户端
    ///
    /// # 参数
    ///
    /// * `http` - HTTP 客户端配置
    ///
    /// # 返回值
    ///
    /// * `Ok(ReqwestFetchClient)` - 客户端
    /// * `Err(FetchError)` - 底层客户端构建失败
    pub fn new(http: &HttpSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(http.req_timeout())
            .pool_max_idle_per_host(http.max_host_conns)
            .build()?;

        Ok(Self {
            client,
            policy: RetryPolicy::from_settings(http),
            max_bytes: http.max_bytes,
            skip_ratelimited_host: http.skip_ratelimited_host,
            rate_limited: DashMap::new(),
        })
    }

    /// 替换重试策略
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn send(&self, method: Method, url: &Url) -> Result<Response, FetchError> {
        let host = host_key(url);
        let mut attempt = 0;

        loop {
            if self.is_rate_limited(&host) {
                return Err(FetchError::RateLimited { host });
            }

            let err = match self.client.request(method.clone(), url.clone()).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::TOO_MANY_REQUESTS && self.skip_ratelimited_host {
                        self.rate_limited.insert(host.clone(), ());
                        counter!("fetch_rate_limited_hosts_total").increment(1);
                        warn!(host = %host, "host returned 429, skipping it for the rest of the run");
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    }
                }
                Err(e) => FetchError::Request(e),
            };

            if !err.is_retryable() || !self.policy.should_retry(attempt) {
                return Err(err);
            }

            attempt += 1;
            let backoff = self.policy.calculate_backoff(attempt);
            counter!("fetch_retries_total").increment(1);
            debug!(
                url = %url,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "retrying request"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    async fn read_body(&self, mut resp: Response) -> Result<Bytes, FetchError> {
        let max = self.max_bytes;
        if resp.content_length().is_some_and(|len| len > max as u64) {
            return Err(FetchError::TooLarge { max });
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = resp.chunk().await? {
            if buf.len() + chunk.len() > max {
                return Err(FetchError::TooLarge { max });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf.freeze())
    }
}

#[async_trait]
impl FetchClient for ReqwestFetchClient {
    async fn get(&self, url: &Url) -> Result<Bytes, FetchError> {
        let resp = self.send(Method::GET, url).await?;
        self.read_body(resp).await
    }

    async fn head(&self, url: &Url) -> Result<FetchHead, FetchError> {
        let resp = self.send(Method::HEAD, url).await?;
        let last_modified = resp
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        Ok(FetchHead {
            status: resp.status().as_u16(),
            last_modified,
        })
    }

    fn is_rate_limited(&self, host: &str) -> bool {
        self.rate_limited.contains_key(host)
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
