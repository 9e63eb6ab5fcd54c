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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含数据库、爬取调度、HTTP 客户端、清单校验、指标和日志等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 爬取调度配置
    pub crawl: CrawlSettings,
    /// HTTP 客户端配置
    pub http: HttpSettings,
    /// 清单校验配置
    pub schema: SchemaSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub log: LogSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 爬取调度配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 并发 worker 数
    pub workers: usize,
    /// 每批从存储读取的任务数，同时是队列容量
    pub batch_size: u64,
    /// 清单多久（秒）未更新后需要重新爬取
    pub manifest_age_secs: u64,
    /// 连续爬取失败多少次后禁用清单
    pub max_crawl_errors: i32,
    /// 读取任务失败后的重试间隔（秒）
    pub store_retry_interval_secs: u64,
    /// 是否远程获取 well-known 文档核对清单 URL
    pub check_provenance: bool,
    /// 清单文件名后缀，生成 GUID 时去掉
    pub manifest_uri: String,
}

impl CrawlSettings {
    pub fn manifest_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.manifest_age_secs as i64)
    }

    pub fn store_retry_interval(&self) -> Duration {
        Duration::from_secs(self.store_retry_interval_secs)
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_size: 100,
            manifest_age_secs: 86_400,
            max_crawl_errors: 5,
            store_retry_interval_secs: 10,
            check_provenance: false,
            manifest_uri: "/funding.json".to_string(),
        }
    }
}

/// HTTP 客户端配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// User-Agent 请求头
    pub user_agent: String,
    /// 每个主机保持的最大空闲连接数
    pub max_host_conns: usize,
    /// 单次请求超时（秒）
    pub req_timeout_secs: u64,
    /// 失败后的重试次数
    pub retries: u32,
    /// 首次重试前的等待时间（毫秒）
    pub retry_wait_ms: u64,
    /// 响应体最大字节数
    pub max_bytes: usize,
    /// 收到 429 后是否在本轮跳过该主机
    pub skip_ratelimited_host: bool,
}

impl HttpSettings {
    pub fn req_timeout(&self) -> Duration {
        Duration::from_secs(self.req_timeout_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("fundcrawl/", env!("CARGO_PKG_VERSION")).to_string(),
            max_host_conns: 10,
            req_timeout_secs: 10,
            retries: 2,
            retry_wait_ms: 1_000,
            max_bytes: 1024 * 1024,
            skip_ratelimited_host: true,
        }
    }
}

/// 清单校验配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaSettings {
    /// 接受的清单版本
    pub version: String,
    /// well-known 证明文档的路径后缀
    pub wellknown_uri: String,
    /// URL 最大长度
    pub max_url_len: usize,
    /// SPDX 许可证数据文件
    pub spdx_file: String,
    /// 编程语言数据文件
    pub languages_file: String,
    /// 货币数据文件
    pub currencies_file: String,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出端点监听地址
    pub listen_addr: String,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// 是否输出 JSON 格式日志
    pub json: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `FUNDCRAWL__` 前缀的环境变量，后者优先。
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let crawl = CrawlSettings::default();
        let http = HttpSettings::default();

        let builder = Config::builder()
            // Default DB pool settings
            .set_default("database.url", "postgres://localhost/fundcrawl")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default crawl settings
            .set_default("crawl.workers", crawl.workers as u64)?
            .set_default("crawl.batch_size", crawl.batch_size)?
            .set_default("crawl.manifest_age_secs", crawl.manifest_age_secs)?
            .set_default("crawl.max_crawl_errors", crawl.max_crawl_errors as i64)?
            .set_default(
                "crawl.store_retry_interval_secs",
                crawl.store_retry_interval_secs,
            )?
            .set_default("crawl.check_provenance", crawl.check_provenance)?
            .set_default("crawl.manifest_uri", crawl.manifest_uri)?
            // Default HTTP client settings
            .set_default("http.user_agent", http.user_agent)?
            .set_default("http.max_host_conns", http.max_host_conns as u64)?
            .set_default("http.req_timeout_secs", http.req_timeout_secs)?
            .set_default("http.retries", http.retries as u64)?
            .set_default("http.retry_wait_ms", http.retry_wait_ms)?
            .set_default("http.max_bytes", http.max_bytes as u64)?
            .set_default("http.skip_ratelimited_host", http.skip_ratelimited_host)?
            // Default schema settings
            .set_default("schema.version", "v1.0.0")?
            .set_default("schema.wellknown_uri", "/.well-known/funding-manifest-urls")?
            .set_default("schema.max_url_len", 1024)?
            .set_default("schema.spdx_file", "data/spdx.json")?
            .set_default("schema.languages_file", "data/languages.json")?
            .set_default("schema.currencies_file", "data/currencies.json")?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .set_default("log.json", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("FUNDCRAWL").separator("__"));

        builder.build()?.try_deserialize()
    }
}
