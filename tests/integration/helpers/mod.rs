// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod memory_repo;

use fundcrawl::config::settings::{CrawlSettings, HttpSettings};
use fundcrawl::domain::services::manifest_validator::{
    ManifestValidator, SchemaTables, ValidatorOptions,
};
use fundcrawl::engines::reqwest_engine::ReqwestFetchClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// 测试用爬取配置：两个 worker，不等待存储重试
pub fn crawl_settings() -> CrawlSettings {
    CrawlSettings {
        workers: 2,
        batch_size: 10,
        store_retry_interval_secs: 0,
        ..CrawlSettings::default()
    }
}

/// 测试用 HTTP 配置：不重试，短超时
pub fn http_settings() -> HttpSettings {
    HttpSettings {
        req_timeout_secs: 5,
        retries: 0,
        retry_wait_ms: 1,
        ..HttpSettings::default()
    }
}

pub fn fetcher() -> Arc<ReqwestFetchClient> {
    Arc::new(ReqwestFetchClient::new(&http_settings()).unwrap())
}

pub fn validator() -> Arc<ManifestValidator> {
    let map = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };

    let tables = SchemaTables {
        licenses: map(&[("MIT", "MIT License")]),
        languages: map(&[("rust", "Rust")]),
        currencies: map(&[("USD", "US Dollar")]),
    };

    Arc::new(ManifestValidator::new(
        ValidatorOptions::default(),
        Arc::new(tables),
    ))
}

/// 托管在 `base` 上的合法清单
///
/// 所有链接与清单同源，因此不需要 wellKnown 证明。
pub fn manifest_json(base: &str) -> Value {
    json!({
        "version": "v1.0.0",
        "entity": {
            "type": "organisation",
            "role": "owner",
            "name": "Acme Labs",
            "email": "funding@acme.dev",
            "telephone": "",
            "webpageUrl": { "url": format!("{}/", base) }
        },
        "projects": [{
            "name": "Widget",
            "description": "A small widget library.",
            "webpageUrl": { "url": format!("{}/widget", base) },
            "repositoryUrl": { "url": format!("{}/widget/source", base) },
            "license": "spdx:MIT",
            "frameworks": ["lang:rust"],
            "tags": ["widgets"]
        }],
        "funding": {
            "channels": [
                { "id": "bank", "type": "bank", "address": "", "description": "" }
            ],
            "plans": [{
                "id": "maintenance",
                "status": "active",
                "name": "Maintenance",
                "description": "",
                "amount": 500,
                "currency": "USD",
                "frequency": "monthly",
                "channels": ["bank"]
            }],
            "history": []
        }
    })
}
