// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 爬取 worker 和爬取管理器
pub mod crawl_worker;
pub mod manager;

pub use crawl_worker::{CrawlSummary, JobOutcome};
pub use manager::CrawlManager;
