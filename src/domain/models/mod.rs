// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 爬取任务（crawl_job）：一条待重新爬取的已登记清单
/// - 资助清单（manifest）：清单文档的结构和取值枚举
pub mod crawl_job;
pub mod manifest;
