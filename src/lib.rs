// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 带重试和限流跳过的 HTTP 抓取客户端
pub mod engines;

/// 基础设施模块
///
/// 提供外部服务集成，如数据库、数据文件和指标
pub mod infrastructure;

/// 队列模块
///
/// 到期清单的分页读取和投放
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 爬取 worker 和爬取管理器
pub mod workers;
