// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供 URL 标识符、字段校验、重试策略和日志初始化
pub mod retry_policy;
pub mod telemetry;
pub mod url_utils;
pub mod validators;
