// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 清单校验（manifest_validator）：结构、取值和来源校验
/// - 更新回调（update_hook）：爬取结果通知接口
pub mod manifest_validator;
pub mod update_hook;
