// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 从存储读取到期清单并投放到 worker 共享的有界队列
pub mod job_feeder;
