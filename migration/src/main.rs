// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 主函数
///
/// 手动执行或回滚 manifests 表迁移的命令行入口
#[async_std::main]
async fn main() {
    cli::run_cli(migration::Migrator).await;
}
