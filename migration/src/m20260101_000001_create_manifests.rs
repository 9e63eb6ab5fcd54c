// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 创建清单表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    /// 应用数据库迁移
    ///
    /// # 参数
    ///
    /// * `manager` - 数据库模式管理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 迁移成功
    /// * `Err(DbErr)` - 迁移失败
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Manifests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Manifests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Manifests::Guid).string().not_null())
                    .col(
                        ColumnDef::new(Manifests::Url)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Manifests::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Manifests::Body).json().not_null())
                    .col(
                        ColumnDef::new(Manifests::CrawlErrors)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Manifests::CrawlMessage)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Manifests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Manifests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_manifests_guid")
                    .table(Manifests::Table)
                    .col(Manifests::Guid)
                    .to_owned(),
            )
            .await?;

        // The crawler pages through due rows by (status, updated_at).
        manager
            .create_index(
                Index::create()
                    .name("idx_manifests_status_updated")
                    .table(Manifests::Table)
                    .col(Manifests::Status)
                    .col(Manifests::UpdatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Manifests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Manifests {
    Table,
    Id,
    Guid,
    Url,
    Status,
    Body,
    CrawlErrors,
    CrawlMessage,
    CreatedAt,
    UpdatedAt,
}
