// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchemaSettings;
use crate::domain::services::manifest_validator::SchemaTables;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// 数据文件错误类型
#[derive(Error, Debug)]
pub enum DataFileError {
    /// 文件读取失败
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("error parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct SpdxFile {
    licenses: Vec<SpdxLicense>,
}

#[derive(Deserialize)]
struct SpdxLicense {
    #[serde(rename = "licenseId")]
    id: String,
    name: String,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DataFileError> {
    let raw = std::fs::read(path).map_err(|source| DataFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| DataFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// 读取 SPDX 许可证列表（`{"licenses": [{"licenseId", "name"}]}`）
pub fn load_licenses(path: &Path) -> Result<HashMap<String, String>, DataFileError> {
    let file: SpdxFile = read_json(path)?;
    Ok(file
        .licenses
        .into_iter()
        .map(|l| (l.id, l.name))
        .collect())
}

/// 读取 `{id: name}` 形式的查找表
pub fn load_map(path: &Path) -> Result<HashMap<String, String>, DataFileError> {
    read_json(path)
}

/// 按配置读取全部校验查找表
pub fn load_schema_tables(settings: &SchemaSettings) -> Result<SchemaTables, DataFileError> {
    let tables = SchemaTables {
        licenses: load_licenses(Path::new(&settings.spdx_file))?,
        languages: load_map(Path::new(&settings.languages_file))?,
        currencies: load_map(Path::new(&settings.currencies_file))?,
    };

    info!(
        licenses = tables.licenses.len(),
        languages = tables.languages.len(),
        currencies = tables.currencies.len(),
        "loaded schema data files"
    );
    Ok(tables)
}
