//! Worker 标识：封闭枚举，运行时字符串在 Delegator 边界解析，未知标识直接拒绝

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerId {
    /// 对象存储连接器：下载 / 上传 / 删除 / 列举文件、创建 bucket
    Connector,
    /// 表格数据转换：预览、按指令转换、保存
    Transformer,
    /// 数据仓库：数据集、表、插入、查询、从存储加载
    Warehouse,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown worker identifier: '{0}'")]
pub struct UnknownWorker(pub String);

impl WorkerId {
    pub const ALL: [WorkerId; 3] = [WorkerId::Connector, WorkerId::Transformer, WorkerId::Warehouse];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerId::Connector => "connector",
            WorkerId::Transformer => "transformer",
            WorkerId::Warehouse => "warehouse",
        }
    }

    /// 能力描述（拼入 Planner prompt）
    pub fn description(&self) -> &'static str {
        match self {
            WorkerId::Connector => {
                "Object storage operations: download ONE file at a time into local storage, \
                 upload ONE file at a time, delete files, create buckets, list files in a bucket."
            }
            WorkerId::Transformer => {
                "Tabular data work on local files (CSV, Excel, JSON, Parquet): preview, \
                 transform (filter, aggregate, join, merge) and save results to a file."
            }
            WorkerId::Warehouse => {
                "Warehouse operations: create datasets and tables, insert rows, run queries, \
                 load files from object storage into tables."
            }
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerId {
    type Err = UnknownWorker;

    /// 规范化 Planner 给出的标识：忽略大小写、`call_` 前缀、`_agent` 后缀与常见别名
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(|c: char| c == '-' || c.is_whitespace(), "_");
        let name = normalized.strip_prefix("call_").unwrap_or(&normalized);
        let name = name.strip_suffix("_agent").unwrap_or(name);
        match name {
            "connector" | "storage_connector" | "storage" | "gcs" | "gcs_connector" => {
                Ok(WorkerId::Connector)
            }
            "transformer" | "smart_transformer" | "data_transformer" => Ok(WorkerId::Transformer),
            "warehouse" | "bigquery" | "bigquery_assistant" | "bq" => Ok(WorkerId::Warehouse),
            _ => Err(UnknownWorker(s.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for id in WorkerId::ALL {
            assert_eq!(id.as_str().parse::<WorkerId>().unwrap(), id);
        }
    }

    #[test]
    fn test_parse_planner_aliases() {
        assert_eq!("call_connector_agent".parse::<WorkerId>().unwrap(), WorkerId::Connector);
        assert_eq!("smart_transformer_agent".parse::<WorkerId>().unwrap(), WorkerId::Transformer);
        assert_eq!("BigQuery Agent".parse::<WorkerId>().unwrap(), WorkerId::Warehouse);
        assert_eq!(" GCS ".parse::<WorkerId>().unwrap(), WorkerId::Connector);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "conflict_resolver".parse::<WorkerId>().unwrap_err();
        assert_eq!(err, UnknownWorker("conflict_resolver".to_string()));
        assert!("".parse::<WorkerId>().is_err());
        assert!("END".parse::<WorkerId>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&WorkerId::Warehouse).unwrap();
        assert_eq!(json, "\"warehouse\"");
    }
}
