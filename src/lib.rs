// ==========================================
// 数据上传平台 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + YAML Schema
// 系统定位: 分类选择 → 文件校验 → 预览 → 分区上传 → 历史记录
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// Schema 注册表 - YAML 规则定义
pub mod schema;

// 导入层 - 文件解析与校验
pub mod importer;

// 对象存储 - 协作接口与本地实现
pub mod storage;

// 数据仓储层 - 上传历史
pub mod repository;

// 配置层 - 运行配置与校验参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务编排
pub mod api;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::types::{FailureKind, FieldType, InferredType};

pub use domain::{
    FieldRule, SchemaDefinition, UploadRecord, UploadedTable, ValidationReport, Violation,
};

pub use importer::{ColumnNormalizer, RecordValidator};

pub use schema::SchemaRegistry;

pub use storage::ObjectStore;

pub use api::{HistoryApi, UploadApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "数据上传平台";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
