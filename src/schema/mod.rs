// ==========================================
// 数据上传平台 - Schema 注册表层
// ==========================================
// 职责: YAML Schema 加载、校验与按分类查找
// ==========================================

pub mod error;
pub mod loader;
pub mod registry;

pub use error::{SchemaError, SchemaResult};
pub use loader::{load_schema_file, parse_schema, DEFAULT_SUBJECT};
pub use registry::{category_key, SchemaCatalog, SchemaRegistry, SkippedSchema};
