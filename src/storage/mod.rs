// ==========================================
// 数据上传平台 - 对象存储层
// ==========================================
// 职责: 对象存储协作接口 + 本地/内存实现
// 红线: 不含重试与退避，失败原样上抛
// ==========================================

pub mod error;
pub mod local_store;
pub mod memory_store;
pub mod object_store;

pub use error::{StorageError, StorageResult};
pub use local_store::LocalObjectStore;
pub use memory_store::InMemoryObjectStore;
pub use object_store::{validate_key, ObjectDescriptor, ObjectStore};
