// ==========================================
// 数据上传平台 - 校验配置读取 Trait
// ==========================================
// 职责: 定义校验/预览所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use std::error::Error;

// ==========================================
// ValidationConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取，缺失回退 UploadConfig）
pub trait ValidationConfigReader: Send + Sync {
    /// 报告中最多列出的错误条数
    ///
    /// # 默认值
    /// - 100
    fn get_max_reported_errors(&self) -> Result<usize, Box<dyn Error>>;

    /// 上传文件大小上限（MB）
    ///
    /// # 默认值
    /// - 50
    fn get_max_file_size_mb(&self) -> Result<u64, Box<dyn Error>>;

    /// 预览行数
    ///
    /// # 默认值
    /// - 10
    fn get_preview_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// date 类型接受的格式（chrono strftime 语法）
    fn get_date_formats(&self) -> Result<Vec<String>, Box<dyn Error>>;

    /// datetime 类型接受的格式
    fn get_datetime_formats(&self) -> Result<Vec<String>, Box<dyn Error>>;
}
