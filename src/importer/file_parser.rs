// ==========================================
// 数据上传平台 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: UploadedTable（表头有序，行与表头等长）
// 红线: 不做列名归一化、不做类型转换，单元格只 TRIM
// ==========================================

use crate::domain::table::UploadedTable;
use crate::domain::upload::FileInfo;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::fs;
use std::path::Path;
use tracing::debug;

/// 默认文件大小上限（MB）
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

/// 分隔符探测时读取的字节数
const SNIFF_BYTES: usize = 1024;

/// 候选分隔符（按优先级）
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

// ==========================================
// ReadOptions - 读取参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Auto,
    Char(u8),
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: Delimiter,
    /// 表头所在行（0 起，之前的行被跳过）
    pub header_row: usize,
    /// Excel 工作表名（None 取第一个）
    pub sheet_name: Option<String>,
    pub max_file_size_mb: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Auto,
            header_row: 0,
            sheet_name: None,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}

// ==========================================
// TableParser Trait
// ==========================================
pub trait TableParser: Send + Sync {
    fn parse(&self, file_path: &Path, options: &ReadOptions) -> ImportResult<UploadedTable>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 在前 1024 字节中统计候选分隔符，取出现次数最多者（并列取优先级高者）
    pub fn detect_delimiter(sample: &str) -> u8 {
        let head: &[u8] = &sample.as_bytes()[..sample.len().min(SNIFF_BYTES)];
        let mut best = (b',', 0usize);
        for candidate in CANDIDATE_DELIMITERS {
            let count = head.iter().filter(|b| **b == candidate).count();
            if count > best.1 {
                best = (candidate, count);
            }
        }
        best.0
    }

    /// 从已解码文本解析
    pub fn parse_text(
        &self,
        source_name: &str,
        text: &str,
        options: &ReadOptions,
    ) -> ImportResult<UploadedTable> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let delimiter = match options.delimiter {
            Delimiter::Auto => Self::detect_delimiter(text),
            Delimiter::Char(c) => c,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut records = reader.records().skip(options.header_row);

        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
            None => return Err(ImportError::MissingHeader(source_name.to_string())),
        };

        let mut table = UploadedTable::new(source_name, headers);
        for result in records {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if cells.iter().all(|v| v.is_empty()) {
                continue;
            }
            table
                .push_row(cells)
                .map_err(|e| ImportError::row_width(source_name, e))?;
        }

        debug!(
            source = source_name,
            delimiter = %(delimiter as char).escape_default(),
            rows = table.row_count(),
            "CSV 解析完成"
        );
        Ok(table)
    }
}

/// UTF-8 优先，失败时按 Latin-1 解码
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|b| *b as char).collect(),
    }
}

impl TableParser for CsvParser {
    fn parse(&self, file_path: &Path, options: &ReadOptions) -> ImportResult<UploadedTable> {
        let bytes = fs::read(file_path)?;
        self.parse_text(&source_name(file_path), &decode_text(bytes), options)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 列出工作表名
    pub fn list_sheets(&self, file_path: &Path) -> ImportResult<Vec<String>> {
        let workbook = open_workbook_auto(file_path)?;
        Ok(workbook.sheet_names())
    }
}

impl TableParser for ExcelParser {
    fn parse(&self, file_path: &Path, options: &ReadOptions) -> ImportResult<UploadedTable> {
        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = match &options.sheet_name {
            Some(name) if sheet_names.contains(name) => name.clone(),
            Some(name) => return Err(ImportError::SheetNotFound(name.clone())),
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;
        let mut rows = range.rows().skip(options.header_row);

        let name = source_name(file_path);
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| ImportError::MissingHeader(name.clone()))?
            .iter()
            .map(|cell| cell_to_string(cell).trim().to_string())
            .collect();

        let mut table = UploadedTable::new(name, headers);
        for data_row in rows {
            let cells: Vec<String> = data_row
                .iter()
                .map(|cell| cell_to_string(cell).trim().to_string())
                .collect();

            if cells.iter().all(|v| v.is_empty()) {
                continue;
            }
            table
                .push_row(cells)
                .map_err(|e| ImportError::row_width(&table.source_name, e))?;
        }

        debug!(sheet = %sheet_name, rows = table.row_count(), "Excel 解析完成");
        Ok(table)
    }
}

/// 单元格 → 文本（整数值浮点去掉 ".0"，日期转 ISO 格式）
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 文件基本信息（存在性 + 扩展名校验）
    pub fn file_info(&self, file_path: &Path) -> ImportResult<FileInfo> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        let extension = extension_of(file_path);
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ImportError::UnsupportedFormat(extension));
        }
        let size = fs::metadata(file_path)?.len();
        Ok(FileInfo {
            name: source_name(file_path),
            size,
            extension,
        })
    }

    pub fn parse<P: AsRef<Path>>(
        &self,
        file_path: P,
        options: &ReadOptions,
    ) -> ImportResult<UploadedTable> {
        let path = file_path.as_ref();
        let info = self.file_info(path)?;

        let size_mb = info.size as f64 / (1024.0 * 1024.0);
        if size_mb > options.max_file_size_mb as f64 {
            return Err(ImportError::FileTooLarge {
                size_mb,
                max_mb: options.max_file_size_mb,
            });
        }

        match info.extension.as_str() {
            "csv" => CsvParser.parse(path, options),
            _ => ExcelParser.parse(path, options),
        }
    }

    /// Excel 工作表列表（CSV 返回空）
    pub fn list_sheets<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<String>> {
        let path = file_path.as_ref();
        match self.file_info(path)?.extension.as_str() {
            "csv" => Ok(Vec::new()),
            _ => ExcelParser.list_sheets(path),
        }
    }
}
