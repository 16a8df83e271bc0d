// ==========================================
// 研究生培训档案系统 - 表格行读取器
// ==========================================
// 支持: CSV (.csv) / Excel (.xlsx/.xls, 读取第一个工作表)
// 约定:
// - 第一行为表头; 数据行号从 2 开始
// - 单元格逐个去除首尾空白
// - 表格中全空的行跳过 (CSV 不跳过)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_normalizer::excel_serial_to_date;
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::Path;

// ==========================================
// UploadedFile - 上传文件
// ==========================================
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// 文件名 (仅用于按扩展名判断格式)
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// 从磁盘读取
    pub fn from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_file_name(&self.name)
    }
}

// ==========================================
// FileKind - 文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
    Xls,
}

impl FileKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        match ext.as_str() {
            "csv" => Some(FileKind::Csv),
            "xlsx" => Some(FileKind::Xlsx),
            "xls" => Some(FileKind::Xls),
            _ => None,
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, FileKind::Xlsx | FileKind::Xls)
    }
}

/// 表头处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// 去空白 + 小写; 空表头记为 col_{i}
    Normalized,
    /// 仅去空白; 空表头的列被忽略
    Preserved,
}

impl HeaderMode {
    fn apply(&self, idx: usize, raw: &str) -> Option<String> {
        let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();
        match self {
            HeaderMode::Normalized if trimmed.is_empty() => Some(format!("col_{}", idx)),
            HeaderMode::Normalized => Some(trimmed.to_lowercase()),
            HeaderMode::Preserved if trimmed.is_empty() => None,
            HeaderMode::Preserved => Some(trimmed.to_string()),
        }
    }
}

// ==========================================
// Row - 规范化行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub row_number: usize,
    fields: BTreeMap<String, String>,
}

impl Row {
    pub fn new(row_number: usize, fields: BTreeMap<String, String>) -> Self {
        Self { row_number, fields }
    }

    /// 取列值
    ///
    /// 依次尝试: 原键 → 下划线换空格 → 大小写不敏感
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.fields.get(key) {
            return Some(v.as_str());
        }
        let spaced = key.replace('_', " ");
        if let Some(v) = self.fields.get(&spaced) {
            return Some(v.as_str());
        }
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key) || k.eq_ignore_ascii_case(&spaced))
            .map(|(_, v)| v.as_str())
    }

    /// 取列值, 缺列视为空串
    pub fn text(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// 第一个非空列值
    pub fn first_non_empty(&self, keys: &[&str]) -> &str {
        keys.iter()
            .map(|k| self.text(k))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }

    /// 原始数据回显 (写入台账失败条目)
    pub fn to_json(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
            .collect();
        JsonValue::Object(map)
    }
}

// ==========================================
// 表格读取 (第一个工作表 → 字符串网格)
// ==========================================

/// 字符串网格: (1 基行号, 单元格)
pub struct SheetGrid {
    pub rows: Vec<(usize, Vec<String>)>,
}

/// 单元格转文本: 整数值浮点去掉小数部分, 日期转 YYYY-MM-DD
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.split('T').next().unwrap_or_default().to_string(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

fn first_sheet_range<R>(workbook: &mut R) -> ImportResult<Range<Data>>
where
    R: Reader<Cursor<Vec<u8>>>,
    ImportError: From<R::Error>,
{
    let sheet_names = workbook.sheet_names();
    let first = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
    Ok(workbook.worksheet_range(&first)?)
}

/// 读取第一个工作表为字符串网格
pub fn read_sheet_grid(kind: FileKind, bytes: &[u8]) -> ImportResult<SheetGrid> {
    let cursor = Cursor::new(bytes.to_vec());
    let range = match kind {
        FileKind::Xlsx => {
            let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)?;
            first_sheet_range(&mut workbook)?
        }
        FileKind::Xls => {
            let mut workbook: Xls<_> = open_workbook_from_rs(cursor)?;
            first_sheet_range(&mut workbook)?
        }
        FileKind::Csv => {
            return Err(ImportError::ExcelParseError(
                "CSV 文件不能按工作表读取".to_string(),
            ))
        }
    };

    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let rows = range
        .rows()
        .enumerate()
        .map(|(idx, cells)| (first_row + idx + 1, cells.iter().map(cell_to_string).collect()))
        .collect();
    Ok(SheetGrid { rows })
}

// ==========================================
// TabularRowReader
// ==========================================

enum RowSource {
    Csv(StringRecordsIntoIter<Cursor<Vec<u8>>>),
    Grid(std::vec::IntoIter<(usize, Vec<String>)>),
}

/// 惰性、有限、不可重启的行序列
pub struct TabularRowReader {
    headers: Vec<Option<String>>,
    source: RowSource,
    next_csv_row: usize,
}

impl TabularRowReader {
    /// 打开文件并校验必需列 (大小写不敏感)
    pub fn open(file: &UploadedFile, mode: HeaderMode, required: &[&str]) -> ImportResult<Self> {
        let kind = file.kind().ok_or_else(|| ImportError::UnsupportedFormat {
            name: file.name.clone(),
            supported: ".csv/.xlsx/.xls",
        })?;
        if file.bytes.is_empty() {
            return Err(ImportError::EmptyFile(file.name.clone()));
        }

        let (raw_headers, source) = match kind {
            FileKind::Csv => {
                let mut reader = ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true) // 允许行长度不一致
                    .from_reader(Cursor::new(file.bytes.clone()));
                let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
                (headers, RowSource::Csv(reader.into_records()))
            }
            FileKind::Xlsx | FileKind::Xls => {
                let mut rows = read_sheet_grid(kind, &file.bytes)?.rows.into_iter();
                let (_, headers) = rows.next().ok_or(ImportError::MissingHeader)?;
                (headers, RowSource::Grid(rows))
            }
        };

        let headers: Vec<Option<String>> = raw_headers
            .iter()
            .enumerate()
            .map(|(idx, h)| mode.apply(idx, h))
            .collect();
        if headers.iter().all(Option::is_none) {
            return Err(ImportError::MissingHeader);
        }

        let reader = Self {
            headers,
            source,
            next_csv_row: 2,
        };
        reader.check_required(required)?;
        Ok(reader)
    }

    /// 有效表头 (已按模式处理)
    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().flatten().map(String::as_str).collect()
    }

    fn check_required(&self, required: &[&str]) -> ImportResult<()> {
        let present: BTreeSet<String> = self
            .headers
            .iter()
            .flatten()
            .map(|h| h.to_lowercase())
            .collect();
        let missing: BTreeSet<String> = required
            .iter()
            .map(|c| c.to_lowercase())
            .filter(|c| !present.contains(c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::Schema(missing.into_iter().collect()))
        }
    }

    fn build_row<'a, I>(&self, row_number: usize, cells: I) -> Row
    where
        I: Iterator<Item = &'a str>,
    {
        let mut fields: BTreeMap<String, String> = self
            .headers
            .iter()
            .flatten()
            .map(|h| (h.clone(), String::new()))
            .collect();
        for (header, value) in self.headers.iter().zip(cells) {
            if let Some(header) = header {
                fields.insert(header.clone(), value.trim().to_string());
            }
        }
        Row::new(row_number, fields)
    }
}

impl Iterator for TabularRowReader {
    type Item = ImportResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            RowSource::Csv(records) => {
                let record = match records.next()? {
                    Ok(record) => record,
                    Err(e) => return Some(Err(e.into())),
                };
                let row_number = self.next_csv_row;
                self.next_csv_row += 1;
                Some(Ok(self.build_row(row_number, record.iter())))
            }
            RowSource::Grid(rows) => loop {
                let (row_number, cells) = rows.next()?;
                if cells.iter().all(|c| c.is_empty()) {
                    continue;
                }
                return Some(Ok(self.build_row(row_number, cells.iter().map(String::as_str))));
            },
        }
    }
}
