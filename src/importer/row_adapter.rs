// ==========================================
// 研究生培训档案系统 - 行适配器
// ==========================================
// 职责: 将规范化行映射为各导入格式的字段集合
// 格式: 日志条目 / 导师名册 / 研究生名册 / 旧版学员表
// 说明: 只做取值与别名合并, 不做校验
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{HeaderMode, Row, TabularRowReader, UploadedFile};
use serde_json::Value as JsonValue;

/// 日志条目导入的必需列
pub const LOGBOOK_REQUIRED_COLUMNS: &[&str] = &["pg_username", "case_title", "date", "status"];

/// 旧版学员表的标准表头
pub const TRAINEE_HEADERS: [&str; 5] = [
    "Sr. No.",
    "Name of Trainee",
    "Date of Joining",
    "MS/FCPS",
    "Supervisor Name",
];

/// 逐行读取并一次性收集 (任一行解析失败即整体失败)
pub fn read_rows(file: &UploadedFile, mode: HeaderMode, required: &[&str]) -> ImportResult<Vec<Row>> {
    TabularRowReader::open(file, mode, required)?.collect()
}

// ==========================================
// LogbookRow - 日志条目行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogbookRow {
    pub row_number: usize,
    pub pg_username: String,
    pub case_title: String,
    pub date: String,
    pub status: String,
    pub location: String,
    pub patient_history: String,
    pub management_action: String,
    pub topic_subtopic: String,
}

impl LogbookRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            row_number: row.row_number,
            pg_username: row.text("pg_username").to_string(),
            case_title: row.text("case_title").to_string(),
            date: row.text("date").to_string(),
            status: row.text("status").to_string(),
            location: row.text("location").to_string(),
            patient_history: row.text("patient_history").to_string(),
            management_action: row.text("management_action").to_string(),
            topic_subtopic: row.text("topic_subtopic").to_string(),
        }
    }
}

// ==========================================
// RosterRow - 导师/研究生名册行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub row_number: usize,
    /// name, 或 first_name + last_name
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub department: String,
    pub phone: String,
    pub registration_number: String,
    pub username: String,
    pub year: String,
    pub supervisor_name: String,
    pub supervisor_username: String,
    pub date_joining: String,
}

impl RosterRow {
    pub fn from_row(row: &Row) -> Self {
        let name = match row.text("name") {
            "" => format!("{} {}", row.text("first_name"), row.text("last_name"))
                .trim()
                .to_string(),
            name => name.to_string(),
        };

        Self {
            row_number: row.row_number,
            name,
            email: row.text("email").to_string(),
            specialty: row.text("specialty").to_string(),
            department: row.text("department").to_string(),
            phone: row.first_non_empty(&["phone", "phone_number"]).to_string(),
            registration_number: row
                .first_non_empty(&["registration_number", "reg_no"])
                .to_string(),
            username: row.text("username").to_string(),
            year: row.first_non_empty(&["year", "training_year"]).to_string(),
            supervisor_name: row
                .first_non_empty(&["supervisor_name", "supervisor"])
                .to_string(),
            supervisor_username: row.text("supervisor_username").to_string(),
            date_joining: row
                .first_non_empty(&["date_joining", "date_of_joining"])
                .to_string(),
        }
    }
}

// ==========================================
// TraineeRow - 旧版学员表行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TraineeRow {
    pub row_number: usize,
    pub name: String,
    pub date_joining: String,
    pub qualification: String,
    pub supervisor_name: String,
    /// 原始行回显
    pub data: JsonValue,
}

/// 学员表的列定位 (按关键词识别表头)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraineeColumns {
    pub sr_no: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub qualification: Option<String>,
    pub supervisor: Option<String>,
}

impl TraineeColumns {
    /// 关键词规则按优先级匹配, 同一目标列后出现者覆盖前者
    pub fn detect<'a, I>(headers: I) -> ImportResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut columns = TraineeColumns::default();
        for header in headers {
            let lower = header.to_lowercase();
            let slot = if lower.contains("sr") && lower.contains("no") {
                &mut columns.sr_no
            } else if lower.contains("name") && lower.contains("trainee") {
                &mut columns.name
            } else if lower.contains("date") && lower.contains("joining") {
                &mut columns.date
            } else if lower.contains("ms") || lower.contains("fcps") {
                &mut columns.qualification
            } else if lower.contains("supervisor") && lower.contains("name") {
                &mut columns.supervisor
            } else {
                continue;
            };
            *slot = Some(header.to_string());
        }

        if columns.name.is_none() || columns.date.is_none() {
            return Err(ImportError::Schema(vec![
                TRAINEE_HEADERS[1].to_string(),
                TRAINEE_HEADERS[2].to_string(),
            ]));
        }
        Ok(columns)
    }

    fn value(row: &Row, column: &Option<String>) -> String {
        column
            .as_deref()
            .and_then(|c| row.fields().get(c))
            .cloned()
            .unwrap_or_default()
    }

    pub fn extract(&self, row: &Row) -> TraineeRow {
        TraineeRow {
            row_number: row.row_number,
            name: Self::value(row, &self.name),
            date_joining: Self::value(row, &self.date),
            qualification: Self::value(row, &self.qualification),
            supervisor_name: Self::value(row, &self.supervisor),
            data: row.to_json(),
        }
    }
}

/// 读取旧版学员表 (仅 .xlsx/.xls)
pub fn read_trainee_rows(file: &UploadedFile) -> ImportResult<Vec<TraineeRow>> {
    if !file.kind().map(|k| k.is_spreadsheet()).unwrap_or(false) {
        return Err(ImportError::UnsupportedFormat {
            name: file.name.clone(),
            supported: ".xlsx/.xls",
        });
    }

    let reader = TabularRowReader::open(file, HeaderMode::Preserved, &[])?;
    let columns = TraineeColumns::detect(reader.headers())?;
    reader
        .map(|row| row.map(|r| columns.extract(&r)))
        .collect()
}
