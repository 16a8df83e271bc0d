// ==========================================
// 研究生培训档案系统 - 单次调用结果累加器
// ==========================================
// 职责: 收集成功/失败/警告条目及格式专属侧列表, 最终写入台账 detail
// 约定: 每个条目都带来源行号 (或记录 id)
// ==========================================

use crate::domain::log_entry::LogEntryValidationError;
use crate::domain::person::PersonValidationError;
use crate::repository::error::RepositoryError;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;

// ==========================================
// RowErrorKind - 行级错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowErrorKind {
    MissingField,
    InvalidEnumValue,
    InvalidDate,
    UnresolvableSupervisor,
    InvalidPg,
    DuplicateOrConstraintViolation,
    InternalError,
    NotFound,
}

impl RowErrorKind {
    /// 稳定的对外错误码
    pub fn code(&self) -> &'static str {
        match self {
            RowErrorKind::MissingField => "missing-field",
            RowErrorKind::InvalidEnumValue => "invalid-enum-value",
            RowErrorKind::InvalidDate => "invalid-date",
            RowErrorKind::UnresolvableSupervisor => "unresolvable-supervisor",
            RowErrorKind::InvalidPg => "invalid-pg",
            RowErrorKind::DuplicateOrConstraintViolation => "duplicate-or-constraint-violation",
            RowErrorKind::InternalError => "internal-error",
            RowErrorKind::NotFound => "not-found",
        }
    }
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ==========================================
// RowError - 行级错误 (记录, 不抛出)
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{kind}] {message}")]
pub struct RowError {
    pub kind: RowErrorKind,
    pub message: String,
}

impl RowError {
    pub fn new(kind: RowErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::new(RowErrorKind::MissingField, message)
    }

    pub fn invalid_enum(message: impl Into<String>) -> Self {
        Self::new(RowErrorKind::InvalidEnumValue, message)
    }

    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::new(RowErrorKind::InvalidDate, message)
    }

    pub fn unresolvable_supervisor(message: impl Into<String>) -> Self {
        Self::new(RowErrorKind::UnresolvableSupervisor, message)
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl From<RepositoryError> for RowError {
    fn from(err: RepositoryError) -> Self {
        let kind = if err.is_constraint_violation() {
            RowErrorKind::DuplicateOrConstraintViolation
        } else {
            RowErrorKind::InternalError
        };
        RowError::new(kind, err.to_string())
    }
}

impl From<PersonValidationError> for RowError {
    fn from(err: PersonValidationError) -> Self {
        let kind = match err.field {
            "specialty" | "year" => RowErrorKind::InvalidEnumValue,
            "supervisor" => RowErrorKind::UnresolvableSupervisor,
            _ => RowErrorKind::DuplicateOrConstraintViolation,
        };
        RowError::new(kind, err.to_string())
    }
}

impl From<LogEntryValidationError> for RowError {
    fn from(err: LogEntryValidationError) -> Self {
        let kind = match err.field {
            "date" => RowErrorKind::InvalidDate,
            _ => RowErrorKind::DuplicateOrConstraintViolation,
        };
        RowError::new(kind, err.to_string())
    }
}

// ==========================================
// RowOutput - 单行成功产出
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutput {
    pub success: JsonValue,
    /// 软警告 (行仍计为成功)
    pub warnings: Vec<RowError>,
    /// 侧列表条目: (列表名, 条目)
    pub side: Vec<(&'static str, JsonValue)>,
}

impl RowOutput {
    pub fn new(success: JsonValue) -> Self {
        Self {
            success,
            warnings: Vec::new(),
            side: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<RowError>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_side(mut self, list: &'static str, entry: JsonValue) -> Self {
        self.side.push((list, entry));
        self
    }
}

// ==========================================
// BulkAccumulator
// ==========================================
#[derive(Debug, Default)]
pub struct BulkAccumulator {
    successes: Vec<JsonValue>,
    failures: Vec<JsonValue>,
    warnings: Vec<JsonValue>,
    side_lists: BTreeMap<&'static str, Vec<JsonValue>>,
}

impl BulkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先声明侧列表 (为空时也写入 detail)
    pub fn with_side_lists(mut self, lists: &[&'static str]) -> Self {
        for list in lists {
            self.side_lists.entry(*list).or_default();
        }
        self
    }

    // ===== 行级 (导入) =====

    /// 记录一行的处理结果
    pub fn record_row(&mut self, row: usize, data: &JsonValue, result: Result<RowOutput, RowError>) {
        match result {
            Ok(output) => {
                for warning in &output.warnings {
                    self.row_warning(row, warning, data);
                }
                for (list, entry) in output.side {
                    self.side_lists.entry(list).or_default().push(entry);
                }
                self.successes.push(output.success);
            }
            Err(error) => self.row_failure(row, &error, data),
        }
    }

    pub fn row_failure(&mut self, row: usize, error: &RowError, data: &JsonValue) {
        warn!(row, code = error.code(), error = %error.message, "行处理失败");
        self.failures.push(json!({
            "row": row,
            "code": error.code(),
            "error": error.message,
            "data": data,
        }));
    }

    pub fn row_warning(&mut self, row: usize, warning: &RowError, data: &JsonValue) {
        self.warnings.push(json!({
            "row": row,
            "code": warning.code(),
            "warning": warning.message,
            "data": data,
        }));
    }

    // ===== id 级 (审核/指派) =====

    pub fn success(&mut self, entry: JsonValue) {
        self.successes.push(entry);
    }

    pub fn not_found(&mut self, id: i64) {
        self.failures.push(json!({
            "id": id,
            "error": RowErrorKind::NotFound.code(),
            "code": RowErrorKind::NotFound.code(),
        }));
    }

    /// 整块失败: 一个条目覆盖该块全部 id
    pub fn chunk_failure(&mut self, ids: &[i64], error: &str) {
        self.failures.push(json!({
            "ids": ids,
            "error": error,
        }));
    }

    /// 当前成功条目数, 供块回滚时截断
    pub fn success_mark(&self) -> usize {
        self.successes.len()
    }

    pub fn truncate_successes(&mut self, mark: usize) {
        self.successes.truncate(mark);
    }

    // ===== 汇总 =====

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn side_list(&self, list: &str) -> &[JsonValue] {
        self.side_lists.get(list).map(Vec::as_slice).unwrap_or(&[])
    }

    /// completed 台账的 detail
    pub fn into_detail(self) -> JsonValue {
        let mut detail = Map::new();
        detail.insert("successes".to_string(), JsonValue::Array(self.successes));
        detail.insert("failures".to_string(), JsonValue::Array(self.failures));
        detail.insert("warnings".to_string(), JsonValue::Array(self.warnings));
        for (list, entries) in self.side_lists {
            detail.insert(list.to_string(), JsonValue::Array(entries));
        }
        JsonValue::Object(detail)
    }

    /// failed 台账的 detail: 只保留失败条目
    pub fn into_failure_detail(self) -> JsonValue {
        json!({ "failures": self.failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_outcomes_land_in_lists() {
        let mut acc = BulkAccumulator::new().with_side_lists(&["unlinked_residents"]);
        let data = json!({"name": "Ali Khan"});

        acc.record_row(
            2,
            &data,
            Ok(RowOutput::new(json!({"row": 2}))
                .with_warnings(vec![RowError::unresolvable_supervisor("no supervisor")])
                .with_side("unlinked_residents", json!({"row": 2}))),
        );
        acc.record_row(3, &data, Err(RowError::missing_field("Missing 'Name'")));

        assert_eq!(acc.success_count(), 1);
        assert_eq!(acc.failure_count(), 1);
        assert_eq!(acc.warning_count(), 1);
        assert_eq!(acc.side_list("unlinked_residents").len(), 1);

        let detail = acc.into_detail();
        assert_eq!(detail["failures"][0]["row"], 3);
        assert_eq!(detail["failures"][0]["code"], "missing-field");
        assert_eq!(detail["warnings"][0]["code"], "unresolvable-supervisor");
        assert_eq!(detail["unlinked_residents"][0]["row"], 2);
    }

    #[test]
    fn test_truncate_successes_for_rolled_back_chunk() {
        let mut acc = BulkAccumulator::new();
        acc.success(json!({"id": 1}));
        let mark = acc.success_mark();
        acc.success(json!({"id": 2}));
        acc.not_found(9);
        acc.truncate_successes(mark);
        acc.chunk_failure(&[2, 9], "boom");

        assert_eq!(acc.success_count(), 1);
        assert_eq!(acc.failure_count(), 2);
        let detail = acc.into_failure_detail();
        assert_eq!(detail["failures"][0]["error"], "not-found");
        assert_eq!(detail["failures"][1]["ids"], json!([2, 9]));
    }

    #[test]
    fn test_repository_error_classification() {
        let dup: RowError = RepositoryError::UniqueConstraintViolation("username".into()).into();
        assert_eq!(dup.code(), "duplicate-or-constraint-violation");
        let other: RowError = RepositoryError::LockError("poisoned".into()).into();
        assert_eq!(other.code(), "internal-error");
    }
}
