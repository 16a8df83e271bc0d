// ==========================================
// 研究生培训档案系统 - 日志条目领域模型
// ==========================================
// 职责: 临床日志条目 (外部实体), 批量审核/指派的作用对象
// ==========================================

use crate::domain::types::LogEntryStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 文本字段最大长度
pub const LOG_TEXT_MAX_LEN: usize = 255;

// ==========================================
// LogEntryRecord - 已持久化的日志条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntryRecord {
    pub id: i64,
    pub pg_id: i64,
    pub entry_date: NaiveDate,
    pub status: LogEntryStatus,
    pub case_title: String,
    pub location_of_activity: String,
    pub patient_history_summary: String,
    pub management_action: String,
    pub topic_subtopic: String,
    pub supervisor_id: Option<i64>,
    pub supervisor_action_at: Option<NaiveDateTime>,
    pub created_by: Option<i64>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// NewLogEntry - 待创建的日志条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub pg_id: i64,
    pub entry_date: NaiveDate,
    pub status: LogEntryStatus,
    pub case_title: String,
    pub location_of_activity: String,
    pub patient_history_summary: String,
    pub management_action: String,
    pub topic_subtopic: String,
    pub created_by: Option<i64>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("日志字段 {field} 校验失败: {message}")]
pub struct LogEntryValidationError {
    pub field: &'static str,
    pub message: String,
}

impl NewLogEntry {
    /// 保存前校验; today 用于拒绝未来日期
    pub fn validate(&self, today: NaiveDate) -> Result<(), LogEntryValidationError> {
        let text_fields = [
            ("case_title", &self.case_title),
            ("location_of_activity", &self.location_of_activity),
            ("topic_subtopic", &self.topic_subtopic),
        ];
        for (field, value) in text_fields {
            if value.trim().is_empty() {
                return Err(LogEntryValidationError {
                    field,
                    message: "不能为空".to_string(),
                });
            }
            if value.chars().count() > LOG_TEXT_MAX_LEN {
                return Err(LogEntryValidationError {
                    field,
                    message: format!("长度不能超过 {}", LOG_TEXT_MAX_LEN),
                });
            }
        }

        if self.entry_date > today {
            return Err(LogEntryValidationError {
                field: "date",
                message: format!("日期 {} 晚于今天", self.entry_date),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: NaiveDate) -> NewLogEntry {
        NewLogEntry {
            pg_id: 1,
            entry_date: date,
            status: LogEntryStatus::Draft,
            case_title: "Appendectomy".to_string(),
            location_of_activity: "OT-2".to_string(),
            patient_history_summary: "Pending summary".to_string(),
            management_action: "Pending action".to_string(),
            topic_subtopic: "General".to_string(),
            created_by: None,
        }
    }

    #[test]
    fn test_future_date_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(entry(today).validate(today).is_ok());

        let err = entry(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
            .validate(today)
            .unwrap_err();
        assert_eq!(err.field, "date");
    }

    #[test]
    fn test_overlong_title_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut e = entry(today);
        e.case_title = "x".repeat(LOG_TEXT_MAX_LEN + 1);
        assert_eq!(e.validate(today).unwrap_err().field, "case_title");
    }
}
