// ==========================================
// 研究生培训档案系统 - 学员表预览
// ==========================================
// 职责: 解析学员表并展示导入后的字段 (不访问存储)
// 说明: 用户名为基础用户名, 实际导入时可能因重名追加数字后缀
// ==========================================

use crate::config::BulkConfig;
use crate::importer::error::ImportResult;
use crate::importer::field_normalizer::{
    base_username, infer_training_year, parse_flexible_date, split_full_name,
};
use crate::importer::file_parser::UploadedFile;
use crate::importer::row_adapter::read_trainee_rows;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraineePreviewRow {
    pub row: usize,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub date_joining: Option<NaiveDate>,
    pub year: Option<String>,
    pub qualification: String,
    pub supervisor_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorPreview {
    pub name: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewIssue {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraineePreview {
    pub trainees: Vec<TraineePreviewRow>,
    /// 去重并按名称排序
    pub supervisors: Vec<SupervisorPreview>,
    pub errors: Vec<PreviewIssue>,
    pub warnings: Vec<PreviewIssue>,
}

pub fn preview_trainees(
    file: &UploadedFile,
    config: &BulkConfig,
    today: NaiveDate,
) -> ImportResult<TraineePreview> {
    let rows = read_trainee_rows(file)?;
    let mut preview = TraineePreview::default();
    let mut supervisor_names = BTreeSet::new();

    for row in rows {
        if row.name.is_empty() {
            preview.errors.push(PreviewIssue {
                row: row.row_number,
                message: "Name of Trainee is required".to_string(),
            });
            continue;
        }

        let date_joining = match parse_flexible_date(&row.date_joining) {
            Ok(date) => Some(date),
            Err(e) => {
                preview.errors.push(PreviewIssue {
                    row: row.row_number,
                    message: e.to_string(),
                });
                None
            }
        };

        if row.supervisor_name.is_empty() {
            preview.warnings.push(PreviewIssue {
                row: row.row_number,
                message: "No supervisor name provided".to_string(),
            });
        } else {
            supervisor_names.insert(row.supervisor_name.clone());
        }

        let (first_name, last_name) = split_full_name(&row.name);
        let username = base_username(&first_name, &last_name, &config.username_fallback);
        preview.trainees.push(TraineePreviewRow {
            row: row.row_number,
            email: config.role_email(&username, "pgr"),
            year: date_joining.map(|d| infer_training_year(d, today).to_string()),
            name: row.name,
            first_name,
            last_name,
            username,
            date_joining,
            qualification: row.qualification,
            supervisor_name: row.supervisor_name,
        });
    }

    preview.supervisors = supervisor_names
        .into_iter()
        .map(|name| {
            let (first, last) = split_full_name(&name);
            let username = base_username(&first, &last, &config.username_fallback);
            SupervisorPreview {
                email: config.role_email(&username, "supervisor"),
                username,
                name,
            }
        })
        .collect();

    Ok(preview)
}
