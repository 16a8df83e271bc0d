// ==========================================
// 研究生培训档案系统 - 人员领域模型
// ==========================================
// 职责: 人员记录 (外部实体, 引擎只消费不拥有)、执行人、字段校验
// 红线: username 全局唯一; 角色决定必填字段
// ==========================================

use crate::domain::reference::{SpecialtyTable, TrainingYearTable};
use crate::domain::types::Role;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 用户名最大长度
pub const USERNAME_MAX_LEN: usize = 150;

/// 姓名字段最大长度
pub const NAME_MAX_LEN: usize = 150;

// ==========================================
// Principal - 执行人
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub role: Option<Role>,
    pub is_superuser: bool,
}

impl Principal {
    pub fn new(id: i64, username: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            id,
            username: username.into(),
            role,
            is_superuser: false,
        }
    }

    /// 超级用户 (角色可为空)
    pub fn superuser(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            role: None,
            is_superuser: true,
        }
    }

    /// 是否有权执行批量操作: admin / supervisor / 超级用户
    pub fn can_run_bulk_operations(&self) -> bool {
        self.is_superuser || matches!(self.role, Some(Role::Admin) | Some(Role::Supervisor))
    }
}

// ==========================================
// PersonRecord - 已持久化的人员记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub specialty: Option<String>,
    pub year: Option<String>,
    pub supervisor_id: Option<i64>,
    pub registration_number: Option<String>,
    pub phone_number: Option<String>,
    pub date_joined: NaiveDate,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub modified_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PersonRecord {
    /// 全名 (名 + 姓, 去除首尾空白)
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// 用导入数据覆写可变字段 (username / created_by 保持不变)
    ///
    /// supervisor_id 仅在导入数据提供时覆写, 避免清空已有关联
    pub fn apply_import(&mut self, draft: &NewPerson, modified_by: i64) {
        self.email = draft.email.clone();
        self.first_name = draft.first_name.clone();
        self.last_name = draft.last_name.clone();
        self.role = draft.role;
        self.specialty = draft.specialty.clone();
        self.year = draft.year.clone();
        if draft.supervisor_id.is_some() {
            self.supervisor_id = draft.supervisor_id;
        }
        self.registration_number = draft.registration_number.clone();
        self.phone_number = draft.phone_number.clone();
        self.date_joined = draft.date_joined;
        self.is_active = draft.is_active;
        self.modified_by = Some(modified_by);
    }

    /// 转为草稿形式 (用于复用校验规则)
    pub fn to_draft(&self) -> NewPerson {
        NewPerson {
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            specialty: self.specialty.clone(),
            year: self.year.clone(),
            supervisor_id: self.supervisor_id,
            registration_number: self.registration_number.clone(),
            phone_number: self.phone_number.clone(),
            date_joined: self.date_joined,
            is_active: self.is_active,
            created_by: self.created_by,
        }
    }
}

// ==========================================
// NewPerson - 待创建/待校验的人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub specialty: Option<String>,
    pub year: Option<String>,
    pub supervisor_id: Option<i64>,
    pub registration_number: Option<String>,
    pub phone_number: Option<String>,
    pub date_joined: NaiveDate,
    pub is_active: bool,
    pub created_by: Option<i64>,
}

// ==========================================
// PersonValidationError - 字段校验失败
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("字段 {field} 校验失败: {message}")]
pub struct PersonValidationError {
    pub field: &'static str,
    pub message: String,
}

impl PersonValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// 校验上下文
pub struct PersonRules<'a> {
    pub specialties: &'a SpecialtyTable,
    pub years: &'a TrainingYearTable,
    /// role=pg 时是否强制要求导师关联
    pub require_supervisor: bool,
}

impl NewPerson {
    /// 按"即将保存"的标准校验记录 (不访问存储)
    pub fn validate(&self, rules: &PersonRules<'_>) -> Result<(), PersonValidationError> {
        // ===== 用户名 =====
        if self.username.is_empty() {
            return Err(PersonValidationError::new("username", "不能为空"));
        }
        if self.username.chars().count() > USERNAME_MAX_LEN {
            return Err(PersonValidationError::new(
                "username",
                format!("长度不能超过 {}", USERNAME_MAX_LEN),
            ));
        }
        if let Some(bad) = self
            .username
            .chars()
            .find(|c| !(c.is_alphanumeric() || "@.+-_".contains(*c)))
        {
            return Err(PersonValidationError::new(
                "username",
                format!("包含非法字符 '{}'", bad),
            ));
        }

        // ===== 邮箱 =====
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => {
                return Err(PersonValidationError::new(
                    "email",
                    format!("邮箱格式无效: '{}'", self.email),
                ))
            }
        }

        if self.first_name.chars().count() > NAME_MAX_LEN
            || self.last_name.chars().count() > NAME_MAX_LEN
        {
            return Err(PersonValidationError::new(
                "name",
                format!("姓名长度不能超过 {}", NAME_MAX_LEN),
            ));
        }

        // ===== 专科 =====
        match &self.specialty {
            Some(code) if !rules.specialties.contains_code(code) => {
                return Err(PersonValidationError::new(
                    "specialty",
                    format!("未知专科代码 '{}'", code),
                ));
            }
            None if self.role.requires_specialty() => {
                return Err(PersonValidationError::new(
                    "specialty",
                    format!("角色 {} 必须填写专科", self.role),
                ));
            }
            _ => {}
        }

        // ===== 培训年级 =====
        match &self.year {
            Some(code) if !rules.years.contains(code) => {
                return Err(PersonValidationError::new(
                    "year",
                    format!("未知培训年级 '{}'", code),
                ));
            }
            None if self.role == Role::Pg => {
                return Err(PersonValidationError::new("year", "研究生必须填写培训年级"));
            }
            _ => {}
        }

        // ===== 导师关联 =====
        if self.role == Role::Pg && rules.require_supervisor && self.supervisor_id.is_none() {
            return Err(PersonValidationError::new("supervisor", "研究生必须关联导师"));
        }

        Ok(())
    }
}

// ==========================================
// PersonFilter - 人员过滤谓词
// ==========================================
// 所有文本条件均为大小写不敏感的精确匹配
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    pub role: Option<Role>,
    pub username_iexact: Option<String>,
    pub first_name_iexact: Option<String>,
    pub last_name_iexact: Option<String>,
    pub limit: Option<usize>,
}

impl PersonFilter {
    pub fn with_role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username_iexact = Some(username.into());
        self
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name_iexact = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name_iexact = Some(last_name.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(role: Role) -> NewPerson {
        NewPerson {
            username: "ali.khan".to_string(),
            email: "ali.khan.pgr@pmc.edu.pk".to_string(),
            first_name: "Ali".to_string(),
            last_name: "Khan".to_string(),
            role,
            specialty: Some("urology".to_string()),
            year: Some("2".to_string()),
            supervisor_id: Some(7),
            registration_number: None,
            phone_number: None,
            date_joined: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            is_active: true,
            created_by: Some(1),
        }
    }

    fn rules<'a>(
        specialties: &'a SpecialtyTable,
        years: &'a TrainingYearTable,
        require_supervisor: bool,
    ) -> PersonRules<'a> {
        PersonRules {
            specialties,
            years,
            require_supervisor,
        }
    }

    #[test]
    fn test_principal_authority() {
        assert!(Principal::new(1, "a", Some(Role::Admin)).can_run_bulk_operations());
        assert!(Principal::new(1, "s", Some(Role::Supervisor)).can_run_bulk_operations());
        assert!(!Principal::new(1, "p", Some(Role::Pg)).can_run_bulk_operations());
        assert!(!Principal::new(1, "x", None).can_run_bulk_operations());
        assert!(Principal::superuser(1, "root").can_run_bulk_operations());
    }

    #[test]
    fn test_valid_pg_passes() {
        let (s, y) = (SpecialtyTable::default(), TrainingYearTable::default());
        assert!(draft(Role::Pg).validate(&rules(&s, &y, true)).is_ok());
    }

    #[test]
    fn test_pg_without_supervisor_depends_on_rule() {
        let (s, y) = (SpecialtyTable::default(), TrainingYearTable::default());
        let mut person = draft(Role::Pg);
        person.supervisor_id = None;

        let err = person.validate(&rules(&s, &y, true)).unwrap_err();
        assert_eq!(err.field, "supervisor");
        assert!(person.validate(&rules(&s, &y, false)).is_ok());
    }

    #[test]
    fn test_specialty_required_for_supervisor() {
        let (s, y) = (SpecialtyTable::default(), TrainingYearTable::default());
        let mut person = draft(Role::Supervisor);
        person.specialty = None;
        person.year = None;
        assert_eq!(person.validate(&rules(&s, &y, true)).unwrap_err().field, "specialty");

        let mut admin = draft(Role::Admin);
        admin.specialty = None;
        admin.year = None;
        assert!(admin.validate(&rules(&s, &y, true)).is_ok());
    }

    #[test]
    fn test_bad_username_and_email() {
        let (s, y) = (SpecialtyTable::default(), TrainingYearTable::default());
        let mut person = draft(Role::Pg);
        person.username = "ali khan".to_string();
        assert_eq!(person.validate(&rules(&s, &y, true)).unwrap_err().field, "username");

        let mut person = draft(Role::Pg);
        person.email = "no-at-sign".to_string();
        assert_eq!(person.validate(&rules(&s, &y, true)).unwrap_err().field, "email");
    }

    #[test]
    fn test_apply_import_keeps_identity_and_existing_supervisor() {
        let now = chrono::Utc::now().naive_utc();
        let mut record = PersonRecord {
            id: 3,
            username: "ali.khan".to_string(),
            email: "old@pmc.edu.pk".to_string(),
            first_name: "Ali".to_string(),
            last_name: "Khan".to_string(),
            role: Role::Pg,
            specialty: Some("surgery".to_string()),
            year: Some("1".to_string()),
            supervisor_id: Some(9),
            registration_number: None,
            phone_number: None,
            date_joined: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            is_active: true,
            created_by: Some(1),
            modified_by: None,
            created_at: now,
            updated_at: now,
        };
        let mut incoming = draft(Role::Pg);
        incoming.username = "ignored".to_string();
        incoming.supervisor_id = None;
        incoming.created_by = Some(42);

        record.apply_import(&incoming, 5);

        assert_eq!(record.username, "ali.khan");
        assert_eq!(record.created_by, Some(1));
        assert_eq!(record.supervisor_id, Some(9));
        assert_eq!(record.specialty.as_deref(), Some("urology"));
        assert_eq!(record.modified_by, Some(5));
    }
}
