// ==========================================
// 研究生培训档案系统 - 领域类型定义
// ==========================================
// 职责: 角色、批量操作类型/状态、日志条目状态
// 存储格式: 小写/下划线字符串 (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 用户角色 (Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,      // 管理员
    Supervisor, // 导师
    Pg,         // 研究生 (住院医师)
}

impl Role {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Pg => "pg",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "supervisor" => Some(Role::Supervisor),
            "pg" => Some(Role::Pg),
            _ => None,
        }
    }

    /// 该角色是否必须填写专科
    pub fn requires_specialty(&self) -> bool {
        matches!(self, Role::Supervisor | Role::Pg)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 批量操作类型 (Operation Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Review,     // 批量审核
    Assignment, // 批量指派导师
    Import,     // 表格导入
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Review => "review",
            OperationKind::Assignment => "assignment",
            OperationKind::Import => "import",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "review" => Some(OperationKind::Review),
            "assignment" => Some(OperationKind::Assignment),
            "import" => Some(OperationKind::Import),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 批量操作状态 (Operation Status)
// ==========================================
// 状态机: Running → Completed | Failed (仅一次)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Running,   // 执行中
    Completed, // 已完成
    Failed,    // 已失败
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Running => "running",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(OperationStatus::Running),
            "completed" => Some(OperationStatus::Completed),
            "failed" => Some(OperationStatus::Failed),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::Running)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 日志条目状态 (Logbook Entry Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEntryStatus {
    Draft,    // 草稿
    Pending,  // 待审核
    Approved, // 已通过
    Returned, // 退回修改
    Rejected, // 已驳回
}

impl LogEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEntryStatus::Draft => "draft",
            LogEntryStatus::Pending => "pending",
            LogEntryStatus::Approved => "approved",
            LogEntryStatus::Returned => "returned",
            LogEntryStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(LogEntryStatus::Draft),
            "pending" => Some(LogEntryStatus::Pending),
            "approved" => Some(LogEntryStatus::Approved),
            "returned" => Some(LogEntryStatus::Returned),
            "rejected" => Some(LogEntryStatus::Rejected),
            _ => None,
        }
    }

    /// 全部合法取值 (用于错误提示)
    pub fn all() -> [LogEntryStatus; 5] {
        [
            LogEntryStatus::Draft,
            LogEntryStatus::Pending,
            LogEntryStatus::Approved,
            LogEntryStatus::Returned,
            LogEntryStatus::Rejected,
        ]
    }
}

impl fmt::Display for LogEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
