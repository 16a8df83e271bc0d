// ==========================================
// 研究生培训档案系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、校验规则
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod ledger;
pub mod log_entry;
pub mod person;
pub mod reference;
pub mod types;

// 重导出核心类型
pub use ledger::{LedgerTransitionError, OperationLedger};
pub use log_entry::{LogEntryRecord, LogEntryValidationError, NewLogEntry};
pub use person::{NewPerson, PersonFilter, PersonRecord, PersonRules, PersonValidationError, Principal};
pub use reference::{Specialty, SpecialtyTable, TrainingYearTable};
pub use types::{LogEntryStatus, OperationKind, OperationStatus, Role};
