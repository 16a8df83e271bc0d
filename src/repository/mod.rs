// ==========================================
// 研究生培训档案系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod ledger_repo;
pub mod log_entry_repo;
pub mod person_repo;
pub mod sqlite_store;
pub mod unit_of_work;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use ledger_repo::OperationLedgerRepository;
pub use log_entry_repo::LogEntryRepository;
pub use person_repo::PersonRepository;
pub use sqlite_store::SqliteStore;
pub use unit_of_work::UnitOfWork;

/// 批量引擎所需的全部仓储能力
pub trait BulkRepository:
    PersonRepository + LogEntryRepository + OperationLedgerRepository + UnitOfWork
{
}

impl<T> BulkRepository for T where
    T: PersonRepository + LogEntryRepository + OperationLedgerRepository + UnitOfWork
{
}
