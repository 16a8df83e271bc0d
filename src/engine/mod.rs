// ==========================================
// 研究生培训档案系统 - 引擎层
// ==========================================
// 职责: 批量审核 / 批量指派 / 表格导入的编排
// 红线: 引擎不拼 SQL; 每次调用必须留下定稿的台账
// ==========================================

pub mod accumulator;
pub mod bulk_service;
pub mod error;

// 重导出核心引擎
pub use accumulator::{BulkAccumulator, RowError, RowErrorKind, RowOutput};
pub use bulk_service::{BulkService, ImportOptions};
pub use error::{BulkError, BulkResult};
