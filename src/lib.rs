// ==========================================
// 研究生培训档案系统 - 批量操作核心库
// ==========================================
// 技术栈: Rust + SQLite
// 能力: 批量审核 / 批量指派导师 / 名册与日志表格导入
// 每次调用留下一条批量操作台账
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 批量编排
pub mod engine;

// 导入层 - 表格解析与实体解析
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LogEntryStatus, OperationKind, OperationStatus, Role};

// 领域实体
pub use domain::{
    LogEntryRecord, NewLogEntry, NewPerson, OperationLedger, PersonRecord, Principal,
    SpecialtyTable, TrainingYearTable,
};

// 引擎
pub use engine::{BulkError, BulkResult, BulkService, ImportOptions, RowError, RowErrorKind};

// 导入
pub use importer::{ImportError, UploadedFile};

// 存储
pub use repository::{BulkRepository, SqliteStore};

// 配置
pub use config::{BulkConfig, ConfigManager};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "研究生培训档案系统 - 批量操作引擎";
