// ==========================================
// 研究生培训档案系统 - 配置层
// ==========================================
// 职责: 批量引擎配置管理, 支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod bulk_config;
pub mod bulk_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use bulk_config::BulkConfig;
pub use bulk_config_trait::BulkConfigReader;
pub use config_manager::{config_keys, ConfigManager};
