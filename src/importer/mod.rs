// ==========================================
// 研究生培训档案系统 - 导入层
// ==========================================
// 职责: 表格解析、字段规范化、实体解析、凭据生成
// 支持: CSV, Excel (.xlsx/.xls)
// ==========================================

// 模块声明
pub mod entity_resolver;
pub mod error;
pub mod field_normalizer;
pub mod file_parser;
pub mod password;
pub mod row_adapter;
pub mod trainee_preview;
pub mod trainee_template;

// 重导出核心类型
pub use entity_resolver::{match_specialty, EntityResolver, SupervisorOutcome};
pub use error::{ImportError, ImportResult};
pub use field_normalizer::{
    infer_training_year, parse_flexible_date, split_full_name, synthesize_username,
    DateParseError,
};
pub use file_parser::{FileKind, HeaderMode, Row, TabularRowReader, UploadedFile};
pub use password::{
    generate_deterministic_password, generate_secure_password, CredentialHasher, PasswordError,
};
pub use row_adapter::{LogbookRow, RosterRow, TraineeRow};
pub use trainee_preview::{preview_trainees, TraineePreview};
pub use trainee_template::{convert_to_trainee_format, generate_trainee_template};
