// ==========================================
// 研究生培训档案系统 - 批量引擎配置读取 Trait
// ==========================================
// 职责: 定义批量引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::reference::{SpecialtyTable, TrainingYearTable};
use std::error::Error;

// ==========================================
// BulkConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait BulkConfigReader {
    // ===== 执行参数 =====

    /// 审核/指派操作的分块大小
    ///
    /// # 默认值
    /// - 50
    fn get_chunk_size(&self) -> Result<usize, Box<dyn Error>>;

    // ===== 账号合成 =====

    /// 合成邮箱所用的域名
    ///
    /// # 默认值
    /// - pmc.edu.pk
    fn get_email_domain(&self) -> Result<String, Box<dyn Error>>;

    /// 专科缺失/无效时的兜底专科代码
    ///
    /// # 默认值
    /// - urology
    fn get_default_specialty(&self) -> Result<String, Box<dyn Error>>;

    /// 姓名清洗后为空时使用的用户名
    ///
    /// # 默认值
    /// - trainee
    fn get_username_fallback(&self) -> Result<String, Box<dyn Error>>;

    /// 导入更新已有账号时是否重置口令
    ///
    /// # 默认值
    /// - true
    fn get_reset_password_on_update(&self) -> Result<bool, Box<dyn Error>>;

    // ===== 口令哈希成本 =====

    /// Argon2 内存成本 (KiB), 默认 19456
    fn get_hash_memory_kib(&self) -> Result<u32, Box<dyn Error>>;

    /// Argon2 迭代次数, 默认 2
    fn get_hash_iterations(&self) -> Result<u32, Box<dyn Error>>;

    // ===== 参考枚举表 =====

    /// 专科表 (JSON: [[code, display], ...]), 缺省为内置表
    fn get_specialty_table(&self) -> Result<SpecialtyTable, Box<dyn Error>>;

    /// 培训年级代码 (逗号分隔), 缺省为 1,2,3,4
    fn get_training_year_codes(&self) -> Result<TrainingYearTable, Box<dyn Error>>;
}
