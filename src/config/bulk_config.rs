// ==========================================
// 研究生培训档案系统 - 批量引擎配置快照
// ==========================================
// 职责: 一次调用期间不可变的配置集合
// ==========================================

use crate::config::bulk_config_trait::BulkConfigReader;
use crate::domain::reference::{SpecialtyTable, TrainingYearTable};
use std::error::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_EMAIL_DOMAIN: &str = "pmc.edu.pk";
pub const DEFAULT_SPECIALTY: &str = "urology";
pub const DEFAULT_USERNAME_FALLBACK: &str = "trainee";
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19_456;
pub const DEFAULT_HASH_ITERATIONS: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct BulkConfig {
    pub chunk_size: usize,
    pub email_domain: String,
    pub default_specialty: String,
    pub username_fallback: String,
    pub reset_password_on_update: bool,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub specialties: SpecialtyTable,
    pub training_years: TrainingYearTable,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            default_specialty: DEFAULT_SPECIALTY.to_string(),
            username_fallback: DEFAULT_USERNAME_FALLBACK.to_string(),
            reset_password_on_update: true,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            specialties: SpecialtyTable::default(),
            training_years: TrainingYearTable::default(),
        }
    }
}

impl BulkConfig {
    /// 从配置源加载快照
    pub fn load(reader: &dyn BulkConfigReader) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            chunk_size: reader.get_chunk_size()?.max(1),
            email_domain: reader.get_email_domain()?,
            default_specialty: reader.get_default_specialty()?,
            username_fallback: reader.get_username_fallback()?,
            reset_password_on_update: reader.get_reset_password_on_update()?,
            hash_memory_kib: reader.get_hash_memory_kib()?,
            hash_iterations: reader.get_hash_iterations()?.max(1),
            specialties: reader.get_specialty_table()?,
            training_years: reader.get_training_year_codes()?,
        })
    }

    /// 角色邮箱: {username}.{suffix}@{domain}
    pub fn role_email(&self, username: &str, suffix: &str) -> String {
        format!("{}.{}@{}", username, suffix, self.email_domain)
    }
}
