// ==========================================
// 研究生培训档案系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::bulk_config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_EMAIL_DOMAIN, DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB,
    DEFAULT_SPECIALTY, DEFAULT_USERNAME_FALLBACK,
};
use crate::config::bulk_config_trait::BulkConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::reference::{SpecialtyTable, TrainingYearTable};
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置, 无法解析时告警并回退默认值
    fn get_number_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: std::str::FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key, value = %raw, default = %default, "配置值无法解析, 使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

// ==========================================
// BulkConfigReader 实现
// ==========================================
impl BulkConfigReader for ConfigManager {
    fn get_chunk_size(&self) -> Result<usize, Box<dyn Error>> {
        self.get_number_or_default(config_keys::CHUNK_SIZE, DEFAULT_CHUNK_SIZE)
    }

    fn get_email_domain(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::EMAIL_DOMAIN, DEFAULT_EMAIL_DOMAIN)
    }

    fn get_default_specialty(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::DEFAULT_SPECIALTY, DEFAULT_SPECIALTY)
    }

    fn get_username_fallback(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::USERNAME_FALLBACK, DEFAULT_USERNAME_FALLBACK)
    }

    fn get_reset_password_on_update(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::RESET_PASSWORD_ON_UPDATE, "true")?;
        Ok(!matches!(
            value.trim().to_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        ))
    }

    fn get_hash_memory_kib(&self) -> Result<u32, Box<dyn Error>> {
        self.get_number_or_default(config_keys::HASH_MEMORY_KIB, DEFAULT_HASH_MEMORY_KIB)
    }

    fn get_hash_iterations(&self) -> Result<u32, Box<dyn Error>> {
        self.get_number_or_default(config_keys::HASH_ITERATIONS, DEFAULT_HASH_ITERATIONS)
    }

    fn get_specialty_table(&self) -> Result<SpecialtyTable, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::SPECIALTY_TABLE)? {
            Some(v) => v,
            None => return Ok(SpecialtyTable::default()),
        };
        let pairs: Vec<(String, String)> = serde_json::from_str(&raw)?;
        if pairs.is_empty() {
            return Ok(SpecialtyTable::default());
        }
        Ok(SpecialtyTable::from_pairs(&pairs))
    }

    fn get_training_year_codes(&self) -> Result<TrainingYearTable, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::TRAINING_YEAR_CODES, "1,2,3,4")?;
        let codes: Vec<String> = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if codes.is_empty() {
            Ok(TrainingYearTable::default())
        } else {
            Ok(TrainingYearTable::new(codes))
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 执行参数
    pub const CHUNK_SIZE: &str = "bulk_chunk_size";

    // 账号合成
    pub const EMAIL_DOMAIN: &str = "bulk_email_domain";
    pub const DEFAULT_SPECIALTY: &str = "bulk_default_specialty";
    pub const USERNAME_FALLBACK: &str = "bulk_username_fallback";
    pub const RESET_PASSWORD_ON_UPDATE: &str = "bulk_reset_password_on_update";

    // 口令哈希成本
    pub const HASH_MEMORY_KIB: &str = "password_hash_memory_kib";
    pub const HASH_ITERATIONS: &str = "password_hash_iterations";

    // 参考枚举表
    pub const SPECIALTY_TABLE: &str = "specialty_table"; // JSON: [[code, display], ...]
    pub const TRAINING_YEAR_CODES: &str = "training_year_codes";
}
