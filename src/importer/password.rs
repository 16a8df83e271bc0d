// ==========================================
// 研究生培训档案系统 - 初始口令生成与哈希
// ==========================================
// 职责:
// - 确定性首登口令 (可预测, 仅用于首次登录)
// - 安全随机口令 (OsRng)
// - Argon2id PHC 哈希 (存储只保存哈希)
// ==========================================

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// 随机口令最小长度
pub const MIN_SECURE_PASSWORD_LEN: usize = 12;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
pub const SYMBOLS: &[u8] = b"!@#$%^&*";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("口令哈希参数无效: {0}")]
    InvalidParams(String),

    #[error("口令哈希失败: {0}")]
    HashFailed(String),
}

/// 确定性口令: `{username}@{year}!`, 无年级时 `{username}@123!`
pub fn generate_deterministic_password(username: &str, year: Option<&str>) -> String {
    match year.filter(|y| !y.is_empty()) {
        Some(year) => format!("{}@{}!", username, year),
        None => format!("{}@123!", username),
    }
}

/// 随机口令: 至少含小写/大写/数字/符号各一, 长度不少于 12
pub fn generate_secure_password(length: usize) -> String {
    let length = length.max(MIN_SECURE_PASSWORD_LEN);
    let mut rng = rand::rngs::OsRng;

    let mut chars: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS]
        .iter()
        .map(|set| set[rng.gen_range(0..set.len())])
        .collect();

    let alphabet: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
    while chars.len() < length {
        chars.push(alphabet[rng.gen_range(0..alphabet.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

// ==========================================
// CredentialHasher - Argon2id
// ==========================================
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// memory_kib / iterations 来自配置; 并行度固定为 1
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// 生成 PHC 字符串
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashFailed(e.to_string()))?;
        Ok(hash.to_string())
    }

    pub fn verify(&self, password: &str, phc: &str) -> bool {
        match PasswordHash::new(phc) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
