// ==========================================
// 研究生培训档案系统 - 参考枚举表
// ==========================================
// 职责: 专科 (code, 显示名) 表与培训年级代码表
// 说明: 由外部环境提供, 引擎只读; 表顺序即模糊匹配的优先级
// ==========================================

use serde::{Deserialize, Serialize};

/// 默认专科表 (顺序有意义, 勿排序)
pub const DEFAULT_SPECIALTIES: &[(&str, &str)] = &[
    ("medicine", "Internal Medicine"),
    ("surgery", "Surgery"),
    ("pediatrics", "Pediatrics"),
    ("gynecology", "Gynecology & Obstetrics"),
    ("orthopedics", "Orthopedics"),
    ("cardiology", "Cardiology"),
    ("neurology", "Neurology"),
    ("urology", "Urology"),
    ("psychiatry", "Psychiatry"),
    ("dermatology", "Dermatology"),
    ("radiology", "Radiology"),
    ("anesthesia", "Anesthesia"),
    ("pathology", "Pathology"),
    ("microbiology", "Microbiology"),
    ("pharmacology", "Pharmacology"),
    ("community_medicine", "Community Medicine"),
    ("forensic_medicine", "Forensic Medicine"),
    ("other", "Other"),
];

/// 默认培训年级代码
pub const DEFAULT_TRAINING_YEARS: &[&str] = &["1", "2", "3", "4"];

// ==========================================
// Specialty - 专科条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub code: String,
    pub display_name: String,
}

// ==========================================
// SpecialtyTable - 专科表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtyTable {
    entries: Vec<Specialty>,
}

impl SpecialtyTable {
    pub fn new(entries: Vec<Specialty>) -> Self {
        Self { entries }
    }

    /// 由 (code, 显示名) 对构造
    pub fn from_pairs<S: AsRef<str>>(pairs: &[(S, S)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(code, name)| Specialty {
                    code: code.as_ref().to_string(),
                    display_name: name.as_ref().to_string(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[Specialty] {
        &self.entries
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.entries.iter().any(|s| s.code == code)
    }

    /// 前 n 个显示名 (用于错误提示)
    pub fn display_names(&self, n: usize) -> Vec<&str> {
        self.entries
            .iter()
            .take(n)
            .map(|s| s.display_name.as_str())
            .collect()
    }
}

impl Default for SpecialtyTable {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_SPECIALTIES)
    }
}

// ==========================================
// TrainingYearTable - 培训年级表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingYearTable {
    codes: Vec<String>,
}

impl TrainingYearTable {
    pub fn new(codes: Vec<String>) -> Self {
        Self { codes }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl Default for TrainingYearTable {
    fn default() -> Self {
        Self::new(DEFAULT_TRAINING_YEARS.iter().map(|c| c.to_string()).collect())
    }
}
