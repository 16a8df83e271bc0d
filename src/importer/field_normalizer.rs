// ==========================================
// 研究生培训档案系统 - 字段规范化
// ==========================================
// 职责: 姓名拆分、用户名合成、多格式日期解析、培训年级推断
// 红线: 除用户名查重外均为纯函数, 不访问存储
// ==========================================

use crate::repository::error::RepositoryResult;
use crate::repository::person_repo::PersonRepository;
use chrono::{Datelike, Duration, NaiveDate};
use thiserror::Error;

/// 称谓词表 (大小写不敏感; 短称谓可带句点)
const TITLE_TOKENS: &[&str] = &["dr", "mr", "mrs", "ms", "prof"];
const TITLE_WORDS: &[&str] = &["professor"];

/// 按顺序尝试的日期格式
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%Y.%m.%d",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无法解析日期: '{0}'")]
pub struct DateParseError(pub String);

// ==========================================
// 姓名拆分
// ==========================================

fn is_title(token: &str) -> bool {
    let lower = token.to_lowercase();
    let short = lower.strip_suffix('.').unwrap_or(&lower);
    TITLE_TOKENS.contains(&short) || TITLE_WORDS.contains(&lower.as_str())
}

/// 拆分全名为 (名, 姓)
///
/// 去掉开头称谓 (其后须还有内容); 最后一个词为姓, 其余以单空格连接为名
pub fn split_full_name(raw: &str) -> (String, String) {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() > 1 && is_title(tokens[0]) {
        tokens.remove(0);
    }

    match tokens.split_last() {
        None => (String::new(), String::new()),
        Some((last, [])) => (last.to_string(), String::new()),
        Some((last, rest)) => (rest.join(" "), last.to_string()),
    }
}

// ==========================================
// 用户名合成
// ==========================================

fn clean_name_part(part: &str) -> String {
    part.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// 基础用户名 (不查重): first.last / 单侧 / 兜底词
pub fn base_username(first: &str, last: &str, fallback: &str) -> String {
    let first = clean_name_part(first);
    let last = clean_name_part(last);
    match (first.is_empty(), last.is_empty()) {
        (true, true) => fallback.to_string(),
        (false, true) => first,
        (true, false) => last,
        (false, false) => format!("{}.{}", first, last),
    }
}

/// 在 base 后追加 1, 2, 3… 直到存储中不存在
///
/// 查重与后续创建之间不是原子的; 并发导入撞名时由唯一约束拒绝
pub fn first_free_username<R>(repo: &R, base: &str) -> RepositoryResult<String>
where
    R: PersonRepository + ?Sized,
{
    let mut candidate = base.to_string();
    let mut counter = 1u32;
    while repo.username_exists(&candidate)? {
        candidate = format!("{}{}", base, counter);
        counter += 1;
    }
    Ok(candidate)
}

/// 合成不与现有记录冲突的用户名
pub fn synthesize_username<R>(
    repo: &R,
    first: &str,
    last: &str,
    fallback: &str,
) -> RepositoryResult<String>
where
    R: PersonRepository + ?Sized,
{
    first_free_username(repo, &base_username(first, last, fallback))
}

// ==========================================
// 日期解析
// ==========================================

/// 表格序列号 → 日期 (序列号 0 = 1899-12-30)
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc();
    if days.abs() > 3_000_000.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(days as i64))
}

/// 依次尝试固定格式, 全部失败再按表格序列号解析
pub fn parse_flexible_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DateParseError(raw.to_string()));
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(date);
        }
    }

    value
        .parse::<f64>()
        .ok()
        .and_then(excel_serial_to_date)
        .ok_or_else(|| DateParseError(raw.to_string()))
}

// ==========================================
// 培训年级推断
// ==========================================

/// 按入职至今的整月数分档: [0,12)→1, [12,24)→2, [24,36)→3, 36+→4
///
/// 入职日期晚于 today 时返回 "1"
pub fn infer_training_year(date_joined: NaiveDate, today: NaiveDate) -> &'static str {
    if date_joined > today {
        return "1";
    }
    let months = (today.year() - date_joined.year()) * 12
        + (today.month() as i32 - date_joined.month() as i32);
    match months {
        m if m < 12 => "1",
        m if m < 24 => "2",
        m if m < 36 => "3",
        _ => "4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::person::NewPerson;
    use crate::domain::types::Role;
    use crate::repository::{PersonRepository, SqliteStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(
            split_full_name("Dr. Ali Khan"),
            ("Ali".to_string(), "Khan".to_string())
        );
        assert_eq!(
            split_full_name("  Muhammad   Ali  Raza "),
            ("Muhammad Ali".to_string(), "Raza".to_string())
        );
        assert_eq!(
            split_full_name("PROFESSOR Sara Ahmed"),
            ("Sara".to_string(), "Ahmed".to_string())
        );
        assert_eq!(split_full_name("Madonna"), ("Madonna".to_string(), String::new()));
        assert_eq!(split_full_name("   "), (String::new(), String::new()));
        // 称谓后无内容时不剥离
        assert_eq!(split_full_name("Dr."), ("Dr.".to_string(), String::new()));
        // 非称谓前缀保留
        assert_eq!(
            split_full_name("Drake Bell"),
            ("Drake".to_string(), "Bell".to_string())
        );
    }

    #[test]
    fn test_split_full_name_surname_is_last_token() {
        for name in ["A B", "A B C", "Mrs X Y Z W"] {
            let tokens: Vec<&str> = name.split_whitespace().collect();
            let (first, last) = split_full_name(name);
            assert_eq!(last, *tokens.last().unwrap());
            assert!(!first.is_empty());
        }
    }

    #[test]
    fn test_base_username() {
        assert_eq!(base_username("Ali", "Khan", "trainee"), "ali.khan");
        assert_eq!(base_username("Muhammad Ali", "O'Neil", "trainee"), "muhammadali.oneil");
        assert_eq!(base_username("Ali", "", "trainee"), "ali");
        assert_eq!(base_username("", "Khan", "trainee"), "khan");
        assert_eq!(base_username("Ñ", "—", "trainee"), "trainee");
    }

    #[test]
    fn test_synthesize_username_probes_suffixes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = synthesize_username(&store, "Ali", "Khan", "trainee").unwrap();
        assert_eq!(first, "ali.khan");
        // 存储未变时结果稳定
        assert_eq!(synthesize_username(&store, "Ali", "Khan", "trainee").unwrap(), first);

        for username in ["ali.khan", "ali.khan1"] {
            store
                .create_person(&NewPerson {
                    username: username.to_string(),
                    email: format!("{}@pmc.edu.pk", username),
                    first_name: "Ali".to_string(),
                    last_name: "Khan".to_string(),
                    role: Role::Admin,
                    specialty: None,
                    year: None,
                    supervisor_id: None,
                    registration_number: None,
                    phone_number: None,
                    date_joined: date(2024, 1, 1),
                    is_active: true,
                    created_by: None,
                })
                .unwrap();
        }
        let probed = synthesize_username(&store, "Ali", "Khan", "trainee").unwrap();
        assert_eq!(probed, "ali.khan2");
        assert!(!store.username_exists(&probed).unwrap());
    }

    #[test]
    fn test_parse_flexible_date_equivalent_forms() {
        let expected = date(2024, 1, 15);
        assert_eq!(parse_flexible_date("2024-01-15").unwrap(), expected);
        assert_eq!(parse_flexible_date("15/01/2024").unwrap(), expected);
        assert_eq!(parse_flexible_date("15.01.2024").unwrap(), expected);
        assert_eq!(parse_flexible_date("15-01-2024").unwrap(), expected);
        assert_eq!(parse_flexible_date("2024/01/15").unwrap(), expected);
        // 日/月优先于月/日
        assert_eq!(parse_flexible_date("03/04/2024").unwrap(), date(2024, 4, 3));
        assert_eq!(parse_flexible_date("12/31/2024").unwrap(), date(2024, 12, 31));
    }

    #[test]
    fn test_parse_flexible_date_serial_fallback() {
        assert_eq!(parse_flexible_date("45306").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_flexible_date("45306.75").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_flexible_date("0").unwrap(), date(1899, 12, 30));
        assert!(parse_flexible_date("not a date").is_err());
        assert!(parse_flexible_date("").is_err());
        assert!(parse_flexible_date("NaN").is_err());
        assert!(parse_flexible_date("1e300").is_err());
    }

    #[test]
    fn test_infer_training_year_bands() {
        let today = date(2026, 10, 19);
        assert_eq!(infer_training_year(today, today), "1");
        assert_eq!(infer_training_year(today - Duration::days(400), today), "2");
        assert_eq!(infer_training_year(today - Duration::days(800), today), "3");
        assert_eq!(infer_training_year(today - Duration::days(1200), today), "4");
        assert_eq!(infer_training_year(date(2025, 10, 20), today), "2");
        assert_eq!(infer_training_year(date(2025, 11, 1), today), "1");
        assert_eq!(infer_training_year(today + Duration::days(30), today), "1");
    }
}
