// ==========================================
// 研究生培训档案系统 - 实体解析器
// ==========================================
// 职责:
// - 专科自由文本 → 专科代码 (表顺序优先)
// - 导师名称/用户名 → 已有导师, 查不到则创建
// 说明: 创建失败不向上抛出, 以 SupervisorOutcome::Failed 返回并记录 warn
// ==========================================

use crate::config::BulkConfig;
use crate::domain::person::{NewPerson, PersonFilter, PersonRecord};
use crate::domain::reference::SpecialtyTable;
use crate::domain::types::Role;
use crate::importer::field_normalizer::{base_username, first_free_username, split_full_name};
use crate::importer::password::{
    generate_deterministic_password, generate_secure_password, CredentialHasher,
    MIN_SECURE_PASSWORD_LEN,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::person_repo::PersonRepository;
use crate::repository::unit_of_work::UnitOfWork;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

// ==========================================
// 专科匹配
// ==========================================

/// 自由文本 → 专科代码
///
/// 规则 (任一命中即返回该条目, 按表顺序):
/// 代码精确匹配 / 显示名精确匹配 / 输入包含于显示名 / 显示名包含于输入
pub fn match_specialty(table: &SpecialtyTable, text: &str) -> Option<String> {
    let raw = text.trim().to_lowercase();
    if raw.is_empty() {
        return None;
    }
    let normalized = raw.replace(' ', "_");

    table
        .entries()
        .iter()
        .find(|entry| {
            let display = entry.display_name.to_lowercase();
            normalized == entry.code.to_lowercase()
                || raw == display
                || display.contains(&normalized)
                || normalized.contains(&display)
        })
        .map(|entry| entry.code.clone())
}

// ==========================================
// SupervisorOutcome - 导师解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorOutcome {
    /// 未提供导师名称
    NotGiven,
    /// 命中已有导师
    Existing(PersonRecord),
    /// 新建导师 (附首登口令明文, 仅用于回显)
    Created {
        person: PersonRecord,
        password: String,
    },
    /// 创建失败
    Failed(String),
}

impl SupervisorOutcome {
    pub fn person(&self) -> Option<&PersonRecord> {
        match self {
            SupervisorOutcome::Existing(person) => Some(person),
            SupervisorOutcome::Created { person, .. } => Some(person),
            SupervisorOutcome::NotGiven | SupervisorOutcome::Failed(_) => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SupervisorOutcome::Created { .. })
    }
}

// ==========================================
// EntityResolver
// ==========================================
pub struct EntityResolver<'a, R: ?Sized> {
    repo: &'a R,
    config: &'a BulkConfig,
    hasher: &'a CredentialHasher,
    actor_id: i64,
    today: NaiveDate,
    /// true: 确定性口令; false: 随机口令
    deterministic_passwords: bool,
}

impl<'a, R> EntityResolver<'a, R>
where
    R: PersonRepository + UnitOfWork + ?Sized,
{
    pub fn new(
        repo: &'a R,
        config: &'a BulkConfig,
        hasher: &'a CredentialHasher,
        actor_id: i64,
        today: NaiveDate,
        deterministic_passwords: bool,
    ) -> Self {
        Self {
            repo,
            config,
            hasher,
            actor_id,
            today,
            deterministic_passwords,
        }
    }

    pub fn match_specialty(&self, text: &str) -> Option<String> {
        match_specialty(&self.config.specialties, text)
    }

    /// 按用户名查导师 (大小写不敏感)
    pub fn find_supervisor_by_username(&self, username: &str) -> RepositoryResult<Option<PersonRecord>> {
        self.repo
            .first_person(&PersonFilter::with_role(Role::Supervisor).username(username))
    }

    /// 仅查找, 不创建
    pub fn find_supervisor(&self, name_or_username: &str) -> RepositoryResult<Option<PersonRecord>> {
        let input = name_or_username.trim();
        if input.is_empty() {
            return Ok(None);
        }
        let (first, last) = split_full_name(input);

        if !first.is_empty() && !last.is_empty() {
            let filter = PersonFilter::with_role(Role::Supervisor)
                .first_name(first.as_str())
                .last_name(last.as_str());
            if let Some(found) = self.repo.first_person(&filter)? {
                return Ok(Some(found));
            }
        }

        // 单字段录入: 整个输入存于 first_name
        let filter = PersonFilter::with_role(Role::Supervisor).first_name(input);
        if let Some(found) = self.repo.first_person(&filter)? {
            return Ok(Some(found));
        }

        if !input.contains(' ') || input.contains('.') {
            return self.find_supervisor_by_username(input);
        }
        Ok(None)
    }

    /// 查找导师, 查不到则创建
    ///
    /// specialty 为专科代码; 缺失或不在表中时使用默认专科
    pub fn resolve_or_create_supervisor(
        &self,
        name_or_username: &str,
        specialty: Option<&str>,
    ) -> SupervisorOutcome {
        let input = name_or_username.trim();
        if input.is_empty() {
            return SupervisorOutcome::NotGiven;
        }

        match self.find_supervisor(input) {
            Ok(Some(found)) => {
                debug!(supervisor = %found.username, input, "命中已有导师");
                return SupervisorOutcome::Existing(found);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(input, error = %e, "导师查找失败");
                return SupervisorOutcome::Failed(e.to_string());
            }
        }

        let specialty = specialty
            .filter(|code| self.config.specialties.contains_code(code))
            .unwrap_or(self.config.default_specialty.as_str())
            .to_string();

        match self
            .repo
            .atomic(|| self.create_supervisor(input, specialty))
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(input, error = %e, "导师创建失败");
                SupervisorOutcome::Failed(e.to_string())
            }
        }
    }

    fn create_supervisor(&self, input: &str, specialty: String) -> RepositoryResult<SupervisorOutcome> {
        let (first, last) = split_full_name(input);
        let base = base_username(&first, &last, &self.config.username_fallback);

        let username = match self.repo.find_person_by_username(&base)? {
            Some(existing) if existing.role == Role::Supervisor => {
                return Ok(SupervisorOutcome::Existing(existing));
            }
            Some(_) => first_free_username(self.repo, &base)?,
            None => base,
        };

        let draft = NewPerson {
            email: self.config.role_email(&username, "supervisor"),
            first_name: if first.is_empty() { input.to_string() } else { first },
            last_name: last,
            role: Role::Supervisor,
            specialty: Some(specialty),
            year: None,
            supervisor_id: None,
            registration_number: None,
            phone_number: None,
            date_joined: self.today,
            is_active: true,
            created_by: Some(self.actor_id),
            username,
        };
        let person = self.repo.create_person(&draft)?;

        let password = if self.deterministic_passwords {
            generate_deterministic_password(&person.username, None)
        } else {
            generate_secure_password(MIN_SECURE_PASSWORD_LEN)
        };
        let hash = self
            .hasher
            .hash(&password)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        self.repo.set_password_hash(person.id, &hash)?;

        info!(supervisor = %person.username, "已创建导师");
        Ok(SupervisorOutcome::Created { person, password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(64, 1).unwrap()
    }

    fn person(username: &str, first: &str, last: &str, role: Role) -> NewPerson {
        NewPerson {
            username: username.to_string(),
            email: format!("{}@pmc.edu.pk", username),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role,
            specialty: Some("surgery".to_string()),
            year: None,
            supervisor_id: None,
            registration_number: None,
            phone_number: None,
            date_joined: today(),
            is_active: true,
            created_by: None,
        }
    }

    #[test]
    fn test_match_specialty_pins_table_order() {
        let table = SpecialtyTable::default();
        let cases = [
            ("medicine", "medicine"),
            ("Internal Medicine", "medicine"),
            ("General Surgery", "surgery"),
            ("Community Medicine", "community_medicine"),
            ("ortho", "orthopedics"),
            // 子串命中更靠前的 neurology
            ("Uro", "neurology"),
            ("a", "medicine"),
            ("Gynecology", "gynecology"),
            ("Radiology", "radiology"),
            ("forensic medicine", "forensic_medicine"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                match_specialty(&table, input).as_deref(),
                Some(expected),
                "input: {input}"
            );
        }
        assert_eq!(match_specialty(&table, "Astrophysics"), None);
        assert_eq!(match_specialty(&table, "   "), None);
    }

    #[test]
    fn test_resolver_creates_then_reuses_supervisor() {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = BulkConfig::default();
        let hasher = hasher();
        let resolver = EntityResolver::new(&store, &config, &hasher, 1, today(), true);

        let created = resolver.resolve_or_create_supervisor("Dr. Ali Khan", None);
        let (person, password) = match created {
            SupervisorOutcome::Created { person, password } => (person, password),
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(person.username, "ali.khan");
        assert_eq!(person.email, "ali.khan.supervisor@pmc.edu.pk");
        assert_eq!(person.specialty.as_deref(), Some("urology"));
        assert_eq!(password, "ali.khan@123!");
        let phc = store.find_password_hash(person.id).unwrap().unwrap();
        assert!(hasher.verify(&password, &phc));

        let again = resolver.resolve_or_create_supervisor("ali khan", Some("surgery"));
        assert_eq!(again.person().map(|p| p.id), Some(person.id));
        assert!(!again.is_created());
        assert_eq!(store.count_persons().unwrap(), 1);
    }

    #[test]
    fn test_resolver_lookup_by_first_name_and_username() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .create_person(&person("prof.iqbal", "Iqbal Hussain", "", Role::Supervisor))
            .unwrap();
        let config = BulkConfig::default();
        let hasher = hasher();
        let resolver = EntityResolver::new(&store, &config, &hasher, 1, today(), true);

        let by_first = resolver.find_supervisor("iqbal hussain").unwrap();
        assert_eq!(by_first.map(|p| p.username), Some("prof.iqbal".to_string()));

        let by_username = resolver.find_supervisor("PROF.IQBAL").unwrap();
        assert_eq!(by_username.map(|p| p.username), Some("prof.iqbal".to_string()));

        assert_eq!(resolver.resolve_or_create_supervisor("  ", None), SupervisorOutcome::NotGiven);
    }

    #[test]
    fn test_resolver_suffixes_username_held_by_other_role() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .create_person(&person("sara.ahmed", "Sara", "Ahmed", Role::Admin))
            .unwrap();
        let config = BulkConfig::default();
        let hasher = hasher();
        let resolver = EntityResolver::new(&store, &config, &hasher, 1, today(), false);

        let outcome = resolver.resolve_or_create_supervisor("Sara Ahmed", Some("cardiology"));
        let created = outcome.person().unwrap();
        assert_eq!(created.username, "sara.ahmed1");
        assert_eq!(created.email, "sara.ahmed1.supervisor@pmc.edu.pk");
        assert_eq!(created.specialty.as_deref(), Some("cardiology"));
        match outcome {
            SupervisorOutcome::Created { password, .. } => {
                assert!(password.len() >= MIN_SECURE_PASSWORD_LEN)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_resolver_invalid_specialty_falls_back_to_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = BulkConfig::default();
        let hasher = hasher();
        let resolver = EntityResolver::new(&store, &config, &hasher, 1, today(), true);

        let outcome = resolver.resolve_or_create_supervisor("Madonna", Some("astrology"));
        let created = outcome.person().unwrap();
        assert_eq!(created.username, "madonna");
        assert_eq!(created.first_name, "Madonna");
        assert_eq!(created.specialty.as_deref(), Some("urology"));
    }
}
