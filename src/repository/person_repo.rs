// ==========================================
// 研究生培训档案系统 - 人员 Repository Trait
// ==========================================
// 职责: 人员记录的查找/过滤/创建/更新
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::person::{NewPerson, PersonFilter, PersonRecord};
use crate::repository::error::RepositoryResult;

// ==========================================
// PersonRepository Trait
// ==========================================
// 实现者: SqliteStore（使用 rusqlite）
pub trait PersonRepository {
    /// 按唯一用户名查找 (区分大小写)
    fn find_person_by_username(&self, username: &str) -> RepositoryResult<Option<PersonRecord>>;

    fn find_person_by_id(&self, id: i64) -> RepositoryResult<Option<PersonRecord>>;

    /// 用户名是否已被占用
    fn username_exists(&self, username: &str) -> RepositoryResult<bool>;

    /// 按谓词过滤, 结果按 id 升序
    fn filter_persons(&self, filter: &PersonFilter) -> RepositoryResult<Vec<PersonRecord>>;

    /// 按谓词取第一条
    fn first_person(&self, filter: &PersonFilter) -> RepositoryResult<Option<PersonRecord>> {
        let limited = filter.clone().limit(1);
        Ok(self.filter_persons(&limited)?.into_iter().next())
    }

    /// 创建人员 (用户名冲突时返回 UniqueConstraintViolation)
    fn create_person(&self, person: &NewPerson) -> RepositoryResult<PersonRecord>;

    /// 覆写可变字段 (按 id)
    fn update_person(&self, person: &PersonRecord) -> RepositoryResult<()>;

    /// 设置口令哈希 (PHC 字符串)
    fn set_password_hash(&self, person_id: i64, hash: &str) -> RepositoryResult<()>;

    fn find_password_hash(&self, person_id: i64) -> RepositoryResult<Option<String>>;

    fn count_persons(&self) -> RepositoryResult<i64>;
}
