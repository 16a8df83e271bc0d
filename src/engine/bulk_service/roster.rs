// ==========================================
// 名册导入: 导师 / 研究生 / 旧版学员表
// ==========================================
// 单行处理顺序:
// 必填检查 → 代码/格式校验 → 姓名拆分 → 用户名合成 → 邮箱合成
// → 导师解析 → 试运行校验 或 创建/更新
// ==========================================

use super::{BulkService, ImportOptions};
use crate::domain::ledger::OperationLedger;
use crate::domain::person::{NewPerson, PersonFilter, PersonRecord, PersonRules};
use crate::domain::types::Role;
use crate::engine::accumulator::{RowError, RowOutput};
use crate::engine::error::BulkResult;
use crate::importer::entity_resolver::{match_specialty, EntityResolver, SupervisorOutcome};
use crate::importer::field_normalizer::{
    infer_training_year, parse_flexible_date, split_full_name, synthesize_username,
};
use crate::importer::file_parser::{HeaderMode, Row, UploadedFile};
use crate::importer::row_adapter::{read_rows, read_trainee_rows, RosterRow, TraineeRow};
use crate::repository::BulkRepository;
use chrono::NaiveDate;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, instrument};

/// 侧列表: 未关联导师的研究生
const UNLINKED_RESIDENTS: &str = "unlinked_residents";
/// 侧列表: 导入过程中新建的导师
const CREATED_SUPERVISORS: &str = "created_supervisors";

const UNLINKED_WARNING: &str = "Created without supervisor - will need manual linking";

/// 专科错误提示中列出的显示名个数
const SPECIALTY_HINT_COUNT: usize = 5;

impl<R: BulkRepository> BulkService<R> {
    // ==========================================
    // 导师名册
    // ==========================================

    #[instrument(skip(self, file), fields(actor = %self.actor.username, file = %file.name))]
    pub fn import_supervisors(
        &self,
        file: &UploadedFile,
        options: ImportOptions,
    ) -> BulkResult<OperationLedger> {
        self.run_import(
            options,
            &[],
            || read_rows(file, HeaderMode::Normalized, &[]),
            |row: &Row| self.process_supervisor_row(&RosterRow::from_row(row), &options),
        )
    }

    fn process_supervisor_row(
        &self,
        row: &RosterRow,
        options: &ImportOptions,
    ) -> Result<RowOutput, RowError> {
        if row.name.is_empty() {
            return Err(RowError::missing_field(
                "Missing 'Name' (or 'First Name' + 'Last Name')",
            ));
        }
        let specialty = self.resolve_specialty(&row.specialty)?;

        let (first, last) = split_full_name(&row.name);
        let username = self.row_username(&row.username, &first, &last)?;
        let email = non_empty(&row.email)
            .unwrap_or_else(|| self.config.role_email(&username, "supervisor"));
        let password = self.initial_password(options, &username, None);

        let draft = NewPerson {
            username: username.clone(),
            email: email.clone(),
            first_name: first,
            last_name: last,
            role: Role::Supervisor,
            specialty: Some(specialty.clone()),
            year: None,
            supervisor_id: None,
            registration_number: non_empty(&row.registration_number),
            phone_number: non_empty(&row.phone),
            date_joined: self.today,
            is_active: true,
            created_by: Some(self.actor.id),
        };
        self.persist_person(draft, &password, options, false)?;

        Ok(RowOutput::new(json!({
            "row": row.row_number,
            "username": username,
            "name": row.name,
            "email": email,
            "specialty": specialty,
            "password": self.echo_password(options, &password),
            "department": non_empty(&row.department),
        })))
    }

    // ==========================================
    // 研究生名册
    // ==========================================

    #[instrument(skip(self, file), fields(actor = %self.actor.username, file = %file.name))]
    pub fn import_residents(
        &self,
        file: &UploadedFile,
        options: ImportOptions,
    ) -> BulkResult<OperationLedger> {
        let resolver = self.resolver(&options);
        self.run_import(
            options,
            &[UNLINKED_RESIDENTS],
            || read_rows(file, HeaderMode::Normalized, &[]),
            |row: &Row| self.process_resident_row(&RosterRow::from_row(row), &options, &resolver),
        )
    }

    fn process_resident_row(
        &self,
        row: &RosterRow,
        options: &ImportOptions,
        resolver: &EntityResolver<'_, R>,
    ) -> Result<RowOutput, RowError> {
        if row.name.is_empty() {
            return Err(RowError::missing_field(
                "Missing 'Name' (or 'First Name' + 'Last Name')",
            ));
        }
        if row.year.is_empty() {
            return Err(RowError::missing_field("Missing 'Year'"));
        }
        if !self.config.training_years.contains(&row.year) {
            return Err(RowError::invalid_enum(format!(
                "Invalid year '{}' (expected one of: {})",
                row.year,
                self.config.training_years.codes().join(", ")
            )));
        }
        let specialty = self.resolve_specialty(&row.specialty)?;

        let mut warnings = Vec::new();
        let date_joined = if row.date_joining.is_empty() {
            self.today
        } else {
            match parse_flexible_date(&row.date_joining) {
                Ok(date) => date,
                Err(e) if options.allow_partial => {
                    warnings.push(RowError::invalid_date(format!("{}; using today's date", e)));
                    self.today
                }
                Err(e) => return Err(RowError::invalid_date(e.to_string())),
            }
        };

        let resolved = if !row.supervisor_username.is_empty() {
            resolver
                .find_supervisor_by_username(&row.supervisor_username)?
                .ok_or_else(|| {
                    RowError::unresolvable_supervisor(format!(
                        "Supervisor username '{}' not found",
                        row.supervisor_username
                    ))
                })
        } else if !row.supervisor_name.is_empty() {
            resolver
                .resolve_or_create_supervisor(&row.supervisor_name, Some(&specialty))
                .person()
                .cloned()
                .ok_or_else(|| {
                    RowError::unresolvable_supervisor(format!(
                        "Could not create/find supervisor '{}'",
                        row.supervisor_name
                    ))
                })
        } else {
            Err(RowError::missing_field(
                "Missing supervisor (provide 'supervisor_name' or 'supervisor_username')",
            ))
        };
        let supervisor = soften(resolved, options, &mut warnings)?;

        let (first, last) = split_full_name(&row.name);
        let username = self.row_username(&row.username, &first, &last)?;
        let email = non_empty(&row.email).unwrap_or_else(|| self.config.role_email(&username, "pgr"));
        let password = self.initial_password(options, &username, Some(&row.year));

        let draft = NewPerson {
            username: username.clone(),
            email: email.clone(),
            first_name: first,
            last_name: last,
            role: Role::Pg,
            specialty: Some(specialty.clone()),
            year: Some(row.year.clone()),
            supervisor_id: supervisor.as_ref().map(|s| s.id),
            registration_number: non_empty(&row.registration_number),
            phone_number: non_empty(&row.phone),
            date_joined,
            is_active: true,
            created_by: Some(self.actor.id),
        };
        self.persist_person(draft, &password, options, false)?;

        let mut success = json!({
            "row": row.row_number,
            "username": username,
            "name": row.name,
            "email": email,
            "specialty": specialty,
            "year": row.year,
            "supervisor": supervisor.as_ref().map(|s| s.username.clone()),
            "password": self.echo_password(options, &password),
        });
        let unlinked =
            self.finish_pg_row(row.row_number, &row.name, &username, &mut success, supervisor.as_ref());

        let mut output = RowOutput::new(success).with_warnings(warnings);
        if let Some(side) = unlinked {
            output = output.with_side(UNLINKED_RESIDENTS, side);
        }
        Ok(output)
    }

    // ==========================================
    // 旧版学员表
    // ==========================================

    #[instrument(skip(self, file), fields(actor = %self.actor.username, file = %file.name))]
    pub fn import_trainees(
        &self,
        file: &UploadedFile,
        options: ImportOptions,
    ) -> BulkResult<OperationLedger> {
        let resolver = self.resolver(&options);
        self.run_import(
            options,
            &[UNLINKED_RESIDENTS, CREATED_SUPERVISORS],
            || read_trainee_rows(file),
            |row: &TraineeRow| self.process_trainee_row(row, &options, &resolver),
        )
    }

    fn process_trainee_row(
        &self,
        row: &TraineeRow,
        options: &ImportOptions,
        resolver: &EntityResolver<'_, R>,
    ) -> Result<RowOutput, RowError> {
        if row.name.is_empty() {
            return Err(RowError::missing_field("Missing 'Name of Trainee'"));
        }
        let date_joined: NaiveDate = if row.date_joining.is_empty() {
            self.today
        } else {
            parse_flexible_date(&row.date_joining)
                .map_err(|e| RowError::invalid_date(e.to_string()))?
        };

        let (first, last) = split_full_name(&row.name);
        let username = synthesize_username(
            self.repo.as_ref(),
            &first,
            &last,
            &self.config.username_fallback,
        )?;
        let year = infer_training_year(date_joined, self.today);

        let mut warnings = Vec::new();
        let mut created_supervisor = None;
        let resolved = match resolver.resolve_or_create_supervisor(&row.supervisor_name, None) {
            SupervisorOutcome::NotGiven => {
                Err(RowError::missing_field("Supervisor Name is required"))
            }
            SupervisorOutcome::Failed(reason) => Err(RowError::unresolvable_supervisor(format!(
                "Could not create/find supervisor '{}': {}",
                row.supervisor_name, reason
            ))),
            SupervisorOutcome::Existing(person) => Ok(person),
            SupervisorOutcome::Created { person, .. } => {
                created_supervisor = Some(json!({
                    "id": person.id,
                    "username": person.username,
                    "name": person.full_name(),
                }));
                Ok(person)
            }
        };
        let supervisor = soften(resolved, options, &mut warnings)?;

        let email = self.config.role_email(&username, "pgr");
        let password = self.initial_password(options, &username, Some(year));

        let draft = NewPerson {
            username: username.clone(),
            email: email.clone(),
            first_name: first,
            last_name: last,
            role: Role::Pg,
            specialty: Some(self.config.default_specialty.clone()),
            year: Some(year.to_string()),
            supervisor_id: supervisor.as_ref().map(|s| s.id),
            registration_number: non_empty(&row.qualification),
            phone_number: None,
            date_joined,
            is_active: true,
            created_by: Some(self.actor.id),
        };
        self.persist_person(draft, &password, options, true)?;

        let mut success = json!({
            "row": row.row_number,
            "username": username,
            "name": row.name,
            "email": email,
            "date_joining": date_joined.to_string(),
            "year": year,
            "qualification": non_empty(&row.qualification),
            "supervisor": supervisor.as_ref().map(|s| s.username.clone()),
            "password": self.echo_password(options, &password),
        });
        let unlinked =
            self.finish_pg_row(row.row_number, &row.name, &username, &mut success, supervisor.as_ref());

        let mut output = RowOutput::new(success).with_warnings(warnings);
        if let Some(side) = unlinked {
            output = output.with_side(UNLINKED_RESIDENTS, side);
        }
        if let Some(side) = created_supervisor {
            output = output.with_side(CREATED_SUPERVISORS, side);
        }
        Ok(output)
    }

    // ==========================================
    // 共用步骤
    // ==========================================

    fn person_rules(&self, require_supervisor: bool) -> PersonRules<'_> {
        PersonRules {
            specialties: &self.config.specialties,
            years: &self.config.training_years,
            require_supervisor,
        }
    }

    /// 专科必填 + 模糊匹配
    fn resolve_specialty(&self, text: &str) -> Result<String, RowError> {
        if text.is_empty() {
            return Err(RowError::missing_field("Missing 'Specialty'"));
        }
        match_specialty(&self.config.specialties, text).ok_or_else(|| {
            RowError::invalid_enum(format!(
                "Invalid specialty '{}'. Valid options include: {}",
                text,
                self.config
                    .specialties
                    .display_names(SPECIALTY_HINT_COUNT)
                    .join(", ")
            ))
        })
    }

    /// 行内给出的用户名优先, 否则合成
    fn row_username(&self, given: &str, first: &str, last: &str) -> Result<String, RowError> {
        if !given.is_empty() {
            return Ok(given.to_string());
        }
        Ok(synthesize_username(
            self.repo.as_ref(),
            first,
            last,
            &self.config.username_fallback,
        )?)
    }

    fn echo_password(&self, options: &ImportOptions, password: &str) -> String {
        if options.dry_run {
            "***".to_string()
        } else {
            password.to_string()
        }
    }

    /// 无导师的研究生: 成功条目附警告, 返回侧列表条目
    fn finish_pg_row(
        &self,
        row_number: usize,
        name: &str,
        username: &str,
        success: &mut JsonValue,
        supervisor: Option<&PersonRecord>,
    ) -> Option<JsonValue> {
        if supervisor.is_some() {
            return None;
        }
        success["warning"] = json!(UNLINKED_WARNING);
        Some(json!({
            "row": row_number,
            "username": username,
            "name": name,
        }))
    }

    /// 试运行: 只按"即将保存"校验; 提交: 同名用户存在则更新, 否则创建
    ///
    /// allow_unlinked 为 false 时拒绝创建无导师的研究生
    fn persist_person(
        &self,
        mut draft: NewPerson,
        password: &str,
        options: &ImportOptions,
        allow_unlinked: bool,
    ) -> Result<(), RowError> {
        let existing = self.repo.find_person_by_username(&draft.username)?;

        if options.dry_run {
            let mut require_supervisor = true;
            if draft.role == Role::Pg && draft.supervisor_id.is_none() {
                // 借用任一已有导师作占位, 以便其余字段照常校验
                match self
                    .repo
                    .first_person(&PersonFilter::with_role(Role::Supervisor))?
                {
                    Some(placeholder) => draft.supervisor_id = Some(placeholder.id),
                    None => require_supervisor = false,
                }
            }
            let candidate = match existing {
                Some(mut record) => {
                    record.apply_import(&draft, self.actor.id);
                    record.to_draft()
                }
                None => draft,
            };
            candidate.validate(&self.person_rules(require_supervisor))?;
            return Ok(());
        }

        match existing {
            Some(mut record) => {
                record.apply_import(&draft, self.actor.id);
                record.to_draft().validate(&self.person_rules(false))?;
                self.repo.update_person(&record)?;
                if self.config.reset_password_on_update {
                    self.store_password(record.id, password)?;
                }
                debug!(username = %record.username, "已更新人员");
            }
            None => {
                if draft.role == Role::Pg && draft.supervisor_id.is_none() && !allow_unlinked {
                    return Err(RowError::unresolvable_supervisor(
                        "Cannot create PG user without supervisor",
                    ));
                }
                draft.validate(&self.person_rules(!allow_unlinked))?;
                let person = self.repo.create_person(&draft)?;
                self.store_password(person.id, password)?;
                debug!(username = %person.username, role = %person.role, "已创建人员");
            }
        }
        Ok(())
    }
}

/// 部分提交时把行错误降级为警告
fn soften<T>(
    result: Result<T, RowError>,
    options: &ImportOptions,
    warnings: &mut Vec<RowError>,
) -> Result<Option<T>, RowError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if options.allow_partial => {
            warnings.push(e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
