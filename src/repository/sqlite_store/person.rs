use super::{invalid_text, SqliteStore};
use crate::domain::person::{NewPerson, PersonFilter, PersonRecord};
use crate::domain::types::Role;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::person_repo::PersonRepository;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const PERSON_COLUMNS: &str = "id, username, email, first_name, last_name, role, specialty, year, \
     supervisor_id, registration_number, phone_number, date_joined, is_active, \
     created_by, modified_by, created_at, updated_at";

fn map_person_row(row: &Row<'_>) -> rusqlite::Result<PersonRecord> {
    let role_raw: String = row.get(5)?;
    let role = Role::from_str(&role_raw).ok_or_else(|| invalid_text(5, &role_raw))?;

    Ok(PersonRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        role,
        specialty: row.get(6)?,
        year: row.get(7)?,
        supervisor_id: row.get(8)?,
        registration_number: row.get(9)?,
        phone_number: row.get(10)?,
        date_joined: row.get(11)?,
        is_active: row.get(12)?,
        created_by: row.get(13)?,
        modified_by: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn load_person(conn: &Connection, id: i64) -> rusqlite::Result<Option<PersonRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM person WHERE id = ?1", PERSON_COLUMNS),
        params![id],
        map_person_row,
    )
    .optional()
}

impl PersonRepository for SqliteStore {
    fn find_person_by_username(&self, username: &str) -> RepositoryResult<Option<PersonRecord>> {
        let conn = self.get_conn()?;
        let person = conn
            .query_row(
                &format!("SELECT {} FROM person WHERE username = ?1", PERSON_COLUMNS),
                params![username],
                map_person_row,
            )
            .optional()?;
        Ok(person)
    }

    fn find_person_by_id(&self, id: i64) -> RepositoryResult<Option<PersonRecord>> {
        let conn = self.get_conn()?;
        Ok(load_person(&conn, id)?)
    }

    fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM person WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn filter_persons(&self, filter: &PersonFilter) -> RepositoryResult<Vec<PersonRecord>> {
        let conn = self.get_conn()?;

        let mut sql = format!("SELECT {} FROM person WHERE 1=1", PERSON_COLUMNS);
        let mut args: Vec<String> = Vec::new();

        if let Some(role) = filter.role {
            args.push(role.as_str().to_string());
            sql.push_str(&format!(" AND role = ?{}", args.len()));
        }
        if let Some(username) = &filter.username_iexact {
            args.push(username.clone());
            sql.push_str(&format!(" AND lower(username) = lower(?{})", args.len()));
        }
        if let Some(first_name) = &filter.first_name_iexact {
            args.push(first_name.clone());
            sql.push_str(&format!(" AND lower(first_name) = lower(?{})", args.len()));
        }
        if let Some(last_name) = &filter.last_name_iexact {
            args.push(last_name.clone());
            sql.push_str(&format!(" AND lower(last_name) = lower(?{})", args.len()));
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let persons = stmt
            .query_map(params_from_iter(args.iter()), map_person_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(persons)
    }

    fn create_person(&self, person: &NewPerson) -> RepositoryResult<PersonRecord> {
        let conn = self.get_conn()?;
        let now = Utc::now().naive_utc();

        conn.execute(
            r#"
            INSERT INTO person (
                username, email, first_name, last_name, role, specialty, year,
                supervisor_id, registration_number, phone_number, date_joined,
                is_active, created_by, modified_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, NULL, ?14, ?14)
            "#,
            params![
                person.username,
                person.email,
                person.first_name,
                person.last_name,
                person.role.as_str(),
                person.specialty,
                person.year,
                person.supervisor_id,
                person.registration_number,
                person.phone_number,
                person.date_joined,
                person.is_active,
                person.created_by,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        load_person(&conn, id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "person".to_string(),
            id: id.to_string(),
        })
    }

    fn update_person(&self, person: &PersonRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE person SET
                email = ?2, first_name = ?3, last_name = ?4, role = ?5, specialty = ?6,
                year = ?7, supervisor_id = ?8, registration_number = ?9, phone_number = ?10,
                date_joined = ?11, is_active = ?12, modified_by = ?13, updated_at = ?14
            WHERE id = ?1
            "#,
            params![
                person.id,
                person.email,
                person.first_name,
                person.last_name,
                person.role.as_str(),
                person.specialty,
                person.year,
                person.supervisor_id,
                person.registration_number,
                person.phone_number,
                person.date_joined,
                person.is_active,
                person.modified_by,
                Utc::now().naive_utc(),
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "person".to_string(),
                id: person.id.to_string(),
            });
        }
        Ok(())
    }

    fn set_password_hash(&self, person_id: i64, hash: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE person SET password_hash = ?2 WHERE id = ?1",
            params![person_id, hash],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "person".to_string(),
                id: person_id.to_string(),
            });
        }
        Ok(())
    }

    fn find_password_hash(&self, person_id: i64) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let hash: Option<Option<String>> = conn
            .query_row(
                "SELECT password_hash FROM person WHERE id = ?1",
                params![person_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash.flatten())
    }

    fn count_persons(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM person", [], |row| row.get(0))?;
        Ok(count)
    }
}
