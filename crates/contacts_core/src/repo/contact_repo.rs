//! Contact repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, search and bulk-insert APIs over `contacts` storage.
//! - Own audit timestamps and email uniqueness among active rows.
//!
//! # Invariants
//! - Write paths call `Contact::validate()` before SQL mutations.
//! - Soft-deleted rows are invisible unless a query opts in explicitly.
//! - `created_at` is written once on insert; `updated_at` on every write.

use crate::db::DbError;
use crate::model::contact::{Contact, ContactId, ContactValidationError};
use chrono::{Local, NaiveDateTime, SubsecRound};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use thiserror::Error;

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    email,
    phone,
    address,
    city,
    postal_code,
    country,
    company,
    job_title,
    birthday,
    website,
    notes,
    is_deleted,
    created_at,
    updated_at
FROM contacts";

const CONTACT_INSERT_SQL: &str = "INSERT INTO contacts (
    first_name,
    last_name,
    email,
    phone,
    address,
    city,
    postal_code,
    country,
    company,
    job_title,
    birthday,
    website,
    notes,
    is_deleted,
    created_at,
    updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, ?14, ?14);";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for contact persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ContactValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("contact not found: {0}")]
    NotFound(ContactId),
    #[error("an active contact already uses email `{0}`")]
    DuplicateEmail(String),
    #[error("contact has no id and cannot be updated")]
    MissingId,
    #[error("invalid persisted contact data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Sort order for contact listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContactSort {
    #[default]
    LastNameAsc,
    LastNameDesc,
    FirstNameAsc,
    CreatedAtDesc,
    IdAsc,
}

impl ContactSort {
    fn order_by_sql(self) -> &'static str {
        match self {
            Self::LastNameAsc => {
                "last_name COLLATE NOCASE ASC, first_name COLLATE NOCASE ASC, id ASC"
            }
            Self::LastNameDesc => {
                "last_name COLLATE NOCASE DESC, first_name COLLATE NOCASE DESC, id DESC"
            }
            Self::FirstNameAsc => {
                "first_name COLLATE NOCASE ASC, last_name COLLATE NOCASE ASC, id ASC"
            }
            Self::CreatedAtDesc => "created_at DESC, id DESC",
            Self::IdAsc => "id ASC",
        }
    }
}

/// Query options for listing and counting contacts.
#[derive(Debug, Clone, Default)]
pub struct ContactListQuery {
    /// Case-insensitive substring matched against first name, last name and email.
    pub search: Option<String>,
    pub include_deleted: bool,
    pub sort: ContactSort,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for contact storage.
pub trait ContactRepository {
    fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId>;
    fn update_contact(&self, contact: &Contact) -> RepoResult<()>;
    fn get_contact(&self, id: ContactId, include_deleted: bool) -> RepoResult<Option<Contact>>;
    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>>;
    fn count_contacts(&self, query: &ContactListQuery) -> RepoResult<u64>;
    /// All non-deleted contacts in id order, as consumed by CSV export.
    fn list_active_contacts(&self) -> RepoResult<Vec<Contact>>;
    fn soft_delete_contact(&self, id: ContactId) -> RepoResult<()>;
    /// Inserts every contact or none of them; returns the inserted count.
    fn insert_contacts(&self, contacts: &[Contact]) -> RepoResult<usize>;
}

/// SQLite-backed contact repository.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId> {
        contact.validate()?;
        insert_row(self.conn, contact, now_local())
    }

    fn update_contact(&self, contact: &Contact) -> RepoResult<()> {
        let id = contact.id.ok_or(RepoError::MissingId)?;
        contact.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE contacts
                 SET
                    first_name = ?1,
                    last_name = ?2,
                    email = ?3,
                    phone = ?4,
                    address = ?5,
                    city = ?6,
                    postal_code = ?7,
                    country = ?8,
                    company = ?9,
                    job_title = ?10,
                    birthday = ?11,
                    website = ?12,
                    notes = ?13,
                    updated_at = ?14
                 WHERE id = ?15 AND is_deleted = 0;",
                params![
                    contact.first_name.trim(),
                    contact.last_name.trim(),
                    contact.email.trim(),
                    contact.phone.as_deref(),
                    contact.address.as_deref(),
                    contact.city.as_deref(),
                    contact.postal_code.as_deref(),
                    contact.country.as_deref(),
                    contact.company.as_deref(),
                    contact.job_title.as_deref(),
                    contact.birthday,
                    contact.website.as_deref(),
                    contact.notes.as_deref(),
                    now_local(),
                    id,
                ],
            )
            .map_err(|err| map_write_error(err, &contact.email))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_contact(&self, id: ContactId, include_deleted: bool) -> RepoResult<Option<Contact>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id, i64::from(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_contact_row(row)?));
        }

        Ok(None)
    }

    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>> {
        let (filter_sql, mut bind_values) = build_filter(query);
        let mut sql = format!(
            "{CONTACT_SELECT_SQL} {filter_sql} ORDER BY {}",
            query.sort.order_by_sql()
        );

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        collect_contacts(self.conn, &sql, bind_values)
    }

    fn count_contacts(&self, query: &ContactListQuery) -> RepoResult<u64> {
        let (filter_sql, bind_values) = build_filter(query);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM contacts {filter_sql}"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    fn list_active_contacts(&self) -> RepoResult<Vec<Contact>> {
        collect_contacts(
            self.conn,
            &format!("{CONTACT_SELECT_SQL} WHERE is_deleted = 0 ORDER BY id ASC"),
            Vec::new(),
        )
    }

    fn soft_delete_contact(&self, id: ContactId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE contacts
             SET
                is_deleted = 1,
                updated_at = ?1
             WHERE id = ?2 AND is_deleted = 0;",
            params![now_local(), id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn insert_contacts(&self, contacts: &[Contact]) -> RepoResult<usize> {
        for contact in contacts {
            contact.validate()?;
        }

        let now = now_local();
        let tx = self.conn.unchecked_transaction()?;
        for contact in contacts {
            insert_row(&tx, contact, now)?;
        }
        tx.commit()?;

        Ok(contacts.len())
    }
}

fn insert_row(conn: &Connection, contact: &Contact, now: NaiveDateTime) -> RepoResult<ContactId> {
    conn.execute(
        CONTACT_INSERT_SQL,
        params![
            contact.first_name.trim(),
            contact.last_name.trim(),
            contact.email.trim(),
            contact.phone.as_deref(),
            contact.address.as_deref(),
            contact.city.as_deref(),
            contact.postal_code.as_deref(),
            contact.country.as_deref(),
            contact.company.as_deref(),
            contact.job_title.as_deref(),
            contact.birthday,
            contact.website.as_deref(),
            contact.notes.as_deref(),
            now,
        ],
    )
    .map_err(|err| map_write_error(err, &contact.email))?;

    Ok(conn.last_insert_rowid())
}

fn build_filter(query: &ContactListQuery) -> (String, Vec<Value>) {
    let mut sql = String::from("WHERE 1 = 1");
    let mut bind_values = Vec::new();

    if !query.include_deleted {
        sql.push_str(" AND is_deleted = 0");
    }

    if let Some(term) = query.search.as_deref().map(str::trim) {
        if !term.is_empty() {
            let pattern = format!("%{}%", escape_like(term));
            sql.push_str(
                " AND (first_name LIKE ? ESCAPE '\\'
                    OR last_name LIKE ? ESCAPE '\\'
                    OR email LIKE ? ESCAPE '\\')",
            );
            for _ in 0..3 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }
    }

    (sql, bind_values)
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn collect_contacts(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Contact>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut contacts = Vec::new();

    while let Some(row) = rows.next()? {
        contacts.push(parse_contact_row(row)?);
    }

    Ok(contacts)
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in contacts.is_deleted"
            )));
        }
    };

    Ok(Contact {
        id: Some(row.get("id")?),
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
        city: row.get("city")?,
        postal_code: row.get("postal_code")?,
        country: row.get("country")?,
        company: row.get("company")?,
        job_title: row.get("job_title")?,
        birthday: row.get("birthday")?,
        website: row.get("website")?,
        notes: row.get("notes")?,
        is_deleted,
        created_at: Some(row.get("created_at")?),
        updated_at: row.get("updated_at")?,
    })
}

fn map_write_error(err: rusqlite::Error, email: &str) -> RepoError {
    let is_duplicate = matches!(
        &err,
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation
                && message.contains("contacts.email")
    );
    if is_duplicate {
        RepoError::DuplicateEmail(email.trim().to_string())
    } else {
        err.into()
    }
}

fn now_local() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}
