use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, postgres::PgArguments, query::QueryAs, types::Json};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Event, EventChanges, NewEvent, NewUser, UpdateUserRequest, User, UserDetails, UserRole},
    query::ListQuery,
};

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers only ever see
/// `Arc<dyn Repository>`, which lets the tests swap in an in-memory mock.
///
/// Lookups return `Ok(None)` for a missing row; mutations that target a single row
/// return `Ok(None)`/`Ok(false)` when nothing matched.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    // Includes soft-deleted rows; callers decide whether `is_deleted` matters.
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_super_admin(&self) -> AppResult<Option<User>>;
    // Partial update of a live (not soft-deleted) user.
    async fn update_user(&self, id: Uuid, patch: UpdateUserRequest) -> AppResult<Option<User>>;
    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<bool>;
    async fn soft_delete_user(&self, id: Uuid) -> AppResult<bool>;

    // --- Events ---
    async fn create_event(&self, event: NewEvent) -> AppResult<Event>;
    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>>;
    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Option<Event>>;
    async fn delete_event(&self, id: Uuid) -> AppResult<bool>;
    async fn archive_event(&self, id: Uuid) -> AppResult<Option<Event>>;

    // --- Lists ---
    /// Runs a composed list query: the projected page plus the total match count.
    async fn list(&self, query: &ListQuery) -> AppResult<(Vec<JsonValue>, i64)>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, email, password, name, role, phone_number, address, \
    date_of_birth, gender, profile_image, student_id, batch, semester, teacher_id, department, \
    specialization, qualification, subjects, joining_date, experience, designation, staff_id, \
    is_deleted, created_at, updated_at";

const EVENT_COLUMNS: &str =
    "id, title, date, time, notes, archived, category, created_at, updated_at";

// Bind order of `UserDetails` in every statement below.
const DETAIL_COLUMNS: [&str; 17] = [
    "phone_number",
    "address",
    "date_of_birth",
    "gender",
    "profile_image",
    "student_id",
    "batch",
    "semester",
    "teacher_id",
    "department",
    "specialization",
    "qualification",
    "subjects",
    "joining_date",
    "experience",
    "designation",
    "staff_id",
];

/// `INSERT` with `$1..$5` for id, email, password, name, role followed by the details.
static INSERT_USER_SQL: LazyLock<String> = LazyLock::new(|| {
    let values = DETAIL_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| match *column {
            "subjects" => format!("COALESCE(${}, '{{}}'::text[])", i + 6),
            _ => format!("${}", i + 6),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO users (id, email, password, name, role, {}, is_deleted, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, {values}, false, NOW(), NOW()) RETURNING {USER_COLUMNS}",
        DETAIL_COLUMNS.join(", ")
    )
});

/// `UPDATE` with `$1` id, `$2..$4` email, name, role followed by the details. Every
/// column is `COALESCE`d so absent fields keep their stored value.
static UPDATE_USER_SQL: LazyLock<String> = LazyLock::new(|| {
    let assignments = ["email", "name", "role"]
        .iter()
        .chain(DETAIL_COLUMNS.iter())
        .enumerate()
        .map(|(i, column)| format!("{column} = COALESCE(${}, {column})", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE users SET {assignments}, updated_at = NOW() \
         WHERE id = $1 AND is_deleted = false RETURNING {USER_COLUMNS}"
    )
});

fn bind_details<'q>(
    query: QueryAs<'q, Postgres, User, PgArguments>,
    details: UserDetails,
) -> QueryAs<'q, Postgres, User, PgArguments> {
    query
        .bind(details.phone_number)
        .bind(details.address)
        .bind(details.date_of_birth)
        .bind(details.gender)
        .bind(details.profile_image)
        .bind(details.student_id)
        .bind(details.batch)
        .bind(details.semester)
        .bind(details.teacher_id)
        .bind(details.department)
        .bind(details.specialization)
        .bind(details.qualification)
        .bind(details.subjects)
        .bind(details.joining_date)
        .bind(details.experience)
        .bind(details.designation)
        .bind(details.staff_id)
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// A duplicate email surfaces as `AppError::Conflict` through the unique index.
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let query = sqlx::query_as::<_, User>(INSERT_USER_SQL.as_str())
            .bind(Uuid::new_v4())
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.name)
            .bind(user.role);
        let created = bind_details(query, user.details)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(user_id = %created.id, role = created.role.as_str(), "user created");
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_super_admin(&self) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 LIMIT 1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(UserRole::SuperAdmin)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: Uuid, patch: UpdateUserRequest) -> AppResult<Option<User>> {
        let query = sqlx::query_as::<_, User>(UPDATE_USER_SQL.as_str())
            .bind(id)
            .bind(patch.email)
            .bind(patch.name)
            .bind(patch.role);
        Ok(bind_details(query, patch.details)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// soft_delete_user
    ///
    /// Flags the row instead of deleting it; already-deleted users do not match.
    async fn soft_delete_user(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_event(&self, event: NewEvent) -> AppResult<Event> {
        let sql = format!(
            "INSERT INTO events (id, title, date, time, notes, archived, category, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, false, $6, NOW(), NOW()) RETURNING {EVENT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Event>(&sql)
            .bind(Uuid::new_v4())
            .bind(event.title)
            .bind(event.date)
            .bind(event.time)
            .bind(event.notes)
            .bind(event.category)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(event_id = %created.id, category = ?created.category, "event created");
        Ok(created)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Option<Event>> {
        let sql = format!(
            "UPDATE events SET title = COALESCE($2, title), date = COALESCE($3, date), \
             time = COALESCE($4, time), notes = COALESCE($5, notes), \
             category = COALESCE($6, category), updated_at = NOW() \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.date)
            .bind(changes.time)
            .bind(changes.notes)
            .bind(changes.category)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn archive_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let sql = format!(
            "UPDATE events SET archived = true, updated_at = NOW() WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list
    ///
    /// Executes the page query and the count query built by the composer. Both share
    /// the same predicates, so `total` always describes the filtered set.
    async fn list(&self, query: &ListQuery) -> AppResult<(Vec<JsonValue>, i64)> {
        let mut select = query.build_select();
        let rows = select
            .build_query_scalar::<Json<JsonValue>>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = query.build_count();
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(
            table = query.resource().table,
            returned = rows.len(),
            total,
            "list query executed"
        );
        Ok((rows.into_iter().map(|Json(doc)| doc).collect(), total))
    }
}
