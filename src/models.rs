use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    query::{Column, ColumnKind, PageMeta, Resource},
};

// --- Enumerations (stored as checked TEXT columns) ---

/// UserRole
///
/// The RBAC field. Serialized in snake_case on the wire and in the `users.role` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[ts(export)]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Teacher,
    #[default]
    Student,
    Staff,
}

impl UserRole {
    pub const LABELS: &'static [&'static str] =
        &["super_admin", "admin", "teacher", "student", "staff"];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
            UserRole::Staff => "staff",
        }
    }

    /// Admin-level roles may manage users.
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[ts(export)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const LABELS: &'static [&'static str] = &["male", "female", "other"];
}

/// EventCategory
///
/// The label assigned by [`crate::categorizer::categorize`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "text")]
#[ts(export)]
pub enum EventCategory {
    Work,
    Personal,
    #[default]
    Other,
}

impl EventCategory {
    pub const LABELS: &'static [&'static str] = &["Work", "Personal", "Other"];
}

// --- Core Application Schemas (Mapped to Database) ---

/// UserDetails
///
/// The optional profile block shared by every role. Student, teacher and staff specific
/// fields live side by side; which ones are filled depends on the role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(default)]
#[ts(export)]
pub struct UserDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,

    // Student specific.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<i32>,

    // Teacher specific. `department` is shared with students and staff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joining_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,

    // Staff specific.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
}

/// User
///
/// A row of the `users` table. The password hash is loaded for login checks but never
/// serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password: String,
    pub name: String,
    pub role: UserRole,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: UserDetails,
    pub is_deleted: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Event
///
/// A row of the `events` table. `date` and `time` are kept as validated strings
/// (`YYYY-MM-DD`, 24-hour `HH:MM`), matching what clients send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
    pub archived: bool,
    pub category: EventCategory,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- List resources ---

pub static USER_RESOURCE: Resource = Resource {
    table: "users",
    columns: &[
        Column::new("id", ColumnKind::Uuid),
        Column::new("email", ColumnKind::Text),
        Column::new("password", ColumnKind::Text).hidden(),
        Column::new("name", ColumnKind::Text),
        Column::new("role", ColumnKind::Label(UserRole::LABELS)),
        Column::new("phone_number", ColumnKind::Text),
        Column::new("address", ColumnKind::Text),
        Column::new("date_of_birth", ColumnKind::Date),
        Column::new("gender", ColumnKind::Label(Gender::LABELS)),
        Column::new("profile_image", ColumnKind::Text),
        Column::new("student_id", ColumnKind::Text),
        Column::new("batch", ColumnKind::Text),
        Column::new("semester", ColumnKind::Integer),
        Column::new("teacher_id", ColumnKind::Text),
        Column::new("department", ColumnKind::Text),
        Column::new("specialization", ColumnKind::Text),
        Column::new("qualification", ColumnKind::Text),
        Column::new("subjects", ColumnKind::TextArray),
        Column::new("joining_date", ColumnKind::Date),
        Column::new("experience", ColumnKind::Integer),
        Column::new("designation", ColumnKind::Text),
        Column::new("staff_id", ColumnKind::Text),
        Column::new("is_deleted", ColumnKind::Boolean),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
    default_sort: "-created_at",
};

pub const USER_SEARCHABLE_FIELDS: &[&str] = &[
    "name",
    "email",
    "department",
    "student_id",
    "teacher_id",
    "staff_id",
];

pub static EVENT_RESOURCE: Resource = Resource {
    table: "events",
    columns: &[
        Column::new("id", ColumnKind::Uuid),
        Column::new("title", ColumnKind::Text),
        Column::new("date", ColumnKind::Text),
        Column::new("time", ColumnKind::Text),
        Column::new("notes", ColumnKind::Text),
        Column::new("archived", ColumnKind::Boolean),
        Column::new("category", ColumnKind::Label(EventCategory::LABELS)),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ],
    default_sort: "-created_at",
};

pub const EVENT_SEARCHABLE_FIELDS: &[&str] = &["title", "notes", "category"];

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// CreateUserRequest
///
/// Input payload for `POST /users`. When `password` is omitted the configured default
/// password is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub name: String,
    pub role: UserRole,
    #[serde(flatten)]
    pub details: UserDetails,
}

/// UpdateUserRequest
///
/// Partial update payload for `PATCH /users/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(flatten)]
    pub details: UserDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateEventRequest {
    pub title: String,
    pub date: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// UpdateEventRequest
///
/// Partial update payload for `PATCH /events/{id}`. A new title or notes triggers
/// re-categorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateEventRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// --- Repository inputs (already validated) ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub details: UserDetails,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
    pub category: EventCategory,
}

/// The columns an event update writes. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
    pub category: Option<EventCategory>,
}

// --- Responses ---

/// ApiResponse
///
/// The success envelope: `{ success, message, meta?, data }`. `meta` is only present on
/// list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            meta: None,
            data,
        }
    }

    pub fn page(message: impl Into<String>, meta: PageMeta, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            meta: Some(meta),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

// --- Validation ---

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").expect("time pattern compiles")
});

const TITLE_MAX: usize = 100;
const NOTES_MAX: usize = 500;
pub const PASSWORD_MIN: usize = 6;

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Validation(message.into())
}

/// Trims and lower-cases an email, rejecting anything that is not `local@domain.tld`.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(invalid("Invalid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(invalid(format!(
            "Password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

fn normalize_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("Name is required"));
    }
    Ok(name.to_string())
}

fn normalize_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(invalid("Title is required"));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(invalid(format!(
            "Title cannot exceed {TITLE_MAX} characters"
        )));
    }
    Ok(title.to_string())
}

fn normalize_notes(notes: &str) -> AppResult<String> {
    let notes = notes.trim();
    if notes.chars().count() > NOTES_MAX {
        return Err(invalid(format!(
            "Notes cannot exceed {NOTES_MAX} characters"
        )));
    }
    Ok(notes.to_string())
}

fn validate_date(date: &str) -> AppResult<String> {
    let date = date.trim();
    if !DATE_RE.is_match(date) || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(invalid("Date must be in YYYY-MM-DD format"));
    }
    Ok(date.to_string())
}

fn validate_time(time: &str) -> AppResult<String> {
    let time = time.trim();
    if !TIME_RE.is_match(time) {
        return Err(invalid("Time must be in HH:MM format (24-hour)"));
    }
    Ok(time.to_string())
}

impl UserDetails {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(semester) = self.semester {
            if !(1..=8).contains(&semester) {
                return Err(invalid("Semester must be between 1 and 8"));
            }
        }
        if let Some(experience) = self.experience {
            if experience < 0 {
                return Err(invalid("Experience cannot be negative"));
            }
        }
        Ok(())
    }
}

impl CreateUserRequest {
    /// Validates the payload and returns it with email and name normalized.
    pub fn normalized(mut self) -> AppResult<Self> {
        self.email = normalize_email(&self.email)?;
        self.name = normalize_name(&self.name)?;
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        self.details.validate()?;
        Ok(self)
    }
}

impl UpdateUserRequest {
    pub fn normalized(mut self) -> AppResult<Self> {
        self.email = self.email.as_deref().map(normalize_email).transpose()?;
        self.name = self.name.as_deref().map(normalize_name).transpose()?;
        self.details.validate()?;
        Ok(self)
    }
}

impl CreateEventRequest {
    pub fn normalized(self) -> AppResult<Self> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            date: validate_date(&self.date)?,
            time: validate_time(&self.time)?,
            notes: self.notes.as_deref().map(normalize_notes).transpose()?,
        })
    }
}

impl UpdateEventRequest {
    pub fn normalized(self) -> AppResult<Self> {
        Ok(Self {
            title: self.title.as_deref().map(normalize_title).transpose()?,
            date: self.date.as_deref().map(validate_date).transpose()?,
            time: self.time.as_deref().map(validate_time).transpose()?,
            notes: self.notes.as_deref().map(normalize_notes).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.date.is_none() && self.time.is_none() && self.notes.is_none()
    }
}
