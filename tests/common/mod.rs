#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use college_portal::{
    AppState,
    auth::{AuthUser, TokenKind, issue_token},
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Event, EventChanges, NewEvent, NewUser, UpdateUserRequest, User, UserRole},
    query::ListQuery,
    repository::Repository,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// --- In-memory repository ---

/// An in-memory `Repository`. Users and events behave like the real tables; `list`
/// cannot run SQL, so it records the generated statement and returns canned rows.
#[derive(Default)]
pub struct MockRepository {
    pub users: Mutex<Vec<User>>,
    pub events: Mutex<Vec<Event>>,
    pub list_rows: Vec<JsonValue>,
    pub list_total: i64,
    pub last_list_sql: Mutex<Option<String>>,
}

impl MockRepository {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Self::default()
        }
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn event(&self, id: Uuid) -> Option<Event> {
        self.events.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }
}

// Copies every `Some` field of the patch onto the stored details.
macro_rules! merge_details {
    ($target:expr, $patch:expr, $($field:ident),+) => {
        $( if $patch.$field.is_some() { $target.$field = $patch.$field; } )+
    };
}

#[async_trait]
impl Repository for MockRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password: user.password_hash,
            name: user.name,
            role: user.role,
            details: user.details,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_super_admin(&self) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.role == UserRole::SuperAdmin)
            .cloned())
    }

    async fn update_user(&self, id: Uuid, patch: UpdateUserRequest) -> AppResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::Conflict(
                    "A user with this email already exists".to_string(),
                ));
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id && !u.is_deleted) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        let details = patch.details;
        merge_details!(
            user.details, details, phone_number, address, date_of_birth, gender, profile_image,
            student_id, batch, semester, teacher_id, department, specialization, qualification,
            subjects, joining_date, experience, designation, staff_id
        );
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id && !u.is_deleted) {
            Some(user) => {
                user.password = password_hash;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id && !u.is_deleted) {
            Some(user) => {
                user.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_event(&self, event: NewEvent) -> AppResult<Event> {
        let created = Event {
            id: Uuid::new_v4(),
            title: event.title,
            date: event.date,
            time: event.time,
            notes: event.notes,
            archived: false,
            category: event.category,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.events.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.event(id))
    }

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Option<Event>> {
        let mut events = self.events.lock().unwrap();
        let Some(event) = events.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            event.title = title;
        }
        if let Some(date) = changes.date {
            event.date = date;
        }
        if let Some(time) = changes.time {
            event.time = time;
        }
        if changes.notes.is_some() {
            event.notes = changes.notes;
        }
        if let Some(category) = changes.category {
            event.category = category;
        }
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<bool> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != id);
        Ok(events.len() != before)
    }

    async fn archive_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let mut events = self.events.lock().unwrap();
        Ok(events.iter_mut().find(|e| e.id == id).map(|event| {
            event.archived = true;
            event.clone()
        }))
    }

    async fn list(&self, query: &ListQuery) -> AppResult<(Vec<JsonValue>, i64)> {
        *self.last_list_sql.lock().unwrap() = Some(query.build_select().sql().to_string());
        Ok((self.list_rows.clone(), self.list_total))
    }
}

// --- Fixtures ---

/// bcrypt at the test cost.
pub async fn hash(password: &str) -> String {
    college_portal::password::PasswordHasher::new(4)
        .hash(password)
        .await
        .unwrap()
}

pub fn user(role: UserRole, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or("user").to_string(),
        role,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        ..User::default()
    }
}

pub fn event(title: &str, notes: Option<&str>) -> Event {
    Event {
        id: Uuid::new_v4(),
        title: title.to_string(),
        date: "2025-03-14".to_string(),
        time: "10:30".to_string(),
        notes: notes.map(str::to_string),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        ..Event::default()
    }
}

pub fn identity(user: &User) -> AuthUser {
    AuthUser::from(user)
}

pub fn state(repo: Arc<MockRepository>) -> AppState {
    AppState {
        repo,
        config: AppConfig::default(),
    }
}

pub fn access_token(user: &User) -> String {
    issue_token(&AppConfig::default(), TokenKind::Access, user).unwrap()
}
