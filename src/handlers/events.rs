use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::list_page;
use crate::{
    AppState,
    categorizer::categorize,
    error::{AppError, AppResult},
    models::{
        ApiResponse, CreateEventRequest, EVENT_RESOURCE, EVENT_SEARCHABLE_FIELDS, Event,
        EventChanges, NewEvent, UpdateEventRequest,
    },
    query::{ListQuery, QueryParams, Value},
};

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

/// Works out which columns an update writes. A new title or new notes re-runs the
/// categorizer over the merged text; date/time-only updates, and blank notes, leave the
/// category alone.
pub fn plan_event_changes(existing: &Event, patch: UpdateEventRequest) -> EventChanges {
    let supplied = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
    let category = if supplied(&patch.title) || supplied(&patch.notes) {
        let title = patch.title.as_deref().unwrap_or(&existing.title);
        let notes = patch
            .notes
            .as_deref()
            .or(existing.notes.as_deref())
            .unwrap_or("");
        Some(categorize(title, notes))
    } else {
        None
    };

    EventChanges {
        title: patch.title,
        date: patch.date,
        time: patch.time,
        notes: patch.notes,
        category,
    }
}

/// create_event
///
/// [Authenticated Route] Validates the payload, assigns a category and stores the event
/// unarchived.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Event>>)> {
    let payload = payload.normalized()?;
    let category = categorize(&payload.title, payload.notes.as_deref().unwrap_or(""));

    let event = state
        .repo
        .create_event(NewEvent {
            title: payload.title,
            date: payload.date,
            time: payload.time,
            notes: payload.notes,
            category,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Event created successfully", event)),
    ))
}

/// list_events
///
/// [Authenticated Route] Lists unarchived events. Supports `searchTerm` over title, notes
/// and category, plus column filters, `sort`, `page`, `limit` and `fields`.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses(
        (status = 200, description = "A page of events", body = [Event]),
        (status = 400, description = "Unknown field or malformed filter value")
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<ApiResponse<Vec<JsonValue>>>> {
    let query = ListQuery::new(&EVENT_RESOURCE, params)
        .where_not("archived", Value::Boolean(true))?
        .search(EVENT_SEARCHABLE_FIELDS)?
        .filter()?
        .sort()?
        .paginate()
        .fields()?;
    list_page(&state.repo, query, "Events retrieved successfully").await
}

/// get_event
///
/// [Authenticated Route] Fetches one event by id. Archived events are still returned.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Found", body = Event),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let event = state.repo.get_event(id).await?.ok_or_else(event_not_found)?;
    Ok(Json(ApiResponse::ok("Event retrieved successfully", event)))
}

/// update_event
///
/// [Authenticated Route] Partial update. See [`plan_event_changes`] for how the category
/// follows title and notes.
#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated", body = Event),
        (status = 404, description = "Event not found")
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let payload = payload.normalized()?;
    let existing = state.repo.get_event(id).await?.ok_or_else(event_not_found)?;
    if payload.is_empty() {
        return Ok(Json(ApiResponse::ok("Event updated successfully", existing)));
    }

    let changes = plan_event_changes(&existing, payload);
    let event = state
        .repo
        .update_event(id, changes)
        .await?
        .ok_or_else(event_not_found)?;
    tracing::info!(event_id = %id, category = ?event.category, "event updated");
    Ok(Json(ApiResponse::ok("Event updated successfully", event)))
}

/// delete_event
///
/// [Authenticated Route] Removes the event permanently.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !state.repo.delete_event(id).await? {
        return Err(event_not_found());
    }
    tracing::info!(event_id = %id, "event deleted");
    Ok(Json(ApiResponse::ok("Event deleted successfully", ())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}/archive",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Archived", body = Event),
        (status = 404, description = "Event not found")
    )
)]
pub async fn archive_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let event = state
        .repo
        .archive_event(id)
        .await?
        .ok_or_else(event_not_found)?;
    Ok(Json(ApiResponse::ok("Event archived successfully", event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventCategory;

    fn existing() -> Event {
        Event {
            title: "Team meeting".to_string(),
            notes: Some("bring the projector".to_string()),
            category: EventCategory::Work,
            ..Event::default()
        }
    }

    #[test]
    fn date_only_update_keeps_category() {
        let changes = plan_event_changes(
            &existing(),
            UpdateEventRequest {
                date: Some("2025-05-01".to_string()),
                ..UpdateEventRequest::default()
            },
        );
        assert_eq!(changes.category, None);
        assert_eq!(changes.date.as_deref(), Some("2025-05-01"));
    }

    #[test]
    fn new_title_is_merged_with_stored_notes() {
        let event = Event {
            notes: Some("cake for the family".to_string()),
            ..existing()
        };
        let changes = plan_event_changes(
            &event,
            UpdateEventRequest {
                title: Some("Saturday".to_string()),
                ..UpdateEventRequest::default()
            },
        );
        assert_eq!(changes.category, Some(EventCategory::Personal));
    }

    #[test]
    fn new_notes_are_merged_with_stored_title() {
        let changes = plan_event_changes(
            &existing(),
            UpdateEventRequest {
                notes: Some("birthday cake".to_string()),
                ..UpdateEventRequest::default()
            },
        );
        // "meeting" in the stored title still wins.
        assert_eq!(changes.category, Some(EventCategory::Work));
    }

    #[test]
    fn blank_notes_keep_category() {
        let changes = plan_event_changes(
            &existing(),
            UpdateEventRequest {
                notes: Some(String::new()),
                ..UpdateEventRequest::default()
            },
        );
        assert_eq!(changes.category, None);
        assert_eq!(changes.notes.as_deref(), Some(""));
    }

    #[test]
    fn recategorizes_to_other() {
        let event = Event {
            notes: None,
            ..existing()
        };
        let changes = plan_event_changes(
            &event,
            UpdateEventRequest {
                title: Some("Dentist".to_string()),
                ..UpdateEventRequest::default()
            },
        );
        assert_eq!(changes.category, Some(EventCategory::Other));
    }
}
