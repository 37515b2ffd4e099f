use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::subject::{
    subject_to_response, syllabus_to_response, QuestionsIngest, QuestionsIngestResponse,
    SubjectCreate, SubjectResponse, SyllabusResponse, SyllabusUpload,
};
use crate::services::scope::{self, ModuleScope};
use crate::services::{history, syllabus};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_subject).get(list_subjects))
        .route("/:subject_id", get(get_subject))
        .route("/:subject_id/syllabus", put(replace_syllabus).get(get_syllabus))
        .route("/:subject_id/scope", get(get_scope))
        .route("/:subject_id/questions", post(ingest_questions))
}

async fn create_subject(
    State(state): State<AppState>,
    Json(payload): Json<SubjectCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = repositories::subjects::find_by_code(state.db(), &payload.code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check subject code"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict(format!(
            "Subject with code {} already exists",
            payload.code
        )));
    }

    let now = primitive_now_utc();
    let id = Uuid::new_v4().to_string();
    let subject = repositories::subjects::create(
        state.db(),
        repositories::subjects::CreateSubject {
            id: &id,
            code: &payload.code,
            name: &payload.name,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create subject"))?;

    Ok((StatusCode::CREATED, Json(subject_to_response(subject))))
}

async fn list_subjects(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::subjects::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    Ok(Json(subjects.into_iter().map(subject_to_response).collect()))
}

async fn get_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<SubjectResponse>, ApiError> {
    let subject = repositories::subjects::find_by_id(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .ok_or_else(|| ApiError::NotFound(format!("Subject {subject_id} not found")))?;

    Ok(Json(subject_to_response(subject)))
}

async fn get_syllabus(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<SyllabusResponse>, ApiError> {
    let stored = syllabus::load_syllabus(state.db(), &subject_id).await?;

    Ok(Json(syllabus_to_response(&subject_id, stored)))
}

async fn replace_syllabus(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(payload): Json<SyllabusUpload>,
) -> Result<Json<SyllabusResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let half_life = state.settings().prediction().freshness_half_life_days;
    let stored =
        syllabus::replace_syllabus(state.db(), &subject_id, payload.into_uploads(), half_life)
            .await?;

    Ok(Json(syllabus_to_response(&subject_id, stored)))
}

/// Default scope over the stored syllabus, everything included. Callers edit
/// this structure and send it back with a prediction request.
async fn get_scope(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<Vec<ModuleScope>>, ApiError> {
    let stored = syllabus::load_syllabus(state.db(), &subject_id).await?;

    Ok(Json(scope::default_scope(&stored)))
}

async fn ingest_questions(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(payload): Json<QuestionsIngest>,
) -> Result<(StatusCode, Json<QuestionsIngestResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let half_life = state.settings().prediction().freshness_half_life_days;
    let outcome =
        history::ingest_questions(state.db(), &subject_id, payload.into_items(), half_life).await?;

    let total_questions = repositories::questions::count_by_subject(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count historical questions"))?;

    Ok((
        StatusCode::CREATED,
        Json(QuestionsIngestResponse {
            inserted: outcome.inserted,
            topics_updated: outcome.topics_updated,
            total_questions,
        }),
    ))
}
