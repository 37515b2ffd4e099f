use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::prediction::{
    prediction_to_response, prediction_to_summary, PredictionCreate, PredictionResponse,
    PredictionSummaryResponse, PredictionValidate,
};
use crate::services::prediction::{self, PredictionRequest};

#[derive(Debug, Deserialize)]
pub(crate) struct ListPredictionsQuery {
    #[serde(default)]
    #[serde(alias = "subjectId")]
    subject_id: Option<String>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_prediction).get(list_predictions))
        .route("/:prediction_id", get(get_prediction))
        .route("/:prediction_id/validate", post(validate_prediction))
}

async fn create_prediction(
    State(state): State<AppState>,
    Json(payload): Json<PredictionCreate>,
) -> Result<(StatusCode, Json<PredictionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.use_web_search {
        tracing::debug!("use_web_search requested; generation runs without web grounding");
    }

    let request = PredictionRequest {
        subject_id: payload.subject_id,
        exam_type: payload.exam_type,
        scope: payload.syllabus_scope,
        question_count: payload.question_count,
        use_thinking_model: payload.use_thinking_model,
        model: payload.model,
        target_label: payload.target_label,
    };

    let outcome = prediction::run(&state, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(prediction_to_response(outcome.prediction, outcome.questions)),
    ))
}

async fn list_predictions(
    State(state): State<AppState>,
    Query(params): Query<ListPredictionsQuery>,
) -> Result<Json<PaginatedResponse<PredictionSummaryResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let predictions = repositories::predictions::list_by_subject(
        state.db(),
        params.subject_id.as_deref(),
        skip,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list predictions"))?;

    let total_count = repositories::predictions::count(state.db(), params.subject_id.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count predictions"))?;

    Ok(Json(PaginatedResponse {
        items: predictions.into_iter().map(prediction_to_summary).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_prediction(
    State(state): State<AppState>,
    Path(prediction_id): Path<String>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let prediction = repositories::predictions::find_by_id(state.db(), &prediction_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load prediction"))?
        .ok_or_else(|| ApiError::NotFound(format!("Prediction {prediction_id} not found")))?;

    let questions = repositories::predictions::list_questions(state.db(), &prediction.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load predicted questions"))?;

    Ok(Json(prediction_to_response(prediction, questions)))
}

/// Record how accurate a prediction turned out once the real paper is known.
async fn validate_prediction(
    State(state): State<AppState>,
    Path(prediction_id): Path<String>,
    Json(payload): Json<PredictionValidate>,
) -> Result<Json<PredictionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let prediction = repositories::predictions::set_accuracy(
        state.db(),
        &prediction_id,
        payload.accuracy_score,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record prediction accuracy"))?
    .ok_or_else(|| ApiError::NotFound(format!("Prediction {prediction_id} not found")))?;

    let questions = repositories::predictions::list_questions(state.db(), &prediction.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load predicted questions"))?;

    Ok(Json(prediction_to_response(prediction, questions)))
}
