use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{PredictedQuestion, Prediction};
use crate::db::types::{DifficultyLevel, ExamType};

pub(crate) const COLUMNS: &str = "\
    id, subject_id, exam_type, target_label, model_used, confidence, accuracy_score, \
    validated_at, created_at";

pub(crate) const QUESTION_COLUMNS: &str = "\
    id, prediction_id, question_text, probability, difficulty, marks, module_label, \
    topic_label, reasoning, order_index";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Prediction>, sqlx::Error> {
    sqlx::query_as::<_, Prediction>(&format!("SELECT {COLUMNS} FROM predictions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_questions(
    pool: &PgPool,
    prediction_id: &str,
) -> Result<Vec<PredictedQuestion>, sqlx::Error> {
    sqlx::query_as::<_, PredictedQuestion>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM predicted_questions \
         WHERE prediction_id = $1 ORDER BY order_index"
    ))
    .bind(prediction_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_subject(
    pool: &PgPool,
    subject_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Prediction>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM predictions WHERE 1 = 1"));

    if let Some(subject_id) = subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id);
    }

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Prediction>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    subject_id: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM predictions WHERE 1 = 1");

    if let Some(subject_id) = subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) struct CreatePrediction<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) exam_type: ExamType,
    pub(crate) target_label: Option<&'a str>,
    pub(crate) model_used: &'a str,
    pub(crate) confidence: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    prediction: CreatePrediction<'_>,
) -> Result<Prediction, sqlx::Error> {
    sqlx::query_as::<_, Prediction>(&format!(
        "INSERT INTO predictions \
         (id, subject_id, exam_type, target_label, model_used, confidence, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
    ))
    .bind(prediction.id)
    .bind(prediction.subject_id)
    .bind(prediction.exam_type)
    .bind(prediction.target_label)
    .bind(prediction.model_used)
    .bind(prediction.confidence)
    .bind(prediction.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreatePredictedQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) prediction_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) probability: f64,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) marks: i32,
    pub(crate) module_label: Option<&'a str>,
    pub(crate) topic_label: Option<&'a str>,
    pub(crate) reasoning: &'a [String],
    pub(crate) order_index: i32,
}

pub(crate) async fn create_question(
    executor: impl sqlx::PgExecutor<'_>,
    question: CreatePredictedQuestion<'_>,
) -> Result<PredictedQuestion, sqlx::Error> {
    sqlx::query_as::<_, PredictedQuestion>(&format!(
        "INSERT INTO predicted_questions \
         (id, prediction_id, question_text, probability, difficulty, marks, module_label, \
          topic_label, reasoning, order_index) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {QUESTION_COLUMNS}"
    ))
    .bind(question.id)
    .bind(question.prediction_id)
    .bind(question.question_text)
    .bind(question.probability)
    .bind(question.difficulty)
    .bind(question.marks)
    .bind(question.module_label)
    .bind(question.topic_label)
    .bind(Json(question.reasoning.to_vec()))
    .bind(question.order_index)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_accuracy(
    pool: &PgPool,
    id: &str,
    accuracy_score: f64,
    validated_at: PrimitiveDateTime,
) -> Result<Option<Prediction>, sqlx::Error> {
    sqlx::query_as::<_, Prediction>(&format!(
        "UPDATE predictions SET accuracy_score = $2, validated_at = $3 \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(accuracy_score)
    .bind(validated_at)
    .fetch_optional(pool)
    .await
}
