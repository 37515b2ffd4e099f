use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::HistoricalQuestion;
use crate::db::types::ExamType;

pub(crate) const COLUMNS: &str = "\
    id, subject_id, question_text, marks, exam_type, module_label, topic_label, created_at";

pub(crate) async fn list_recent_by_subject(
    pool: &PgPool,
    subject_id: &str,
    limit: i64,
) -> Result<Vec<HistoricalQuestion>, sqlx::Error> {
    sqlx::query_as::<_, HistoricalQuestion>(&format!(
        "SELECT {COLUMNS} FROM historical_questions \
         WHERE subject_id = $1 ORDER BY created_at DESC LIMIT $2"
    ))
    .bind(subject_id)
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_subject(pool: &PgPool, subject_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM historical_questions WHERE subject_id = $1")
        .bind(subject_id)
        .fetch_one(pool)
        .await
}

pub(crate) struct CreateHistoricalQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) marks: i32,
    pub(crate) exam_type: ExamType,
    pub(crate) module_label: Option<&'a str>,
    pub(crate) topic_label: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    question: CreateHistoricalQuestion<'_>,
) -> Result<HistoricalQuestion, sqlx::Error> {
    sqlx::query_as::<_, HistoricalQuestion>(&format!(
        "INSERT INTO historical_questions \
         (id, subject_id, question_text, marks, exam_type, module_label, topic_label, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
    ))
    .bind(question.id)
    .bind(question.subject_id)
    .bind(question.question_text)
    .bind(question.marks)
    .bind(question.exam_type)
    .bind(question.module_label)
    .bind(question.topic_label)
    .bind(question.created_at)
    .fetch_one(executor)
    .await
}
