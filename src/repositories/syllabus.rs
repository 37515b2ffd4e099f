use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{SyllabusModule, SyllabusTopic};

pub(crate) const MODULE_COLUMNS: &str =
    "id, subject_id, module_number, name, hours, created_at";

pub(crate) const TOPIC_COLUMNS: &str = "\
    id, module_id, name, description, order_index, times_asked, last_asked_date, \
    freshness_score, created_at, updated_at";

pub(crate) async fn list_modules(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<SyllabusModule>, sqlx::Error> {
    sqlx::query_as::<_, SyllabusModule>(&format!(
        "SELECT {MODULE_COLUMNS} FROM syllabus_modules \
         WHERE subject_id = $1 ORDER BY module_number"
    ))
    .bind(subject_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_topics_by_module(
    pool: &PgPool,
    module_id: &str,
) -> Result<Vec<SyllabusTopic>, sqlx::Error> {
    sqlx::query_as::<_, SyllabusTopic>(&format!(
        "SELECT {TOPIC_COLUMNS} FROM syllabus_topics \
         WHERE module_id = $1 ORDER BY order_index"
    ))
    .bind(module_id)
    .fetch_all(pool)
    .await
}

/// All topics of a subject in module order then topic order, for freshness
/// ranking and scope resolution in one query.
pub(crate) async fn list_topics_by_subject(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<SyllabusTopic>, sqlx::Error> {
    sqlx::query_as::<_, SyllabusTopic>(
        "SELECT t.id, t.module_id, t.name, t.description, t.order_index, t.times_asked, \
                t.last_asked_date, t.freshness_score, t.created_at, t.updated_at \
         FROM syllabus_topics t \
         JOIN syllabus_modules m ON t.module_id = m.id \
         WHERE m.subject_id = $1 \
         ORDER BY m.module_number, t.order_index",
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_topic_by_name(
    executor: impl sqlx::PgExecutor<'_>,
    subject_id: &str,
    topic_name: &str,
) -> Result<Option<SyllabusTopic>, sqlx::Error> {
    sqlx::query_as::<_, SyllabusTopic>(
        "SELECT t.id, t.module_id, t.name, t.description, t.order_index, t.times_asked, \
                t.last_asked_date, t.freshness_score, t.created_at, t.updated_at \
         FROM syllabus_topics t \
         JOIN syllabus_modules m ON t.module_id = m.id \
         WHERE m.subject_id = $1 AND lower(t.name) = lower($2) \
         LIMIT 1",
    )
    .bind(subject_id)
    .bind(topic_name)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateModule<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) module_number: i32,
    pub(crate) name: &'a str,
    pub(crate) hours: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create_module(
    executor: impl sqlx::PgExecutor<'_>,
    module: CreateModule<'_>,
) -> Result<SyllabusModule, sqlx::Error> {
    sqlx::query_as::<_, SyllabusModule>(&format!(
        "INSERT INTO syllabus_modules (id, subject_id, module_number, name, hours, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MODULE_COLUMNS}"
    ))
    .bind(module.id)
    .bind(module.subject_id)
    .bind(module.module_number)
    .bind(module.name)
    .bind(module.hours)
    .bind(module.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateTopic<'a> {
    pub(crate) id: &'a str,
    pub(crate) module_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) order_index: i32,
    pub(crate) times_asked: i32,
    pub(crate) last_asked_date: Option<PrimitiveDateTime>,
    pub(crate) freshness_score: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create_topic(
    executor: impl sqlx::PgExecutor<'_>,
    topic: CreateTopic<'_>,
) -> Result<SyllabusTopic, sqlx::Error> {
    sqlx::query_as::<_, SyllabusTopic>(&format!(
        "INSERT INTO syllabus_topics \
         (id, module_id, name, description, order_index, times_asked, last_asked_date, \
          freshness_score, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {TOPIC_COLUMNS}"
    ))
    .bind(topic.id)
    .bind(topic.module_id)
    .bind(topic.name)
    .bind(topic.description)
    .bind(topic.order_index)
    .bind(topic.times_asked)
    .bind(topic.last_asked_date)
    .bind(topic.freshness_score)
    .bind(topic.created_at)
    .bind(topic.updated_at)
    .fetch_one(executor)
    .await
}

/// Record one more historical appearance of a topic. Last write wins under
/// concurrent ingestion; freshness is a soft ranking signal.
pub(crate) async fn record_topic_asked(
    executor: impl sqlx::PgExecutor<'_>,
    topic_id: &str,
    asked_at: PrimitiveDateTime,
    freshness_score: f64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE syllabus_topics \
         SET times_asked = times_asked + 1, last_asked_date = $2, freshness_score = $3, \
             updated_at = $4 \
         WHERE id = $1",
    )
    .bind(topic_id)
    .bind(asked_at)
    .bind(freshness_score)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete_modules_by_subject(
    executor: impl sqlx::PgExecutor<'_>,
    subject_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM syllabus_modules WHERE subject_id = $1")
        .bind(subject_id)
        .execute(executor)
        .await?;
    Ok(())
}
