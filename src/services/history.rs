use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::types::ExamType;
use crate::repositories;
use crate::services::error::PredictionError;
use crate::services::freshness;

/// One historical question as handed to the prompt compiler: labels joined,
/// text bounded.
#[derive(Debug, Clone)]
pub(crate) struct HistoryEntry {
    pub(crate) text: String,
    pub(crate) marks: i32,
    pub(crate) exam_type: ExamType,
    pub(crate) module_label: Option<String>,
    pub(crate) topic_label: Option<String>,
}

/// Most-recent-first sample of a subject's historical questions. The sample
/// is capped at `limit` rows and each text at `max_chars` characters so the
/// downstream prompt stays bounded. Zero history is a valid result.
pub(crate) async fn load_history(
    pool: &PgPool,
    subject_id: &str,
    limit: i64,
    max_chars: usize,
) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    let rows = repositories::questions::list_recent_by_subject(pool, subject_id, limit).await?;

    Ok(rows
        .into_iter()
        .map(|row| HistoryEntry {
            text: truncate_text(&row.question_text, max_chars),
            marks: row.marks,
            exam_type: row.exam_type,
            module_label: row.module_label,
            topic_label: row.topic_label,
        })
        .collect())
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let mut truncated: String = trimmed.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionIngest {
    pub(crate) text: String,
    pub(crate) marks: i32,
    pub(crate) exam_type: ExamType,
    pub(crate) module_label: Option<String>,
    pub(crate) topic_label: Option<String>,
    pub(crate) asked_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct IngestOutcome {
    pub(crate) inserted: usize,
    pub(crate) topics_updated: usize,
}

/// Record extracted past-exam questions and refresh the freshness fields of
/// every syllabus topic they implicate. Topic matching is by name, case
/// insensitive; an unmatched label still stores the question, it just cannot
/// feed the freshness model.
pub(crate) async fn ingest_questions(
    pool: &PgPool,
    subject_id: &str,
    items: Vec<QuestionIngest>,
    half_life_days: f64,
) -> Result<IngestOutcome, PredictionError> {
    let subject = repositories::subjects::find_by_id(pool, subject_id)
        .await?
        .ok_or_else(|| PredictionError::NotFound(format!("Subject {subject_id} not found")))?;

    let now = primitive_now_utc();
    let mut inserted = 0;
    let mut topics_updated = 0;

    let mut tx = pool.begin().await?;

    for item in items {
        let question_id = Uuid::new_v4().to_string();
        let asked_at = item.asked_at.unwrap_or(now);

        repositories::questions::create(
            &mut *tx,
            repositories::questions::CreateHistoricalQuestion {
                id: &question_id,
                subject_id: &subject.id,
                question_text: &item.text,
                marks: item.marks,
                exam_type: item.exam_type,
                module_label: item.module_label.as_deref(),
                topic_label: item.topic_label.as_deref(),
                created_at: asked_at,
            },
        )
        .await?;
        inserted += 1;

        let Some(topic_label) = item.topic_label.as_deref() else {
            continue;
        };

        let topic =
            repositories::syllabus::find_topic_by_name(&mut *tx, &subject.id, topic_label).await?;

        let Some(topic) = topic else {
            tracing::debug!(
                subject_id = %subject.id,
                topic_label,
                "Historical question topic label did not match any syllabus topic"
            );
            continue;
        };

        let last_asked = match topic.last_asked_date {
            Some(existing) if existing > asked_at => existing,
            _ => asked_at,
        };
        let new_score =
            freshness::score(topic.times_asked + 1, Some(last_asked), now, half_life_days);

        repositories::syllabus::record_topic_asked(
            &mut *tx,
            &topic.id,
            last_asked,
            new_score,
            now,
        )
        .await?;
        topics_updated += 1;
    }

    tx.commit().await?;

    tracing::info!(
        subject_id = %subject.id,
        inserted,
        topics_updated,
        "Historical questions ingested"
    );

    Ok(IngestOutcome { inserted, topics_updated })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_text_keeps_short_text_unchanged() {
        assert_eq!(truncate_text("  What is entropy?  ", 400), "What is entropy?");
    }

    #[test]
    fn truncate_text_caps_long_text_on_char_boundary() {
        let long = "x".repeat(500);
        let truncated = truncate_text(&long, 400);
        assert_eq!(truncated.chars().count(), 403);
        assert!(truncated.ends_with("..."));
    }
}
