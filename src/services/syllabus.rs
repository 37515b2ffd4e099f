use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::error::PredictionError;
use crate::services::freshness;
use crate::services::scope::ModuleWithTopics;

/// Load the current syllabus for a subject, modules in sequence order with
/// topics in order-index order. A subject without a syllabus is a
/// `NotFound`: the caller has to upload one first.
pub(crate) async fn load_syllabus(
    pool: &PgPool,
    subject_id: &str,
) -> Result<Vec<ModuleWithTopics>, PredictionError> {
    let modules = repositories::syllabus::list_modules(pool, subject_id).await?;
    if modules.is_empty() {
        return Err(PredictionError::NotFound(format!(
            "No syllabus found for subject {subject_id}; upload a syllabus first"
        )));
    }

    let mut stored = Vec::with_capacity(modules.len());
    for module in modules {
        let topics = repositories::syllabus::list_topics_by_module(pool, &module.id).await?;
        stored.push(ModuleWithTopics { module, topics });
    }

    Ok(stored)
}

#[derive(Debug, Clone)]
pub(crate) struct ModuleUpload {
    pub(crate) module_number: i32,
    pub(crate) name: String,
    pub(crate) hours: Option<i32>,
    pub(crate) topics: Vec<TopicUpload>,
}

#[derive(Debug, Clone)]
pub(crate) struct TopicUpload {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
}

/// Full replace of a subject's syllabus. Topics whose names survive the
/// replace keep their ask history (`times_asked`, `last_asked_date`) and get
/// their freshness recomputed; genuinely new topics start never-asked.
pub(crate) async fn replace_syllabus(
    pool: &PgPool,
    subject_id: &str,
    modules: Vec<ModuleUpload>,
    half_life_days: f64,
) -> Result<Vec<ModuleWithTopics>, PredictionError> {
    let subject = repositories::subjects::find_by_id(pool, subject_id)
        .await?
        .ok_or_else(|| PredictionError::NotFound(format!("Subject {subject_id} not found")))?;

    let existing = repositories::syllabus::list_topics_by_subject(pool, &subject.id).await?;
    let history: HashMap<String, (i32, Option<PrimitiveDateTime>)> = existing
        .into_iter()
        .map(|topic| {
            (topic.name.to_lowercase(), (topic.times_asked, topic.last_asked_date))
        })
        .collect();

    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;

    repositories::syllabus::delete_modules_by_subject(&mut *tx, &subject.id).await?;

    let mut stored = Vec::with_capacity(modules.len());
    for upload in modules {
        let module_id = Uuid::new_v4().to_string();
        let module = repositories::syllabus::create_module(
            &mut *tx,
            repositories::syllabus::CreateModule {
                id: &module_id,
                subject_id: &subject.id,
                module_number: upload.module_number,
                name: &upload.name,
                hours: upload.hours,
                created_at: now,
            },
        )
        .await?;

        let mut topics = Vec::with_capacity(upload.topics.len());
        for (index, topic) in upload.topics.into_iter().enumerate() {
            let (times_asked, last_asked_date) =
                history.get(&topic.name.to_lowercase()).copied().unwrap_or((0, None));
            let score = freshness::score(times_asked, last_asked_date, now, half_life_days);

            let topic_id = Uuid::new_v4().to_string();
            let created = repositories::syllabus::create_topic(
                &mut *tx,
                repositories::syllabus::CreateTopic {
                    id: &topic_id,
                    module_id: &module.id,
                    name: &topic.name,
                    description: topic.description.as_deref(),
                    order_index: index as i32,
                    times_asked,
                    last_asked_date,
                    freshness_score: score,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;
            topics.push(created);
        }

        stored.push(ModuleWithTopics { module, topics });
    }

    tx.commit().await?;

    tracing::info!(
        subject_id = %subject.id,
        modules = stored.len(),
        "Syllabus replaced"
    );

    Ok(stored)
}
