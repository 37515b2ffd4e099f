use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{PredictedQuestion, Prediction};
use crate::db::types::ExamType;
use crate::repositories;
use crate::services::error::PredictionError;
use crate::services::freshness::{self, RankedTopic};
use crate::services::history;
use crate::services::prompt::{self, PromptConfig};
use crate::services::response;
use crate::services::scope::{self, ModuleScope};
use crate::services::syllabus;

#[derive(Debug, Clone)]
pub(crate) struct PredictionRequest {
    pub(crate) subject_id: String,
    pub(crate) exam_type: ExamType,
    pub(crate) scope: Option<Vec<ModuleScope>>,
    pub(crate) question_count: Option<u64>,
    pub(crate) use_thinking_model: bool,
    pub(crate) model: Option<String>,
    pub(crate) target_label: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct PredictionOutcome {
    pub(crate) prediction: Prediction,
    pub(crate) questions: Vec<PredictedQuestion>,
}

/// The whole pipeline for one request, strictly sequential: resolve scope,
/// rank freshness, sample history, compile the prompt, call the model chain,
/// validate, persist. Nothing is written until the terminal success; every
/// error is terminal for this request.
pub(crate) async fn run(
    state: &AppState,
    request: PredictionRequest,
) -> Result<PredictionOutcome, PredictionError> {
    let settings = state.settings();
    let pool = state.db();

    let subject = repositories::subjects::find_by_id(pool, &request.subject_id)
        .await?
        .ok_or_else(|| {
            PredictionError::NotFound(format!("Subject {} not found", request.subject_id))
        })?;

    let stored = syllabus::load_syllabus(pool, &subject.id).await?;

    let effective = match &request.scope {
        Some(caller) => scope::apply_scope(&stored, caller),
        None => scope::default_scope(&stored),
    };

    let now = primitive_now_utc();
    let half_life = settings.prediction().freshness_half_life_days;
    let mut entries = Vec::new();
    for (stored_module, module_scope) in stored.iter().zip(&effective) {
        if !module_scope.included {
            continue;
        }
        for (topic, topic_scope) in stored_module.topics.iter().zip(&module_scope.topics) {
            if !topic_scope.included {
                continue;
            }
            entries.push(RankedTopic {
                module_number: stored_module.module.module_number,
                module_name: stored_module.module.name.clone(),
                topic_name: topic.name.clone(),
                score: freshness::score(topic.times_asked, topic.last_asked_date, now, half_life),
            });
        }
    }

    if entries.is_empty() {
        return Err(PredictionError::Validation(
            "The supplied scope excludes every topic of the syllabus".to_string(),
        ));
    }

    let ranking = freshness::rank(entries, settings.prediction().freshness_top_k as usize);

    let history_entries = history::load_history(
        pool,
        &subject.id,
        settings.prediction().history_limit as i64,
        settings.prediction().history_max_chars as usize,
    )
    .await?;

    let question_count = request
        .question_count
        .unwrap_or(settings.prediction().default_question_count)
        .clamp(1, settings.prediction().max_question_count) as usize;

    let compiled = prompt::compile_prompt(
        &PromptConfig {
            subject_name: subject.name.clone(),
            subject_code: subject.code.clone(),
            exam_type: request.exam_type,
            question_count,
        },
        &effective,
        &ranking,
        &history_entries,
    );

    let preferred = request.model.clone().unwrap_or_else(|| {
        if request.use_thinking_model {
            settings.gemini().thinking_model.clone()
        } else {
            settings.gemini().model.clone()
        }
    });
    let chain = settings.gemini().model_chain(&preferred);

    tracing::info!(
        subject_id = %subject.id,
        exam_type = %request.exam_type.as_str(),
        prompt_chars = compiled.len(),
        history_entries = history_entries.len(),
        "Sending prediction request"
    );

    let outcome = state.generation().generate(&compiled, &chain).await?;

    let validated = response::parse_predictions(&outcome.text)?;
    let confidence = response::mean_confidence(&validated);

    let created_at = primitive_now_utc();
    let prediction_id = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;
    let prediction = repositories::predictions::create(
        &mut *tx,
        repositories::predictions::CreatePrediction {
            id: &prediction_id,
            subject_id: &subject.id,
            exam_type: request.exam_type,
            target_label: request.target_label.as_deref(),
            model_used: &outcome.model,
            confidence,
            created_at,
        },
    )
    .await?;

    let mut questions = Vec::with_capacity(validated.len());
    for (index, question) in validated.iter().enumerate() {
        let question_id = Uuid::new_v4().to_string();
        let created = repositories::predictions::create_question(
            &mut *tx,
            repositories::predictions::CreatePredictedQuestion {
                id: &question_id,
                prediction_id: &prediction.id,
                question_text: &question.text,
                probability: question.probability,
                difficulty: question.difficulty,
                marks: question.marks,
                module_label: question.module.as_deref(),
                topic_label: question.topic.as_deref(),
                reasoning: &question.reasoning,
                order_index: index as i32,
            },
        )
        .await?;
        questions.push(created);
    }
    tx.commit().await?;

    tracing::info!(
        prediction_id = %prediction.id,
        model = %prediction.model_used,
        questions = questions.len(),
        confidence,
        "Prediction persisted"
    );

    Ok(PredictionOutcome { prediction, questions })
}
