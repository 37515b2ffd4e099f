use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{PredictedQuestion, Prediction};
use crate::db::types::{DifficultyLevel, ExamType};
use crate::services::scope::ModuleScope;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PredictionCreate {
    #[serde(alias = "subjectId")]
    #[validate(length(min = 1, message = "subject_id must not be empty"))]
    pub(crate) subject_id: String,
    #[serde(alias = "examType")]
    pub(crate) exam_type: ExamType,
    #[serde(default)]
    #[serde(alias = "syllabusScope")]
    pub(crate) syllabus_scope: Option<Vec<ModuleScope>>,
    #[serde(default)]
    #[serde(alias = "questionCount")]
    #[validate(range(min = 1, max = 50, message = "question_count must be between 1 and 50"))]
    pub(crate) question_count: Option<u64>,
    #[serde(default)]
    #[serde(alias = "useWebSearch")]
    pub(crate) use_web_search: bool,
    #[serde(default = "default_use_thinking_model")]
    #[serde(alias = "useThinkingModel")]
    pub(crate) use_thinking_model: bool,
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    #[serde(alias = "targetLabel")]
    pub(crate) target_label: Option<String>,
}

const fn default_use_thinking_model() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PredictionValidate {
    #[serde(alias = "accuracyScore")]
    #[validate(range(min = 0.0, max = 1.0, message = "accuracy_score must be within [0, 1]"))]
    pub(crate) accuracy_score: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictedQuestionResponse {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) probability: f64,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) marks: i32,
    pub(crate) module: Option<String>,
    pub(crate) topic: Option<String>,
    pub(crate) reasoning: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionResponse {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) exam_type: ExamType,
    pub(crate) target_label: Option<String>,
    pub(crate) model_used: String,
    pub(crate) confidence: f64,
    pub(crate) accuracy_score: Option<f64>,
    pub(crate) validated_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) questions: Vec<PredictedQuestionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionSummaryResponse {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) exam_type: ExamType,
    pub(crate) model_used: String,
    pub(crate) confidence: f64,
    pub(crate) accuracy_score: Option<f64>,
    pub(crate) created_at: String,
}

pub(crate) fn prediction_to_response(
    prediction: Prediction,
    questions: Vec<PredictedQuestion>,
) -> PredictionResponse {
    PredictionResponse {
        id: prediction.id,
        subject_id: prediction.subject_id,
        exam_type: prediction.exam_type,
        target_label: prediction.target_label,
        model_used: prediction.model_used,
        confidence: prediction.confidence,
        accuracy_score: prediction.accuracy_score,
        validated_at: prediction.validated_at.map(format_primitive),
        created_at: format_primitive(prediction.created_at),
        questions: questions.into_iter().map(question_to_response).collect(),
    }
}

pub(crate) fn question_to_response(question: PredictedQuestion) -> PredictedQuestionResponse {
    PredictedQuestionResponse {
        id: question.id,
        text: question.question_text,
        probability: question.probability,
        difficulty: question.difficulty,
        marks: question.marks,
        module: question.module_label,
        topic: question.topic_label,
        reasoning: question.reasoning.0,
    }
}

pub(crate) fn prediction_to_summary(prediction: Prediction) -> PredictionSummaryResponse {
    PredictionSummaryResponse {
        id: prediction.id,
        subject_id: prediction.subject_id,
        exam_type: prediction.exam_type,
        model_used: prediction.model_used,
        confidence: prediction.confidence,
        accuracy_score: prediction.accuracy_score,
        created_at: format_primitive(prediction.created_at),
    }
}
