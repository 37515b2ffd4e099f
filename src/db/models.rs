use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DifficultyLevel, ExamType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SyllabusModule {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) module_number: i32,
    pub(crate) name: String,
    pub(crate) hours: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SyllabusTopic {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) order_index: i32,
    pub(crate) times_asked: i32,
    pub(crate) last_asked_date: Option<PrimitiveDateTime>,
    pub(crate) freshness_score: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct HistoricalQuestion {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) question_text: String,
    pub(crate) marks: i32,
    pub(crate) exam_type: ExamType,
    pub(crate) module_label: Option<String>,
    pub(crate) topic_label: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Prediction {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) exam_type: ExamType,
    pub(crate) target_label: Option<String>,
    pub(crate) model_used: String,
    pub(crate) confidence: f64,
    pub(crate) accuracy_score: Option<f64>,
    pub(crate) validated_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct PredictedQuestion {
    pub(crate) id: String,
    pub(crate) prediction_id: String,
    pub(crate) question_text: String,
    pub(crate) probability: f64,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) marks: i32,
    pub(crate) module_label: Option<String>,
    pub(crate) topic_label: Option<String>,
    pub(crate) reasoning: Json<Vec<String>>,
    pub(crate) order_index: i32,
}
