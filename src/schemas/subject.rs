use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime, Time,
};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Subject;
use crate::db::types::ExamType;
use crate::services::history::QuestionIngest;
use crate::services::scope::ModuleWithTopics;
use crate::services::syllabus::{ModuleUpload, TopicUpload};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectCreate {
    #[validate(length(min = 1, max = 32, message = "code must contain 1..32 characters"))]
    pub(crate) code: String,
    #[validate(length(min = 1, max = 300, message = "name must contain 1..300 characters"))]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

pub(crate) fn subject_to_response(subject: Subject) -> SubjectResponse {
    SubjectResponse {
        id: subject.id,
        code: subject.code,
        name: subject.name,
        created_at: format_primitive(subject.created_at),
        updated_at: format_primitive(subject.updated_at),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SyllabusUpload {
    #[validate(length(min = 1, message = "modules must not be empty"))]
    #[validate(nested)]
    pub(crate) modules: Vec<SyllabusModuleUpload>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct SyllabusModuleUpload {
    #[serde(alias = "moduleNumber")]
    #[validate(range(min = 1, message = "module_number must be positive"))]
    pub(crate) module_number: i32,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) hours: Option<i32>,
    #[validate(length(min = 1, message = "topics must not be empty"))]
    #[validate(nested)]
    pub(crate) topics: Vec<SyllabusTopicUpload>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct SyllabusTopicUpload {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

impl SyllabusUpload {
    pub(crate) fn into_uploads(self) -> Vec<ModuleUpload> {
        self.modules
            .into_iter()
            .map(|module| ModuleUpload {
                module_number: module.module_number,
                name: module.name,
                hours: module.hours,
                topics: module
                    .topics
                    .into_iter()
                    .map(|topic| TopicUpload { name: topic.name, description: topic.description })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SyllabusResponse {
    pub(crate) subject_id: String,
    pub(crate) modules: Vec<SyllabusModuleResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SyllabusModuleResponse {
    pub(crate) module_number: i32,
    pub(crate) name: String,
    pub(crate) hours: Option<i32>,
    pub(crate) topics: Vec<SyllabusTopicResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SyllabusTopicResponse {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) times_asked: i32,
    pub(crate) last_asked_date: Option<String>,
    pub(crate) freshness_score: f64,
}

pub(crate) fn syllabus_to_response(
    subject_id: &str,
    stored: Vec<ModuleWithTopics>,
) -> SyllabusResponse {
    SyllabusResponse {
        subject_id: subject_id.to_string(),
        modules: stored
            .into_iter()
            .map(|entry| SyllabusModuleResponse {
                module_number: entry.module.module_number,
                name: entry.module.name,
                hours: entry.module.hours,
                topics: entry
                    .topics
                    .into_iter()
                    .map(|topic| SyllabusTopicResponse {
                        name: topic.name,
                        description: topic.description,
                        times_asked: topic.times_asked,
                        last_asked_date: topic.last_asked_date.map(format_primitive),
                        freshness_score: topic.freshness_score,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionsIngest {
    #[validate(length(min = 1, max = 500, message = "questions must contain 1..500 items"))]
    #[validate(nested)]
    pub(crate) questions: Vec<HistoricalQuestionCreate>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct HistoricalQuestionCreate {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub(crate) text: String,
    #[validate(range(min = 0, message = "marks must be non-negative"))]
    pub(crate) marks: i32,
    #[serde(alias = "examType")]
    pub(crate) exam_type: ExamType,
    #[serde(default)]
    #[serde(alias = "moduleLabel")]
    pub(crate) module_label: Option<String>,
    #[serde(default)]
    #[serde(alias = "topicLabel")]
    pub(crate) topic_label: Option<String>,
    #[serde(default)]
    #[serde(alias = "askedAt")]
    #[serde(deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) asked_at: Option<OffsetDateTime>,
}

impl QuestionsIngest {
    pub(crate) fn into_items(self) -> Vec<QuestionIngest> {
        self.questions
            .into_iter()
            .map(|question| QuestionIngest {
                text: question.text,
                marks: question.marks,
                exam_type: question.exam_type,
                module_label: question.module_label,
                topic_label: question.topic_label,
                asked_at: question
                    .asked_at
                    .map(|value| PrimitiveDateTime::new(value.date(), value.time())),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionsIngestResponse {
    pub(crate) inserted: usize,
    pub(crate) topics_updated: usize,
    pub(crate) total_questions: i64,
}

fn parse_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Exam archives usually carry a bare date.
    if let Ok(date) = time::Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Some(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_option_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_datetime_accepts_rfc3339() {
        let parsed = parse_datetime_flexible("2024-11-02T09:30:00Z").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.hour(), 9);
    }

    #[test]
    fn parse_datetime_accepts_bare_date() {
        let parsed = parse_datetime_flexible("2024-11-02").unwrap();
        assert_eq!(parsed.day(), 2);
        assert_eq!(parsed.hour(), 0);
    }

    #[test]
    fn parse_datetime_rejects_garbage() {
        assert!(parse_datetime_flexible("next tuesday").is_none());
    }
}
