use std::fmt::Write as _;

use crate::db::types::ExamType;
use crate::services::freshness::RankedTopic;
use crate::services::history::HistoryEntry;
use crate::services::scope::ModuleScope;

/// Output-format contract embedded in every prompt. This block is the defense
/// against unparseable model output and must stay in sync with the shapes
/// `response::parse_predictions` accepts.
const OUTPUT_CONTRACT: &str = "\
Respond with ONLY a JSON array and nothing else: no prose before or after, \
no markdown code fences. Each element must be an object with exactly these \
fields:
  \"id\": string identifier,
  \"text\": the full question text,
  \"probability\": number between 0.0 and 1.0,
  \"module\": name of the syllabus module the question targets,
  \"topic\": name of the topic the question targets,
  \"difficulty\": one of \"EASY\", \"MEDIUM\", \"HARD\",
  \"marks\": non-negative integer,
  \"reasoning\": array of short strings justifying the prediction.";

#[derive(Debug, Clone)]
pub(crate) struct PromptConfig {
    pub(crate) subject_name: String,
    pub(crate) subject_code: String,
    pub(crate) exam_type: ExamType,
    pub(crate) question_count: usize,
}

/// Deterministically assemble the generation prompt. No randomness and no
/// clock reads: everything dynamic arrives through the arguments, so equal
/// inputs always produce the identical string.
pub(crate) fn compile_prompt(
    config: &PromptConfig,
    scope: &[ModuleScope],
    ranking: &[RankedTopic],
    history: &[HistoryEntry],
) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are an experienced university examiner. Predict the {} most likely \
         questions for the upcoming {} exam in {} ({}).",
        config.question_count,
        config.exam_type.as_str(),
        config.subject_name,
        config.subject_code
    );

    prompt.push_str("\n## Syllabus scope\n");
    prompt.push_str("Only the modules and topics listed below are in scope.\n");
    for module in scope {
        if !module.included {
            continue;
        }
        let _ = writeln!(prompt, "Module {}: {}", module.module_number, module.module_name);
        for topic in &module.topics {
            if topic.included {
                let _ = writeln!(prompt, "  - {}", topic.name);
            }
        }
    }

    if !ranking.is_empty() {
        prompt.push_str("\n## Topic freshness ranking\n");
        prompt.push_str(
            "Topics ranked by how due they are for re-examination (higher score = \
             not asked recently or rarely asked). Favor high-ranked topics.\n",
        );
        for (index, entry) in ranking.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. {} (Module {}: {}) score {:.3}",
                index + 1,
                entry.topic_name,
                entry.module_number,
                entry.module_name,
                entry.score
            );
        }
    }

    // An empty history section would only confuse the model; omit it outright.
    if !history.is_empty() {
        prompt.push_str("\n## Historical questions\n");
        prompt.push_str(
            "Past questions for this subject, most recent first. Match their style, \
             depth and marks distribution; do not repeat them verbatim.\n",
        );
        for entry in history {
            let module = entry.module_label.as_deref().unwrap_or("unknown module");
            let topic = entry.topic_label.as_deref().unwrap_or("unknown topic");
            let _ = writeln!(
                prompt,
                "- [{}, {} marks, {} / {}] {}",
                entry.exam_type.as_str(),
                entry.marks,
                module,
                topic,
                entry.text
            );
        }
    }

    prompt.push_str("\n## Output format\n");
    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scope::TopicScope;

    fn config() -> PromptConfig {
        PromptConfig {
            subject_name: "Organic Chemistry".to_string(),
            subject_code: "CHEM-201".to_string(),
            exam_type: ExamType::Midterm1,
            question_count: 10,
        }
    }

    fn module(number: i32, name: &str, topics: &[&str]) -> ModuleScope {
        ModuleScope {
            module_number: number,
            module_name: name.to_string(),
            included: true,
            topics: topics
                .iter()
                .map(|topic| TopicScope { name: topic.to_string(), included: true })
                .collect(),
            excluded_topics: Vec::new(),
        }
    }

    fn ranking_for(scope: &[ModuleScope]) -> Vec<RankedTopic> {
        scope
            .iter()
            .flat_map(|module| {
                module.topics.iter().map(|topic| RankedTopic {
                    module_number: module.module_number,
                    module_name: module.module_name.clone(),
                    topic_name: topic.name.clone(),
                    score: 0.8,
                })
            })
            .collect()
    }

    #[test]
    fn omits_history_section_when_history_is_empty() {
        let scope = vec![
            module(1, "Alkanes", &["Nomenclature", "Isomerism", "Radical halogenation"]),
            module(2, "Alkenes", &["Addition reactions", "Markovnikov's rule"]),
        ];
        let ranking = ranking_for(&scope);

        let prompt = compile_prompt(&config(), &scope, &ranking, &[]);

        assert!(!prompt.contains("Historical questions"));
        for name in [
            "Nomenclature",
            "Isomerism",
            "Radical halogenation",
            "Addition reactions",
            "Markovnikov's rule",
        ] {
            assert!(prompt.contains(name), "missing topic {name}");
        }
        assert_eq!(prompt.matches("score 0.800").count(), 5);
        assert!(prompt.contains("MIDTERM_1"));
    }

    #[test]
    fn skips_excluded_modules_and_topics() {
        let mut scope = vec![
            module(1, "Alkanes", &["Nomenclature", "Isomerism"]),
            module(2, "Alkenes", &["Addition reactions"]),
        ];
        scope[0].topics[1].included = false;
        scope[1].included = false;

        let prompt = compile_prompt(&config(), &scope, &[], &[]);

        assert!(prompt.contains("Nomenclature"));
        assert!(!prompt.contains("Isomerism"));
        assert!(!prompt.contains("Alkenes"));
    }

    #[test]
    fn includes_history_entries_with_labels() {
        let scope = vec![module(1, "Alkanes", &["Nomenclature"])];
        let history = vec![HistoryEntry {
            text: "Name the compound CH3-CH2-CH3.".to_string(),
            marks: 5,
            exam_type: ExamType::EndTerm,
            module_label: Some("Alkanes".to_string()),
            topic_label: None,
        }];

        let prompt = compile_prompt(&config(), &scope, &[], &history);

        assert!(prompt.contains("## Historical questions"));
        assert!(prompt.contains("[END_TERM, 5 marks, Alkanes / unknown topic]"));
    }

    #[test]
    fn output_is_deterministic() {
        let scope = vec![module(1, "Alkanes", &["Nomenclature", "Isomerism"])];
        let ranking = ranking_for(&scope);

        let first = compile_prompt(&config(), &scope, &ranking, &[]);
        let second = compile_prompt(&config(), &scope, &ranking, &[]);

        assert_eq!(first, second);
    }

    #[test]
    fn always_ends_with_the_output_contract() {
        let prompt = compile_prompt(&config(), &[], &[], &[]);
        assert!(prompt.trim_end().ends_with(OUTPUT_CONTRACT.trim_end()));
    }
}
