use serde::{Deserialize, Serialize};

use crate::db::models::{SyllabusModule, SyllabusTopic};

/// Caller-editable inclusion/exclusion selection over one syllabus module.
/// Request-scoped value type; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ModuleScope {
    #[serde(alias = "moduleNumber")]
    pub(crate) module_number: i32,
    #[serde(alias = "moduleName")]
    pub(crate) module_name: String,
    #[serde(default = "default_included")]
    pub(crate) included: bool,
    pub(crate) topics: Vec<TopicScope>,
    #[serde(default)]
    #[serde(alias = "excludedTopics")]
    pub(crate) excluded_topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TopicScope {
    pub(crate) name: String,
    #[serde(default = "default_included")]
    pub(crate) included: bool,
}

const fn default_included() -> bool {
    true
}

/// A subject's stored syllabus, modules in sequence order with their topics
/// in order-index order.
#[derive(Debug, Clone)]
pub(crate) struct ModuleWithTopics {
    pub(crate) module: SyllabusModule,
    pub(crate) topics: Vec<SyllabusTopic>,
}

/// Default scope over a stored syllabus: every module and topic included.
pub(crate) fn default_scope(stored: &[ModuleWithTopics]) -> Vec<ModuleScope> {
    stored
        .iter()
        .map(|entry| ModuleScope {
            module_number: entry.module.module_number,
            module_name: entry.module.name.clone(),
            included: true,
            topics: entry
                .topics
                .iter()
                .map(|topic| TopicScope { name: topic.name.clone(), included: true })
                .collect(),
            excluded_topics: Vec::new(),
        })
        .collect()
}

/// Reconcile a caller-supplied scope against the authoritative syllabus.
///
/// The stored syllabus decides which modules and topics exist and in what
/// order; the caller's scope only contributes include/exclude toggles. Topics
/// added to storage after the caller's snapshot default to included; topics
/// the caller still lists but storage no longer has are dropped. The result
/// is a fixed point: applying it again returns it unchanged.
pub(crate) fn apply_scope(
    stored: &[ModuleWithTopics],
    caller: &[ModuleScope],
) -> Vec<ModuleScope> {
    stored
        .iter()
        .map(|entry| {
            let caller_module =
                caller.iter().find(|scope| scope.module_number == entry.module.module_number);

            let module_included = caller_module.map(|scope| scope.included).unwrap_or(true);

            let topics: Vec<TopicScope> = entry
                .topics
                .iter()
                .map(|topic| {
                    let included = caller_module
                        .map(|scope| topic_included(scope, &topic.name))
                        .unwrap_or(true);
                    TopicScope { name: topic.name.clone(), included }
                })
                .collect();

            let excluded_topics = topics
                .iter()
                .filter(|topic| !topic.included)
                .map(|topic| topic.name.clone())
                .collect();

            ModuleScope {
                module_number: entry.module.module_number,
                module_name: entry.module.name.clone(),
                included: module_included,
                topics,
                excluded_topics,
            }
        })
        .collect()
}

fn topic_included(scope: &ModuleScope, topic_name: &str) -> bool {
    if scope.excluded_topics.iter().any(|excluded| excluded == topic_name) {
        return false;
    }

    scope.topics.iter().find(|topic| topic.name == topic_name).map_or(true, |topic| topic.included)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn stored_module(number: i32, name: &str, topics: &[&str]) -> ModuleWithTopics {
        let now = primitive_now_utc();
        let module = SyllabusModule {
            id: format!("module-{number}"),
            subject_id: "subject-1".to_string(),
            module_number: number,
            name: name.to_string(),
            hours: None,
            created_at: now,
        };
        let topics = topics
            .iter()
            .enumerate()
            .map(|(index, topic)| SyllabusTopic {
                id: format!("topic-{number}-{index}"),
                module_id: module.id.clone(),
                name: topic.to_string(),
                description: None,
                order_index: index as i32,
                times_asked: 0,
                last_asked_date: None,
                freshness_score: 1.0,
                created_at: now,
                updated_at: now,
            })
            .collect();
        ModuleWithTopics { module, topics }
    }

    #[test]
    fn default_scope_includes_everything_in_stored_order() {
        let stored = vec![
            stored_module(1, "Thermodynamics", &["Entropy", "Enthalpy"]),
            stored_module(2, "Kinetics", &["Rate laws"]),
        ];

        let scope = default_scope(&stored);

        assert_eq!(scope.len(), 2);
        assert_eq!(scope[0].module_number, 1);
        assert!(scope[0].included);
        assert_eq!(scope[0].topics.len(), 2);
        assert!(scope[0].topics.iter().all(|topic| topic.included));
        assert!(scope[0].excluded_topics.is_empty());
        assert_eq!(scope[1].topics[0].name, "Rate laws");
    }

    #[test]
    fn default_scope_is_deterministic() {
        let stored = vec![stored_module(1, "Thermodynamics", &["Entropy", "Enthalpy"])];
        assert_eq!(default_scope(&stored), default_scope(&stored));
    }

    #[test]
    fn apply_scope_honors_caller_toggles() {
        let stored = vec![stored_module(1, "Thermodynamics", &["Entropy", "Enthalpy"])];
        let mut caller = default_scope(&stored);
        caller[0].topics[1].included = false;

        let effective = apply_scope(&stored, &caller);

        assert!(effective[0].topics[0].included);
        assert!(!effective[0].topics[1].included);
        assert_eq!(effective[0].excluded_topics, vec!["Enthalpy".to_string()]);
    }

    #[test]
    fn apply_scope_defaults_new_topics_to_included() {
        let old_stored = vec![stored_module(1, "Thermodynamics", &["Entropy"])];
        let mut caller = default_scope(&old_stored);
        caller[0].topics[0].included = false;

        // The syllabus gained a topic after the caller's snapshot.
        let stored = vec![stored_module(1, "Thermodynamics", &["Entropy", "Gibbs energy"])];
        let effective = apply_scope(&stored, &caller);

        assert_eq!(effective[0].topics.len(), 2);
        assert!(!effective[0].topics[0].included);
        assert!(effective[0].topics[1].included);
    }

    #[test]
    fn apply_scope_drops_topics_removed_from_storage() {
        let old_stored = vec![stored_module(1, "Thermodynamics", &["Entropy", "Phlogiston"])];
        let caller = default_scope(&old_stored);

        let stored = vec![stored_module(1, "Thermodynamics", &["Entropy"])];
        let effective = apply_scope(&stored, &caller);

        assert_eq!(effective[0].topics.len(), 1);
        assert_eq!(effective[0].topics[0].name, "Entropy");
    }

    #[test]
    fn apply_scope_respects_excluded_topics_list() {
        let stored = vec![stored_module(1, "Thermodynamics", &["Entropy", "Enthalpy"])];
        let mut caller = default_scope(&stored);
        caller[0].excluded_topics = vec!["Entropy".to_string()];

        let effective = apply_scope(&stored, &caller);

        assert!(!effective[0].topics[0].included);
        assert!(effective[0].topics[1].included);
    }

    #[test]
    fn apply_scope_is_idempotent() {
        let stored = vec![
            stored_module(1, "Thermodynamics", &["Entropy", "Enthalpy"]),
            stored_module(2, "Kinetics", &["Rate laws", "Catalysis"]),
        ];
        let mut caller = default_scope(&stored);
        caller[1].included = false;
        caller[0].topics[0].included = false;

        let once = apply_scope(&stored, &caller);
        let twice = apply_scope(&stored, &once);

        assert_eq!(once, twice);
    }

    #[test]
    fn fully_current_scope_is_a_fixed_point() {
        let stored = vec![stored_module(1, "Thermodynamics", &["Entropy", "Enthalpy"])];
        let scope = default_scope(&stored);

        assert_eq!(apply_scope(&stored, &scope), scope);
    }
}
