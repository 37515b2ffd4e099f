use std::cmp::Ordering;

use time::PrimitiveDateTime;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Freshness of a topic in [0, 1]: how "due" it is for re-examination.
///
/// The score is the product of a recency factor and a frequency factor.
/// Recency grows toward 1.0 the longer a topic has gone unasked
/// (`days / (days + half_life)`), and is exactly 1.0 for a topic never asked,
/// so a never-asked topic always tops its frequency bucket. Frequency is
/// `1 / (1 + times_asked)`. Both factors shrink as the topic is asked more
/// recently or more often, which gives the required monotonicity in each
/// argument independently.
pub(crate) fn score(
    times_asked: i32,
    last_asked_date: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
    half_life_days: f64,
) -> f64 {
    let frequency = 1.0 / (1.0 + f64::from(times_asked.max(0)));

    let recency = match last_asked_date {
        None => 1.0,
        Some(asked) => {
            let days = ((now - asked).as_seconds_f64() / SECONDS_PER_DAY).max(0.0);
            days / (days + half_life_days)
        }
    };

    (recency * frequency).clamp(0.0, 1.0)
}

/// One topic in the freshness ranking handed to the prompt compiler.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RankedTopic {
    pub(crate) module_number: i32,
    pub(crate) module_name: String,
    pub(crate) topic_name: String,
    pub(crate) score: f64,
}

/// Sort descending by score with a stable tie-break on topic name, and keep
/// only the top `top_k` entries.
pub(crate) fn rank(mut topics: Vec<RankedTopic>, top_k: usize) -> Vec<RankedTopic> {
    topics.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.topic_name.cmp(&b.topic_name))
    });
    topics.truncate(top_k);
    topics
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    const HALF_LIFE: f64 = 180.0;

    fn at(year: i32, month: time::Month, day: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(year, month, day).unwrap();
        PrimitiveDateTime::new(date, Time::MIDNIGHT)
    }

    fn now() -> PrimitiveDateTime {
        at(2026, time::Month::June, 1)
    }

    #[test]
    fn never_asked_beats_any_asked_topic_in_same_frequency_bucket() {
        let unasked = score(3, None, now(), HALF_LIFE);
        let long_ago = score(3, Some(at(2015, time::Month::January, 1)), now(), HALF_LIFE);
        assert!(unasked > long_ago);
        assert!(unasked <= 1.0);
    }

    #[test]
    fn more_recent_ask_scores_lower_at_equal_frequency() {
        let recent = score(2, Some(at(2026, time::Month::May, 1)), now(), HALF_LIFE);
        let older = score(2, Some(at(2024, time::Month::May, 1)), now(), HALF_LIFE);
        assert!(recent < older);
    }

    #[test]
    fn higher_frequency_scores_lower_at_equal_recency() {
        let asked_at = Some(at(2025, time::Month::June, 1));
        let rare = score(1, asked_at, now(), HALF_LIFE);
        let common = score(6, asked_at, now(), HALF_LIFE);
        assert!(common < rare);
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        let fresh = score(0, None, now(), HALF_LIFE);
        assert_eq!(fresh, 1.0);

        // Asked "in the future" relative to now must not go negative.
        let future = score(0, Some(at(2027, time::Month::January, 1)), now(), HALF_LIFE);
        assert_eq!(future, 0.0);
    }

    #[test]
    fn rank_sorts_descending_and_breaks_ties_by_name() {
        let entry = |name: &str, score: f64| RankedTopic {
            module_number: 1,
            module_name: "Module".to_string(),
            topic_name: name.to_string(),
            score,
        };

        let ranked = rank(
            vec![entry("Osmosis", 0.5), entry("Diffusion", 0.5), entry("Enzymes", 0.9)],
            2,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].topic_name, "Enzymes");
        assert_eq!(ranked[1].topic_name, "Diffusion");
    }
}
