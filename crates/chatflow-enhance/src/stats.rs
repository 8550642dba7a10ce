//! Descriptive statistics over an event log

use crate::log::{Case, EventLog};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Bot-level summary of a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStatistics {
    /// Number of cases
    pub number_of_conversations: usize,
    /// Distinct activity names
    pub number_of_states: usize,
    /// Distinct users
    pub number_of_users: usize,
    /// Mean events per case
    pub average_conversation_length: f64,
    /// Mean case duration in seconds
    pub average_conversation_duration: f64,
}

impl LogStatistics {
    /// Compute statistics; an empty log yields all zeros
    #[must_use]
    pub fn compute(log: &EventLog) -> Self {
        let cases = log.cases();
        if cases.is_empty() {
            return Self::default();
        }

        let states: BTreeSet<&str> = log.events().iter().map(|e| e.activity.as_str()).collect();
        let users: BTreeSet<&str> = log.events().iter().filter_map(|e| e.user.as_deref()).collect();
        #[allow(clippy::cast_precision_loss)]
        let n = cases.len() as f64;
        #[allow(clippy::cast_precision_loss)]
        let total_events = log.len() as f64;
        let total_duration: f64 = cases.values().map(|c| case_span(c).2).sum();

        Self {
            number_of_conversations: cases.len(),
            number_of_states: states.len(),
            number_of_users: users.len(),
            average_conversation_length: total_events / n,
            average_conversation_duration: total_duration / n,
        }
    }
}

/// Throughput summary of one case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSummary {
    /// Case id
    pub case_id: String,
    /// Earliest timestamp
    pub started: Option<DateTime<Utc>>,
    /// Latest timestamp
    pub ended: Option<DateTime<Utc>>,
    /// `ended - started` in seconds, 0 without timestamps
    pub duration_secs: f64,
    /// Activity sequence
    pub trace: Vec<String>,
}

impl EventLog {
    /// Per-case throughput summaries, ascending case id
    #[must_use]
    pub fn case_summaries(&self) -> Vec<CaseSummary> {
        self.cases()
            .values()
            .map(|case| {
                let (started, ended, duration_secs) = case_span(case);
                CaseSummary {
                    case_id: case.id.to_string(),
                    started,
                    ended,
                    duration_secs,
                    trace: case.activities(),
                }
            })
            .collect()
    }
}

fn case_span(case: &Case<'_>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>, f64) {
    let stamps = case.events.iter().filter_map(|e| e.timestamp);
    let started = stamps.clone().min();
    let ended = stamps.max();
    let duration = match (started, ended) {
        (Some(s), Some(e)) => seconds(e - s),
        _ => 0.0,
    };
    (started, ended, duration)
}

/// Signed duration as fractional seconds
#[allow(clippy::cast_precision_loss)]
pub(crate) fn seconds(delta: chrono::Duration) -> f64 {
    delta.num_milliseconds() as f64 / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Event;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn empty_log_is_all_zero() {
        assert_eq!(LogStatistics::compute(&EventLog::default()), LogStatistics::default());
    }

    #[test]
    fn aggregates_over_cases() {
        let log = EventLog::new(vec![
            Event::new("c1", "greet").with_timestamp(at(0)).with_user("u1"),
            Event::new("c1", "menu").with_timestamp(at(30)).with_user("u1"),
            Event::new("c2", "greet").with_timestamp(at(100)).with_user("u2"),
            Event::new("c2", "menu").with_timestamp(at(110)),
            Event::new("c2", "bye").with_timestamp(at(190)),
        ]);

        let stats = LogStatistics::compute(&log);
        assert_eq!(stats.number_of_conversations, 2);
        assert_eq!(stats.number_of_states, 3);
        assert_eq!(stats.number_of_users, 2);
        assert!((stats.average_conversation_length - 2.5).abs() < f64::EPSILON);
        assert!((stats.average_conversation_duration - 60.0).abs() < 1e-9);
    }

    #[test]
    fn stats_serialize_camel_case() {
        let json = serde_json::to_value(LogStatistics::default()).unwrap();
        assert!(json.get("numberOfConversations").is_some());
        assert!(json.get("averageConversationDuration").is_some());
    }

    #[test]
    fn case_summaries_report_duration_and_trace() {
        let log = EventLog::new(vec![
            Event::new("c1", "greet").with_timestamp(at(5)),
            Event::new("c1", "menu").with_timestamp(at(65)),
            Event::new("c2", "untimed"),
        ]);

        let summaries = log.case_summaries();
        assert_eq!(summaries.len(), 2);
        assert!((summaries[0].duration_secs - 60.0).abs() < 1e-9);
        assert_eq!(summaries[0].trace, vec!["greet", "menu"]);
        assert_eq!(summaries[1].started, None);
        assert!(summaries[1].duration_secs.abs() < f64::EPSILON);
    }
}
