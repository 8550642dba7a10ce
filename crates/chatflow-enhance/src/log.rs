//! Event log model
//!
//! Events are grouped by case; a case's events are ordered by timestamp
//! (stable, so untimed events keep their log order). Cases with the same
//! activity sequence form a [`Variant`].

use crate::error::LogError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Lifecycle phase of an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Activity started
    Start,
    /// Activity completed
    #[default]
    Complete,
    /// Any other phase
    #[serde(other)]
    Other,
}

/// Who produced the event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Message sent by a user
    #[default]
    UserMessage,
    /// Bot called an external service
    ServiceRequest,
    /// Message sent by the bot
    BotMessage,
    /// Unrecognized type
    #[serde(other)]
    Other,
}

/// One logged event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Conversation (case) id
    pub case_id: String,
    /// Activity name
    pub activity: String,
    /// Completion time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Lifecycle phase
    #[serde(default)]
    pub lifecycle: Lifecycle,
    /// Event type
    #[serde(default)]
    pub event_type: EventType,
    /// Whether the bot is inside a service call
    #[serde(default, deserialize_with = "boolish")]
    pub in_service_context: bool,
    /// User that took part in the conversation
    #[serde(default)]
    pub user: Option<String>,
}

impl Event {
    /// Completed user message without timestamp
    #[must_use]
    pub fn new(case_id: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            activity: activity.into(),
            timestamp: None,
            lifecycle: Lifecycle::Complete,
            event_type: EventType::UserMessage,
            in_service_context: false,
            user: None,
        }
    }

    /// With timestamp
    #[inline]
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// With lifecycle phase
    #[inline]
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// With event type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    /// With service-context flag
    #[inline]
    #[must_use]
    pub fn with_service_context(mut self, in_service_context: bool) -> Self {
        self.in_service_context = in_service_context;
        self
    }

    /// With user
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

// Logs carry the flag as bool, "true"/"false", 0/1 or null.
fn boolish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

/// Events of one case in timestamp order
#[derive(Debug, Clone)]
pub struct Case<'a> {
    /// Case id
    pub id: &'a str,
    /// Ordered events
    pub events: Vec<&'a Event>,
}

impl Case<'_> {
    /// Activity sequence
    #[must_use]
    pub fn activities(&self) -> Vec<String> {
        self.events.iter().map(|e| e.activity.clone()).collect()
    }
}

/// Cases sharing one activity sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    /// Activity sequence
    pub activities: Vec<String>,
    /// Ids of the cases following it, ascending
    pub case_ids: Vec<String>,
}

impl Variant {
    /// Number of cases
    #[inline]
    #[must_use]
    pub fn count(&self) -> u64 {
        self.case_ids.len() as u64
    }
}

/// A flat event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create from events
    #[inline]
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Parse a JSON array of events
    ///
    /// # Errors
    /// Returns error on invalid JSON
    pub fn from_json_str(json: &str) -> Result<Self, LogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON array of events
    ///
    /// # Errors
    /// Returns error on IO failure or invalid JSON
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, LogError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// All events in log order
    #[inline]
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log has no events
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Completed user messages and service requests only
    #[must_use]
    pub fn for_analysis(&self) -> Self {
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| {
                e.lifecycle == Lifecycle::Complete
                    && matches!(e.event_type, EventType::UserMessage | EventType::ServiceRequest)
            })
            .cloned()
            .collect();
        tracing::debug!(kept = events.len(), dropped = self.events.len() - events.len(), "filtered event log");
        Self { events }
    }

    /// Cases by id, ascending
    ///
    /// Events of a case are sorted by timestamp when every one of them is
    /// timed; a case with an untimed event keeps log order.
    #[must_use]
    pub fn cases(&self) -> BTreeMap<&str, Case<'_>> {
        let mut cases: BTreeMap<&str, Case<'_>> = BTreeMap::new();
        for event in &self.events {
            cases
                .entry(event.case_id.as_str())
                .or_insert_with(|| Case {
                    id: event.case_id.as_str(),
                    events: Vec::new(),
                })
                .events
                .push(event);
        }
        for case in cases.values_mut().filter(|c| c.events.iter().all(|e| e.timestamp.is_some())) {
            case.events.sort_by_key(|e| e.timestamp);
        }
        cases
    }

    /// Variants ordered by the first case (ascending id) that follows them
    #[must_use]
    pub fn variants(&self) -> Vec<Variant> {
        let mut variants: Vec<Variant> = Vec::new();
        let mut index: BTreeMap<Vec<String>, usize> = BTreeMap::new();

        for case in self.cases().values() {
            let activities = case.activities();
            match index.get(&activities) {
                Some(&i) => variants[i].case_ids.push(case.id.to_string()),
                None => {
                    index.insert(activities.clone(), variants.len());
                    variants.push(Variant {
                        activities,
                        case_ids: vec![case.id.to_string()],
                    });
                }
            }
        }
        variants
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn parses_boolish_flags_and_defaults() {
        let log = EventLog::from_json_str(
            r#"[
                {"case_id": "c1", "activity": "a", "in_service_context": "True"},
                {"case_id": "c1", "activity": "b", "in_service_context": 0,
                 "event_type": "SERVICE_REQUEST", "lifecycle": "start"},
                {"case_id": "c1", "activity": "c", "in_service_context": null,
                 "event_type": "SOMETHING_ELSE", "timestamp": "2024-01-01T10:00:00Z"}
            ]"#,
        )
        .unwrap();

        let events = log.events();
        assert!(events[0].in_service_context);
        assert_eq!(events[0].lifecycle, Lifecycle::Complete);
        assert_eq!(events[0].event_type, EventType::UserMessage);
        assert!(!events[1].in_service_context);
        assert_eq!(events[1].event_type, EventType::ServiceRequest);
        assert_eq!(events[1].lifecycle, Lifecycle::Start);
        assert_eq!(events[2].event_type, EventType::Other);
        assert!(events[2].timestamp.is_some());
    }

    #[test]
    fn analysis_filter_drops_bot_messages_and_incomplete_events() {
        let log = EventLog::new(vec![
            Event::new("c1", "hi"),
            Event::new("c1", "reply").with_type(EventType::BotMessage),
            Event::new("c1", "call").with_type(EventType::ServiceRequest),
            Event::new("c1", "half").with_lifecycle(Lifecycle::Start),
        ]);
        let kept: Vec<_> = log.for_analysis().events().iter().map(|e| e.activity.clone()).collect();
        assert_eq!(kept, vec!["hi", "call"]);
    }

    #[test]
    fn cases_are_ordered_by_timestamp() {
        let log = EventLog::new(vec![
            Event::new("c2", "late").with_timestamp(at(20)),
            Event::new("c2", "early").with_timestamp(at(10)),
            Event::new("c1", "only"),
        ]);
        let cases = log.cases();
        assert_eq!(cases.keys().copied().collect::<Vec<_>>(), vec!["c1", "c2"]);
        assert_eq!(cases["c2"].activities(), vec!["early", "late"]);
    }

    #[test]
    fn untimed_event_keeps_log_order() {
        let log = EventLog::new(vec![
            Event::new("c1", "greet").with_timestamp(at(0)),
            Event::new("c1", "menu"),
            Event::new("c1", "bye").with_timestamp(at(10)),
        ]);
        assert_eq!(log.variants()[0].activities, vec!["greet", "menu", "bye"]);

        let shuffled = EventLog::new(vec![
            Event::new("c1", "bye").with_timestamp(at(10)),
            Event::new("c1", "menu"),
            Event::new("c1", "greet").with_timestamp(at(0)),
        ]);
        assert_eq!(shuffled.cases()["c1"].activities(), vec!["bye", "menu", "greet"]);
    }

    #[test]
    fn variants_group_cases() {
        let log: EventLog = [
            Event::new("c3", "x"),
            Event::new("c3", "y"),
            Event::new("c1", "x"),
            Event::new("c1", "y"),
            Event::new("c2", "z"),
        ]
        .into_iter()
        .collect();

        let variants = log.variants();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].activities, vec!["x", "y"]);
        assert_eq!(variants[0].case_ids, vec!["c1", "c3"]);
        assert_eq!(variants[0].count(), 2);
        assert_eq!(variants[1].activities, vec!["z"]);
    }
}
