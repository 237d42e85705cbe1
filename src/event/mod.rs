use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

/// Metadata stamped onto every event of a run.
///
/// Built once before the pipeline starts and shared by every record through
/// an `Arc`; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventProperties {
    pub host: Option<String>,
    pub source: Option<String>,
    pub sourcetype: Option<String>,
}

impl EventProperties {
    /// Empty strings are treated as absent so they serialize as `null`.
    pub fn new(
        host: Option<String>,
        source: Option<String>,
        sourcetype: Option<String>,
    ) -> Self {
        Self {
            host: host.filter(|s| !s.is_empty()),
            source: source.filter(|s| !s.is_empty()),
            sourcetype: sourcetype.filter(|s| !s.is_empty()),
        }
    }
}

/// One ingested record.
#[derive(Debug, Clone)]
pub struct Event {
    properties: Arc<EventProperties>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Sub-millisecond offset
    pub nanos: i32,
    pub body: Value,
}

impl Event {
    pub fn new(properties: Arc<EventProperties>, timestamp: i64, body: Value) -> Self {
        Self {
            properties,
            timestamp,
            nanos: 0,
            body,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.properties.host.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.properties.source.as_deref()
    }

    pub fn sourcetype(&self) -> Option<&str> {
        self.properties.sourcetype.as_deref()
    }

    /// Length in bytes of the record as it goes out on the wire.
    pub fn encoded_len(&self) -> Result<usize, serde_json::Error> {
        serde_json::to_vec(self).map(|bytes| bytes.len())
    }
}

#[derive(Serialize)]
struct WireEvent<'a> {
    host: Option<&'a str>,
    source: Option<&'a str>,
    sourcetype: Option<&'a str>,
    timestamp: i64,
    nanos: i32,
    body: &'a Value,
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        WireEvent {
            host: self.host(),
            source: self.source(),
            sourcetype: self.sourcetype(),
            timestamp: self.timestamp,
            nanos: self.nanos,
            body: &self.body,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_properties_become_none() {
        let props = EventProperties::new(Some("web-01".to_string()), Some(String::new()), None);
        assert_eq!(props.host.as_deref(), Some("web-01"));
        assert!(props.source.is_none());
        assert!(props.sourcetype.is_none());
    }

    #[test]
    fn test_wire_format_includes_all_fields() {
        let props = Arc::new(EventProperties::new(
            Some("web-01".to_string()),
            None,
            Some("access_combined".to_string()),
        ));
        let event = Event::new(props, 1_700_000_000_000, json!({"id": "1"}));

        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(
            encoded,
            json!({
                "host": "web-01",
                "source": null,
                "sourcetype": "access_combined",
                "timestamp": 1_700_000_000_000i64,
                "nanos": 0,
                "body": {"id": "1"}
            })
        );
    }

    #[test]
    fn test_encoded_len_matches_serialized_bytes() {
        let event = Event::new(Arc::new(EventProperties::default()), 42, json!([1, 2, 3]));
        let bytes = serde_json::to_vec(&event).unwrap();
        assert_eq!(event.encoded_len().unwrap(), bytes.len());
    }

    #[test]
    fn test_events_share_properties() {
        let props = Arc::new(EventProperties::new(Some("h".to_string()), None, None));
        let a = Event::new(Arc::clone(&props), 1, json!(1));
        let b = Event::new(Arc::clone(&props), 2, json!(2));
        assert!(Arc::ptr_eq(&a.properties, &b.properties));
        assert_eq!(Arc::strong_count(&props), 3);
    }
}
