use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Ping frame sent on the heartbeat interval.
///
/// The hub is not required to answer; the heartbeat only keeps intermediary
/// network state alive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeartbeatFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub ts: u64,
}

impl HeartbeatFrame {
    pub fn new(ts: u64) -> Self {
        Self {
            kind: "ping".to_string(),
            ts,
        }
    }

    /// A heartbeat stamped with the current wall-clock time in epoch milliseconds
    pub fn now() -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::new(ts)
    }

    pub fn to_text(&self) -> crate::types::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_frame_shape() {
        let frame = HeartbeatFrame::new(1_700_000_000_123);
        let json: serde_json::Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();

        assert_eq!(json["type"], "ping");
        assert_eq!(json["ts"], 1_700_000_000_123u64);
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_heartbeat_frame_now_is_stamped() {
        let frame = HeartbeatFrame::now();
        assert_eq!(frame.kind, "ping");
        assert!(frame.ts > 0);
    }
}
