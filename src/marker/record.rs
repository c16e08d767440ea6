use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Mode tag written into every marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalMode {
    Agent,
}

/// Content of one marker file. Field names are the on-disk contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    pub is_agent_session: bool,
    pub terminal_mode: TerminalMode,
    pub process_id: u32,
    pub terminal_name: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
}

impl MarkerRecord {
    /// Record for an agent terminal, stamped now
    pub fn new(process_id: u32, terminal_name: impl Into<String>) -> Self {
        Self::with_timestamp(process_id, terminal_name, Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(
        process_id: u32,
        terminal_name: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            is_agent_session: true,
            terminal_mode: TerminalMode::Agent,
            process_id,
            terminal_name: terminal_name.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let record = MarkerRecord::with_timestamp(4242, "GitHub Copilot Chat", 1_700_000_000_000);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"isAgentSession":true,"terminalMode":"agent","processId":4242,"terminalName":"GitHub Copilot Chat","timestamp":1700000000000}"#
        );
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{"isAgentSession":true,"terminalMode":"agent","processId":1}"#;
        assert!(serde_json::from_str::<MarkerRecord>(json).is_err());
    }

    #[test]
    fn test_new_is_stamped_now() {
        let before = Utc::now().timestamp_millis();
        let record = MarkerRecord::new(1, "agent");
        assert!(record.timestamp >= before);
        assert!(record.is_agent_session);
        assert_eq!(record.terminal_mode, TerminalMode::Agent);
    }
}
