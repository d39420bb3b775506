//! Bridge diagnostics tool.
//!
//! Synchronous: reads the connection manager's published stats snapshot,
//! touches no host state, and never goes through the gate.

use std::time::Instant;

use serde_json::json;
use tokio::sync::watch;

use crate::bridge::protocol::Envelope;
use crate::bridge::server::BridgeStats;
use crate::bridge::tool::{Tool, ToolResult};

pub struct StatusTool {
    stats: watch::Receiver<BridgeStats>,
    started: Instant,
}

impl StatusTool {
    pub fn new(stats: watch::Receiver<BridgeStats>) -> Self {
        Self {
            stats,
            started: Instant::now(),
        }
    }
}

impl Tool for StatusTool {
    fn name(&self) -> &str {
        "bridge.status"
    }

    fn description(&self) -> &str {
        "Reports connected client count, last activity age, and uptime"
    }

    fn execute(&self, _params: &serde_json::Value) -> ToolResult {
        let stats = self.stats.borrow().clone();
        let last_activity_secs = stats
            .last_activity
            .map(|at| at.elapsed().as_secs());
        Ok(Envelope::with_data(
            format!("{} client(s) connected", stats.connected_clients),
            json!({
                "connectedClients": stats.connected_clients,
                "lastActivitySecs": last_activity_secs,
                "uptimeSecs": self.started.elapsed().as_secs(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_published_stats() {
        let (tx, rx) = watch::channel(BridgeStats::default());
        let tool = StatusTool::new(rx);

        let result = tool.execute(&json!({})).unwrap();
        assert_eq!(result.data.as_ref().unwrap()["connectedClients"], 0);
        assert_eq!(
            result.data.as_ref().unwrap()["lastActivitySecs"],
            serde_json::Value::Null
        );

        tx.send_replace(BridgeStats {
            connected_clients: 2,
            last_activity: Some(Instant::now()),
        });
        let result = tool.execute(&json!({})).unwrap();
        assert_eq!(result.data.as_ref().unwrap()["connectedClients"], 2);
        assert!(result.message.contains("2 client(s)"));
    }

    #[test]
    fn is_sync_and_never_gated() {
        let (_tx, rx) = watch::channel(BridgeStats::default());
        assert!(!StatusTool::new(rx).is_async());
    }
}
