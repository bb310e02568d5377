//! Events loop — asynchronous die/oom detection from the engine stream.

use futures_util::stream::StreamExt;
use tracing::{debug, warn};

use crate::docker::inventory::ContainerEvent;
use crate::evidence::model::FaultKind;

use super::Monitor;

/// Map an engine event to a fault label. Exit code 137 on `die` is the
/// kernel's OOM kill showing up one hop later.
pub fn classify_event(event: &ContainerEvent) -> Option<FaultKind> {
    match event.action.as_str() {
        "oom" => Some(FaultKind::OomKilled),
        "die" => {
            let exit_code = event
                .attributes
                .get("exitCode")
                .map(String::as_str)
                .unwrap_or("0");
            if exit_code == "137" {
                Some(FaultKind::OomKilled)
            } else {
                Some(FaultKind::ProcessCrash)
            }
        }
        _ => None,
    }
}

impl Monitor {
    /// Consume the filtered event stream until the stop token fires.
    /// Reconnection lives inside the runtime adapter's stream; this loop
    /// only classifies and reports.
    pub(super) async fn events_loop(&self) {
        let mut stream = self.runtime.events(self.stop.clone());
        loop {
            let event = tokio::select! {
                _ = self.stop.cancelled() => break,
                event = stream.next() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.handle_event(&event).await;
        }
        debug!("events loop stopped");
    }

    /// Classify and report one event. Unwatched containers and unknown
    /// actions are silently dropped. Returns whether a report was
    /// admitted.
    pub(crate) async fn handle_event(&self, event: &ContainerEvent) -> bool {
        let Some(name) = event.container_name() else {
            return false;
        };
        if !self.is_monitored(name) {
            return false;
        }
        let Some(fault) = classify_event(event) else {
            return false;
        };

        warn!(container = name, action = %event.action, fault = %fault, "container event");
        self.report_issue(name, fault).await
    }
}
