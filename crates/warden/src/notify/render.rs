//! Render — deterministic subject + HTML body for each notification kind.

use chrono::{DateTime, Utc};

use super::model::Notification;

const CELL: &str = "padding: 8px; border: 1px solid #ddd;";

fn row(label: &str, value: &str) -> String {
    format!(
        "<tr><td style=\"{CELL}\"><strong>{label}</strong></td>\
         <td style=\"{CELL}\">{value}</td></tr>"
    )
}

fn table(rows: &[String]) -> String {
    format!(
        "<table style=\"border-collapse: collapse; width: 100%;\">{}</table>",
        rows.join("")
    )
}

fn page(heading_color: &str, heading: &str, body: &str) -> String {
    format!(
        "<html><body style=\"font-family: Arial, sans-serif; padding: 20px;\">\
         <h2 style=\"color: {heading_color};\">{heading}</h2>{body}</body></html>"
    )
}

/// Render a notification into `(subject, html_body)`.
///
/// Output is a pure function of the notification and the supplied
/// timestamp, so tests can assert exact strings.
pub fn render(notification: &Notification, now: DateTime<Utc>) -> (String, String) {
    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();

    match notification {
        Notification::Alert {
            container_name,
            fault_type,
            current_cpu,
            current_memory,
            reason,
        } => {
            let subject = format!("⚠️ Container alert - {container_name}");
            let rows = vec![
                row("Container", container_name),
                row("Fault type", fault_type),
                row("Current CPU", current_cpu),
                row("Current memory", current_memory),
                row("Diagnosis", reason),
                row("Alert time", &timestamp),
            ];
            (subject, page("#f39c12", "⚠️ Container resource alert", &table(&rows)))
        }

        Notification::ActionResult {
            container_name,
            command,
            fault_type,
            action_response,
        } => {
            let success = action_response
                .get("success")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let (color, status) = if success {
                ("#27ae60", "✅ Action succeeded")
            } else {
                ("#e74c3c", "❌ Action failed")
            };
            let subject = format!("{status} - {container_name} {command}");
            let verification = action_response
                .get("verification")
                .map(|v| v.to_string())
                .unwrap_or_default();
            let rows = vec![
                row("Container", container_name),
                row("Command", command),
                row("Fault type", fault_type),
                row("Executed at", &timestamp),
            ];
            let body = format!(
                "{}<h3>Verification</h3>\
                 <pre style=\"background: #f5f5f5; padding: 10px;\">{verification}</pre>",
                table(&rows)
            );
            (subject, page(color, status, &body))
        }

        Notification::Recovery {
            container_name,
            message,
        } => {
            let subject = format!("✅ Container recovered - {container_name}");
            let rows = vec![
                row("Container", container_name),
                row("Status", message),
                row("Checked at", &timestamp),
            ];
            (subject, page("#27ae60", "✅ Container back to normal", &table(&rows)))
        }

        Notification::CircuitBreak {
            container_name,
            fault_type,
            reason,
        } => {
            let subject =
                format!("🔥 Circuit breaker tripped - {container_name} needs operator attention");
            let rows = vec![
                row("Container", container_name),
                row("Fault type", fault_type),
                row("Diagnosis", reason),
            ];
            let body = format!(
                "{}<div style=\"background: #fdecea; padding: 15px; margin-top: 20px;\">\
                 <strong>⚠️ Warning:</strong> repeated restarts did not recover this \
                 container. Manual intervention is required.</div>",
                table(&rows)
            );
            (subject, page("#e74c3c", "🔥 Circuit breaker tripped", &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn alert_subject_and_body() {
        let n = Notification::Alert {
            container_name: "web".to_string(),
            fault_type: "CPU_HIGH".to_string(),
            current_cpu: "92%".to_string(),
            current_memory: "40%".to_string(),
            reason: "sustained load".to_string(),
        };
        let (subject, body) = render(&n, at());
        assert_eq!(subject, "⚠️ Container alert - web");
        assert!(body.contains("CPU_HIGH"));
        assert!(body.contains("92%"));
        assert!(body.contains("2025-06-01 12:00:00"));
    }

    #[test]
    fn action_result_reflects_success_flag() {
        let ok = Notification::ActionResult {
            container_name: "web".to_string(),
            command: "RESTART".to_string(),
            fault_type: "PROCESS_CRASH".to_string(),
            action_response: serde_json::json!({"success": true}),
        };
        let (subject, _) = render(&ok, at());
        assert_eq!(subject, "✅ Action succeeded - web RESTART");

        let failed = Notification::ActionResult {
            container_name: "web".to_string(),
            command: "RESTART".to_string(),
            fault_type: "PROCESS_CRASH".to_string(),
            action_response: serde_json::json!({"success": false}),
        };
        let (subject, _) = render(&failed, at());
        assert_eq!(subject, "❌ Action failed - web RESTART");
    }

    #[test]
    fn rendering_is_deterministic() {
        let n = Notification::Recovery {
            container_name: "db".to_string(),
            message: "running".to_string(),
        };
        assert_eq!(render(&n, at()), render(&n, at()));
    }

    #[test]
    fn circuit_break_warns_about_manual_intervention() {
        let n = Notification::CircuitBreak {
            container_name: "api".to_string(),
            fault_type: "PROCESS_CRASH".to_string(),
            reason: "4 reports in 300s".to_string(),
        };
        let (subject, body) = render(&n, at());
        assert!(subject.contains("operator attention"));
        assert!(body.contains("Manual intervention"));
    }
}
