//! Consumers of the tail reader: the ownCloud JSON log and the backup job's
//! summary and history files.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::tail;

/// Display cap applied after parsing the tailed window.
const RECENT_LIMIT: usize = 5;

/// Non-JSON lines are kept, clipped to their final characters.
const RAW_CLIP: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub time: String,
    pub level: String,
    pub app: String,
    pub message: String,
}

/// Last few events from a JSON-per-line application log. Lines that do not
/// parse as JSON objects become clipped raw events instead of being dropped,
/// so a corrupted log still shows something.
pub fn recent_events(path: &Path, scan_lines: usize) -> Vec<LogEvent> {
    let events: Vec<LogEvent> = tail::tail_lines(path, scan_lines)
        .into_iter()
        .map(|line| parse_event(&line))
        .collect();
    last_n(events, RECENT_LIMIT)
}

fn parse_event(line: &str) -> LogEvent {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(entry)) => LogEvent {
            time: first_scalar(&entry, &["time", "datetime"]),
            level: scalar(entry.get("level")),
            app: scalar(entry.get("app")),
            message: first_scalar(&entry, &["message", "msg", "reqId"]),
        },
        _ => LogEvent {
            time: String::new(),
            level: String::new(),
            app: "raw".to_string(),
            message: clip_end(line, RAW_CLIP),
        },
    }
}

/// Scalars become their text form; missing keys and structured values
/// become the empty string.
fn scalar(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn first_scalar(entry: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| scalar(entry.get(*key)))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn clip_end(line: &str, max_chars: usize) -> String {
    let total = line.chars().count();
    line.chars().skip(total.saturating_sub(max_chars)).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub latest: Value,
    pub recent: Vec<Value>,
}

/// Latest summary plus the tail of the JSONL history. An unreadable or
/// unparseable summary reads `{"status": "unknown"}`; history lines that
/// fail to parse are wrapped as `{"raw": <line>}`.
pub fn backup_report(summary: &Path, history: &Path, scan_lines: usize) -> BackupReport {
    let latest = std::fs::read_to_string(summary)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_else(|| serde_json::json!({"status": "unknown"}));

    let entries: Vec<Value> = tail::tail_lines(history, scan_lines)
        .into_iter()
        .map(|line| {
            serde_json::from_str(&line).unwrap_or_else(|_| serde_json::json!({"raw": line}))
        })
        .collect();

    BackupReport {
        latest,
        recent: last_n(entries, RECENT_LIMIT),
    }
}

fn last_n<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    let keep_from = items.len().saturating_sub(n);
    items.split_off(keep_from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_json_lines_and_caps_to_recent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owncloud.log");
        let mut text = String::new();
        for i in 0..20 {
            text.push_str(&format!(
                "{{\"time\":\"2026-08-0{}T00:00:00+00:00\",\"level\":3,\"app\":\"core\",\"message\":\"event {i}\"}}\n",
                i % 9 + 1
            ));
        }
        fs::write(&path, text).unwrap();

        let events = recent_events(&path, 50);
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].message, "event 15");
        assert_eq!(events[4].message, "event 19");
        assert_eq!(events[4].level, "3");
        assert_eq!(events[4].app, "core");
    }

    #[test]
    fn falls_back_through_alternate_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alt.log");
        fs::write(
            &path,
            "{\"datetime\":\"2026-08-22T10:00:00Z\",\"msg\":\"via msg\"}\n\
             {\"reqId\":\"abc123\"}\n",
        )
        .unwrap();

        let events = recent_events(&path, 50);
        assert_eq!(events[0].time, "2026-08-22T10:00:00Z");
        assert_eq!(events[0].message, "via msg");
        assert_eq!(events[1].time, "");
        assert_eq!(events[1].message, "abc123");
    }

    #[test]
    fn non_json_line_becomes_clipped_raw_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.log");
        let long_line = "x".repeat(300);
        fs::write(&path, format!("{long_line}\nnot json either\n")).unwrap();

        let events = recent_events(&path, 50);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].app, "raw");
        assert_eq!(events[0].message.chars().count(), 200);
        assert_eq!(events[1].message, "not json either");
        assert_eq!(events[1].time, "");
    }

    #[test]
    fn json_array_line_is_treated_as_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arr.log");
        fs::write(&path, "[1,2,3]\n").unwrap();

        let events = recent_events(&path, 50);
        assert_eq!(events[0].app, "raw");
        assert_eq!(events[0].message, "[1,2,3]");
    }

    #[test]
    fn missing_log_yields_no_events() {
        let events = recent_events(Path::new("/nonexistent/owncloud.log"), 50);
        assert!(events.is_empty());
    }

    #[test]
    fn backup_report_reads_summary_and_history_tail() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("backup.json");
        let history = dir.path().join("backup.jsonl");
        fs::write(&summary, "{\"status\":\"ok\",\"duration_sec\":12}").unwrap();
        let mut lines = String::new();
        for i in 0..8 {
            lines.push_str(&format!("{{\"run\":{i},\"status\":\"ok\"}}\n"));
        }
        lines.push_str("corrupt line\n");
        fs::write(&history, lines).unwrap();

        let report = backup_report(&summary, &history, 50);
        assert_eq!(report.latest["status"], "ok");
        assert_eq!(report.recent.len(), 5);
        assert_eq!(report.recent[0]["run"], 4);
        assert_eq!(report.recent[4]["raw"], "corrupt line");
    }

    #[test]
    fn missing_summary_reads_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let report = backup_report(
            &dir.path().join("absent.json"),
            &dir.path().join("absent.jsonl"),
            50,
        );
        assert_eq!(report.latest, serde_json::json!({"status": "unknown"}));
        assert!(report.recent.is_empty());
    }

    #[test]
    fn malformed_summary_reads_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("broken.json");
        fs::write(&summary, "{not json").unwrap();
        let report = backup_report(&summary, &dir.path().join("none.jsonl"), 50);
        assert_eq!(report.latest, serde_json::json!({"status": "unknown"}));
    }
}
