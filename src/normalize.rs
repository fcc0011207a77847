//! Tolerant mapping of loosely-typed backend payloads into the strict
//! internal shapes. The backend wraps collections inconsistently and
//! renames fields between versions; everything here degrades to `None`
//! rather than failing, except `id`/`code` which get synthesized
//! fallbacks so they are never empty.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::types::{LevelType, SupportUser, Team, Ticket, TicketAttachment};

/// Wrapper keys probed, in order, when a payload is not itself an array.
const WRAPPER_KEYS: [&str; 5] = ["items", "data", "tickets", "results", "result"];

/// Monotonic nonce so synthesized ids are unique even within one call.
static SYNTH_NONCE: AtomicU64 = AtomicU64::new(0);

fn next_nonce() -> u64 {
    SYNTH_NONCE.fetch_add(1, Ordering::Relaxed)
}

/// Locate the actual element list inside an arbitrary payload. A
/// `serde_json::Value` is a tree, so recursing through nested wrappers
/// cannot revisit a structure.
pub fn extract_array(source: &Value) -> Option<&Vec<Value>> {
    if let Value::Array(items) = source {
        return Some(items);
    }

    if let Value::Object(container) = source {
        for key in WRAPPER_KEYS {
            let Some(value) = container.get(key) else {
                continue;
            };
            if let Some(extracted) = extract_array(value) {
                return Some(extracted);
            }
        }
    }

    None
}

/// Normalize a ticket-list payload. A non-null payload without any
/// recognizable array is treated as a single ticket.
pub fn normalize_tickets(payload: &Value) -> Vec<Ticket> {
    if let Some(items) = extract_array(payload) {
        return items
            .iter()
            .enumerate()
            .map(|(index, entry)| normalize_ticket(entry, index))
            .collect();
    }
    if payload.is_null() {
        return Vec::new();
    }
    vec![normalize_ticket(payload, 0)]
}

pub fn normalize_ticket(entry: &Value, index: usize) -> Ticket {
    let Value::Object(_) = entry else {
        return fallback_ticket(index);
    };

    let id = ensure_string(field(entry, &["id"]), || synthesized_id(index));
    let code = ensure_string(field(entry, &["code"]), || fallback_code(&id));

    Ticket {
        id,
        code,
        note: nullable_string(field(entry, &["note"])).unwrap_or_default(),
        request_type_id: nullable_string(field(entry, &["requestTypeId", "request_type_id"])),
        request: nullable_string(field(entry, &["request"])),
        priority_type_id: nullable_string(field(entry, &["priorityTypeId", "priority_type_id"])),
        priority: nullable_string(field(entry, &["priority"])),
        status_type_id: nullable_string(field(entry, &["statusTypeId", "status_type_id"])),
        status: nullable_string(field(entry, &["status"])),
        requester_id: ensure_string(field(entry, &["requesterId", "requester_id"]), || {
            "Sin solicitante".to_string()
        }),
        requester: nullable_string(field(entry, &["requester"])),
        manager_id: nullable_string(field(
            entry,
            &["managerId", "manager_id", "assigneeId", "assignee_id"],
        )),
        manager: nullable_string(field(entry, &["manager", "assignee"])),
        team_id: nullable_string(field(entry, &["teamId", "team_id"])),
        due_at: nullable_string(field(entry, &["duetAt", "dueAt", "due_at"])),
        resolved_at: nullable_string(field(entry, &["resolvedAt", "resolved_at"])),
        closed_at: nullable_string(field(entry, &["closedAt", "closed_at"])),
        deleted_at: nullable_string(field(entry, &["deletedAt", "deleted_at"])),
        created_at: nullable_string(field(entry, &["createdAt", "created_at"])),
        updated_at: nullable_string(field(entry, &["updatedAt", "updated_at"])),
        is_resolved: field(entry, &["isResolved", "is_resolved"]).and_then(Value::as_bool),
        attachments: normalize_attachments(field(entry, &["attachments"]).unwrap_or(&Value::Null)),
    }
}

pub fn normalize_attachments(payload: &Value) -> Vec<TicketAttachment> {
    let Some(items) = extract_array(payload) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .map(|(index, entry)| TicketAttachment {
            id: ensure_string(field(entry, &["id"]), || {
                format!("att-{index}-{}", next_nonce())
            }),
            ticket_id: nullable_string(field(entry, &["ticketId", "ticket_id"])),
            file_name: ensure_string(field(entry, &["fileName", "file_name"]), || {
                "Sin nombre".to_string()
            }),
            file_path: nullable_string(field(entry, &["filePath", "file_path"])),
            file_size: field(entry, &["fileSize", "file_size"]).and_then(numeric),
            mime_type: nullable_string(field(entry, &["mimeType", "mime_type"])),
            created_at: nullable_string(field(entry, &["createdAt", "created_at"])),
            url: nullable_string(field(entry, &["url"])),
        })
        .collect()
}

/// Catalog entries (request/priority/status types). Entries without a
/// usable id are dropped.
pub fn normalize_level_types(payload: &Value) -> Vec<LevelType> {
    let Some(items) = extract_array(payload) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|entry| {
            let id = nullable_string(field(entry, &["id"]))?;
            Some(LevelType {
                id,
                value: field(entry, &["value"]).and_then(integer),
                description: nullable_string(field(entry, &["description"])),
            })
        })
        .collect()
}

pub fn normalize_support_users(payload: &Value) -> Vec<SupportUser> {
    let Some(items) = extract_array(payload) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect()
}

pub fn normalize_teams(payload: &Value) -> Vec<Team> {
    let Some(items) = extract_array(payload) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect()
}

/// Count payloads arrive as `{data: {count: n}}`; older builds sent a
/// bare `{count: n}`.
pub fn normalize_count(payload: &Value) -> u64 {
    let candidate = payload
        .get("data")
        .and_then(|data| data.get("count"))
        .or_else(|| payload.get("count"));

    candidate.and_then(numeric).unwrap_or(0)
}

fn field<'a>(entry: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| entry.get(*name))
}

/// Trimmed non-empty string, with finite numbers stringified.
fn nullable_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn ensure_string(value: Option<&Value>, fallback: impl FnOnce() -> String) -> String {
    nullable_string(value).unwrap_or_else(fallback)
}

/// Numbers, or numeric-looking strings.
fn numeric(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn synthesized_id(index: usize) -> String {
    format!("raw-{index}-{}", next_nonce())
}

fn fallback_code(id: &str) -> String {
    let prefix: String = id.chars().take(6).collect::<String>().to_uppercase();
    format!("#{prefix}")
}

fn fallback_ticket(index: usize) -> Ticket {
    let id = synthesized_id(index);
    let code = fallback_code(&id);
    Ticket {
        id,
        code,
        note: String::new(),
        request_type_id: None,
        request: None,
        priority_type_id: None,
        priority: None,
        status_type_id: None,
        status: None,
        requester_id: "Sin solicitante".to_string(),
        requester: None,
        manager_id: None,
        manager: None,
        team_id: None,
        due_at: None,
        resolved_at: None,
        closed_at: None,
        deleted_at: None,
        created_at: None,
        updated_at: None,
        is_resolved: None,
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapper_shapes_yield_the_same_list() {
        let records = json!([{"id": "t-1"}, {"id": "t-2"}]);
        let shapes = [
            records.clone(),
            json!({"data": records.clone()}),
            json!({"items": records.clone()}),
            json!({"tickets": records.clone()}),
            json!({"result": {"data": records.clone()}}),
        ];

        for shape in shapes {
            let tickets = normalize_tickets(&shape);
            let ids: Vec<&str> = tickets.iter().map(|t| t.id.as_str()).collect();
            assert_eq!(ids, ["t-1", "t-2"], "shape {shape} should normalize");
        }
    }

    #[test]
    fn null_payload_is_empty_and_single_object_is_one_ticket() {
        assert!(normalize_tickets(&Value::Null).is_empty());

        let tickets = normalize_tickets(&json!({"id": "t-1", "code": "HD-1"}));
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].code, "HD-1");
    }

    #[test]
    fn missing_ids_are_synthesized_and_unique() {
        let tickets = normalize_tickets(&json!([{}, {}, {"note": "x"}]));
        let mut ids: Vec<&str> = tickets.iter().map(|t| t.id.as_str()).collect();
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert!(tickets.iter().all(|t| !t.code.is_empty()));
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3, "synthesized ids must be unique per call");
    }

    #[test]
    fn code_falls_back_to_id_prefix() {
        let tickets = normalize_tickets(&json!([{"id": "abcdef1234"}]));
        assert_eq!(tickets[0].code, "#ABCDEF");
    }

    #[test]
    fn strings_are_trimmed_and_empty_becomes_none() {
        let tickets = normalize_tickets(&json!([{
            "id": "t-1",
            "status": "  Abierto  ",
            "priority": "   ",
            "requestTypeId": 42,
        }]));
        let ticket = &tickets[0];
        assert_eq!(ticket.status.as_deref(), Some("Abierto"));
        assert_eq!(ticket.priority, None);
        assert_eq!(ticket.request_type_id.as_deref(), Some("42"));
    }

    #[test]
    fn snake_case_aliases_are_accepted() {
        let tickets = normalize_tickets(&json!([{
            "id": "t-1",
            "request_type_id": "rt-9",
            "assignee_id": "m-3",
            "is_resolved": true,
        }]));
        let ticket = &tickets[0];
        assert_eq!(ticket.request_type_id.as_deref(), Some("rt-9"));
        assert_eq!(ticket.manager_id.as_deref(), Some("m-3"));
        assert_eq!(ticket.is_resolved, Some(true));
    }

    #[test]
    fn is_resolved_is_only_taken_from_real_booleans() {
        let tickets = normalize_tickets(&json!([
            {"id": "1", "isResolved": true},
            {"id": "2", "isResolved": "true"},
            {"id": "3"},
        ]));
        assert_eq!(tickets[0].is_resolved, Some(true));
        assert_eq!(tickets[1].is_resolved, None);
        assert_eq!(tickets[2].is_resolved, None);
    }

    #[test]
    fn attachments_use_the_same_extraction_and_get_ids() {
        let tickets = normalize_tickets(&json!([{
            "id": "t-1",
            "attachments": {"data": [
                {"fileName": "error.png", "fileSize": "2048"},
                {"id": "a-1", "fileName": "log.txt", "fileSize": 10},
            ]},
        }]));

        let attachments = &tickets[0].attachments;
        assert_eq!(attachments.len(), 2);
        assert!(!attachments[0].id.is_empty());
        assert_eq!(attachments[0].file_size, Some(2048));
        assert_eq!(attachments[1].id, "a-1");
        assert_eq!(attachments[1].file_size, Some(10));
    }

    #[test]
    fn level_types_without_id_are_dropped() {
        let types = normalize_level_types(&json!({"data": [
            {"id": "st-1", "value": 1, "description": "Abierto"},
            {"value": 2},
            {"id": "st-3", "value": "3"},
        ]}));
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].label(), "Abierto");
        assert_eq!(types[1].value, Some(3));
    }

    #[test]
    fn counts_unwrap_both_shapes() {
        assert_eq!(normalize_count(&json!({"data": {"count": 5}})), 5);
        assert_eq!(normalize_count(&json!({"count": 2})), 2);
        assert_eq!(normalize_count(&json!({"data": null})), 0);
        assert_eq!(normalize_count(&Value::Null), 0);
    }
}
