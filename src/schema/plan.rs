//! Plan document parsing
//!
//! A plan is accepted either as a bare JSON array of entries or wrapped in an
//! object under `steps`:
//!
//! ```json
//! [
//!   { "id": "wu", "type": "warmup", "duration": { "kind": "time", "value": 600 } },
//!   { "groupId": "g1", "reps": 3, "members": [
//!       { "id": "int", "type": "active", "duration": { "kind": "distance", "value": 1000 },
//!         "target": { "type": "pace", "min": 230, "max": 240 } },
//!       { "id": "rec", "type": "recovery", "duration": { "kind": "time", "value": 120 } }
//!   ] }
//! ]
//! ```

use super::validation::PlanIssue;
use crate::error::MatchError;
use crate::types::{PlanEntry, MAX_REPS};
use serde_json::Value;

/// Parse plan JSON into plan entries.
///
/// Entries are decoded one at a time so a failure names the offending entry.
/// Groups above `MAX_REPS` repetitions are rejected.
pub fn parse_plan(json: &str) -> Result<Vec<PlanEntry>, MatchError> {
    // Parse as a value first so syntax errors surface as JSON errors, not shape errors
    let value: Value = serde_json::from_str(json)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("steps") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(MatchError::ParseError(
                    "plan object has no `steps` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(MatchError::ParseError(
                "expected an array of plan entries or an object with `steps`".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let entry = parse_entry(item)
                .map_err(|e| MatchError::ParseError(format!("plan entry {}: {}", index, e)))?;
            check_reps(&entry, index)?;
            Ok(entry)
        })
        .collect()
}

/// Entries carrying `groupId` are repeat groups, anything else is a step
fn parse_entry(item: Value) -> Result<PlanEntry, serde_json::Error> {
    if item.get("groupId").is_some() {
        serde_json::from_value(item).map(PlanEntry::Group)
    } else {
        serde_json::from_value(item).map(PlanEntry::Step)
    }
}

fn check_reps(entry: &PlanEntry, index: usize) -> Result<(), MatchError> {
    match entry {
        PlanEntry::Group(group) if group.reps > MAX_REPS => {
            let issue = PlanIssue::ExcessiveReps {
                group_id: group.group_id.clone(),
                reps: group.reps,
                max_reps: MAX_REPS,
            };
            Err(MatchError::ParseError(format!("plan entry {}: {}", index, issue)))
        }
        _ => Ok(()),
    }
}
