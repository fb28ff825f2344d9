use serde_json::{Map, Value};
use storyboard_schema::{Chart, NoteId};

use crate::{selector::NoteSelector, StoryboardError};

pub(crate) type Node = Map<String, Value>;

/// Checked in this order; only the first array-valued field fans out.
const TIME_FIELDS: [&str; 3] = ["relative_time", "add_time", "time"];

/// Expands array-valued time fields and the `note` specifier of one declaration.
///
/// The result is the time fan-out crossed with the note fan-out, time-major.
/// A selector that matches nothing yields no declarations.
pub fn expand(node: Node, chart: &Chart) -> Result<Vec<Node>, StoryboardError> {
    let mut out = Vec::new();
    for variant in expand_time(node) {
        expand_note(variant, chart, &mut out)?;
    }
    Ok(out)
}

fn expand_time(node: Node) -> Vec<Node> {
    let fan_out = TIME_FIELDS.iter().find_map(|&field| match node.get(field) {
        Some(Value::Array(items)) if !items.is_empty() => Some((field, items.clone())),
        _ => None,
    });

    let Some((field, items)) = fan_out else {
        return vec![node];
    };

    items
        .into_iter()
        .map(|time| {
            let mut variant = node.clone();
            variant.insert(field.to_string(), time);
            variant
        })
        .collect()
}

fn expand_note(node: Node, chart: &Chart, out: &mut Vec<Node>) -> Result<(), StoryboardError> {
    let ids = match node.get("note") {
        None | Some(Value::Null) => {
            out.push(node);
            return Ok(());
        }
        Some(v @ Value::Number(_)) => {
            note_id(v)?;
            out.push(node);
            return Ok(());
        }
        Some(Value::Array(items)) => items.iter().map(note_id).collect::<Result<Vec<_>, _>>()?,
        Some(Value::Object(spec)) => NoteSelector::from_json(spec)?.select(chart),
        Some(other) => {
            return Err(StoryboardError::new(
                "E4102",
                "`note` must be an integer, an array of integers or a selector",
            )
            .with_context(other.to_string()))
        }
    };

    for id in ids {
        let mut variant = node.clone();
        variant.insert("note".to_string(), Value::from(id));
        out.push(variant);
    }
    Ok(())
}

fn note_id(v: &Value) -> Result<NoteId, StoryboardError> {
    v.as_i64().and_then(|n| NoteId::try_from(n).ok()).ok_or_else(|| {
        StoryboardError::new("E4102", "note ids must be integers").with_context(v.to_string())
    })
}
