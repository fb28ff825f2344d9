use serde_json::{Map, Value};
use storyboard_schema::{Chart, NoteId, NoteType};

use crate::StoryboardError;

/// Query over the chart's notes, built from an object-valued `note` field.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSelector {
    pub start: NoteId,
    pub end: NoteId,
    pub direction: Option<i32>,
    pub min_x: f64,
    pub max_x: f64,
    pub types: Vec<i32>,
}

impl Default for NoteSelector {
    fn default() -> Self {
        Self {
            start: NoteId::MIN,
            end: NoteId::MAX,
            direction: None,
            min_x: f64::MIN,
            max_x: f64::MAX,
            types: NoteType::ALL.iter().map(|t| t.code()).collect(),
        }
    }
}

impl NoteSelector {
    pub fn from_json(spec: &Map<String, Value>) -> Result<Self, StoryboardError> {
        let mut selector = NoteSelector::default();
        if let Some(v) = spec.get("start") {
            selector.start = int_field(v, "start")?;
        }
        if let Some(v) = spec.get("end") {
            selector.end = int_field(v, "end")?;
        }
        if let Some(v) = spec.get("direction") {
            selector.direction = Some(int_field(v, "direction")?);
        }
        if let Some(v) = spec.get("min_x") {
            selector.min_x = float_field(v, "min_x")?;
        }
        if let Some(v) = spec.get("max_x") {
            selector.max_x = float_field(v, "max_x")?;
        }
        match spec.get("type") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                selector.types = items
                    .iter()
                    .map(|v| int_field(v, "type"))
                    .collect::<Result<_, _>>()?;
            }
            Some(v) => selector.types = vec![int_field(v, "type")?],
        }
        Ok(selector)
    }

    /// Ids of every matching note, ascending.
    pub fn select(&self, chart: &Chart) -> Vec<NoteId> {
        chart
            .notes()
            .iter()
            .filter(|n| {
                self.types.contains(&n.note_type)
                    && self.start <= n.id
                    && n.id <= self.end
                    && self.min_x <= n.x
                    && n.x <= self.max_x
                    && self.direction.map_or(true, |d| d == n.direction)
            })
            .map(|n| n.id)
            .collect()
    }
}

fn int_field(v: &Value, name: &str) -> Result<i32, StoryboardError> {
    v.as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| {
            StoryboardError::new("E4102", format!("note selector `{name}` must be an integer"))
                .with_context(v.to_string())
        })
}

fn float_field(v: &Value, name: &str) -> Result<f64, StoryboardError> {
    v.as_f64().ok_or_else(|| {
        StoryboardError::new("E4102", format!("note selector `{name}` must be a number"))
            .with_context(v.to_string())
    })
}
