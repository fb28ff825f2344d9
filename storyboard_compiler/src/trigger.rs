use serde_json::Value;
use storyboard_schema::{ChartNote, Trigger, TriggerType};

use crate::StoryboardError;

/// Game values read when a note-clear event is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameSnapshot {
    pub combo: i32,
    pub score: i64,
}

/// Receives every trigger activation (spawn / destroy is the receiver's job).
pub trait TriggerHandler {
    fn on_trigger(&mut self, trigger: &Trigger);
}

impl<F: FnMut(&Trigger)> TriggerHandler for F {
    fn on_trigger(&mut self, trigger: &Trigger) {
        self(trigger)
    }
}

pub fn load_trigger(value: &Value) -> Result<Trigger, StoryboardError> {
    let Value::Object(json) = value else {
        return Err(StoryboardError::new("E5002", "triggers must be objects"));
    };
    let mut trigger = Trigger::default();

    if let Some(kind) = json.get("type").filter(|v| !v.is_null()) {
        let kind = kind
            .as_str()
            .ok_or_else(|| StoryboardError::new("E5001", "trigger `type` must be a string"))?;
        trigger.trigger_type = kind
            .parse::<TriggerType>()
            .map_err(|e| StoryboardError::new("E5001", e))?;
    }

    if let Some(uses) = json.get("uses").filter(|v| !v.is_null()) {
        let uses = uses
            .as_i64()
            .ok_or_else(|| StoryboardError::new("E5002", "trigger `uses` must be an integer"))?;
        trigger.uses = u32::try_from(uses).ok().filter(|&n| n > 0);
    }

    if let Some(notes) = json.get("notes") {
        trigger.notes = list(notes, "notes", |v| v.as_i64().and_then(|n| i32::try_from(n).ok()))?;
    }
    if let Some(spawn) = json.get("spawn") {
        trigger.spawn = list(spawn, "spawn", |v| v.as_str().map(str::to_string))?;
    }
    if let Some(destroy) = json.get("destroy") {
        trigger.destroy = list(destroy, "destroy", |v| v.as_str().map(str::to_string))?;
    }
    if let Some(combo) = json.get("combo").filter(|v| !v.is_null()) {
        trigger.combo = combo
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| StoryboardError::new("E5002", "trigger `combo` must be an integer"))?;
    }
    if let Some(score) = json.get("score").filter(|v| !v.is_null()) {
        trigger.score = score
            .as_i64()
            .ok_or_else(|| StoryboardError::new("E5002", "trigger `score` must be an integer"))?;
    }

    Ok(trigger)
}

fn list<T>(
    value: &Value,
    name: &str,
    item: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>, StoryboardError> {
    let bad = || StoryboardError::new("E5002", format!("trigger `{name}` has an invalid entry"));
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(|v| item(v).ok_or_else(bad)).collect(),
        _ => Err(StoryboardError::new("E5002", format!("trigger `{name}` must be an array"))),
    }
}

/// Armed triggers of one storyboard, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TriggerEngine {
    triggers: Vec<Trigger>,
}

impl TriggerEngine {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        Self { triggers }
    }

    pub fn armed(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
    }

    /// Evaluates every armed trigger against one cleared note. Returns how many fired.
    ///
    /// Each trigger is checked once, in declaration order. A trigger retires when its
    /// use budget is spent; a score trigger retires on its first activation.
    pub fn on_note_clear(
        &mut self,
        note: &ChartNote,
        game: GameSnapshot,
        handler: &mut impl TriggerHandler,
    ) -> usize {
        let mut fired = 0;
        self.triggers.retain_mut(|trigger| {
            let hit = match trigger.trigger_type {
                TriggerType::None => false,
                TriggerType::NoteClear => trigger.notes.contains(&note.id),
                TriggerType::Combo => game.combo == trigger.combo,
                TriggerType::Score => game.score >= trigger.score,
            };
            if !hit {
                return true;
            }

            fired += 1;
            trigger.triggerer = Some(note.clone());
            trigger.current_uses += 1;
            handler.on_trigger(trigger);

            let spent = trigger.uses == Some(trigger.current_uses);
            let retire = spent || trigger.trigger_type == TriggerType::Score;
            tracing::debug!(
                kind = ?trigger.trigger_type,
                note = note.id,
                uses = trigger.current_uses,
                retire,
                "trigger fired"
            );
            !retire
        });
        fired
    }
}
