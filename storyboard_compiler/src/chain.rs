use serde_json::Value;
use storyboard_schema::{NoteId, ObjectState, Seconds, NEVER};

use crate::{
    expand::{expand, Node},
    template::TemplateRegistry,
    time::{resolve_time, ResolveContext},
    StoryboardError,
};

/// Keys the chain builder consumes itself; everything else goes to the category parser.
const STRUCTURAL_KEYS: [&str; 9] = [
    "id",
    "target_id",
    "parent_id",
    "template",
    "time",
    "relative_time",
    "add_time",
    "reset",
    "states",
];

/// Builds the state list of one object from its template-merged root node.
///
/// The root node is the zeroth state. Nested `states` are expanded, template-merged
/// and chained in document order; the result is stably sorted by resolved time.
pub fn build_states<S: ObjectState>(
    root: &Node,
    templates: &TemplateRegistry,
    ctx: &mut ResolveContext<'_>,
) -> Result<Vec<S>, StoryboardError> {
    let root_time = resolve_time(ctx, node_note(root), root.get("time"))?;

    let mut initial: S = create_state(None, root)?;
    initial.base_mut().time = root_time.unwrap_or(NEVER);

    let mut states = vec![initial.clone()];
    let mut builder = ChainBuilder {
        templates,
        ctx,
        states: &mut states,
        root_time,
    };
    builder.add_states(&initial, root, root_time)?;

    states.sort_by(|a, b| a.base().time.total_cmp(&b.base().time));
    Ok(states)
}

struct ChainBuilder<'b, 'c, 'a, S> {
    templates: &'b TemplateRegistry,
    ctx: &'c mut ResolveContext<'a>,
    states: &'b mut Vec<S>,
    /// Fallback base for every nesting level; nesting never replaces it.
    root_time: Option<Seconds>,
}

impl<S: ObjectState> ChainBuilder<'_, '_, '_, S> {
    fn add_states(
        &mut self,
        parent_state: &S,
        node: &Node,
        node_time: Option<Seconds>,
    ) -> Result<(), StoryboardError> {
        let children = match node.get("states") {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Array(children)) => children,
            Some(other) => {
                return Err(StoryboardError::new("E1003", "`states` must be an array")
                    .with_context(other.to_string()))
            }
        };

        let mut expanded = Vec::new();
        for child in children {
            let Value::Object(child) = child else {
                return Err(StoryboardError::new("E1003", "state declarations must be objects")
                    .with_context(child.to_string()));
            };
            expanded.extend(expand(child.clone(), self.ctx.chart())?);
        }

        let mut base_time = node_time.or(self.root_time).unwrap_or(NEVER);
        let mut last_time = parent_state.base().time;
        let mut prev = parent_state.clone();

        for child in expanded {
            let child = self.templates.apply(child)?;
            let explicit = resolve_time(self.ctx, node_note(&child), child.get("time"))?;

            let mut state = create_state(Some(&prev), &child)?;
            let time = if let Some(t) = explicit {
                base_time = t;
                t
            } else if let Some(relative) = state.base().relative_time {
                offset(base_time, relative)
            } else if let Some(add) = state.base().add_time {
                offset(last_time, add)
            } else {
                // inherited from `prev`; NEVER after a reset
                state.base().time
            };
            state.base_mut().time = time;
            last_time = time;

            self.states.push(state.clone());
            self.add_states(&state, &child, explicit)?;
            prev = state;
        }
        Ok(())
    }
}

/// Copies `prev` (unless absent or the node resets) and overlays the node's fields.
fn create_state<S: ObjectState>(prev: Option<&S>, node: &Node) -> Result<S, StoryboardError> {
    let reset = node.get("reset").and_then(Value::as_bool).unwrap_or(false);
    let mut state = match prev {
        Some(prev) if !reset => prev.clone(),
        _ => S::default(),
    };

    let mut fields = node.clone();
    for key in STRUCTURAL_KEYS {
        fields.remove(key);
    }
    let patch: S = serde_json::from_value(Value::Object(fields)).map_err(|e| {
        StoryboardError::new("E4102", format!("invalid {} state: {e}", S::CATEGORY))
            .with_category(S::CATEGORY)
    })?;
    state.overlay(patch);

    let base = state.base_mut();
    base.relative_time = number(node, "relative_time");
    base.add_time = number(node, "add_time");
    Ok(state)
}

fn offset(base: Seconds, delta: Seconds) -> Seconds {
    if base == NEVER {
        NEVER
    } else {
        base + delta
    }
}

fn number(node: &Node, key: &str) -> Option<Seconds> {
    node.get(key).and_then(Value::as_f64)
}

pub(crate) fn node_note(node: &Node) -> Option<NoteId> {
    node.get("note")
        .and_then(Value::as_i64)
        .and_then(|n| NoteId::try_from(n).ok())
}
