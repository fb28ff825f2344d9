use serde_json::Value;
use storyboard_schema::{Chart, NoteId, Seconds};

use crate::StoryboardError;

const NOTE_PLACEHOLDER: &str = "$note";

/// Symbol bindings for one object's resolution pass.
///
/// A fresh context is created for every expanded root declaration, so a `$note`
/// bound while resolving one object can never leak into a sibling.
#[derive(Debug, Clone)]
pub struct ResolveContext<'a> {
    chart: &'a Chart,
    note: Option<NoteId>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(chart: &'a Chart) -> Self {
        Self { chart, note: None }
    }

    pub fn chart(&self) -> &'a Chart {
        self.chart
    }

    pub fn note_binding(&self) -> Option<NoteId> {
        self.note
    }

    /// Resolves `$note` for a node whose own `note` field is `own`.
    ///
    /// A node carrying a note rebinds the placeholder for everything resolved after it.
    pub fn resolve_note(&mut self, own: Option<NoteId>) -> Result<NoteId, StoryboardError> {
        if let Some(id) = own {
            self.note = Some(id);
            return Ok(id);
        }
        self.note.ok_or_else(|| {
            StoryboardError::new(
                "E3001",
                "$note used without a note on the declaration or an earlier binding",
            )
        })
    }

    /// Substitutes `$note` inside an id-like string.
    pub fn substitute(&mut self, s: &str, own: Option<NoteId>) -> Result<String, StoryboardError> {
        if !s.contains(NOTE_PLACEHOLDER) {
            return Ok(s.to_string());
        }
        let id = self
            .resolve_note(own)
            .map_err(|e| e.with_context(s.to_string()))?;
        Ok(s.replace(NOTE_PLACEHOLDER, &id.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Intro,
    Start,
    End,
    At,
}

/// Resolves a raw `time` token to chart seconds.
///
/// Numbers pass through. Strings are `type:id[:offset]` note references. Anything
/// else is malformed and resolves to `None` (never displayed); only an unbound
/// `$note` or an unknown note id is an error.
pub fn resolve_time(
    ctx: &mut ResolveContext<'_>,
    own_note: Option<NoteId>,
    token: Option<&Value>,
) -> Result<Option<Seconds>, StoryboardError> {
    match token {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => resolve_expression(ctx, own_note, s),
        Some(other) => {
            tracing::warn!(token = %other, "malformed time token");
            Ok(None)
        }
    }
}

fn resolve_expression(
    ctx: &mut ResolveContext<'_>,
    own_note: Option<NoteId>,
    expr: &str,
) -> Result<Option<Seconds>, StoryboardError> {
    let parts: Vec<&str> = expr.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Ok(malformed(expr));
    }

    let anchor = match parts[0].to_ascii_lowercase().as_str() {
        "intro" => Anchor::Intro,
        "start" => Anchor::Start,
        "end" => Anchor::End,
        "at" => Anchor::At,
        _ => return Ok(malformed(expr)),
    };

    let offset = match parts.get(2) {
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => return Ok(malformed(expr)),
        },
        None => 0.0,
    };

    let note_id = if parts[1] == NOTE_PLACEHOLDER {
        ctx.resolve_note(own_note)
            .map_err(|e| e.with_context(expr.to_string()))?
    } else {
        match parts[1].trim().parse::<NoteId>() {
            Ok(id) => id,
            Err(_) => return Ok(malformed(expr)),
        }
    };

    let note = ctx.chart().note(note_id).ok_or_else(|| {
        StoryboardError::new("E3002", format!("unknown note id {note_id}"))
            .with_context(expr.to_string())
    })?;

    let time = match anchor {
        Anchor::Intro => note.intro_time + offset,
        Anchor::Start => note.start_time + offset,
        Anchor::End => note.end_time + offset,
        Anchor::At => note.start_time + (note.end_time - note.start_time) * offset,
    };
    Ok(Some(time))
}

fn malformed(expr: &str) -> Option<Seconds> {
    tracing::warn!(token = expr, "malformed time token");
    None
}
