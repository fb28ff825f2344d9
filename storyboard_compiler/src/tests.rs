use super::*;
use serde_json::json;
use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};
use storyboard_schema::{ChartNote, Trigger, TriggerType, NEVER};

fn chart() -> Chart {
    let notes = (1..=8)
        .map(|id| ChartNote {
            id,
            note_type: if id <= 4 { 0 } else { 1 },
            x: id as f64 / 10.0,
            direction: if id % 2 == 0 { 1 } else { -1 },
            intro_time: id as f64 - 0.5,
            start_time: id as f64,
            end_time: id as f64 + 1.0,
        })
        .collect();
    Chart::new(notes)
}

fn parse(v: Value) -> Storyboard {
    parse_value_with_options(&v, &chart(), &ParseOptions::default()).unwrap()
}

fn assert_sorted<S: ObjectState>(table: &ObjectTable<S>) {
    for object in table.values() {
        for pair in object.states.windows(2) {
            assert!(pair[0].base().time <= pair[1].base().time, "{} unsorted", object.id);
        }
    }
}

#[test]
fn parses_every_category() {
    let sb = parse(json!({
        "texts": [{ "id": "title", "time": 0, "text": "Hello", "states": [{ "add_time": 2, "opacity": 0 }] }],
        "sprites": [{ "id": "bg", "time": 0, "path": "bg.png" }],
        "videos": [{ "id": "mv", "time": 1, "path": "mv.mp4" }],
        "lines": [{ "id": "l", "time": 0, "pos": [{ "x": 0, "y": 0 }, { "x": 1, "y": 1 }] }],
        "controllers": [{ "id": "cam", "fov": 60 }],
        "note_controllers": [{ "id": "n3", "note": 3, "override_x": true, "x": 0.5 }]
    }));

    assert_eq!(sb.object_count(), 6);
    assert!(sb.diagnostics().is_empty());

    let title = &sb.texts["title"];
    assert_eq!(title.states.len(), 2);
    assert_eq!(title.states[1].base.time, 2.0);
    assert_eq!(title.states[1].text.as_deref(), Some("Hello"));
    assert_eq!(title.states[1].stage.opacity, Some(0.0));

    assert_eq!(sb.lines["l"].states[0].pos.as_ref().unwrap().len(), 2);
    assert_eq!(sb.controllers["cam"].states[0].base.time, 0.0);
    assert_eq!(sb.note_controllers["n3"].states[0].note, Some(3));
}

#[test]
fn note_array_expands_into_objects_with_note_ids() {
    let sb = parse(json!({
        "sprites": [{
            "id": "ring_$note",
            "note": [2, 4, 6],
            "time": "intro:$note",
            "states": [{ "time": "end:$note", "opacity": 0 }]
        }]
    }));

    assert_eq!(sb.sprites.len(), 3);
    for id in [2, 4, 6] {
        let ring = &sb.sprites[&format!("ring_{id}")];
        assert_eq!(ring.states[0].base.time, id as f64 - 0.5);
        assert_eq!(ring.states[1].base.time, id as f64 + 1.0);
    }
}

#[test]
fn time_array_times_selector_gives_m_times_n_objects() {
    let sb = parse(json!({
        "texts": [{
            "time": [0, 10, 20],
            "note": { "type": 1, "direction": 1 },
            "text": "$note"
        }]
    }));
    // type 1 notes are 5..=8, direction 1 keeps 6 and 8
    assert_eq!(sb.texts.len(), 6);
    let mut times: Vec<_> = sb.texts.values().map(|t| t.states[0].base.time).collect();
    times.sort_by(f64::total_cmp);
    assert_eq!(times, vec![0.0, 0.0, 10.0, 10.0, 20.0, 20.0]);
}

#[test]
fn selector_with_no_match_produces_nothing() {
    let sb = parse(json!({
        "sprites": [{ "id": "x_$note", "note": { "min_x": 5.0 }, "time": 0 }]
    }));
    assert!(sb.sprites.is_empty());
    assert!(sb.diagnostics().is_empty());
}

#[test]
fn bad_declarations_are_isolated() {
    let sb = parse(json!({
        "texts": [
            { "id": "ok1", "time": 0 },
            { "id": "both", "target_id": "ok1" },
            { "target_id": "ok1", "parent_id": "ok2" },
            { "id": "dangling", "time": "start:$note" },
            { "id": "missing_note", "time": "start:99" },
            { "id": "tmpl", "template": "nope" },
            { "id": "ok1", "time": 5 },
            "not an object",
            { "id": "ok2", "time": 1 }
        ]
    }));

    let mut ids: Vec<_> = sb.texts.keys().cloned().collect();
    ids.sort();
    assert_eq!(ids, vec!["ok1".to_string(), "ok2".to_string()]);
    assert_eq!(sb.texts["ok1"].states[0].base.time, 0.0);

    let codes: Vec<_> = sb.diagnostics().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["E4001", "E4002", "E3001", "E3002", "E3003", "E4101", "E1003"]);
    assert_eq!(sb.diagnostics()[0].kind, StoryboardErrorKind::Identity);
    assert_eq!(sb.diagnostics()[0].index, Some(1));
}

#[test]
fn strict_mode_fails_on_first_diagnostic() {
    let doc = json!({ "texts": [{ "id": "a", "target_id": "b" }] });
    let err = parse_value_with_options(&doc, &chart(), &ParseOptions { strict: true }).unwrap_err();
    assert_eq!(err.code, "E4001");
    assert_eq!(err.category, Some(Category::Text));
}

#[test]
fn malformed_time_is_never_displayed() {
    let sb = parse(json!({ "sprites": [{ "id": "s", "time": "whenever" }] }));
    assert_eq!(sb.sprites["s"].states[0].base.time, NEVER);
    assert!(sb.diagnostics().is_empty());
}

#[test]
fn templates_apply_to_objects_and_states() {
    let sb = parse(json!({
        "templates": {
            "fade_in": { "opacity": 0, "states": [{ "relative_time": 1, "opacity": 1 }] },
            "hop": { "add_time": 0.5, "y": 1 }
        },
        "sprites": [
            { "id": "a", "time": 2, "template": "fade_in", "path": "a.png" },
            { "id": "b", "time": 2, "states": [{ "time": 3 }, { "template": "hop" }, { "template": "hop", "y": 2 }] }
        ]
    }));

    let a = &sb.sprites["a"];
    assert_eq!(a.states.len(), 2);
    assert_eq!(a.states[0].stage.opacity, Some(0.0));
    assert_eq!(a.states[1].base.time, 3.0);
    assert_eq!(a.states[1].stage.opacity, Some(1.0));
    assert_eq!(a.states[1].path.as_deref(), Some("a.png"));

    let b: Vec<_> = sb.sprites["b"]
        .states
        .iter()
        .map(|s| (s.base.time, s.stage.y))
        .collect();
    assert_eq!(b, vec![(2.0, None), (3.0, None), (3.5, Some(1.0)), (4.0, Some(2.0))]);
}

#[test]
fn replacement_context_does_not_leak_between_objects() {
    let sb = parse(json!({
        "sprites": [
            { "id": "first", "note": 1, "time": "start:$note" },
            { "id": "second", "time": "start:$note" }
        ]
    }));
    assert!(sb.sprites.contains_key("first"));
    assert!(!sb.sprites.contains_key("second"));
    assert_eq!(sb.diagnostics()[0].code, "E3001");
}

#[test]
fn every_state_list_is_time_ordered() {
    let sb = parse(json!({
        "texts": [{
            "id": "t", "time": 5,
            "states": [
                { "time": 9 }, { "time": 1 }, { "relative_time": -3 }, { "x": 1 },
                { "time": "at:3:0.5", "states": [{ "add_time": 1 }] }
            ]
        }],
        "lines": [{ "id": "l", "states": [{ "time": 4 }, { "time": 2 }] }]
    }));
    assert_sorted(&sb.texts);
    assert_sorted(&sb.lines);
    let times: Vec<_> = sb.texts["t"].states.iter().map(|s| s.base.time).collect();
    assert_eq!(times, vec![-2.0, -2.0, 1.0, 3.5, 4.5, 5.0, 9.0]);
}

#[test]
fn triggers_are_loaded_in_order() {
    let sb = parse(json!({
        "triggers": [
            { "type": "noteclear", "notes": [1], "spawn": ["a"], "uses": 1 },
            { "type": "bogus" },
            { "type": "Score", "score": 1000, "destroy": ["a"] }
        ]
    }));
    let kinds: Vec<_> = sb.triggers.armed().iter().map(|t| t.trigger_type).collect();
    assert_eq!(kinds, vec![TriggerType::NoteClear, TriggerType::Score]);
    assert_eq!(sb.diagnostics()[0].code, "E5001");
    assert_eq!(sb.diagnostics()[0].index, Some(1));
}

#[test]
fn parsed_triggers_fire_on_note_clear() {
    let mut sb = parse(json!({
        "triggers": [{ "type": "noteclear", "notes": [2], "spawn": ["boom"], "uses": 1 }]
    }));
    let chart = chart();
    let mut spawned: Vec<String> = Vec::new();
    let mut handler = |t: &Trigger| spawned.extend(t.spawn.iter().cloned());

    sb.triggers
        .on_note_clear(chart.note(2).unwrap(), GameSnapshot::default(), &mut handler);
    sb.triggers
        .on_note_clear(chart.note(2).unwrap(), GameSnapshot::default(), &mut handler);
    assert_eq!(spawned, vec!["boom".to_string()]);
    assert!(sb.triggers.is_empty());
}

#[test]
fn compile_then_reload_reproduces_every_table() {
    let sb = parse(json!({
        "templates": { "t": { "scale_x": 2, "easing": "easeOutQuad" } },
        "texts": [{ "id": "a", "time": 0.1, "text": "x", "states": [{ "add_time": 0.3, "template": "t" }, { "size": 20 }] }],
        "sprites": [{ "id": "s_$note", "note": [1, 2], "time": "at:$note:0.25", "parent_id": "a" }],
        "videos": [{ "target_id": "mv", "time": 3 }],
        "lines": [{ "id": "l", "time": 0, "pos": [{ "x": 0.5, "y": 0.25 }] }],
        "controllers": [{ "id": "c", "bloom": true, "states": [{ "relative_time": 1.7, "bloom_intensity": 0.3 }] }],
        "note_controllers": [{ "id": "n", "note": 4, "rot_z": 45 }],
        "triggers": [{ "type": "combo", "combo": 10 }]
    }));
    assert!(sb.diagnostics().is_empty());

    let compiled = sb.compile_to_value().unwrap();
    assert_eq!(compiled["compiled"], json!(true));
    assert!(compiled["texts"][0].get("target_id").is_none());
    assert!(compiled["texts"][0]["states"][0].get("x").is_none());

    let reloaded = parse(compiled);
    assert_eq!(reloaded.texts, sb.texts);
    assert_eq!(reloaded.sprites, sb.sprites);
    assert_eq!(reloaded.videos, sb.videos);
    assert_eq!(reloaded.lines, sb.lines);
    assert_eq!(reloaded.controllers, sb.controllers);
    assert_eq!(reloaded.note_controllers, sb.note_controllers);
    assert!(reloaded.triggers.is_empty());
    assert!(reloaded.templates.is_empty());
}

#[test]
fn compiled_text_reload_keeps_float_bits() {
    let chart = chart();
    let src = r#"{
        "sprites": [
            { "id": "s", "time": 40.09, "states": [{ "add_time": 0.07 }, { "add_time": 0.013 }] },
            { "id": "m_$note", "note": [3, 7], "time": "at:$note:0.37", "states": [{ "relative_time": 0.1 }] }
        ]
    }"#;
    let sb = parse_str(src, &chart).unwrap();
    let text = serde_json::to_string_pretty(&sb.compile_to_value().unwrap()).unwrap();
    let reloaded = parse_str(&text, &chart).unwrap();

    assert_eq!(reloaded.sprites, sb.sprites);
    for (id, object) in &sb.sprites {
        for (a, b) in object.states.iter().zip(&reloaded.sprites[id].states) {
            assert_eq!(a.base.time.to_bits(), b.base.time.to_bits(), "{id}");
        }
    }
}

#[test]
fn compiled_document_requires_all_arrays() {
    let doc = json!({ "compiled": true, "texts": [], "sprites": [], "videos": [], "lines": [], "controllers": [] });
    let err = parse_value_with_options(&doc, &chart(), &ParseOptions::default()).unwrap_err();
    assert_eq!(err.code, "E1101");
    assert_eq!(err.kind, StoryboardErrorKind::Structure);
    assert_eq!(err.category, Some(Category::NoteController));
}

#[test]
fn compiled_document_skips_resolution() {
    let doc = json!({
        "compiled": true,
        "templates": { "ignored": {} },
        "texts": [{ "id": "t", "states": [{ "time": 2.0, "text": "kept" }] }],
        "sprites": [], "videos": [], "lines": [], "controllers": [], "note_controllers": [],
        "triggers": [{ "type": "combo", "combo": 1 }]
    });
    let sb = parse(doc);
    assert_eq!(sb.texts["t"].states[0].text.as_deref(), Some("kept"));
    assert!(sb.triggers.is_empty());
    assert!(sb.templates.is_empty());
}

#[test]
fn root_must_be_an_object() {
    assert_eq!(parse_str("[1, 2]", &chart()).unwrap_err().code, "E1002");
    assert_eq!(parse_str("{ nope", &chart()).unwrap_err().code, "E1001");
}

#[test]
fn dispose_releases_everything() {
    let mut sb = parse(json!({
        "templates": { "t": {} },
        "texts": [{ "id": "a", "time": 0 }],
        "triggers": [{ "type": "combo", "combo": 1 }]
    }));
    sb.dispose();
    assert_eq!(sb.object_count(), 0);
    assert!(sb.triggers.is_empty());
    assert!(sb.templates.is_empty());
}

#[test]
fn parse_file_and_write_compiled_roundtrip() {
    let tmp_base = std::env::temp_dir().join(format!(
        "storyboard_compiler_test_{}_{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    fs::create_dir_all(&tmp_base).unwrap();
    let input = tmp_base.join("storyboard.json");
    fs::write(
        &input,
        r#"{ "sprites": [{ "id": "s", "time": "start:3", "states": [{ "add_time": 1, "x": 2 }] }] }"#,
    )
    .unwrap();

    let chart = chart();
    let sb = parse_file(&input, &chart).unwrap();
    let output = tmp_base.join("storyboard.compiled.json");
    sb.write_compiled(&output).unwrap();

    let reloaded = parse_file(&output, &chart).unwrap();
    assert_eq!(reloaded.sprites, sb.sprites);
    assert_eq!(reloaded.sprites["s"].states[1].base.time, 4.0);

    let missing = parse_file(tmp_base.join("missing.json"), &chart).unwrap_err();
    assert_eq!(missing.code, "E2001");
    assert!(missing.file.is_some());

    let _ = fs::remove_dir_all(&tmp_base);
}
