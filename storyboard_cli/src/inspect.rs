use storyboard_compiler::{ObjectTable, Storyboard};
use storyboard_schema::{Category, ObjectState, Seconds, NEVER};

pub fn print_storyboard(storyboard: &Storyboard) {
    for category in Category::ALL {
        match category {
            Category::Text => print_table(&storyboard.texts),
            Category::Sprite => print_table(&storyboard.sprites),
            Category::Video => print_table(&storyboard.videos),
            Category::Line => print_table(&storyboard.lines),
            Category::Controller => print_table(&storyboard.controllers),
            Category::NoteController => print_table(&storyboard.note_controllers),
        }
    }

    println!("[triggers] {}", storyboard.triggers.len());
    for (i, trigger) in storyboard.triggers.armed().iter().enumerate() {
        let uses = trigger
            .uses
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
        println!(
            "  #{i} {:?} uses={uses} notes={:?} combo={} score={} spawn={:?} destroy={:?}",
            trigger.trigger_type,
            trigger.notes,
            trigger.combo,
            trigger.score,
            trigger.spawn,
            trigger.destroy
        );
    }

    let diagnostics = storyboard.diagnostics();
    println!("[diagnostics] {}", diagnostics.len());
    for d in diagnostics {
        let category = d.category.map_or("-", |c| c.key());
        let index = d.index.map_or_else(|| "-".to_string(), |i| i.to_string());
        println!("  {category}[{index}] {d}");
    }
}

fn print_table<S: ObjectState>(table: &ObjectTable<S>) {
    if table.is_empty() {
        return;
    }
    println!("[{}] {}", S::CATEGORY, table.len());
    for object in table.values() {
        let mut line = format!("  {}", object.id);
        if let Some(target) = &object.target_id {
            line.push_str(&format!(" target={target}"));
        }
        if let Some(parent) = &object.parent_id {
            line.push_str(&format!(" parent={parent}"));
        }
        let times: Vec<String> = object.states.iter().map(|s| fmt_time(s.base().time)).collect();
        println!("{line} states=[{}]", times.join(", "));
    }
}

fn fmt_time(t: Seconds) -> String {
    if t == NEVER {
        "never".to_string()
    } else {
        format!("{t:.3}")
    }
}
