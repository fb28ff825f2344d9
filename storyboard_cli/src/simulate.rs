use storyboard_compiler::{GameSnapshot, Storyboard};
use storyboard_runner::{Session, StoryboardRenderer};
use storyboard_schema::{Chart, Trigger};

/// Prints every trigger firing instead of drawing anything.
#[derive(Default)]
struct ConsoleRenderer {
    fired: usize,
}

impl StoryboardRenderer for ConsoleRenderer {
    fn initialize(&mut self, storyboard: &Storyboard) -> anyhow::Result<()> {
        println!(
            "Simulation Start ({} objects, {} triggers)",
            storyboard.object_count(),
            storyboard.triggers.len()
        );
        println!("Time(s)  | Note | Trigger   | Spawn / Destroy");
        println!("---------|------|-----------|------------------");
        Ok(())
    }

    fn on_trigger(&mut self, trigger: &Trigger) {
        self.fired += 1;
        let (time, note) = trigger
            .triggerer
            .as_ref()
            .map_or((0.0, -1), |n| (n.start_time, n.id));
        let kind = format!("{:?}", trigger.trigger_type);
        println!(
            "{time:8.3} | {note:4} | {kind:<9} | +{:?} -{:?}",
            trigger.spawn, trigger.destroy
        );
    }
}

/// Clears every chart note in start-time order, one combo step and a fixed score each.
pub fn run_simulation(storyboard: Storyboard, chart: Chart, score_per_note: i64) -> anyhow::Result<()> {
    let mut order: Vec<(f64, i32)> = chart.notes().iter().map(|n| (n.start_time, n.id)).collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut session = Session::start(storyboard, chart, ConsoleRenderer::default())?;
    let mut game = GameSnapshot::default();
    for (_, id) in order {
        game.combo += 1;
        game.score += score_per_note;
        session.on_note_clear(id, game)?;
    }

    let remaining = session.storyboard().triggers.len();
    let renderer = session.dispose();
    println!(
        "Simulation End: {} firings, {remaining} triggers still armed",
        renderer.fired
    );
    Ok(())
}
