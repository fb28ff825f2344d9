use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
struct Args {
    path: PathBuf,
    #[arg(long)]
    chart: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let chart = storyboard_runner::load_chart_json_from_path(&args.chart)?;
    let storyboard = storyboard_runner::load_storyboard_from_path(&args.path, &chart)?;
    println!("notes={}", chart.notes().len());
    println!("texts={}", storyboard.texts.len());
    println!("sprites={}", storyboard.sprites.len());
    println!("videos={}", storyboard.videos.len());
    println!("lines={}", storyboard.lines.len());
    println!("controllers={}", storyboard.controllers.len());
    println!("note_controllers={}", storyboard.note_controllers.len());
    println!("triggers={}", storyboard.triggers.len());
    println!("diagnostics={}", storyboard.diagnostics().len());
    Ok(())
}
