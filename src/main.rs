mod app;
mod audio;
mod instrument;
mod project;
mod samples;
mod sequencer;
mod toys;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use app::App;
use ui::Theme;

/// Tonegrid - terminal music toy
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Theme to use for the interface
    #[arg(long, default_value = "default")]
    theme: String,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// Project file to load on startup and save to (default: pattern.tgrid)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Extra directory to scan for .wav samples
    #[arg(long)]
    samples: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_themes {
        println!("Available themes:");
        for theme in Theme::available_themes() {
            println!("  {}", theme);
        }
        return Ok(());
    }

    let theme = Theme::from_name(&args.theme).unwrap_or_else(|| {
        eprintln!(
            "Warning: Unknown theme '{}', using default. Use --list-themes to see available themes.",
            args.theme
        );
        Theme::default()
    });

    let mut app = App::new(theme, args.project, args.samples)?;
    app.run()
}
