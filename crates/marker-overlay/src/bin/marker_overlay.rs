use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marker_overlay::config::OverlayConfig;
use marker_overlay::replay::{run_replay, ScriptedDetector};

#[derive(Parser, Debug)]
#[command(author, version, about = "Marker-based AR overlay tools", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run recorded frames and detections through the overlay pipeline
    Replay {
        /// Overlay config (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Detection script (JSON array, one entry per frame)
        #[arg(short, long)]
        detections: PathBuf,

        /// Where to write the replay report
        #[arg(short, long, default_value = "replay_report.json")]
        report: PathBuf,

        /// Frame images, in order
        #[arg(required = true)]
        frames: Vec<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = marker_overlay::core::level_from_verbosity(cli.verbose);
    #[cfg(feature = "tracing")]
    {
        marker_overlay::core::init_tracing(false, level);
        let _ = tracing_log::LogTracer::init();
    }
    #[cfg(not(feature = "tracing"))]
    marker_overlay::core::init_with_level(level)?;

    match cli.command {
        Command::Replay {
            config,
            detections,
            report,
            frames,
        } => {
            let cfg = OverlayConfig::load(&config)?;
            let detector = ScriptedDetector::load_json(&detections)?;
            let result = run_replay(&cfg, frames, detector)?;
            result.write_json(&report)?;
            println!(
                "replayed {} frame(s), {} pose(s) applied; wrote {}",
                result.ticks.len(),
                result.poses_applied,
                report.display()
            );
        }
    }

    Ok(())
}
