//! gesture_drive: command-line entry point.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gesture_drive::app::run;
use gesture_drive::config::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gesture_drive=info,finger_gesture=info")),
        )
        .init();

    let cli = Cli::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Gesture Drive — 1 finger = Up,  2 fingers = Down      ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  LeapMotion hardware available (--source leap)");
    #[cfg(not(feature = "leap"))]
    println!("  Keyboard simulation / replay  (use --features leap for hardware)");
    println!();

    let cfg = cli.into_config().context("invalid arguments")?;
    let summary = run(cfg).context("gesture loop failed")?;

    println!();
    println!("  {} frames, exit: {:?}", summary.frames, summary.exit);
    Ok(())
}
