use std::{cell::RefCell, path::PathBuf, rc::Rc, time::Duration};

use clap::{Args, Parser, Subcommand};
use interval_metronome_core::{
    format_display_time, AppConfig, ControllerEvent, RhythmSegment, RunController, RunState,
    SoundBank, Timeline,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{Instant, MissedTickBehavior},
};
use tracing_subscriber::EnvFilter;

mod command;
mod output;

use command::Command;
use output::OutputKind;

#[tokio::main(flavor = "current_thread")]
async fn main() -> interval_metronome_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Plan { timeline, json } => run_plan(&timeline, json),
        Commands::PrintConfig => {
            println!("{}", AppConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> interval_metronome_core::Result<()> {
    let config = args.timeline.load()?;
    tracing::info!(
        segments = config.segments.len(),
        total_minutes = config.segments.total_duration_minutes(),
        output = ?args.output,
        "starting metronome"
    );

    let sounds = SoundBank::load(output::open(args.output, config.sounds.volume), &config.sounds);
    let mut controller = RunController::from_config(&config, sounds);

    let pending = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&pending);
    controller.subscribe(move |event: &ControllerEvent| sink.borrow_mut().push(event.clone()));

    let origin = Instant::now();
    let now_ms = || origin.elapsed().as_millis() as u64;

    if args.autostart {
        controller.start(now_ms());
    } else {
        println!("{}", command::HELP);
    }
    render(&controller, &mut pending.borrow_mut(), args.json)?;

    let mut poll = tokio::time::interval(Duration::from_millis(config.run.poll_interval_ms.max(1)));
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = poll.tick() => controller.advance(now_ms()),
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    controller.advance(now_ms());
                    if execute(&mut controller, &line, now_ms(), args.json)? == Flow::Quit {
                        break;
                    }
                }
                None => {
                    tracing::debug!("stdin closed, commands disabled");
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }

        render(&controller, &mut pending.borrow_mut(), args.json)?;

        if controller.state() == RunState::Finished && (args.exit_on_finish || !stdin_open) {
            break;
        }
    }

    controller.stop();
    tracing::info!("metronome shut down");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn execute(
    controller: &mut RunController,
    line: &str,
    now_ms: u64,
    json: bool,
) -> interval_metronome_core::Result<Flow> {
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(err) => {
            println!("! {err}");
            return Ok(Flow::Continue);
        }
    };

    let outcome = match command {
        Command::Start => {
            if !controller.start(now_ms) {
                println!("already running");
            }
            Ok(())
        }
        Command::Pause => {
            if !controller.pause() {
                println!("not running");
            }
            Ok(())
        }
        Command::Stop => {
            controller.stop();
            Ok(())
        }
        Command::Add(Some(segment)) => controller.add_segment_with(segment),
        Command::Add(None) => controller.add_segment(),
        Command::Remove(index) => controller.remove_segment(index),
        Command::Set {
            index,
            field,
            value,
        } => controller.update_segment(index, field, value),
        Command::List => {
            print_plan(controller.timeline(), json)?;
            Ok(())
        }
        Command::Status => {
            print_status(controller, json)?;
            Ok(())
        }
        Command::Help => {
            println!("{}", command::HELP);
            Ok(())
        }
        Command::Quit => return Ok(Flow::Quit),
    };

    if let Err(err) = outcome {
        println!("! {err}");
    }
    Ok(Flow::Continue)
}

/// Turns queued change notifications into output lines.
fn render(
    controller: &RunController,
    pending: &mut Vec<ControllerEvent>,
    json: bool,
) -> interval_metronome_core::Result<()> {
    if pending.is_empty() {
        return Ok(());
    }

    let mut refresh = false;
    for event in pending.drain(..) {
        match event {
            ControllerEvent::StateChanged { to, .. } => {
                if !json {
                    println!("== {to}");
                }
                refresh = true;
            }
            ControllerEvent::TempoChanged { to, segment, .. } => {
                if !json {
                    println!("== segment {} @ {to} bpm", segment + 1);
                }
            }
            ControllerEvent::ElapsedChanged(_) | ControllerEvent::TimelineChanged => refresh = true,
            ControllerEvent::Beat { .. } => {}
        }
    }

    if refresh {
        print_status(controller, json)?;
    }
    Ok(())
}

fn print_status(controller: &RunController, json: bool) -> interval_metronome_core::Result<()> {
    let snapshot = controller.snapshot();
    if json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!("{}", snapshot.summary());
    }
    Ok(())
}

fn run_plan(args: &TimelineArgs, json: bool) -> interval_metronome_core::Result<()> {
    let config = args.load()?;
    print_plan(&config.segments, json)
}

fn print_plan(timeline: &Timeline, json: bool) -> interval_metronome_core::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(timeline)?);
        return Ok(());
    }

    println!("{:>3}  {:>8}  {:>9}  {:>6}  {:>9}", "#", "start", "minutes", "bpm", "beat");
    for (index, segment) in timeline.segments().iter().enumerate() {
        let start = timeline.segment_start_seconds(index).unwrap_or_default();
        println!(
            "{:>3}  {:>8}  {:>9}  {:>6}  {:>6.0} ms",
            index + 1,
            format_display_time(start as u64),
            segment.duration_minutes,
            segment.bpm,
            segment.beat_interval_ms(),
        );
    }
    println!(
        "total {} min ({})",
        timeline.total_duration_minutes(),
        format_display_time(timeline.total_duration_seconds().ceil() as u64)
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Interval timer metronome", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the metronome and accept commands on stdin.
    Run(RunArgs),
    /// Print the segment plan without running it.
    Plan {
        #[command(flatten)]
        timeline: TimelineArgs,
        /// Print the segments as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the default configuration as JSON.
    PrintConfig,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    timeline: TimelineArgs,
    /// Where beat sounds go.
    #[arg(short, long, value_enum, default_value_t = OutputKind::Silent)]
    output: OutputKind,
    /// Start immediately instead of waiting for `start`.
    #[arg(long)]
    autostart: bool,
    /// Exit once the whole timeline has elapsed.
    #[arg(long)]
    exit_on_finish: bool,
    /// Print status updates as JSON lines.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct TimelineArgs {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Segment as MINUTESxBPM, e.g. `10x160`. Repeat to build a timeline;
    /// replaces the configured segments.
    #[arg(short, long = "segment", value_name = "MINUTESxBPM")]
    segments: Vec<RhythmSegment>,
}

impl TimelineArgs {
    fn load(&self) -> interval_metronome_core::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if !self.segments.is_empty() {
            config.segments = Timeline::new(self.segments.clone())?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use interval_metronome_core::{SilentOutput, SoundBank};

    use super::*;

    fn controller() -> RunController {
        let timeline = Timeline::new(vec![RhythmSegment::new(1.0, 120.0)]).unwrap();
        RunController::new(timeline, SoundBank::unavailable(Box::new(SilentOutput)))
    }

    #[test]
    fn cli_parses_repeated_segments() {
        let cli = Cli::try_parse_from([
            "interval-metronome",
            "run",
            "-s",
            "10x160",
            "--segment",
            "30x180",
            "--output",
            "bell",
            "--autostart",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.output, OutputKind::Bell);
        assert!(args.autostart);
        let config = args.timeline.load().unwrap();
        assert_eq!(config.segments.total_duration_seconds(), 2400.0);
    }

    #[test]
    fn cli_rejects_bad_segments() {
        assert!(Cli::try_parse_from(["interval-metronome", "plan", "-s", "ten"]).is_err());
    }

    #[test]
    fn commands_drive_the_controller() {
        let mut controller = controller();

        assert_eq!(execute(&mut controller, "start", 0, false).unwrap(), Flow::Continue);
        assert_eq!(controller.state(), RunState::Started);

        execute(&mut controller, "add", 0, false).unwrap();
        assert_eq!(controller.timeline().len(), 1);

        execute(&mut controller, "stop", 0, false).unwrap();
        execute(&mut controller, "add 2 100", 0, false).unwrap();
        execute(&mut controller, "set 1 bpm 90", 0, false).unwrap();
        assert_eq!(controller.timeline().len(), 2);
        assert_eq!(controller.current_bpm(), 90.0);

        assert_eq!(execute(&mut controller, "quit", 0, false).unwrap(), Flow::Quit);
    }

    #[test]
    fn render_drains_pending_events() {
        let controller = controller();
        let mut pending = vec![ControllerEvent::TimelineChanged];
        render(&controller, &mut pending, true).unwrap();
        assert!(pending.is_empty());
    }
}
