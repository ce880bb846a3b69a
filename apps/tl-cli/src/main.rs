use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tl_app::{
    AppError, AppResult, BatchConfig, BatchProgressEvent, BatchReport, BatchStage, Evaluation,
    Manifest, StatisticKind, TraceSeries, WheelParams, batch, group_label, manifest, stats, trace,
};
use tl_core::{Smoothing, WindowSpec};
use tl_results::ResultSink;
use tracing::debug;

#[derive(Parser)]
#[command(name = "tl-cli")]
#[command(about = "TractionLab CLI - wheel/terrain run aggregation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate every run folder under a root directory
    Batch(BatchArgs),
    /// Slip and effective radius of a single run
    Summary {
        /// Series file with a time channel and a velocity channel
        csv: PathBuf,
        /// Window start in seconds
        #[arg(long, default_value_t = stats::DEFAULT_SUMMARY_START)]
        start: f64,
        /// Window end in seconds (defaults to the last sample)
        #[arg(long)]
        end: Option<f64>,
        /// Wheel angular rate in rad/s
        #[arg(long, default_value_t = stats::DEFAULT_ANGULAR_RATE)]
        angular_rate: f64,
        /// Wheel radius in m
        #[arg(long, default_value_t = stats::DEFAULT_WHEEL_RADIUS)]
        wheel_radius: f64,
        /// Longitudinal velocity channel
        #[arg(long, default_value = stats::DEFAULT_VELOCITY_CHANNEL)]
        velocity_channel: String,
    },
    /// Drawbar vs slip from explicit lists of series files, scales and slips
    Sweep {
        /// Series files
        #[arg(long, num_args = 1.., required = true)]
        csv: Vec<PathBuf>,
        /// Scale factor for each file
        #[arg(long, num_args = 1.., required = true)]
        scale: Vec<f64>,
        /// Slip value for each file
        #[arg(long, num_args = 1.., required = true)]
        slip: Vec<f64>,
        /// Window start in seconds (defaults to the first sample)
        #[arg(long)]
        start: Option<f64>,
        /// Window end in seconds (defaults to the last sample)
        #[arg(long)]
        end: Option<f64>,
        #[command(flatten)]
        smoothing: SmoothingArgs,
        /// Write `Scale, Slip, Drawbar` rows to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print rows and skips as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-file traces over time (drawbar coefficient, or named channels)
    Trace {
        /// Series files
        #[arg(long, num_args = 1.., required = true)]
        csv: Vec<PathBuf>,
        /// Scale factor for each file
        #[arg(long, num_args = 1.., required = true)]
        scale: Vec<f64>,
        /// Channels to trace instead of the drawbar coefficient (e.g. pos_x)
        #[arg(long)]
        channel: Vec<String>,
        #[command(flatten)]
        smoothing: SmoothingArgs,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct BatchArgs {
    /// Root directory holding one folder per run
    root_dir: Option<PathBuf>,
    /// Batch configuration YAML; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory for the output table
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Window start in seconds
    #[arg(long)]
    start: Option<f64>,
    /// Window end in seconds
    #[arg(long)]
    end: Option<f64>,
    /// Write the output table
    #[arg(long)]
    persist: bool,
    /// Metadata key to group runs by (e.g. scale)
    #[arg(long)]
    group_by: Option<String>,
    /// Average this channel instead of computing the drawbar coefficient (e.g. d_c)
    #[arg(long)]
    channel_mean: Option<String>,
    #[command(flatten)]
    smoothing: SmoothingArgs,
    /// Evaluate runs in parallel
    #[arg(long)]
    parallel: bool,
    /// Print rows and skips as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SmoothingArgs {
    /// Smoothing applied to each trace
    #[arg(long, value_enum)]
    smooth: Option<SmoothMethod>,
    /// Smoothing window in samples (odd for savgol)
    #[arg(long, default_value_t = 5)]
    window_size: usize,
    /// Polynomial order for savgol
    #[arg(long, default_value_t = 2)]
    polyorder: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum SmoothMethod {
    None,
    MovingAverage,
    Savgol,
}

impl SmoothingArgs {
    fn to_smoothing(&self) -> Option<Smoothing> {
        self.smooth.map(|method| match method {
            SmoothMethod::None => Smoothing::None,
            SmoothMethod::MovingAverage => Smoothing::MovingAverage {
                window: self.window_size,
            },
            SmoothMethod::Savgol => Smoothing::LocalPolynomial {
                window: self.window_size,
                order: self.polyorder,
            },
        })
    }
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Batch(args) => cmd_batch(args),
        Commands::Summary {
            csv,
            start,
            end,
            angular_rate,
            wheel_radius,
            velocity_channel,
        } => cmd_summary(
            &csv,
            WindowSpec { start, end },
            WheelParams {
                angular_rate,
                wheel_radius,
                velocity_channel,
            },
        ),
        Commands::Sweep {
            csv,
            scale,
            slip,
            start,
            end,
            smoothing,
            output,
            json,
        } => {
            let window = match start {
                Some(start) => WindowSpec { start, end },
                None => WindowSpec {
                    end,
                    ..WindowSpec::full()
                },
            };
            let evaluation = Evaluation {
                window,
                smoothing: smoothing.to_smoothing().unwrap_or_default(),
                ..manifest::default_manifest_evaluation()
            };
            cmd_sweep(csv, scale, slip, &evaluation, output.as_deref(), json)
        }
        Commands::Trace {
            csv,
            scale,
            channel,
            smoothing,
            output,
        } => cmd_trace(
            &csv,
            &scale,
            &channel,
            // traces are smoothed with a moving average unless told otherwise
            &smoothing
                .to_smoothing()
                .unwrap_or(Smoothing::MovingAverage {
                    window: smoothing.window_size,
                }),
            output.as_deref(),
        ),
    }
}

fn batch_config(args: &BatchArgs) -> AppResult<BatchConfig> {
    let mut config = match &args.config {
        Some(path) => BatchConfig::load_yaml(path)?,
        None => BatchConfig::default(),
    };
    if let Some(root) = &args.root_dir {
        config.root_dir = root.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(start) = args.start {
        config.window.start = start;
    }
    if args.end.is_some() {
        config.window.end = args.end;
    }
    if args.persist {
        config.persist = true;
    }
    if let Some(group) = &args.group_by {
        config.group_parameter = Some(group.clone());
    }
    if let Some(channel) = &args.channel_mean {
        config.statistic = StatisticKind::ChannelMean {
            channel: channel.clone(),
        };
    }
    if let Some(smoothing) = args.smoothing.to_smoothing() {
        config.smoothing = smoothing;
    }
    if args.parallel {
        config.parallel = true;
    }
    if args.config.is_none() && args.root_dir.is_none() {
        return Err(AppError::Config(
            "a root directory or --config is required".to_string(),
        ));
    }
    config.validate()?;
    Ok(config)
}

fn cmd_batch(args: BatchArgs) -> AppResult<()> {
    let config = batch_config(&args)?;
    println!("Aggregating runs under: {}", config.root_dir.display());

    let mut last_emit = Instant::now();
    let report = batch::run_batch_with_progress(
        &config,
        Some(&mut |event| {
            let emit_now = !matches!(event.stage, BatchStage::ProcessingRun)
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    print_report(&report, args.json)?;
    if let Some(path) = &report.output_path {
        println!("✓ Wrote {} rows to {}", report.rows().len(), path.display());
    }
    Ok(())
}

fn cmd_summary(csv: &Path, window: WindowSpec, wheel: WheelParams) -> AppResult<()> {
    let summary = stats::summarize_slip_file(csv, window, &wheel)?;
    println!("Run: {}", csv.display());
    println!("  Mean {}:       {:.6} m/s", wheel.velocity_channel, summary.mean_velocity);
    println!("  Slip:             {:.3} %", summary.slip_percent);
    println!("  Effective radius: {:.6} m", summary.effective_radius);
    Ok(())
}

fn cmd_sweep(
    csv: Vec<PathBuf>,
    scale: Vec<f64>,
    slip: Vec<f64>,
    evaluation: &Evaluation,
    output: Option<&Path>,
    json: bool,
) -> AppResult<()> {
    let manifest = Manifest::from_lists(csv, scale, slip)?;
    let report = manifest::run_manifest(&manifest, evaluation)?;
    print_report(&report, json)?;

    if let Some(path) = output {
        let sink = ResultSink::File {
            path: path.to_path_buf(),
            labels: vec!["Scale".into(), "Slip".into(), evaluation.statistic.label()],
        };
        batch::write_grouped(&report, &sink)?;
        println!("✓ Wrote {} rows to {}", report.rows().len(), path.display());
    }
    Ok(())
}

fn cmd_trace(
    csv: &[PathBuf],
    scale: &[f64],
    channels: &[String],
    smoothing: &Smoothing,
    output: Option<&Path>,
) -> AppResult<()> {
    let traces: Vec<TraceSeries> = if channels.is_empty() {
        trace::drawbar_traces(csv, scale, smoothing)?
    } else {
        trace::channel_traces(csv, scale, channels, smoothing)?
            .into_iter()
            .flatten()
            .collect()
    };

    let mut out = String::from("label,t,value\n");
    let mut points = 0usize;
    for series in &traces {
        for (t, value) in &series.points {
            out.push_str(&format!("\"{}\",{},{}\n", series.label, t, value));
        }
        points += series.points.len();
    }
    debug!(traces = traces.len(), points, "built traces");

    if let Some(path) = output {
        std::fs::write(path, out)?;
        println!(
            "✓ Exported {} traces ({} points) to {}",
            traces.len(),
            points,
            path.display()
        );
    } else {
        print!("{}", out);
    }
    Ok(())
}

fn print_report(report: &BatchReport, json: bool) -> AppResult<()> {
    if json {
        let value = serde_json::json!({
            "rows": report.rows(),
            "skipped": report.skipped(),
        });
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| AppError::Config(format!("Failed to serialize report: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    let grouped = report.grouped();
    if grouped.is_empty() {
        println!("No successful runs");
    }
    for (key, points) in grouped.iter() {
        println!("{}:", group_label(key));
        for (order, value) in points {
            println!("  {:>10.4}  {:.6}", order, value);
        }
    }

    let skipped = report.skipped();
    if !skipped.is_empty() {
        println!("Skipped {} of {} runs:", skipped.len(), report.run_count());
        for skip in skipped {
            println!("  {} [{}] {}", skip.run_id, skip.kind, skip.message);
        }
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &BatchProgressEvent) {
    match event.stage {
        BatchStage::ProcessingRun | BatchStage::RunCompleted | BatchStage::RunSkipped => {
            let width = 28usize;
            let filled = ((event.fraction_complete() * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>3}/{:<3} {}  elapsed={:.1}s",
                bar,
                event.completed,
                event.total,
                event.run_id.as_deref().unwrap_or(""),
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        BatchStage::Discovering | BatchStage::Persisting => {
            print!("\r{:?}...", event.stage);
            let _ = io::stdout().flush();
        }
        BatchStage::Completed => {}
    }
}
