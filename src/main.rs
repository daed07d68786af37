use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use droidclaw::agent::{HumanOverride, RunOutcome, RunReport, SelfExplorer, TaskExecutor};
use droidclaw::config::load_config;
use droidclaw::device::{list_all_devices, AdbDevice};
use droidclaw::errors::DroidClawResult;
use droidclaw::human::{HumanInput, StdinHuman};
use droidclaw::llm::build_provider;

#[derive(Parser)]
#[command(name = "droidclaw", about = "Model-driven mobile app automation agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct CommonOpts {
    /// App name; scopes the documentation store and task directories.
    #[arg(long)]
    app: String,

    /// Working directory for apps/ and tasks/.
    #[arg(long, default_value = ".")]
    root_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a task described by the operator.
    Task(CommonOpts),
    /// Explore the app autonomously and build element documentation.
    Explore(CommonOpts),
}

impl Command {
    fn opts(&self) -> &CommonOpts {
        match self {
            Command::Task(opts) | Command::Explore(opts) => opts,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "runtime init failed");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(report) => {
            match report.outcome {
                RunOutcome::Completed => {
                    println!("Run completed after {} rounds.", report.rounds)
                }
                RunOutcome::RoundBudget => {
                    println!("Round budget exhausted after {} rounds.", report.rounds)
                }
                RunOutcome::Unexpected => {
                    println!("Run stopped unexpectedly after {} rounds.", report.rounds)
                }
            }
            if report.docs_written > 0 {
                println!("Documentation files written: {}.", report.docs_written);
            }
            match report.outcome {
                RunOutcome::Unexpected => ExitCode::from(2),
                _ => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> DroidClawResult<RunReport> {
    let config = load_config()?;
    let human = StdinHuman;

    let serial = select_device(&human).await?;
    let device = AdbDevice::connect(&serial, &config.device).await?;
    let model = build_provider(&config.model)?;

    let opts = cli.command.opts();
    let docs_root = opts.root_dir.join("apps").join(&opts.app).join("auto_docs");
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let task_dir = opts
        .root_dir
        .join("tasks")
        .join(format!("task_{}_{timestamp}", opts.app));

    match cli.command {
        Command::Task(_) => {
            let task = human.ask("Describe the task to perform:")?;
            let override_flag = HumanOverride::new();
            spawn_override_listener(override_flag.clone());
            let executor = TaskExecutor::new(
                &config,
                &device,
                model.as_ref(),
                &human,
                &docs_root,
                &task_dir,
                override_flag,
            )?;
            Ok(executor.run(&task).await)
        }
        Command::Explore(_) => {
            let task = human.ask("Describe the task to explore towards:")?;
            let explorer =
                SelfExplorer::new(&config, &device, model.as_ref(), &docs_root, &task_dir)?;
            Ok(explorer.run(&task).await)
        }
    }
}

async fn select_device(human: &dyn HumanInput) -> DroidClawResult<String> {
    let devices = list_all_devices().await?;
    match devices.as_slice() {
        [] => Err(droidclaw::DroidClawError::Device(
            "no adb devices connected".into(),
        )),
        [only] => Ok(only.clone()),
        many => {
            let listing = many
                .iter()
                .enumerate()
                .map(|(i, d)| format!("  {}. {d}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            loop {
                let answer = human.ask(&format!(
                    "Multiple devices connected:\n{listing}\nPick a device number:"
                ))?;
                if let Ok(n) = answer.parse::<usize>() {
                    if n >= 1 && n <= many.len() {
                        return Ok(many[n - 1].clone());
                    }
                }
                println!("Invalid selection.");
            }
        }
    }
}

/// Ctrl-C requests a one-shot pause consumed at the top of the next round
/// instead of killing the run.
fn spawn_override_listener(flag: HumanOverride) {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            tracing::info!("human override requested");
            flag.request();
        }
    });
}
