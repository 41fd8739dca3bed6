//! Conductor CLI
//!
//! `conductor run "<request>"`：按配置装配 Planner 与 Worker，运行一次编排并打印结果；
//! `conductor workers`：列出可用 Worker。Ctrl+C 在下一个步骤边界取消运行。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use conductor::config::load_config;
use conductor::core::{RunEvent, RunSupervisor};
use conductor::runtime::build_orchestrator;
use conductor::workers::WorkerId;
use conductor::{RunConfig, RunResult};

#[derive(Parser, Debug)]
#[command(name = "conductor", version, about = "Delegating orchestrator for data-engineering requests")]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one request to completion
    Run {
        request: String,
        #[arg(long)]
        max_steps: Option<usize>,
        #[arg(long)]
        max_resolutions: Option<u32>,
        #[arg(long)]
        top_k: Option<usize>,
        /// 以 JSON 输出完整结果（含上下文日志）
        #[arg(long)]
        json: bool,
    },
    /// List available workers
    Workers,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Workers => {
            for id in WorkerId::ALL {
                println!("{:<12} {}", id.as_str(), id.description());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            request,
            max_steps,
            max_resolutions,
            top_k,
            json,
        } => {
            if json {
                conductor::observability::init_stderr();
            } else {
                conductor::observability::init();
            }

            let cfg = load_config(cli.config).context("failed to load configuration")?;
            let mut run_config = RunConfig::from(&cfg.orchestrator);
            if let Some(n) = max_steps {
                run_config = run_config.with_max_steps(n);
            }
            if let Some(n) = max_resolutions {
                run_config = run_config.with_max_consecutive_resolutions(n);
            }
            if let Some(k) = top_k {
                run_config = run_config.with_evidence_top_k(k);
            }

            let orchestrator = build_orchestrator(&cfg, run_config)?;
            let supervisor = RunSupervisor::new();
            supervisor.cancel_on_ctrl_c();

            let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RunEvent>();
            let printer = tokio::spawn(async move {
                while let Some(ev) = event_rx.recv().await {
                    if !json {
                        print_event(&ev);
                    }
                }
            });

            let result = orchestrator
                .run_with_events(&request, supervisor.child_token(), Some(event_tx))
                .await;
            join_printer(printer).await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("failed to serialize result")?
                );
            } else {
                print_summary(&result);
            }

            Ok(if result.is_completed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// 等待事件打印任务结束；任务异常退出时记录警告并返回 false
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("event printer task failed: {e}");
            false
        }
    }
}

fn print_event(ev: &RunEvent) {
    match ev {
        RunEvent::Planned { worker, task, .. } => println!("→ [{worker}] {task}"),
        RunEvent::Dispatched { worker, task, retry: true } => println!("↻ [{worker}] {task}"),
        RunEvent::WorkerSucceeded { worker, summary } => println!("✓ [{worker}] {summary}"),
        RunEvent::WorkerFailed { worker, detail } => match worker {
            Some(w) => println!("✗ [{w}] {detail}"),
            None => println!("✗ [planner] {detail}"),
        },
        RunEvent::Resolved { decision, note } => println!("  resolver {decision}: {note}"),
        _ => {}
    }
}

fn print_summary(result: &RunResult) {
    println!();
    println!(
        "run {} {:?} after {} steps, {} task(s) completed",
        result.run_id,
        result.status,
        result.steps,
        result.completed_tasks.len()
    );
    for (i, task) in result.completed_tasks.iter().enumerate() {
        println!("  {}. [{}] {} => {}", i + 1, task.worker, task.description, task.result_summary);
    }
    if let Some(err) = &result.final_error {
        println!("final error: {err}");
    }
}
