//! subledger-runner: headless host for the reconciliation engine.
//!
//! Usage:
//!   subledger-runner --db subs.db --passes 1
//!   subledger-runner --db subs.db --date 2025-03-15 --ipc-mode
//!   subledger-runner --db subs.db --ipc-mode --no-timer
//!
//! In IPC mode each stdin line is one JSON command tagged by `type`, and
//! each reply is one JSON line on stdout.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;
use std::io::{self, BufRead, Write};
use subledger_core::{
    bus::{LogSink, RecordingSink},
    clock::EngineClock,
    command::{CommandOutcome, UserCommand},
    config::EngineConfig,
    engine::ReconEngine,
    event::EngineEvent,
    expiration::ExpirationStatus,
    ledger::{LedgerMetrics, Period},
    scheduler::{HostCapabilities, ReconTask},
    store::Store,
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Command {
        command: UserCommand,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    today:          NaiveDate,
    passes_run:     u64,
    clients:        usize,
    overdue:        usize,
    expiring:       usize,
    leads:          usize,
    trials:         usize,
    month_metrics:  LedgerMetrics,
    events:         Vec<EngineEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome:        Option<CommandOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:          Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let passes = parse_arg(&args, "--passes", 1u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let no_timer = args.iter().any(|a| a == "--no-timer");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let clock = match string_arg(&args, "--date") {
        Some(raw) => {
            let date = subledger_core::dates::parse_date(raw)
                .with_context(|| format!("--date {raw:?} is not a date"))?;
            EngineClock::fixed_on(date)
        }
        None => EngineClock::System,
    };

    if !ipc_mode {
        println!("subledger-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  passes:    {passes}");
        println!("  today:     {}", clock.today());
        println!();
    }

    let config = EngineConfig::load(data_dir)?;
    let store = Store::open(db)?;
    store.migrate()?;

    let caps = HostCapabilities {
        background_timer: !no_timer,
    };
    let task = ReconTask::for_host(caps, config.pass_interval_secs);

    let mut engine = ReconEngine::build(Box::new(store), config, clock);
    let sink = RecordingSink::new();
    engine.subscribe(Box::new(sink.clone()));
    engine.subscribe(Box::new(LogSink));

    if let Some(report) = engine.load()? {
        if report.changed() {
            log::info!(
                "startup normalization: {} corrected, {} reverted",
                report.corrected,
                report.reverted
            );
        }
    }

    if ipc_mode {
        run_ipc_loop(&mut engine, task, &sink)?;
    } else {
        for _ in 0..passes {
            engine.run_pass()?;
        }
        print_summary(&engine, &sink);
    }

    Ok(())
}

fn run_ipc_loop(
    engine: &mut ReconEngine,
    mut task: Option<ReconTask>,
    sink: &RecordingSink,
) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let state = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => build_ui_state(engine, sink, None, None),
            IpcCommand::Tick { count } => {
                let error = run_ticks(engine, task.as_mut(), count).err();
                build_ui_state(engine, sink, None, error.map(|e| e.to_string()))
            }
            IpcCommand::Command { command } => match command.apply(engine) {
                Ok(outcome) => build_ui_state(engine, sink, Some(outcome), None),
                Err(e) => {
                    log::warn!("command failed: {e}");
                    build_ui_state(engine, sink, None, Some(e.to_string()))
                }
            },
        };
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

/// One tick is one scheduler round. A fixed clock moves forward by the pass
/// interval first, so every tick is due. Without a timer, ticks do nothing.
fn run_ticks(
    engine: &mut ReconEngine,
    task: Option<&mut ReconTask>,
    count: u64,
) -> subledger_core::error::EngineResult<()> {
    let Some(task) = task else {
        log::debug!("tick ignored: no background timer");
        return Ok(());
    };
    let interval = task.interval();
    for _ in 0..count {
        if engine.clock.is_fixed() {
            engine.clock.advance(interval);
        }
        if let Some(result) = task.poll(engine) {
            result?;
        }
    }
    Ok(())
}

fn build_ui_state(
    engine: &ReconEngine,
    sink: &RecordingSink,
    outcome: Option<CommandOutcome>,
    error: Option<String>,
) -> UiState {
    let projection = engine.projection();
    let mut overdue = 0;
    let mut expiring = 0;
    for client in projection.clients.iter().filter(|c| c.is_active()) {
        match engine.classify_client(client).status {
            ExpirationStatus::Overdue => overdue += 1,
            ExpirationStatus::Expiring => expiring += 1,
            ExpirationStatus::Normal => {}
        }
    }

    UiState {
        today:         engine.clock.today(),
        passes_run:    engine.passes_run(),
        clients:       projection.clients.len(),
        overdue,
        expiring,
        leads:         projection.leads.len(),
        trials:        projection.trials.len(),
        month_metrics: engine.metrics(Period::CurrentMonth, None),
        events:        sink.drain(),
        outcome,
        error,
    }
}

fn print_summary(engine: &ReconEngine, sink: &RecordingSink) {
    let projection = engine.projection();
    let metrics = engine.metrics(Period::All, None);
    let month = engine.metrics(Period::CurrentMonth, None);
    let events = sink.drain();

    println!("=== RUN SUMMARY ===");
    println!("  passes run:     {}", engine.passes_run());
    println!("  clients:        {}", projection.clients.len());
    println!("  trials:         {}", projection.trials.len());
    println!("  leads:          {}", projection.leads.len());
    println!("  events:         {}", events.len());
    if let Some(report) = engine.last_report() {
        println!("  set pending:    {}", report.clients_set_pending);
        println!("  leads created:  {}", report.leads_created);
        println!("  failures:       {}", report.failures.len());
    }

    println!();
    println!("=== LEDGER ===");
    println!(
        "  all time | Revenue: {:.2} | Expenses: {:.2} | Net: {:.2}",
        metrics.total_revenue, metrics.total_expenses, metrics.net
    );
    println!(
        "  month    | Revenue: {:.2} | Pending: {:.2} | Avg ticket: {:.2}",
        month.monthly_revenue, month.pending_revenue, month.average_ticket
    );

    if !events.is_empty() {
        println!();
        println!("=== ALERTS ===");
        for event in &events {
            println!("  [{:?}] {}", event.priority(), event.type_name());
        }
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
