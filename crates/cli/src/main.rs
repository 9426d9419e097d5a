use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;
use schedcheck_cli::{
    AnalyzeArgs, App, Command, FmtArgs, GenerateArgs, ScheduleInput, SimulateArgs, VerifyArgs,
};
use schedcheck_core::analysis::ScheduleAnalysis;
use schedcheck_core::analyze;
use schedcheck_core::conflict::describe_cycle;
use schedcheck_core::schedule::format_schedule;
use schedcheck_core::simulation::{LockManager, SimulationStep};
use schedcheck_parser::{parse_schedule, ParsedSchedule};
use schedcheck_testgen::generator::GeneratedSchedule;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    match &app.command {
        Command::Analyze(args) => analyze_cmd(args),
        Command::Simulate(args) => simulate(args),
        Command::Generate(args) => generate(args),
        Command::Verify(args) => verify(args),
        Command::Fmt(args) => fmt(args),
        Command::Schema => schema(),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fail(&format!("Failed to serialize output: {e}")))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Read and parse the schedule, printing every dropped token to stderr.
fn read_schedule(input: &ScheduleInput) -> ParsedSchedule {
    let text = match (&input.schedule, &input.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .unwrap_or_else(|e| fail(&format!("Failed to read {}: {e}", path.display()))),
        (None, None) => fail("No schedule given"),
    };
    let parsed = parse_schedule(&text);
    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }
    parsed
}

fn analyze_cmd(args: &AnalyzeArgs) {
    let parsed = read_schedule(&args.input);
    let analysis = analyze(parsed.operations);

    if args.json {
        let report = serde_json::json!({
            "analysis": analysis,
            "warnings": parsed.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", to_json(&report));
    } else {
        print_analysis(&analysis, args.verbose);
    }
}

fn print_analysis(analysis: &ScheduleAnalysis, verbose: bool) {
    println!("Schedule: {}", format_schedule(&analysis.operations));

    println!("Transactions:");
    for transaction in &analysis.transactions {
        println!("  {}: {}", transaction.id, transaction.summary);
    }

    println!("Conflicts: {}", analysis.conflicts.len());
    for conflict in &analysis.conflicts {
        println!("  {conflict}");
    }

    let graph = &analysis.precedence_graph;
    println!("Precedence graph:");
    for edge in &graph.edges {
        let marker = if edge.is_cycle_edge { " (cycle)" } else { "" };
        println!(
            "  {} -> {} [{}]{marker}",
            edge.source, edge.target, edge.label
        );
    }
    match &analysis.serial_order {
        Some(order) => {
            let order: Vec<String> = order.iter().map(ToString::to_string).collect();
            println!(
                "Conflict serializable: yes (serial order: {})",
                order.join(", ")
            );
        }
        None => println!(
            "Conflict serializable: no (cycle: {})",
            describe_cycle(graph)
        ),
    }

    println!("Two-phase locking:");
    for (id, compliance) in &analysis.two_pl_report.transaction_compliance {
        println!(
            "  {id}: basic {}, strict {}, rigorous {}, conservative {}",
            yes_no(compliance.basic_2pl),
            yes_no(compliance.strict_2pl),
            yes_no(compliance.rigorous_2pl),
            yes_no(compliance.conservative_2pl),
        );
        if verbose {
            for event in &compliance.lock_phase_events {
                println!(
                    "    step {:>3}  {:<10} {:<9} {}",
                    event.step, event.op_text, event.phase, event.action
                );
            }
        }
    }

    let recoverability = &analysis.recoverability;
    println!(
        "Recoverable: {}, cascadeless: {}",
        yes_no(recoverability.is_recoverable),
        yes_no(recoverability.is_cascadeless)
    );
    for dirty in &recoverability.dirty_reads {
        println!(
            "  step {}: {} reads {} written by uncommitted {}",
            dirty.read_step, dirty.reader, dirty.variable, dirty.writer
        );
    }
}

fn simulate(args: &SimulateArgs) {
    let parsed = read_schedule(&args.input);
    let mut manager = LockManager::new(parsed.operations);
    let history = manager.run(args.max_steps).to_vec();

    if args.json {
        let report = serde_json::json!({
            "steps": history,
            "complete": manager.is_complete(),
            "deadlock": manager.is_deadlocked(),
        });
        println!("{}", to_json(&report));
        return;
    }

    for (index, step) in history.iter().enumerate() {
        print_step(index, step);
    }
    if manager.is_deadlocked() {
        println!("Stopped: deadlock detected");
    } else if manager.is_complete() {
        println!("Finished after {} step(s)", history.len() - 1);
    } else {
        println!("Stopped after {} step(s)", args.max_steps);
    }
}

fn print_step(index: usize, step: &SimulationStep) {
    match &step.operation {
        Some(operation) => println!("[{index}] {operation}"),
        None => println!("[{index}] -"),
    }
    for line in &step.log {
        println!("    {line}");
    }
    if !step.locks.is_empty() {
        let locks: Vec<String> = step.locks.iter().map(ToString::to_string).collect();
        println!("    locks: {}", locks.join(", "));
    }
    if !step.waiting_queue.is_empty() {
        let waiting: Vec<String> = step
            .waiting_queue
            .iter()
            .map(|entry| {
                format!(
                    "{} wants {}({})",
                    entry.transaction, entry.requested, entry.variable
                )
            })
            .collect();
        println!("    waiting: {}", waiting.join(", "));
    }
}

fn generate(args: &GenerateArgs) {
    fs::create_dir_all(&args.output_dir)
        .unwrap_or_else(|e| fail(&format!("Failed to create output directory: {e}")));

    let schedules = schedcheck_testgen::generator::generate_mult_schedules(
        args.n_sched,
        args.n_txn,
        args.n_var,
        args.n_op,
        args.abort_percent,
    );

    for schedule in &schedules {
        let path = args.output_dir.join(format!("{}.json", schedule.get_id()));
        let file = fs::File::create(&path)
            .unwrap_or_else(|e| fail(&format!("Failed to create {}: {e}", path.display())));
        serde_json::to_writer_pretty(file, schedule)
            .unwrap_or_else(|e| fail(&format!("Failed to write {}: {e}", path.display())));
    }

    println!(
        "Generated {} schedules to {}",
        schedules.len(),
        args.output_dir.display()
    );
}

fn verify(args: &VerifyArgs) {
    let mut entries: Vec<_> = fs::read_dir(&args.input_dir)
        .unwrap_or_else(|e| fail(&format!("Failed to read input directory: {e}")))
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .collect();

    entries.sort_by_key(fs::DirEntry::path);

    if entries.is_empty() {
        fail(&format!("No .json files found in {}", args.input_dir.display()));
    }

    for entry in entries {
        let path = entry.path();
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        let file = fs::File::open(&path)
            .unwrap_or_else(|e| fail(&format!("Failed to open {filename}: {e}")));
        let schedule: GeneratedSchedule = serde_json::from_reader(file)
            .unwrap_or_else(|e| fail(&format!("Failed to parse {filename}: {e}")));

        let analysis = analyze(schedule.get_operations().to_vec());
        if args.json {
            let result = serde_json::json!({
                "file": filename,
                "schedule": schedule.get_schedule(),
                "serializable": analysis.is_serializable(),
                "serial_order": analysis.serial_order,
                "recoverable": analysis.recoverability.is_recoverable,
                "cascadeless": analysis.recoverability.is_cascadeless,
            });
            println!("{result}");
        } else {
            println!(
                "{filename}: serializable {}, recoverable {}, cascadeless {}",
                yes_no(analysis.is_serializable()),
                yes_no(analysis.recoverability.is_recoverable),
                yes_no(analysis.recoverability.is_cascadeless)
            );
        }
    }
}

/// Expand directories into the `.sched` files they contain.
fn schedule_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)
                .unwrap_or_else(|e| fail(&format!("Failed to read {}: {e}", path.display())))
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "sched"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

/// Canonical contents of a schedule file, or `None` if it has tokens that
/// formatting would drop.
fn formatted(path: &Path) -> Option<(String, String)> {
    let original = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(&format!("Failed to read {}: {e}", path.display())));
    let parsed = parse_schedule(&original);
    if !parsed.is_clean() {
        for warning in &parsed.warnings {
            eprintln!("{}: {warning}", path.display());
        }
        return None;
    }
    let mut canonical = format_schedule(&parsed.operations);
    if !canonical.is_empty() {
        canonical.push('\n');
    }
    Some((original, canonical))
}

fn fmt(args: &FmtArgs) {
    let mut unformatted = 0usize;
    let mut invalid = 0usize;

    for path in schedule_files(&args.paths) {
        let Some((original, canonical)) = formatted(&path) else {
            invalid += 1;
            continue;
        };
        if original == canonical {
            continue;
        }
        if args.check {
            println!("would reformat {}", path.display());
            unformatted += 1;
        } else {
            fs::write(&path, canonical)
                .unwrap_or_else(|e| fail(&format!("Failed to write {}: {e}", path.display())));
            println!("formatted {}", path.display());
        }
    }

    if invalid > 0 {
        fail(&format!(
            "{invalid} file(s) contain invalid operations and were left unchanged"
        ));
    }
    if unformatted > 0 {
        process::exit(1);
    }
}

fn schema() {
    let schema = schemars::schema_for!(ScheduleAnalysis);
    println!("{}", to_json(&schema));
}
