use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{Config, WriteLogger};

use procsnap::core::Pid;
use procsnap::procfs::Procfs;

/// Prints a summary of the system and of a process, read from a proc tree
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Process to inspect, defaults to this process
    pid: Option<Pid>,

    /// Root of the proc tree to read
    #[arg(long, default_value = "/proc")]
    root: PathBuf,
}

fn main() {
    setup_panic_logging();
    init_logging();

    if let Err(e) = run(Args::parse()) {
        error!("{:?}", e);
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let procfs = Procfs::with_root(&args.root);
    let pid = args.pid.unwrap_or_else(std::process::id);
    info!("Inspecting process {} from {:?}", pid, args.root);

    let cpuinfo = procfs.cpuinfo().context("Could not read CPU information")?;
    println!(
        "CPUs: {} package(s), {} core(s), {} thread(s)",
        cpuinfo.cpu_count(),
        cpuinfo.cpu_physical_core_count(),
        cpuinfo.cpu_thread_count()
    );
    println!("Total RAM: {} kB", procfs.total_ram_kb().context("Could not read total RAM")?);
    println!(
        "Page size: {:.1} kB",
        procfs.page_size_kb().context("Could not estimate page size")?
    );

    let process = procfs.process(pid);
    let stat = process
        .stat()
        .with_context(|| format!("Could not read the stat of process {}", pid))?;
    println!("Process {} ({}): {:?}", pid, stat.comm(), stat.state());
    println!(
        "  threads: {}",
        process.tasks().context("Could not list tasks")?.len()
    );
    println!(
        "  RSS: {:.0} kB ({:.2}% of RAM)",
        process.resident_set_size_kb().context("Could not compute RSS")?,
        process.memory_fraction().context("Could not compute memory usage")? * 100.
    );
    println!(
        "  CPU time: {:.2}s, usage: {:.2}%",
        process.cpu_time_secs().context("Could not compute CPU time")?,
        process.cpu_usage().context("Could not compute CPU usage")? * 100.
    );

    Ok(())
}

fn setup_panic_logging() {
    // As panics are erased by the application exiting, log the panic as an error
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        error!("Panic occured: {:?}", info);
        default_hook(info);
    }))
}

fn init_logging() {
    let log_file = OpenOptions::new()
        .write(true)
        .append(true)
        .create(true)
        .open("procsnap.log")
        .expect("Could not open log file");

    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file).expect("Could not initialize logging");
}
