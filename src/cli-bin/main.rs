use reach_engine::prelude::*;

use anyhow::Context as _;

pub mod args;

use args::{Args, PolicyChoice};

fn main() {
    let args = match <Args as clap::Parser>::try_parse() {
        Ok(args) => args,
        Err(err) => {
            use clap::error::ErrorKind::*;

            let exit_code = match err.kind() {
                DisplayHelp |
                DisplayHelpOnMissingArgumentOrSubcommand |
                DisplayVersion => 0,
                _ => 2,
            };

            err.print().unwrap();
            std::process::exit(exit_code);
        },
    };

    init_logging(args.verbose);

    match run_analysis(args) {
        Ok(schedulable) => {
            if schedulable {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(2);
        },
    };
}

fn init_logging(verbose: u8) {
    use log::LevelFilter::*;

    let level = match verbose {
        0 => Off,
        1 => Error,
        2 => Warn,
        3 => Info,
        4 => Debug,
        _ => Trace,
    };

    env_logger::Builder::new().filter_level(level).init();
}

fn run_analysis(args: Args) -> anyhow::Result<bool> {
    let model = parse_model(&args.model_file)?;
    let workload = model.expand()?;

    let config = AnalysisConfig {
        naive: args.naive,
        timeout_secs: args.time_limit,
        model_resources: !args.no_resources,
        retain_graph: args.keep_graph,
        output: args.output,
    };

    match args.policy {
        PolicyChoice::EarliestDeadlineFirst =>
            report(ReachabilityEngine::construct(workload, EarliestDeadlineFirst, config), args.raw),
        PolicyChoice::FixedPriority =>
            report(ReachabilityEngine::construct(workload, FixedPriority, config), args.raw),
    }
}

fn report<P: SchedulingPolicy>(
    engine: ReachabilityEngine<P>,
    raw: bool,
) -> anyhow::Result<bool> {
    let summary = engine.summary();

    if raw {
        println!("{}", summary.raw());
    } else {
        print!("{summary}");
    }

    let csv_path = std::path::Path::new(&summary.output_file);
    let csv = std::fs::File::create(csv_path)
        .with_context(|| format!("cannot create {}", csv_path.display()))?;
    engine.write_response_times(csv)
        .with_context(|| format!("cannot write {}", csv_path.display()))?;

    let dot_path = csv_path.with_extension("dot");
    let dot = std::fs::File::create(&dot_path)
        .with_context(|| format!("cannot create {}", dot_path.display()))?;
    engine.write_graph(dot)
        .with_context(|| format!("cannot write {}", dot_path.display()))?;

    Ok(summary.schedulable)
}
