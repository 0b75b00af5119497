//! Telegraphy demo harness.
//!
//! Runs two in-process participants against one shared capped endpoint and
//! prints a JSON report per cycle per participant. The pair negotiates
//! roles exactly as two unrelated processes would; the only thing they
//! share is the endpoint's cap and the system clock.
//!
//! # Usage
//!
//! ```sh
//! slotwire-demo --cycles 10 --pulse 50 --settling 0
//! slotwire-demo --payload 2dfdc1c35
//! ```

use slotwire::{Clock, CycleReport, Payload, Session, SessionConfig, SharedCapEndpoint};

/// Default number of cycles per run.
const DEFAULT_CYCLES: usize = 10;

fn main() {
    slotwire::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let opts = match parse_args(&args) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("slotwire-demo: {msg}");
            print_usage();
            std::process::exit(2);
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("build tokio runtime");
    runtime.block_on(run(opts));
}

struct Options {
    cycles: usize,
    config: SessionConfig,
    payload: Payload,
    create_latency_ms: u64,
}

async fn run(opts: Options) {
    let endpoint = match opts.create_latency_ms {
        0 => SharedCapEndpoint::new(opts.config.max_slots),
        ms => SharedCapEndpoint::with_create_latency(opts.config.max_slots, ms),
    };

    let mut alpha = Session::new(endpoint.clone(), Clock::system(), opts.config.clone());
    let mut beta = Session::new(endpoint, Clock::system(), opts.config);
    let payload = opts.payload;
    let cycles = opts.cycles;

    let (alpha_reports, beta_reports) = tokio::join!(
        alpha.run(cycles, payload),
        beta.run(cycles, payload),
    );

    for (name, reports) in [("alpha", alpha_reports), ("beta", beta_reports)] {
        for report in reports {
            print_report(name, &report);
        }
    }
}

fn print_report(name: &str, report: &CycleReport) {
    match serde_json::to_string(report) {
        Ok(json) => println!("{{\"participant\":\"{name}\",\"report\":{json}}}"),
        Err(e) => eprintln!("slotwire-demo: serialize report: {e}"),
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut cycles = DEFAULT_CYCLES;
    let mut config = SessionConfig::websocket_chrome();
    let mut payload = Payload::Random;
    let mut create_latency_ms = 0u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--cycles" | "-n" => {
                cycles = parse_value(args, &mut i, "cycles")?;
            }
            "--pulse" => {
                config = config.with_pulse_ms(parse_value(args, &mut i, "pulse")?);
            }
            "--settling" => {
                config = config.with_settling_ms(parse_value(args, &mut i, "settling")?);
            }
            "--firefox" => {
                config = SessionConfig::websocket_firefox();
            }
            "--latency" => {
                create_latency_ms = parse_value(args, &mut i, "latency")?;
            }
            "--payload" => {
                i += 1;
                let hex = args.get(i).ok_or("missing value for --payload")?;
                let value = u64::from_str_radix(hex, 16)
                    .map_err(|e| format!("invalid --payload {hex:?}: {e}"))?;
                payload = Payload::Fixed(value);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            arg => return Err(format!("unknown argument: {arg}")),
        }
        i += 1;
    }

    Ok(Options {
        cycles,
        config,
        payload,
        create_latency_ms,
    })
}

fn parse_value<T: std::str::FromStr>(
    args: &[String],
    i: &mut usize,
    name: &str,
) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    *i += 1;
    let raw = args.get(*i).ok_or_else(|| format!("missing value for --{name}"))?;
    raw.parse()
        .map_err(|e| format!("invalid --{name} {raw:?}: {e}"))
}

fn print_usage() {
    eprintln!(
        r#"slotwire-demo - two-participant resource-pool telegraphy demo

USAGE:
    slotwire-demo [OPTIONS]

OPTIONS:
    -n, --cycles <N>      Cycles to run (default: 10)
        --pulse <MS>      Pulse duration override
        --settling <MS>   Settling delay override
        --firefox         Use the Firefox WebSocket preset
        --latency <MS>    Simulated per-connection setup latency
        --payload <HEX>   Fixed payload instead of random per-cycle values
    -h, --help            Print this help message

EXAMPLE:
    slotwire-demo --cycles 3 --pulse 100 --settling 10 --payload 2dfdc1c35
"#
    );
}
