//! LBeacon tag daemon
//!
//! The daemon reads the configuration of the tag, starts advertising the tag identifier, and
//! keeps advertising until it is sent SIGINT or SIGTERM. Advertising is then disabled before the
//! daemon exits.
//!
//! The exit code of the daemon is one of the result codes of [`ErrorCode`].
//!
//! # Note
//! Super User privileges (or the `CAP_NET_RAW` capability) are required to open a raw HCI socket.

mod lock;

use lbeacon_tag::advertiser::HEALTH_REPORT;
use lbeacon_tag::{Advertiser, ErrorCode, TagConfig};
use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "/home/pi/Tag/config/config.conf";

const DEFAULT_LOCK_PATH: &str = "/home/pi/Tag/bin/Tag.pid";

/// How often the run loop checks if the daemon was told to stop
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Exit code for an invalid command line (`EX_USAGE` of sysexits.h)
const EX_USAGE: i32 = 64;

struct Args {
    config: String,
    lock: String,
    report: Option<String>,
    verbose: bool,
}

fn get_arg_options() -> getopts::Options {
    let mut opts = getopts::Options::new();
    opts.parsing_style(getopts::ParsingStyle::FloatingFrees);
    opts.long_only(false);
    opts.optflag("h", "help", "Print this help menu");
    opts.optflag("v", "verbose", "Log every step of talking to the controller");
    opts.optopt(
        "c",
        "config",
        &format!("The configuration file (default {})", DEFAULT_CONFIG_PATH),
        "PATH",
    );
    opts.optopt(
        "l",
        "lock",
        &format!("The lock file containing the PID of the tag (default {})", DEFAULT_LOCK_PATH),
        "PATH",
    );
    opts.optopt("r", "report", "Append failures to this health report file", "PATH");
    opts
}

fn parse_args(mut args: std::env::Args) -> Args {
    let options = get_arg_options();

    let program_name = args.next().unwrap_or_else(|| "tag".to_string());

    let usage = format!("Usage: {} [options]", program_name);

    let matches = match options.parse(args) {
        Ok(all_match) => all_match,
        Err(no_match) => {
            eprintln!("{}", no_match);
            eprint!("{}", options.usage(&usage));
            std::process::exit(EX_USAGE);
        }
    };

    if matches.opt_present("h") {
        print!("{}", options.usage(&usage));
        std::process::exit(ErrorCode::WorkSuccessfully.code());
    }

    Args {
        config: matches.opt_str("c").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
        lock: matches.opt_str("l").unwrap_or_else(|| DEFAULT_LOCK_PATH.to_string()),
        report: matches.opt_str("r"),
        verbose: matches.opt_present("v"),
    }
}

/// Setup the loggers
///
/// Everything is logged to the terminal. The health report only gets the failures logged to the
/// health report target.
fn init_logging(args: &Args) -> Result<(), String> {
    use simplelog::{
        ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger, TerminalMode,
        WriteLogger,
    };

    let level = if args.verbose { LevelFilter::Trace } else { LevelFilter::Info };

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));

    if let Some(report) = &args.report {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report)
            .map_err(|e| format!("failed to open health report {}, {}", report, e))?;

        let config = ConfigBuilder::new().add_filter_allow_str(HEALTH_REPORT).build();

        loggers.push(WriteLogger::new(LevelFilter::Warn, config, file));
    }

    CombinedLogger::init(loggers).map_err(|e| e.to_string())
}

/// Signal setup
///
/// The returned flag is cleared once SIGINT or SIGTERM is received.
fn setup_sig() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));

    let flag = running.clone();

    simple_signal::set_handler(&[simple_signal::Signal::Int, simple_signal::Signal::Term], move |_| {
        flag.store(false, Ordering::SeqCst);
    });

    running
}

#[cfg(target_os = "linux")]
fn create_driver() -> lbeacon_tag_linux::LinuxDriver {
    lbeacon_tag_linux::LinuxDriver::new()
}

#[cfg(not(target_os = "linux"))]
compile_error!("unsupported target for the tag daemon");

fn run(args: Args) -> ErrorCode {
    let _lock = match lock::LockFile::acquire(&args.lock) {
        Ok(lock) => lock,
        Err(e) => {
            log::error!(target: HEALTH_REPORT, "{}", e);
            return ErrorCode::OpenFile;
        }
    };

    let config = match TagConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!(target: HEALTH_REPORT, "{}: {}", args.config, e);
            return ErrorCode::OpenFile;
        }
    };

    log::info!(
        "using controller {} with an advertising interval of {} (0.625 ms units)",
        config.advertise_dongle_id,
        config.advertise_interval_in_units_0625_ms
    );

    let running = setup_sig();

    let mut advertiser = Advertiser::new(create_driver());

    if let Err(e) = advertiser.start(&config, &config.advertise_uuid) {
        return e.code();
    }

    log::info!("advertising, awaiting SIGINT or SIGTERM to stop");

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
    }

    log::info!("stopping advertising");

    match advertiser.stop(&config) {
        Ok(()) => ErrorCode::WorkSuccessfully,
        Err(e) => e.code(),
    }
}

fn main() {
    let args = parse_args(std::env::args());

    if let Err(e) = init_logging(&args) {
        eprintln!("{}", e);
        std::process::exit(ErrorCode::OpenFile.code());
    }

    let code = run(args);

    log::info!("exiting with {}", code);

    std::process::exit(code.code())
}
