use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use md2html::{Config, Error, Policy};

use clap::error::ErrorKind;
use clap::{arg, value_parser, ArgMatches, Command};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let mut cmd = cli();
    let matches = match cmd.try_get_matches_from_mut(env::args_os()) {
        Ok(m) => m,
        // help and version go to stdout
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return match e.print() {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(e) => {
            let reason = e.kind().as_str().unwrap_or("invalid arguments");
            // one line, like every other diagnostic
            let usage = cmd.render_usage().to_string();
            let usage = usage.split_whitespace().collect::<Vec<_>>().join(" ");
            let usage = Error::Usage(format!("{}; {}", reason, usage));
            return report(None, &usage);
        }
    };

    init_logging(matches.get_count("verbose"));

    let input = matches
        .get_one::<PathBuf>("INPUT_MARKDOWN_PATH")
        .expect("required");
    let output = matches
        .get_one::<PathBuf>("OUTPUT_HTML_PATH")
        .expect("required");

    match run(&matches, input, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(Some(input), &e),
    }
}

fn run(matches: &ArgMatches, input: &Path, output: &Path) -> Result<(), Error> {
    let policy = match matches.get_one::<String>("policy") {
        Some(name) => name.parse::<Policy>()?,
        None => Policy::default(),
    };
    debug!(%policy, "starting");
    md2html::convert(input, output, &Config::new(policy))
}

// Every failure is reported here, as one line on stderr.
fn report(input: Option<&Path>, e: &Error) -> ExitCode {
    match input {
        Some(path) => eprintln!("md2html: {}: {}", path.display(), e),
        None => eprintln!("md2html: {}", e),
    }
    ExitCode::FAILURE
}

// The log level only comes from the command line: warn, -v info, -vv debug.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("md2html={}", level)))
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();
}

fn cli() -> Command {
    Command::new("md2html")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert a Markdown file into a self-contained HTML document")
        .arg(
            arg!(-p --policy <POLICY> "Specify how the input is rendered, default \"markdown\" when it is compiled in.")
                .required(false)
                .value_parser(Policy::NAMES),
        )
        .arg(arg!(-v --verbose ... "Log more to stderr, -v for info and -vv for debug."))
        .arg(arg!(<INPUT_MARKDOWN_PATH> "Specify path of the markdown file.").value_parser(value_parser!(PathBuf)))
        .arg(arg!(<OUTPUT_HTML_PATH> "Specify path of the html file, it is replaced if it exists.").value_parser(value_parser!(PathBuf)))
}
