use anyhow::Context as _;
use anyhow::Result;
use itertools::Itertools as _;
use medreader::GaussToCell;
use std::env;
use std::fs;
use std::io;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::Registry;
use tracing_tree::HierarchicalLayer;

/// Parses the command line. `-h` prints the usage and yields `None`.
pub fn parse_args(
    mut options: getopts::Options,
    usage: &str,
    max_free_args: usize,
) -> Result<Option<getopts::Matches>> {
    options.optflag("h", "help", "print this help menu");

    let matches = options.parse(env::args().skip(1))?;

    if matches.opt_present("h") {
        eprintln!("{}", options.usage(usage));
        return Ok(None);
    }
    if matches.free.len() > max_free_args {
        anyhow::bail!("too many arguments\n\n{}", options.usage(usage));
    }

    Ok(Some(matches))
}

/// Logs to stderr, filtered by the `LOG` environment variable.
pub fn init_tracing() {
    Registry::default()
        .with(EnvFilter::from_env("LOG"))
        .with(
            HierarchicalLayer::new(4)
                .with_thread_ids(true)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .init();
}

/// The file at `path`, or stdin.
pub fn reader(path: Option<&String>) -> Result<Box<dyn io::BufRead>> {
    Ok(match path {
        Some(path) => {
            let file = fs::File::open(path).with_context(|| format!("failed to open {path:?}"))?;
            Box::new(io::BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    })
}

/// The file at `path`, or stdout.
pub fn writer(path: Option<&String>) -> Result<Box<dyn io::Write>> {
    Ok(match path {
        Some(path) => {
            let file = fs::File::create(path).with_context(|| format!("failed to create {path:?}"))?;
            Box::new(io::BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    })
}

/// Parses a comma-separated list of reductions among `avg`, `max` and
/// `min`.
pub fn parse_reductions(spec: &str) -> Result<GaussToCell> {
    let mut filter = GaussToCell {
        avg: false,
        max: false,
        min: false,
    };
    for reduction in spec.split(',').map(str::trim).filter(|s| !s.is_empty()).unique() {
        match reduction {
            "avg" => filter.avg = true,
            "max" => filter.max = true,
            "min" => filter.min = true,
            other => anyhow::bail!("unknown reduction {other:?}, expected avg, max or min"),
        }
    }
    Ok(filter)
}
