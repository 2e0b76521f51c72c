use std::sync::Arc;

use facet::Facet;
use figue as args;
use lockwise::{DetectorContext, DiagnosticSink, FmtSink, TracingSink};

mod scenarios;

type AnyResult<T> = Result<T, String>;

const DEFAULT_ITERATIONS: u32 = 100;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Iterations per worker loop.
    #[facet(args::named, default)]
    iterations: Option<u32>,
    /// Route records through tracing instead of printing each one.
    #[facet(args::named, default)]
    quiet: bool,
    #[facet(args::subcommand)]
    command: CommandKind,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum CommandKind {
    OrderInversion,
    ConsistentOrder,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> AnyResult<()> {
    let cli = parse_cli()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let iterations = cli.iterations.unwrap_or(DEFAULT_ITERATIONS);
    let sink: Arc<dyn DiagnosticSink> = if cli.quiet {
        Arc::new(TracingSink)
    } else {
        Arc::new(FmtSink::new(std::io::stdout()))
    };
    let cx = Arc::new(DetectorContext::with_sink(sink));

    match cli.command {
        CommandKind::OrderInversion => scenarios::order_inversion::run(cx, iterations),
        CommandKind::ConsistentOrder => scenarios::consistent_order::run(cx, iterations),
    }
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("lockwise-examples")
                .description("Run lockwise demonstration workloads as subcommands")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}
