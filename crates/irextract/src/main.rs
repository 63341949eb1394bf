use anyhow::{Context, Result};
use clap::Parser;
use irextract::pass::{self, FunctionPassManager, PASSES};
use irextract::{logging, parse_module, ExtractOptions};
use log::info;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// irextract — serialize compiler IR functions to JSON, one document per line.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input module in textual IR (.ll)
    #[arg(required_unless_present = "list_passes")]
    input: Option<PathBuf>,

    /// Output file (defaults to stderr)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Only extract this function
    #[arg(long, short)]
    function: Option<String>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,

    /// Pass to run
    #[arg(long, default_value = "IRExtractor")]
    pass: String,

    /// List registered passes and exit
    #[arg(long)]
    list_passes: bool,

    /// Increase log verbosity (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose > 0 {
        logging::init_with_level(logging::level_for_verbosity(cli.verbose));
    } else {
        logging::init_from_env();
    }

    if cli.list_passes {
        for info in PASSES {
            println!("{:<16} {}", info.arg, info.description);
        }
        return Ok(());
    }

    let input = cli.input.context("no input file given")?;
    let pass_info =
        pass::lookup(&cli.pass).with_context(|| format!("unknown pass '{}'", cli.pass))?;

    info!("reading {}", input.display());
    let source = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let module =
        parse_module(&source).with_context(|| format!("failed to parse {}", input.display()))?;

    let options = ExtractOptions {
        function: cli.function,
        pretty: cli.pretty,
    };

    // The host writes to its diagnostic stream unless told otherwise.
    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stderr()),
    };

    let mut manager = FunctionPassManager::new().with_filter(options.function.clone());
    manager.add((pass_info.create)(sink, &options));
    manager.run(&module).context("extraction failed")?;

    if let Some(path) = &cli.output {
        info!("wrote {}", path.display());
    }
    Ok(())
}
