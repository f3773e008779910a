use clap::{Parser, ValueEnum};
use stagesync::engine::{self, NativeEngine, RsyncEngine, SyncRequest, SyncStrategy};
use stagesync::process::{ExecutableLookup, PathLookup};
use stagesync::types::{ExclusionList, OutputChunk, StreamKind};
use stagesync::TreePath;
use std::io::Write;
use std::time::Duration;

/// Mirror a source directory tree onto a destination tree.
#[derive(Debug, Parser)]
#[command(name = "stagesync", version, about)]
struct Cli {
    /// Source directory
    source: String,

    /// Destination directory
    destination: String,

    /// Relative path or directory to leave untouched in both trees
    /// (repeatable)
    #[arg(short = 'x', long = "exclude")]
    exclude: Vec<String>,

    /// Wall-clock limit for the whole sync, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Which engine to use
    #[arg(long, value_enum, default_value_t = EngineChoice::Auto)]
    engine: EngineChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineChoice {
    /// Probe for rsync, fall back to the native engine
    Auto,
    /// In-process engine, no external tool
    Native,
    /// Delegate to the rsync binary
    Rsync,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let strategy: Box<dyn SyncStrategy> = match cli.engine {
        EngineChoice::Auto => engine::create(),
        EngineChoice::Native => Box::new(NativeEngine::new()),
        EngineChoice::Rsync => {
            let program = PathLookup
                .locate(engine::RSYNC_PROGRAM)
                .ok_or_else(|| anyhow::anyhow!("rsync is not installed on this host"))?;
            Box::new(RsyncEngine::new(program))
        }
    };

    let request = SyncRequest {
        source: TreePath::native(cli.source)?,
        destination: TreePath::native(cli.destination)?,
        exclusions: ExclusionList::from_entries(cli.exclude),
        timeout: cli.timeout.map(Duration::from_secs),
    };

    eprintln!("stagesync v{} ({} engine)", stagesync::VERSION, strategy.name());

    let sink = |chunk: &OutputChunk| match chunk.stream {
        StreamKind::Stdout => {
            let _ = writeln!(std::io::stdout(), "{}", chunk.text);
        }
        StreamKind::Stderr => {
            let _ = writeln!(std::io::stderr(), "{}", chunk.text);
        }
    };

    strategy.sync(&request, Some(&sink))?;
    Ok(())
}
