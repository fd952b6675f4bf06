mod frames;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use refract_conll::read_document;
use refract_extract::{ExtractConfig, Extraction, FrameExtractor, SequentialIds};
use refract_protocol::Frame;
use refract_query::{project_frames, ConditionalCounts, FrequencyCounts, ProjectionQuery};
use tracing::{debug, info, Level};

use frames::Format;

#[derive(Parser)]
#[command(author, version, about = "Extracts frames from annotated text and computes statistics over them")]
struct Cli {
    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract frames from CoNLL files, one document per file
    Extract {
        #[arg(short, long, value_name = "FILE", required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Maximum frame height; overrides the config file
        #[arg(long)]
        height: Option<u32>,

        /// JSON extraction config
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Archive)]
        format: Format,

        /// Extract documents on all cores
        #[arg(long)]
        parallel: bool,

        /// Print extraction counters as JSON
        #[arg(long)]
        stats: bool,
    },
    /// Keep the projection of every frame that matches a query
    Project {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long)]
        query: String,

        /// Write frames here instead of printing them
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Records)]
        format: Format,
    },
    /// Count projected frames grouped by slot values
    Frequency {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long)]
        query: String,
    },
    /// P(target | given) over projected frames
    Conditional {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long)]
        target: String,

        #[arg(short, long)]
        given: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>, height: Option<u32>) -> anyhow::Result<ExtractConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ExtractConfig::default(),
    };
    if let Some(height) = height {
        config.frame_height = height;
    }
    Ok(config)
}

fn read_frames(path: &Path) -> anyhow::Result<Vec<Frame>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let frames = frames::decode(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    debug!(frames = frames.len(), path = %path.display(), "loaded frames");
    Ok(frames)
}

fn compile(query: &str) -> anyhow::Result<ProjectionQuery> {
    Ok(ProjectionQuery::compile(query)?)
}

fn extract(
    input: &[PathBuf],
    output: &Path,
    config: ExtractConfig,
    format: Format,
    parallel: bool,
    stats: bool,
) -> anyhow::Result<()> {
    let mut documents = Vec::with_capacity(input.len());
    for path in input {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let document = read_document(&text).with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), sentences = document.len(), "read document");
        documents.push(document);
    }

    info!(height = config.frame_height, parallel, "extracting frames");
    let extractor = FrameExtractor::new(config);
    let extraction = if parallel {
        extractor.extract_parallel(&documents)?
    } else {
        let mut ids = SequentialIds::new();
        let mut out = Extraction::default();
        for document in &documents {
            out.absorb(extractor.extract_document(document, &mut ids)?);
        }
        out
    };

    let counters = extraction.stats;
    info!(
        sentences = counters.sentences,
        skipped = counters.skipped_sentences,
        frames = counters.frames,
        named_entities = counters.named_entities,
        named_entities_in_frames = counters.named_entities_in_frames,
        predicates = counters.predicates,
        predicates_in_frames = counters.predicates_in_frames,
        "extraction finished"
    );

    let bytes = frames::encode(extraction.frames, format)?;
    fs::write(output, bytes).with_context(|| format!("writing {}", output.display()))?;
    if stats {
        println!("{}", serde_json::to_string_pretty(&counters)?);
    }
    Ok(())
}

fn project(input: &Path, query: &str, output: Option<&Path>, format: Format) -> anyhow::Result<()> {
    let query = compile(query)?;
    let frames = read_frames(input)?;
    let projected = project_frames(&query, &frames);
    info!(query = %query, matched = projected.len(), of = frames.len(), "projected frames");

    match output {
        Some(path) => {
            let bytes = frames::encode(projected, format)?;
            fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        }
        None => {
            for frame in &projected {
                println!("{}\t{}", frame.id, frame);
            }
        }
    }
    Ok(())
}

fn frequency(input: &Path, query: &str) -> anyhow::Result<()> {
    let query = compile(query)?;
    let mut counts = FrequencyCounts::new();
    for frame in project_frames(&query, &read_frames(input)?) {
        counts.observe(&frame);
    }
    info!(groups = counts.len(), "counted frames");
    for (key, count) in counts.counts() {
        println!("{key}\t{count}");
    }
    Ok(())
}

fn conditional(input: &Path, target: &str, given: &str) -> anyhow::Result<()> {
    let target = compile(target)?;
    let given = compile(given)?;
    let mut counts = ConditionalCounts::new();
    for frame in &read_frames(input)? {
        counts.observe(frame, &target, &given);
    }
    for entry in counts.probabilities() {
        println!("{}\t{}", entry.key, entry.probability);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Extract {
            input,
            output,
            height,
            config,
            format,
            parallel,
            stats,
        } => {
            let config = load_config(config.as_deref(), height)?;
            extract(&input, &output, config, format, parallel, stats)
        }
        Command::Project {
            input,
            query,
            output,
            format,
        } => project(&input, &query, output.as_deref(), format),
        Command::Frequency { input, query } => frequency(&input, &query),
        Command::Conditional { input, target, given } => conditional(&input, &target, &given),
    }
}
