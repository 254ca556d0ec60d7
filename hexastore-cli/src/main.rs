use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use hexastore::reason::parse_and_register;
use hexastore::turtle;
use hexastore::{Iri, MemoryHexastore, Namespace, TripleReader, default_reasoner};

#[derive(Parser)]
#[command(name = "hexastore", version, arg_required_else_help = true)]
struct Cli {
    /// Log filter, e.g. "hexastore_reason=debug".
    #[arg(long, default_value = "info")]
    log_filter: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load Turtle/N-Triples inputs and serialise the combined graph.
    Cat(IoArgs),
    /// Load data and rules, saturate, and serialise the result.
    Reason(IoArgs),
}

#[derive(Args)]
struct IoArgs {
    /// Namespace binding as a NAME IRI pair; repeatable.
    #[arg(short = 'n', long = "namespace", num_args = 2, value_names = ["NAME", "IRI"])]
    namespace: Vec<String>,

    /// Output file, or "-" for stdout.
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: PathBuf,

    /// Input files: .ttl / .nt data, .mtt rules (reason only).
    #[arg(required = true)]
    filenames: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log_filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Cat(args) => cat(args),
        Commands::Reason(args) => reason(args),
    }
}

fn cat(args: IoArgs) -> anyhow::Result<()> {
    let mut store = MemoryHexastore::new();
    let factory = hexastore::BlankNodeFactory::new();
    let mut namespaces = declared_namespaces(&args.namespace)?;

    let started = Instant::now();
    for filename in &args.filenames {
        match extension(filename) {
            "ttl" | "nt" => {
                let document = fs::read_to_string(filename)
                    .with_context(|| format!("reading {}", filename.display()))?;
                let mut triples = Vec::new();
                let parsed = turtle::parse(&document, &factory, |s, p, o| {
                    triples.push(hexastore::Triple::new(s, p, o));
                })
                .with_context(|| format!("parsing {}", filename.display()))?;
                merge_namespaces(&mut namespaces, parsed);
                store.bulk_insert(triples);
            }
            other => bail!("unknown input kind .{other}: {}", filename.display()),
        }
    }
    info!(triples = store.len(), elapsed = ?started.elapsed(), "loaded");

    write_output(&store, &args.output, &namespaces)
}

fn reason(args: IoArgs) -> anyhow::Result<()> {
    let factory = hexastore::BlankNodeFactory::new();
    let mut reasoner = default_reasoner(MemoryHexastore::new())?;
    let mut namespaces = declared_namespaces(&args.namespace)?;

    let started = Instant::now();
    for filename in &args.filenames {
        match extension(filename) {
            "ttl" | "nt" => {
                let document = fs::read_to_string(filename)
                    .with_context(|| format!("reading {}", filename.display()))?;
                let mut triples = Vec::new();
                let parsed = turtle::parse(&document, &factory, |s, p, o| {
                    triples.push(hexastore::Triple::new(s, p, o));
                })
                .with_context(|| format!("parsing {}", filename.display()))?;
                merge_namespaces(&mut namespaces, parsed);
                reasoner.bulk_insert(triples)?;
            }
            "mtt" => {
                let document = fs::read_to_string(filename)
                    .with_context(|| format!("reading {}", filename.display()))?;
                parse_and_register(&document, &mut reasoner)
                    .with_context(|| format!("registering rules from {}", filename.display()))?;
            }
            other => bail!("unknown input kind .{other}: {}", filename.display()),
        }
    }
    let store = reasoner.into_store();
    info!(triples = store.len(), elapsed = ?started.elapsed(), "saturated");

    write_output(&store, &args.output, &namespaces)
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn declared_namespaces(pairs: &[String]) -> anyhow::Result<BTreeMap<String, Namespace>> {
    let mut namespaces = BTreeMap::new();
    for pair in pairs.chunks(2) {
        let [name, iri] = pair else {
            bail!("namespace bindings come in NAME IRI pairs");
        };
        namespaces.insert(
            name.clone(),
            Namespace::new(name.clone(), Iri::new(iri.clone())),
        );
    }
    Ok(namespaces)
}

fn merge_namespaces(
    namespaces: &mut BTreeMap<String, Namespace>,
    parsed: BTreeMap<String, Namespace>,
) {
    for (name, namespace) in parsed {
        match namespaces.get(&name) {
            None => {
                namespaces.insert(name, namespace);
            }
            Some(existing) if *existing != namespace => {
                warn!(prefix = %name, "ignoring conflicting namespace binding");
            }
            Some(_) => {}
        }
    }
}

fn write_output<S: TripleReader>(
    store: &S,
    output: &Path,
    namespaces: &BTreeMap<String, Namespace>,
) -> anyhow::Result<()> {
    let bindings: Vec<(String, Iri)> = namespaces
        .values()
        .map(|n| (n.name.clone(), n.prefix.clone()))
        .collect();

    if output == Path::new("-") {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        turtle::serialise(store, &mut out, &bindings)?;
        out.flush()?;
    } else {
        let mut out = fs::File::create(output)
            .with_context(|| format!("creating {}", output.display()))?;
        turtle::serialise(store, &mut out, &bindings)?;
    }
    Ok(())
}
