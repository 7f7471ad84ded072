use std::fs;
use std::io::{self, Read};
use std::iter;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use heading_range::{Config, Node, Options, Result, SectionConfig, Test, heading_range, parse, render};
use regex::Regex;
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

/// Config file picked up from the working directory when `--config` is absent
const LOCAL_CONFIG: &str = "heading-range.toml";

#[derive(Parser)]
#[command(name = "heading-range")]
#[command(about = "Find a markdown section by its heading and replace it")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to heading-range.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log located and replaced sections
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the section (heading and body) without changing anything
    Extract(SectionArgs),
    /// Keep the heading, drop the body
    Clear(SectionArgs),
    /// Delete the heading and its body
    Delete(SectionArgs),
    /// Keep the heading, replace the body with the content of another file
    Replace {
        #[command(flatten)]
        section: SectionArgs,

        /// Markdown file holding the new body
        #[arg(short, long)]
        with: PathBuf,
    },
}

#[derive(Args)]
struct SectionArgs {
    /// Input Markdown file, `-` for stdin
    input: PathBuf,

    /// Heading to look for. Matched against the whole heading text, ignoring
    /// case, and read as a regex: `foo+` matches "Fooooo" and `(` must be
    /// escaped. Pass --literal to match plain text.
    heading: String,

    /// Read HEADING as an unanchored, case-sensitive regex
    #[arg(long, conflicts_with = "literal")]
    regex: bool,

    /// Read HEADING as plain text
    #[arg(long)]
    literal: bool,

    /// Leave definitions at the end of the section where they are
    #[arg(long)]
    ignore_final_definitions: bool,

    /// Write the mdast tree as JSON instead of markdown
    #[arg(long)]
    json: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

enum Action {
    Extract,
    Clear,
    Delete,
    Replace(Vec<Node>),
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }
}

/// Returns `false` when `extract` finds nothing.
fn run(cli: Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => Config::load_strict(path)?,
        None => Config::load(Path::new(LOCAL_CONFIG)),
    };

    let (args, action) = match cli.command {
        Command::Extract(args) => (args, Action::Extract),
        Command::Clear(args) => (args, Action::Clear),
        Command::Delete(args) => (args, Action::Delete),
        Command::Replace { section, with } => {
            let body = read_input(&with)?;
            (section, Action::replace(&body, &config))
        }
    };

    let markdown = read_input(&args.input)?;
    match apply(&markdown, &args, &action, &config)? {
        Some(text) => {
            write_output(args.output.as_deref(), &text)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

impl Action {
    /// Replace with the blocks of a markdown document.
    fn replace(body: &str, config: &Config) -> Self {
        match parse(body, &config.parse) {
            Node::Root { children } => Action::Replace(children),
            other => Action::Replace(vec![other]),
        }
    }
}

/// Run `action` on the section of `markdown` picked by `args` and render the
/// result. `None` means `extract` found nothing to print.
fn apply(markdown: &str, args: &SectionArgs, action: &Action, config: &Config) -> Result<Option<String>> {
    let mut tree = parse(markdown, &config.parse);
    let options = section_options(args, &config.section)?;

    let mut found = false;
    let mut extracted = None;
    heading_range(&mut tree, options, |start, between, end, scope| {
        found = true;
        debug!(start = scope.start, end = ?scope.end, between = between.len(), "found section");

        match action {
            Action::Extract => {
                let nodes = iter::once(start).chain(between).cloned().collect();
                extracted = Some(Node::root(nodes));
                None
            }
            Action::Clear => Some(vec![Some(start.clone()), end.cloned()]),
            Action::Delete => Some(vec![end.cloned()]),
            Action::Replace(body) => Some(
                iter::once(Some(start.clone()))
                    .chain(body.iter().cloned().map(Some))
                    .chain(iter::once(end.cloned()))
                    .collect(),
            ),
        }
    })?;

    if !found {
        warn!(heading = %args.heading, input = %args.input.display(), "no matching heading");
    }

    let output = match (action, extracted) {
        (Action::Extract, None) => return Ok(None),
        (Action::Extract, Some(section)) => section,
        _ => tree,
    };

    if args.json {
        let mut json = serde_json::to_string_pretty(&output)?;
        json.push('\n');
        return Ok(Some(json));
    }
    Ok(Some(render(&output, &config.render)))
}

fn section_options(args: &SectionArgs, config: &SectionConfig) -> Result<Options> {
    let test = if args.regex {
        Test::Pattern(Regex::new(&args.heading)?)
    } else if args.literal || config.literal {
        Test::literal(&args.heading)
    } else {
        Test::from(args.heading.as_str())
    };

    Ok(Options::new(test)
        .ignore_final_definitions(args.ignore_final_definitions || config.ignore_final_definitions))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    Ok(fs::read_to_string(path)?)
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text)?;
            debug!(path = %path.display(), "wrote output");
        }
        None => print!("{}", text),
    }
    Ok(())
}
