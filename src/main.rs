use clap::Parser;
use mdrst::convert::{DEFAULT_OUTPUT, DEFAULT_SOURCE, STDIO};
use mdrst::{logger, metadata, Error, InputFormat, Job, MarkdownConverter, Options, OutputFormat};
use owo_colors::OwoColorize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Source file, `-` for stdin
    #[clap(default_value = DEFAULT_SOURCE)]
    source: PathBuf,
    /// Output file, `-` for stdout
    #[clap(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Input format (inferred from the source extension when omitted)
    #[clap(short, long, value_enum)]
    from: Option<InputFormat>,
    /// Output format (inferred from the output extension when omitted)
    #[clap(short, long, value_enum)]
    to: Option<OutputFormat>,
    /// Wrap the output in a template with a metadata header
    #[clap(short, long)]
    standalone: bool,
    /// Template file for standalone output
    #[clap(long)]
    template: Option<PathBuf>,
    /// JSON, YAML or TOML file with metadata defaults
    #[clap(long)]
    metadata_file: Option<PathBuf>,
    /// Template variable as KEY=VALUE
    #[clap(short = 'D', long = "variable", value_parser = parse_variable)]
    variables: Vec<(String, String)>,
    /// Log conversion steps
    #[clap(short, long)]
    verbose: bool,
    /// Do not print the status line
    #[clap(short, long)]
    quiet: bool,
}

fn parse_variable(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn main() {
    let args = Args::parse();
    logger::init(args.verbose);
    if let Err(e) = run(args) {
        eprintln!("{} {}", "error:".red().bold(), e.white());
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let template = match &args.template {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            Error::IO(format!(
                "Failed to read template file '{}': {}",
                path.display(),
                e
            ))
        })?),
        None => None,
    };
    let metadata = match &args.metadata_file {
        Some(path) => metadata::read_file(path)?,
        None => Value::Object(Map::new()),
    };
    let to = args.to.unwrap_or_else(|| OutputFormat::infer(&args.output));

    let converter = MarkdownConverter::new(Options {
        from: args.from,
        standalone: args.standalone,
        template,
        metadata,
        variables: args.variables,
    });
    let job = Job {
        source: args.source,
        to,
        output: args.output,
    };
    mdrst::run(&converter, &job)?;

    if !args.quiet && job.output != Path::new(STDIO) {
        eprintln!(
            "{} {}  {}  {}",
            "Converted".green().bold(),
            job.source.display().dimmed(),
            "->".white().bold(),
            job.output.display().dimmed()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_convert_index_to_readme() {
        let args = Args::parse_from(["mdrst"]);
        assert_eq!(args.source, PathBuf::from("index.md"));
        assert_eq!(args.output, PathBuf::from("README.rst"));
        assert!(args.to.is_none());
        assert!(!args.standalone);
    }

    #[test]
    fn parses_variables() {
        let args = Args::parse_from(["mdrst", "-D", "version=1.0", "--variable", "x=a=b"]);
        assert_eq!(
            args.variables,
            vec![
                ("version".to_string(), "1.0".to_string()),
                ("x".to_string(), "a=b".to_string())
            ]
        );
        assert!(parse_variable("=oops").is_err());
        assert!(parse_variable("novalue").is_err());
    }
}
