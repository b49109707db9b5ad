use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use xsort::{KeyType, SortOptions};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Parser)]
#[command(
    name = "xsort",
    version,
    about = "Sort the child elements of selected XML nodes by an attribute or subelement"
)]
struct Args {
    /// Source XML file
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,
    /// Path to the parent elements whose children get sorted, e.g. `./Items`
    #[arg(value_name = "NODE_PATH")]
    node_path: String,
    /// Attribute (or, with --text, child element) holding the sort key
    #[arg(value_name = "SORT_ATTR")]
    sort_attr: String,
    /// Sort in descending order
    #[arg(short, long, visible_alias = "descending")]
    reverse: bool,
    /// Read the key from a child element's text instead of an attribute
    #[arg(short, long, visible_alias = "use-text")]
    text: bool,
    /// Compare keys as dates and times
    #[arg(long, visible_alias = "as-datetime", conflicts_with = "decimal")]
    datetime: bool,
    /// Compare keys as decimal numbers
    #[arg(long, visible_alias = "as-decimal")]
    decimal: bool,
    /// Output file (defaults to `<stem>_sorted.<ext>` next to the input)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn options(&self) -> SortOptions {
        let key_type = if self.datetime {
            KeyType::DateTime
        } else if self.decimal {
            KeyType::Decimal
        } else {
            KeyType::Plain
        };
        SortOptions::new()
            .with_text(self.text)
            .with_key_type(key_type)
            .with_descending(self.reverse)
    }
}

fn main() {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    debug!("Reading file: {}", args.input_file.display());
    let content = read_input(&args.input_file)?;

    let mut doc = xsort::parse(&content)
        .with_context(|| format!("failed to parse {}", args.input_file.display()))?;
    if doc.namespaces().is_empty() {
        debug!("No namespace declarations");
    }
    for (prefix, uri) in doc.namespaces().iter() {
        debug!("Namespace {:?} -> {}", prefix, uri);
    }
    let report = xsort::sort(&mut doc, &args.node_path, &args.sort_attr, &args.options())?;
    debug!(
        "Sorted {} children under {} parents",
        report.children, report.parents
    );

    let out_file = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input_file));
    write_output(&out_file, &xsort::serialize(&doc))?;

    info!("Output sorted file as `{}`", out_file.display());
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    let text = std::str::from_utf8(bytes)
        .with_context(|| format!("input file {} is not valid UTF-8", path.display()))?;
    Ok(text.to_string())
}

fn write_output(path: &Path, data: &str) -> Result<()> {
    std::fs::write(path, data)
        .with_context(|| format!("failed to write output file {}", path.display()))
}

/// `dir/name.xml` becomes `dir/name_sorted.xml`
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}_sorted.{}", ext.to_string_lossy()),
        None => format!("{stem}_sorted"),
    };
    input.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_name() {
        assert_eq!(
            default_output(Path::new("data/report.rdl")),
            PathBuf::from("data/report_sorted.rdl")
        );
        assert_eq!(
            default_output(Path::new("plain")),
            PathBuf::from("plain_sorted")
        );
    }

    #[test]
    fn test_flags_map_to_options() {
        let args = Args::parse_from(["xsort", "in.xml", ".", "id", "-r", "--as-decimal", "-t"]);
        let options = args.options();
        assert!(options.descending && options.use_text);
        assert_eq!(options.key_type, KeyType::Decimal);
    }

    #[test]
    fn test_datetime_and_decimal_conflict() {
        let parsed = Args::try_parse_from(["xsort", "in.xml", ".", "id", "--datetime", "--decimal"]);
        assert!(parsed.is_err());
    }
}
