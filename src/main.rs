use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use plotframe::pipeline::{Alignment, DerivedColumn};
use plotframe::{
    summarize, DataSource, Frame, LoadError, ParserConfig, Plan, RowFilter, TableParser,
};

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Parse delimited numeric files and report what a chart would receive.
#[derive(Parser)]
#[command(name = "plotframe", version)]
struct Args {
    /// Data files to load.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Field delimiter (`\t` for tab).
    #[arg(short, long, default_value = "\\t")]
    delimiter: String,

    /// Comment prefix (repeatable). Defaults to `#`.
    #[arg(short, long = "comment")]
    comments: Vec<String>,

    /// Treat the first line of each block as data instead of column names.
    #[arg(long)]
    no_header: bool,

    /// Text encoding label.
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// Add a derived column, `NAME=EXPRESSION` (repeatable).
    #[arg(long = "derive", value_name = "NAME=EXPR")]
    derive: Vec<String>,

    /// Keep rows with `MIN <= COLUMN <= MAX`; either bound may be empty (repeatable).
    #[arg(long = "filter", value_name = "COLUMN:MIN:MAX")]
    filter: Vec<String>,

    /// Align all frames on this column.
    #[arg(long, value_name = "COLUMN")]
    align: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct ColumnReport {
    name: String,
    derived: bool,
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Serialize)]
struct FrameReport {
    source: String,
    rows: usize,
    columns: Vec<ColumnReport>,
}

#[derive(Serialize)]
struct Report {
    summary: String,
    frames: Vec<FrameReport>,
    x_range: Option<(f64, f64)>,
    warnings: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Parse errors carry their own multi-line pointer diagnostic.
            match err.downcast_ref::<LoadError>() {
                Some(LoadError::Parse(parse)) => eprintln!("{parse}"),
                _ => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let parser = TableParser::new(parser_config(&args)?).context("invalid parser settings")?;
    let plan = plan(&args)?;

    let mut frames = Vec::new();
    let mut warnings = Vec::new();
    for path in &args.files {
        let parsed = parser.parse_blocks_path(path)?;
        log::info!("loaded {} ({} frame(s))", path.display(), parsed.data.len());
        frames.extend(parsed.data);
        warnings.extend(parsed.warnings.iter().map(ToString::to_string));
    }

    let output = plan.apply(frames).context("applying transformations")?;
    warnings.extend(output.skipped.iter().map(|s| {
        format!(
            "could not create derived column '{}' for {}: {}",
            s.column, s.source, s.error.message
        )
    }));

    let report = Report {
        summary: summarize(&output.frames),
        frames: output.frames.iter().map(frame_report).collect(),
        x_range: output.x_range,
        warnings,
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn parser_config(args: &Args) -> Result<ParserConfig> {
    let delimiter = match args.delimiter.as_str() {
        "\\t" | "tab" => '\t',
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => bail!("delimiter must be a single character, got {other:?}"),
            }
        }
    };

    let mut config = ParserConfig::default()
        .with_delimiter(delimiter)
        .with_header(!args.no_header)
        .with_encoding(args.encoding.clone());
    if !args.comments.is_empty() {
        config = config.with_comment_prefixes(args.comments.iter().cloned());
    }
    Ok(config)
}

fn plan(args: &Args) -> Result<Plan> {
    let derived_columns = args
        .derive
        .iter()
        .map(|spec| {
            let (name, expression) = spec
                .split_once('=')
                .ok_or_else(|| anyhow!("--derive expects NAME=EXPR, got {spec:?}"))?;
            Ok(DerivedColumn {
                name: name.trim().to_string(),
                expression: expression.trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let filters = args
        .filter
        .iter()
        .map(|spec| parse_filter(spec).with_context(|| format!("invalid --filter {spec:?}")))
        .collect::<Result<Vec<_>>>()?;

    let alignment = match &args.align {
        Some(column) => Alignment {
            enabled: true,
            column: column.clone(),
        },
        None => Alignment::default(),
    };

    Ok(Plan {
        derived_columns,
        filters,
        alignment,
    })
}

fn parse_filter(spec: &str) -> Result<RowFilter> {
    let mut parts = spec.rsplitn(3, ':');
    let (Some(max), Some(min), Some(column)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected COLUMN:MIN:MAX");
    };
    let bound = |text: &str| -> Result<Option<f64>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<f64>()
            .map(Some)
            .with_context(|| format!("'{text}' is not a number"))
    };
    Ok(RowFilter::new(column.trim(), bound(min)?, bound(max)?))
}

fn frame_report(frame: &Frame) -> FrameReport {
    let columns = frame
        .iter()
        .map(|column| {
            let finite = column.values().iter().copied().filter(|v| v.is_finite());
            let (min, max) = finite.fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), v| {
                (
                    Some(lo.map_or(v, |lo| lo.min(v))),
                    Some(hi.map_or(v, |hi| hi.max(v))),
                )
            });
            ColumnReport {
                name: column.name().to_string(),
                derived: column.is_derived(),
                min,
                max,
            }
        })
        .collect();

    FrameReport {
        source: DataSource::of(frame).label(),
        rows: frame.row_count(),
        columns,
    }
}

fn print_text(report: &Report) {
    println!("{}", report.summary);
    for frame in &report.frames {
        println!("{}: {} rows", frame.source, frame.rows);
        for column in &frame.columns {
            let range = match (column.min, column.max) {
                (Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
                _ => "(no values)".to_string(),
            };
            let marker = if column.derived { " (derived)" } else { "" };
            println!("  {}{marker}: {range}", column.name);
        }
    }
    if let Some((lo, hi)) = report.x_range {
        println!("aligned range: [{lo}, {hi}]");
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_specs() {
        assert_eq!(
            parse_filter("t:1:3").unwrap(),
            RowFilter::new("t", Some(1.0), Some(3.0))
        );
        assert_eq!(parse_filter("t::3").unwrap(), RowFilter::new("t", None, Some(3.0)));
        assert_eq!(
            parse_filter("a:b:-1:").unwrap(),
            RowFilter::new("a:b", Some(-1.0), None)
        );
        assert!(parse_filter("t:1").is_err());
        assert!(parse_filter("t:x:1").is_err());
    }

    #[test]
    fn delimiter_argument() {
        let args = Args::parse_from(["plotframe", "-d", ",", "f.csv"]);
        assert_eq!(parser_config(&args).unwrap().delimiter, ',');
        let args = Args::parse_from(["plotframe", "f.tsv"]);
        assert_eq!(parser_config(&args).unwrap().delimiter, '\t');
        let args = Args::parse_from(["plotframe", "-d", ";;", "f.csv"]);
        assert!(parser_config(&args).is_err());
    }
}
