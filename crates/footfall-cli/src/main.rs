use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use footfall_dash::{
    Dashboard, DashboardOptions, DateRange, FilterSpec, Resolution, Role, RoleMap, Session,
};
use footfall_format::{get_locale, FormatOptions};
use footfall_io::{export_csv, CsvDateOrder, CsvOptions, EXPORT_FILE_NAME};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "footfall")]
#[command(about = "Detect column roles, compute filtered KPIs and charts, and export filtered rows from a footfall CSV.")]
struct Cli {
    /// Log at debug level unless `RUST_LOG` overrides it.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print detected column roles and the filter choices as JSON.
    Roles(LoadArgs),
    /// Print KPIs and chart data for one filter state as JSON.
    Dashboard(DashboardArgs),
    /// Write the filtered rows as CSV.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Optional input file path. If omitted, reads bytes from stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Order used for ambiguous numeric dates like `01/02/2025`.
    #[arg(long, value_enum, default_value_t = DateOrderArg::Mdy)]
    date_order: DateOrderArg,

    /// Single-byte field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateOrderArg {
    Mdy,
    Dmy,
    Ymd,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// First day to include (`YYYY-MM-DD`). Defaults to the earliest date in the data.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to include (`YYYY-MM-DD`). Defaults to the latest date in the data.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Keep only this ghat (`All` keeps every ghat).
    #[arg(long)]
    ghat: Option<String>,

    /// Keep only this peak/time-of-day bucket.
    #[arg(long)]
    peak: Option<String>,

    /// Keep only this weather condition.
    #[arg(long)]
    weather: Option<String>,
}

#[derive(Debug, Args)]
struct DashboardArgs {
    #[command(flatten)]
    load: LoadArgs,

    #[command(flatten)]
    filters: FilterArgs,

    /// Locale for number separators (e.g. `en-US`, `en-IN`, `de-DE`).
    #[arg(long, default_value = "en-US")]
    locale: String,

    /// Rows in the quick data table.
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    load: LoadArgs,

    #[command(flatten)]
    filters: FilterArgs,

    /// Destination file, or `-` for stdout.
    #[arg(long, default_value = EXPORT_FILE_NAME)]
    output: PathBuf,
}

#[derive(Debug, Serialize)]
struct ColumnReport {
    name: String,
    column_type: String,
}

#[derive(Debug, Serialize)]
struct RolesReport<'a> {
    rows: usize,
    columns: Vec<ColumnReport>,
    roles: &'a RoleMap,
    day_axis: &'a Resolution,
    date_bounds: Option<DateRange>,
    filter_choices: BTreeMap<Role, Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ExportReport {
    output: String,
    rows: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Roles(args) => run_roles(&args),
        Command::Dashboard(args) => run_dashboard(&args),
        Command::Export(args) => run_export(&args),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_roles(args: &LoadArgs) -> Result<()> {
    let session = load_session(args)?;
    let source = session.source_view(session.table())?;
    let options = session.filter_options();

    let report = RolesReport {
        rows: source.row_count(),
        columns: source
            .schema()
            .iter()
            .map(|c| ColumnReport {
                name: c.name.clone(),
                column_type: format!("{:?}", c.column_type).to_lowercase(),
            })
            .collect(),
        roles: session.roles(),
        day_axis: session.day_axis(),
        date_bounds: options.date_bounds,
        filter_choices: Role::FILTERS
            .into_iter()
            .map(|role| (role, options.choices(role)))
            .collect(),
    };
    print_json(&report)
}

fn run_dashboard(args: &DashboardArgs) -> Result<()> {
    let session = load_session(&args.load)?;
    let locale = get_locale(&args.locale)
        .with_context(|| format!("unsupported locale {:?}", args.locale))?;
    let options = DashboardOptions {
        preview_rows: args.preview_rows,
        format: FormatOptions { locale: *locale },
    };

    let spec = filter_spec(&session, &args.filters);
    let dashboard = Dashboard::build(&session, &spec, &options).context("build dashboard")?;
    print_json(&dashboard)
}

fn run_export(args: &ExportArgs) -> Result<()> {
    let session = load_session(&args.load)?;
    let spec = filter_spec(&session, &args.filters);
    let filtered = session.filter(&spec)?;
    let view = session.source_view(&filtered)?;

    if args.output.as_os_str() == "-" {
        let stdout = io::stdout().lock();
        return match export_csv(&view, stdout) {
            Err(e) if e.is_broken_pipe() => Ok(()),
            other => other.context("write CSV to stdout"),
        };
    }

    let file = File::create(&args.output)
        .with_context(|| format!("create {}", args.output.display()))?;
    export_csv(&view, BufWriter::new(file))
        .with_context(|| format!("write {}", args.output.display()))?;
    log::info!("wrote {} rows to {}", view.row_count(), args.output.display());

    print_json(&ExportReport {
        output: args.output.display().to_string(),
        rows: view.row_count(),
    })
}

fn load_session(args: &LoadArgs) -> Result<Session> {
    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {:?}", args.delimiter);
    }
    let options = CsvOptions {
        delimiter: args.delimiter as u8,
        date_order: match args.date_order {
            DateOrderArg::Mdy => CsvDateOrder::Mdy,
            DateOrderArg::Dmy => CsvDateOrder::Dmy,
            DateOrderArg::Ymd => CsvDateOrder::Ymd,
        },
        ..CsvOptions::default()
    };

    let bytes = read_all_input(args.input.as_deref())?;
    let session = Session::from_csv_bytes(&bytes, &options).context("load dataset")?;
    Ok(session)
}

fn read_all_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path).with_context(|| format!("read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("read stdin")?;
            Ok(buf)
        }
    }
}

fn filter_spec(session: &Session, args: &FilterArgs) -> FilterSpec {
    let options = session.filter_options();
    let mut spec = FilterSpec::all();
    if args.from.is_some() || args.to.is_some() {
        spec = spec.with_date_range(options.complete_range(DateRange {
            start: args.from,
            end: args.to,
        }));
    }

    let choices = [
        (Role::Location, &args.ghat),
        (Role::TimeBucket, &args.peak),
        (Role::Weather, &args.weather),
    ];
    for (role, choice) in choices {
        if let Some(text) = choice {
            spec.selections.insert(role, options.parse_choice(role, text));
        }
    }
    spec
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    let written = serde_json::to_writer_pretty(&mut out, value)
        .map_err(io::Error::from)
        .and_then(|()| writeln!(out));
    match written {
        // The reader went away (e.g. `| head`); nothing left to do.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("write JSON to stdout"),
    }
}
