use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use exio_ghg::app::{App, MaterializeOptions, ProgressSink, TracingSink};
use exio_ghg::batch::{BatchReport, run_batch};
use exio_ghg::config::{ConfigLoader, ResolvedConfig};
use exio_ghg::correspondence::CorrespondenceTable;
use exio_ghg::domain::{Classification, RegionCode, Selection, Year};
use exio_ghg::error::GhgError;
use exio_ghg::exiobase::ExiobaseHttpClient;
use exio_ghg::geo::{GeoJsonClient, GeoJsonHttpClient};
use exio_ghg::output::{JsonOutput, OutputMode, write_country_csv, write_region_csv};
use exio_ghg::server::{self, PipelinePages};
use exio_ghg::store::Store;

#[derive(Parser)]
#[command(name = "exio-ghg")]
#[command(about = "Greenhouse-gas proxy trade maps from EXIOBASE input-output tables")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./exio-ghg.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Data folder holding cached matrices and outputs
    #[arg(long, global = true)]
    folder: Option<String>,

    /// Print machine-readable JSON instead of progress logs
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download and cache the trade matrix for one year")]
    Matrix(MatrixArgs),
    #[command(about = "List cached trade matrices")]
    Cached,
    #[command(about = "Write an emission series as CSV")]
    Series(SeriesArgs),
    #[command(about = "Write a choropleth map page as HTML")]
    Map(MapArgs),
    #[command(about = "Write internal, import and export CSVs for a range of years")]
    Batch(BatchArgs),
    #[command(about = "Serve map pages over HTTP")]
    Serve(ServeArgs),
}

#[derive(Args, Clone)]
struct TableArgs {
    #[arg(long)]
    year: Option<Year>,

    #[arg(long)]
    classification: Option<Classification>,
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Region whose outgoing flows are selected
    #[arg(long)]
    origin: Option<RegionCode>,

    /// Region whose incoming flows are selected
    #[arg(long)]
    target: Option<RegionCode>,
}

#[derive(Args)]
struct MatrixArgs {
    #[command(flatten)]
    table: TableArgs,

    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct SeriesArgs {
    #[command(flatten)]
    table: TableArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// Expand regions to ISO3 countries
    #[arg(long)]
    countries: bool,

    /// Output file (stdout when omitted)
    #[arg(long)]
    output: Option<String>,
}

#[derive(Args)]
struct MapArgs {
    #[command(flatten)]
    table: TableArgs,

    #[command(flatten)]
    filter: FilterArgs,

    #[arg(long)]
    output: String,
}

#[derive(Args)]
struct BatchArgs {
    #[arg(long)]
    from: Option<Year>,

    #[arg(long)]
    to: Option<Year>,

    #[arg(long)]
    classification: Option<Classification>,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long)]
    bind: Option<std::net::SocketAddr>,

    /// Year shown on `/`
    #[arg(long)]
    year: Option<Year>,

    #[arg(long)]
    classification: Option<Classification>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<GhgError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GhgError) -> u8 {
    match error {
        GhgError::InvalidYear(_)
        | GhgError::InvalidClassification(_)
        | GhgError::InvalidRegion(_)
        | GhgError::InvalidCountry(_)
        | GhgError::UnknownRegion { .. }
        | GhgError::ConfigRead(_)
        | GhgError::ConfigParse(_) => 2,
        GhgError::ExiobaseHttp(_)
        | GhgError::ExiobaseStatus { .. }
        | GhgError::GeoJsonHttp(_)
        | GhgError::GeoJsonStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(folder) = cli.folder {
        config.pipeline.folder = Utf8PathBuf::from(folder);
    }

    match cli.command {
        Commands::Matrix(args) => run_matrix(args, &config, output_mode),
        Commands::Cached => run_cached(&config, output_mode),
        Commands::Series(args) => run_series(args, &config, output_mode),
        Commands::Map(args) => run_map(args, &config, output_mode),
        Commands::Batch(args) => run_batch_command(args, &config, output_mode),
        Commands::Serve(args) => run_serve(args, config),
    }
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Human => &TracingSink,
        OutputMode::Json => &JsonOutput,
    }
}

fn load_correspondence(config: &ResolvedConfig) -> Result<CorrespondenceTable, GhgError> {
    match &config.pipeline.correspondence {
        Some(path) => CorrespondenceTable::from_csv_path(path.as_std_path()),
        None => CorrespondenceTable::exio3(),
    }
}

fn build_app<G: GeoJsonClient>(
    config: &ResolvedConfig,
    geojson: G,
) -> Result<App<ExiobaseHttpClient, G>, GhgError> {
    Ok(App::new(
        Store::new(config.pipeline.folder.clone()),
        ExiobaseHttpClient::new(config.pipeline.source_url.clone())?,
        geojson,
        load_correspondence(config)?,
    ))
}

fn table_of(args: &TableArgs, config: &ResolvedConfig) -> (Year, Classification) {
    (
        args.year.unwrap_or(config.pipeline.year),
        args.classification
            .unwrap_or(config.pipeline.classification),
    )
}

fn run_matrix(
    args: MatrixArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let app = build_app(config, NopGeoJson)?;
    let (year, classification) = table_of(&args.table, config);
    let (_, result) = app.ensure_matrix(
        year,
        classification,
        MaterializeOptions { force: args.force },
        sink_for(output_mode),
    )?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_matrix(&result).into_diagnostic(),
        OutputMode::Human => {
            let green = "\x1b[32m";
            let cyan = "\x1b[36m";
            let reset = "\x1b[0m";
            let color = if result.action == "cache" { green } else { cyan };
            println!(
                "{color}IOT {} {} ({}): {} regions{reset}",
                result.year, result.classification, result.action, result.regions
            );
            println!("{color}   {}{reset}", result.path);
            Ok(())
        }
    }
}

fn run_cached(config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let app = build_app(config, NopGeoJson)?;
    let list = app.list_cached()?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_cached(&list).into_diagnostic(),
        OutputMode::Human => {
            println!("{}", list.folder);
            if list.matrices.is_empty() {
                println!("   (no cached matrices)");
            }
            for item in &list.matrices {
                let note = if item.has_metadata { "" } else { " [no metadata]" };
                println!("   {} {}{note}", item.year, item.classification);
            }
            Ok(())
        }
    }
}

fn run_series(
    args: SeriesArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let app = build_app(config, NopGeoJson)?;
    let (year, classification) = table_of(&args.table, config);
    let selection = Selection::from_filters(args.filter.origin, args.filter.target);
    let sink = sink_for(output_mode);

    let series = app.region_series(year, classification, &selection, sink)?;
    let mut buffer = Vec::new();
    if args.countries {
        let countries = app.expand(&series, &selection)?;
        write_country_csv(&mut buffer, &countries)?;
    } else {
        write_region_csv(&mut buffer, &series)?;
    }

    match args.output {
        Some(path) => Store::write_bytes_atomic(&Utf8PathBuf::from(path), &buffer)?,
        None => io::stdout().write_all(&buffer).into_diagnostic()?,
    }
    Ok(())
}

fn run_map(args: MapArgs, config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let geojson = GeoJsonHttpClient::new(config.pipeline.geojson_url.clone())?;
    let app = build_app(config, geojson)?;
    let (year, classification) = table_of(&args.table, config);
    let selection = Selection::from_filters(args.filter.origin, args.filter.target);

    let page = app.map_page(year, classification, &selection, sink_for(output_mode))?;
    let output = Utf8PathBuf::from(args.output);
    Store::write_bytes_atomic(&output, page.as_bytes())?;
    if matches!(output_mode, OutputMode::Human) {
        println!("{output}");
    }
    Ok(())
}

fn run_batch_command(
    args: BatchArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let app = build_app(config, NopGeoJson)?;
    let mut batch = config.batch.clone();
    if let Some(from) = args.from {
        batch.first_year = from;
    }
    if let Some(to) = args.to {
        batch.last_year = to;
    }
    if let Some(classification) = args.classification {
        batch.classification = classification;
    }
    if batch.first_year > batch.last_year {
        return Err(miette::Report::msg(format!(
            "empty year range {}..={}",
            batch.first_year, batch.last_year
        )));
    }

    let report = run_batch(&app, &batch, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_batch(&report).into_diagnostic(),
        OutputMode::Human => {
            print_batch_summary(&report);
            Ok(())
        }
    }
}

fn print_batch_summary(report: &BatchReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let reset = "\x1b[0m";
    for year in &report.years {
        println!(
            "{green}{} {} matrix={}: {} written{reset}, {yellow}{} skipped{reset}",
            year.year, report.classification, year.matrix_action, year.written, year.skipped
        );
    }
}

fn run_serve(args: ServeArgs, mut config: ResolvedConfig) -> miette::Result<()> {
    if let Some(classification) = args.classification {
        config.pipeline.classification = classification;
    }
    let bind = args.bind.unwrap_or(config.server.bind);
    let year = args.year.unwrap_or(config.pipeline.year);
    let pages = Arc::new(PipelinePages::new(config.pipeline));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(server::serve(bind, pages, year))?;
    Ok(())
}

struct NopGeoJson;

impl GeoJsonClient for NopGeoJson {
    fn fetch_countries(&self) -> Result<String, GhgError> {
        Err(GhgError::GeoJsonHttp(
            "GeoJSON client not configured".to_string(),
        ))
    }
}
