use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use mg_survey::api::MgRastHttpClient;
use mg_survey::app::{App, FetchOptions, ProgressSink};
use mg_survey::config::{ConfigLoader, SurveyConfig};
use mg_survey::domain::MetagenomeId;
use mg_survey::error::SurveyError;
use mg_survey::output::{ConsoleSink, JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "mg-survey")]
#[command(about = "Reconcile and survey the MG-RAST metagenome catalog")]
#[command(version, author)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Config file (defaults to ./mg-survey.json when present)"
    )]
    config: Option<String>,

    #[arg(long, global = true, help = "Print results as JSON instead of tables")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Compare the web table export against the API listing")]
    Reconcile(ReconcileArgs),
    #[command(about = "Filter putative assemblies and fetch their metadata")]
    Survey(SurveyArgs),
    #[command(about = "Render the HTML report from cached metadata")]
    Report(ReportArgs),
    #[command(about = "Download an auxiliary file of one metagenome")]
    Download(DownloadArgs),
}

#[derive(Args)]
struct ReconcileArgs {
    #[arg(long)]
    export: Option<Utf8PathBuf>,

    #[arg(long)]
    page_size: Option<u64>,

    #[arg(long, help = "Number of export-only ids to look up individually")]
    verify: Option<usize>,
}

#[derive(Args)]
struct SurveyArgs {
    #[arg(long)]
    export: Option<Utf8PathBuf>,

    #[arg(long)]
    min_len: Option<f64>,

    #[arg(long)]
    max_len: Option<f64>,

    #[arg(long)]
    min_bps: Option<f64>,

    #[arg(long, help = "Refetch metadata that is already cached")]
    force: bool,

    #[arg(long)]
    dry_run: bool,

    #[arg(long, help = "Write the repaired export back to disk")]
    rewrite_export: bool,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct DownloadArgs {
    id: String,

    #[arg(long, default_value = "050.2")]
    file: String,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SurveyError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SurveyError) -> u8 {
    match error {
        SurveyError::MissingConfig(_)
        | SurveyError::ConfigRead(_)
        | SurveyError::ConfigParse(_)
        | SurveyError::InvalidThresholds { .. }
        | SurveyError::InvalidIdentifier(_)
        | SurveyError::InvalidPageSize
        | SurveyError::TypeConversion { .. }
        | SurveyError::MissingColumn(_)
        | SurveyError::MalformedExport(_)
        | SurveyError::EmptyExport(_) => 2,
        SurveyError::ApiHttp(_) | SurveyError::ApiStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Reconcile(args) => {
            if let Some(export) = args.export {
                config.export = export;
            }
            if let Some(page_size) = args.page_size {
                config.page_size = page_size;
            }
            if let Some(verify) = args.verify {
                config.verify_limit = verify;
            }
            let app = build_app(config)?;
            let result = app.reconcile(sink(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic(),
                OutputMode::Text => {
                    TextOutput::print_reconcile(&result);
                    Ok(())
                }
            }
        }
        Commands::Survey(args) => {
            if let Some(export) = args.export {
                config.export = export;
            }
            config.override_thresholds(args.min_len, args.max_len, args.min_bps)?;
            if matches!(output_mode, OutputMode::Text) {
                TextOutput::print_thresholds(&config.thresholds);
            }
            let app = build_app(config)?;
            let options = FetchOptions {
                force: args.force,
                dry_run: args.dry_run,
            };
            let result = app.survey(args.rewrite_export, options, sink(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic(),
                OutputMode::Text => {
                    TextOutput::print_survey(&result);
                    Ok(())
                }
            }
        }
        Commands::Report(args) => {
            let app = build_app(config)?;
            let result = app.report(args.output.as_deref(), sink(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic(),
                OutputMode::Text => {
                    TextOutput::print_report(&result);
                    Ok(())
                }
            }
        }
        Commands::Download(args) => {
            let id = parse_id(&args.id)?;
            let app = build_app(config)?;
            let result = app.download(
                &id,
                &args.file,
                args.output.as_deref(),
                sink(output_mode),
            )?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result).into_diagnostic(),
                OutputMode::Text => {
                    TextOutput::print_download(&result);
                    Ok(())
                }
            }
        }
    }
}

fn build_app(config: SurveyConfig) -> Result<App<MgRastHttpClient>, SurveyError> {
    let client = MgRastHttpClient::new(&config.api_url, Duration::from_secs(config.timeout_secs))?;
    Ok(App::new(config, client))
}

fn parse_id(value: &str) -> Result<MetagenomeId, SurveyError> {
    if value.trim().starts_with(mg_survey::domain::API_ID_PREFIX) {
        MetagenomeId::from_api(value)
    } else {
        value.parse()
    }
}

fn sink(mode: OutputMode) -> &'static dyn ProgressSink {
    match mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Text => &ConsoleSink,
    }
}
