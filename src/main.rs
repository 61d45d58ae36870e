use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use academic_scraper::config::Settings;
use academic_scraper::fetch::{DirFetch, HttpFetch};
use academic_scraper::report::TracingSink;
use academic_scraper::source;
use academic_scraper::{db, PortalSource, Reported, ScrapeError, TranscriptSource};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "academic_scraper", about = "Normalize student records from the transcript system or the portal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Also store the records in the SQLite database
    #[arg(long, global = true)]
    save: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read rendered transcript documents (one text file per document)
    Transcript {
        /// Directory with the rendered documents (default: settings)
        #[arg(short, long)]
        dir: Option<String>,
    },
    /// Scrape the live student portal
    Portal {
        /// Portal base URL (default: settings)
        #[arg(short, long)]
        url: Option<String>,
        /// Session cookie of a logged-in browser (default: settings)
        #[arg(short, long)]
        cookie: Option<String>,
    },
    /// Read portal pages saved as HTML files
    PortalDir {
        #[arg(short, long)]
        dir: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let sink = Arc::new(TracingSink);

    let (label, result) = match cli.command {
        Commands::Transcript { dir } => {
            let dir = dir.unwrap_or_else(|| settings.transcript_dir.clone());
            info!(%dir, "reading transcript documents");
            let reader = Reported::new(TranscriptSource::new(DirFetch::new(dir, "txt")), sink);
            ("transcript", source::collect_all(&reader).await)
        }
        Commands::Portal { url, cookie } => {
            let url = url.unwrap_or_else(|| settings.portal_url.clone());
            let cookie = cookie.or_else(|| settings.session_cookie.clone());
            info!(%url, "scraping portal");
            let reader = Reported::new(PortalSource::new(HttpFetch::new(&url, cookie)?), sink);
            ("portal", source::collect_all(&reader).await)
        }
        Commands::PortalDir { dir } => {
            info!(%dir, "reading saved portal pages");
            let reader = Reported::new(PortalSource::new(DirFetch::new(dir, "html")), sink);
            ("portal", source::collect_all(&reader).await)
        }
    };

    let records = match result {
        Ok(records) => records,
        Err(ScrapeError::SessionExpired) => {
            eprintln!("Session expired: log in to the portal again and refresh the cookie.");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&records)?);

    if cli.save {
        let conn = db::connect(&settings.db_path)?;
        db::init_schema(&conn)?;
        db::save_record_set(&conn, label, &records)?;
        info!(db = %settings.db_path, "saved records");
    }

    info!(
        classes = records.class_schedules.len(),
        signed = records.passed_courses.signed.len(),
        passed = records.passed_courses.passed.len(),
        surveys = records.taken_surveys.len(),
        secs = t0.elapsed().as_secs_f64(),
        "done"
    );
    Ok(ExitCode::SUCCESS)
}
