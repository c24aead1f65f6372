//! Command-line front-end sharing the server's job database and directories.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tubeconv::adapters::local::MemoryRepository;
use tubeconv::application::{DownloadRequest, DownloadService, Submission};
use tubeconv::bootstrap;
use tubeconv::config::AppConfig;
use tubeconv::domain::jobs::{JobSnapshot, JobStatus};
use tubeconv::logging::init_logging;
use tubeconv::ports::repository::JobRepository;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "tubeconv-cli")]
#[command(about = "Download and convert videos from the command line", long_about = None)]
struct Cli {
    /// Keep jobs in memory instead of the job database.
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List files in the ongoing and completed directories.
    List,

    /// Show every known job.
    Status,

    /// Download a video and wait for it to finish.
    Download {
        /// Video URL (youtu.be/<id> or youtube.com/watch?v=<id>).
        url: String,

        /// Target format, e.g. mp4, avi, mpg.
        #[arg(long, default_value = "")]
        format: String,

        /// Transcode after downloading.
        #[arg(long)]
        convert: bool,

        /// Only print the resolved download link.
        #[arg(long)]
        link_only: bool,
    },

    /// Convert an .mp4 from the ongoing directory into the completed one.
    Convert {
        /// File name inside the ongoing directory.
        file: String,

        #[arg(long, value_parser = ["mpg", "avi"])]
        format: String,

        /// Remove the source file after a successful conversion.
        #[arg(long)]
        delete_source: bool,
    },

    /// Re-run a failed job and wait for it to finish.
    Retry {
        /// Job identifier.
        id: String,
    },
}

#[tokio::main]
async fn main() {
    init_logging("warn,tubeconv=info");

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::from_env()?;
    let repo: Arc<dyn JobRepository> = if cli.memory {
        Arc::new(MemoryRepository::new())
    } else {
        bootstrap::connect_repository(&config).await?
    };
    let services = bootstrap::build(&config, repo).await?;
    let service = services.service;

    match cli.command {
        Command::List => {
            let store = service.registry().store();
            print_files("Ongoing downloads", store.list_ongoing().await?);
            print_files("Completed files", store.list_completed().await?);
        }
        Command::Status => {
            let jobs = service.list().await;
            if jobs.is_empty() {
                println!("No jobs found.");
            }
            for job in &jobs {
                print_job(job);
            }
        }
        Command::Download {
            url,
            format,
            convert,
            link_only,
        } => {
            println!("Resolving {} ...", url);
            let request = DownloadRequest {
                url,
                format,
                convert,
                passthrough: link_only,
            };
            match service.submit(request).await? {
                Submission::Ready { download_url } => println!("{}", download_url),
                Submission::Converting { job_id } | Submission::Processing { job_id } => {
                    println!("Started job {}", job_id);
                    wait_for(&service, &job_id).await?;
                }
            }
        }
        Command::Convert {
            file,
            format,
            delete_source,
        } => {
            println!("Converting {} to {} ...", file, format);
            let job = service.convert_local(&file, &format, delete_source).await?;
            print_job(&service.get(&job.id).await?);
            if job.status == JobStatus::Failed {
                std::process::exit(1);
            }
        }
        Command::Retry { id } => {
            service.retry(&id).await?;
            println!("Retrying job {}", id);
            wait_for(&service, &id).await?;
        }
    }

    Ok(())
}

/// Poll a job until it reaches a terminal state, printing each change.
async fn wait_for(service: &DownloadService, id: &str) -> tubeconv::Result<()> {
    let mut last = None;
    loop {
        let job = service.get(id).await?;
        let seen = (job.status, (job.progress * 100.0) as u32);
        if last != Some(seen) {
            print_job(&job);
            last = Some(seen);
        }
        if job.status.is_terminal() {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_files(heading: &str, files: Vec<tubeconv::adapters::local::fs::StoredFile>) {
    println!("{}:", heading);
    if files.is_empty() {
        println!("  (none)");
    }
    for (i, file) in files.iter().enumerate() {
        println!("  {}. {} ({} bytes)", i + 1, file.name, file.size);
    }
}

fn print_job(job: &JobSnapshot) {
    let detail = if !job.error.is_empty() {
        job.error.as_str()
    } else {
        job.filename.as_str()
    };
    println!(
        "{:<28} {:<10} {:<11} {:>3}%  {}",
        job.id,
        job.kind.as_str(),
        job.status.as_str(),
        (job.progress * 100.0) as u32,
        detail
    );
}
