//! examkit CLI — compose, take and grade timed exams from question pools.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use examkit_core::distribution::TierMatrix;

mod commands;

use commands::{ExamArgs, OutputFormat};

#[derive(Parser)]
#[command(name = "examkit", version, about = "Timed exam composer and grader")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a question pool for problems
    Validate {
        /// Pool JSON file or directory
        #[arg(long)]
        pool: PathBuf,
    },

    /// Show how a request would be distributed over the pool
    Plan {
        /// Pool JSON file or directory
        #[arg(long)]
        pool: PathBuf,

        #[command(flatten)]
        exam: ExamArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Compose an exam and print or save it
    Compose {
        /// Pool JSON file or directory
        #[arg(long)]
        pool: PathBuf,

        #[command(flatten)]
        exam: ExamArgs,

        /// Seed for a reproducible shuffle
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Grade answers against a composed exam
    Grade {
        /// Composed exam JSON (from `compose --format json`)
        #[arg(long)]
        exam: PathBuf,

        /// Answers JSON: an object of question id → answer
        #[arg(long)]
        answers: PathBuf,

        /// Seconds spent, recorded with --record
        #[arg(long, default_value = "0")]
        time_spent: u64,

        /// Append the result to the session history
        #[arg(long)]
        record: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Take an exam interactively in the terminal
    Take {
        /// Pool JSON file or directory
        #[arg(long)]
        pool: PathBuf,

        #[command(flatten)]
        exam: ExamArgs,

        /// Seed for a reproducible shuffle
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Draw a per-tier matrix from the pool and write a titled exam file
    Export {
        /// Pool JSON file or directory
        #[arg(long)]
        pool: PathBuf,

        /// Exam title, also used for the default file name
        #[arg(long, default_value = "Exam")]
        title: String,

        /// Questions per tier, e.g. NB=8,TH=6,VD=4,VDC=2
        #[arg(long, conflicts_with = "count")]
        matrix: Option<TierMatrix>,

        /// Total questions, spread 40/30/20/rest over NB/TH/VD/VDC
        #[arg(long)]
        count: Option<usize>,

        /// Session length in minutes
        #[arg(long)]
        minutes: Option<u64>,

        /// Seed for a reproducible shuffle
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (default: the title with spaces as underscores)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show past sessions, newest first
    History {
        /// Delete every recorded session
        #[arg(long)]
        clear: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Create starter config and example pool
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("examkit=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Validate { pool } => commands::validate::execute(pool),
        Commands::Plan { pool, exam, format } => {
            commands::plan::execute(pool, exam, format, config)
        }
        Commands::Compose {
            pool,
            exam,
            seed,
            format,
            output,
        } => commands::compose::execute(pool, exam, seed, format, output, config),
        Commands::Grade {
            exam,
            answers,
            time_spent,
            record,
            format,
        } => commands::grade::execute(exam, answers, time_spent, record, format, config),
        Commands::Take { pool, exam, seed } => {
            commands::take::execute(pool, exam, seed, config).await
        }
        Commands::Export {
            pool,
            title,
            matrix,
            count,
            minutes,
            seed,
            output,
        } => commands::export::execute(
            pool,
            commands::export::ExportOptions {
                title,
                matrix,
                count,
                minutes,
                seed,
                output,
            },
            config,
        ),
        Commands::History { clear, format } => commands::history::execute(clear, format, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
