use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use meddiag::{
    config, logging,
    knowledge::{DatasetSource, HuggingFaceRows, JsonlFiles},
    service::knowledge_base_from_config,
};

#[derive(Parser)]
#[command(
    name = "seed-corpus",
    about = "Load the lab-test and consultation corpora into Qdrant"
)]
struct Cli {
    /// Where dataset rows come from.
    #[arg(long, value_enum, default_value_t = Source::Hf)]
    source: Source,
    /// JSON Lines export of the lab-test dataset (with `--source jsonl`).
    #[arg(long)]
    lab_file: Option<PathBuf>,
    /// JSON Lines export of the chatbot dataset (with `--source jsonl`).
    #[arg(long)]
    chatbot_file: Option<PathBuf>,
    /// Maximum rows per corpus; defaults to `SEED_MAX_ROWS`.
    #[arg(long)]
    max_rows: Option<usize>,
    /// Re-seed collections that already hold points.
    #[arg(long)]
    force: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    /// Hugging Face datasets server.
    Hf,
    /// Local JSON Lines files.
    Jsonl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let source: Box<dyn DatasetSource> = match cli.source {
        Source::Hf => Box::new(
            HuggingFaceRows::new(config.hf_datasets_url.clone())
                .context("failed to build datasets client")?,
        ),
        Source::Jsonl => {
            let (Some(lab_file), Some(chatbot_file)) = (cli.lab_file, cli.chatbot_file) else {
                bail!("--source jsonl requires both --lab-file and --chatbot-file");
            };
            Box::new(JsonlFiles::new(lab_file, chatbot_file))
        }
    };

    let knowledge = knowledge_base_from_config(config).context("failed to build knowledge base")?;
    let max_rows = cli.max_rows.unwrap_or(config.seed_max_rows);
    let reports = knowledge
        .seed_if_empty(source.as_ref(), max_rows, cli.force)
        .await
        .context("seeding failed")?;

    for report in reports {
        println!(
            "{}: collection={} indexed={} existing={}",
            report.corpus, report.collection, report.documents_indexed, report.existing_points
        );
    }
    Ok(())
}
