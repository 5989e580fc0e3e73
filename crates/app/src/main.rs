use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tally::{DataDir, Session};
use tally_core::{Rule, TagAssignment};
use tally_import::Provider;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Alipay / WeChat statement bookkeeping")]
struct Cli {
    /// Directory holding rules.json, categories.json, settings.toml and progress
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a statement export, replacing the current progress
    Import {
        /// alipay or wechat
        provider: Provider,
        file: PathBuf,
    },

    /// Re-run the rules over bills that have no category yet
    Tag,

    /// Apply a JSON list of {交易订单号, 类别, 标签, 备注} assignments
    Assign { file: PathBuf },

    /// Merge a JSON list of suggested rules into rules.json
    MergeRules { file: PathBuf },

    /// Print bills, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print tagging coverage as JSON
    Stats,

    /// Delete the saved progress
    Clear,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data = DataDir::new(&cli.data_dir);
    let mut session = Session::open(&data)
        .with_context(|| format!("opening data directory {}", cli.data_dir.display()))?;

    match cli.command {
        Command::Import { provider, file } => {
            if !file.exists() {
                bail!("statement not found: {}", file.display());
            }
            let warnings = session
                .import(&file, provider)
                .with_context(|| format!("importing {}", file.display()))?;
            session.persist()?;

            let stats = session.stats();
            println!(
                "Imported {} bills from {} ({} categorized)",
                stats.total,
                file.display(),
                stats.category_tagged
            );
            for w in &warnings {
                println!("warning: {w}");
            }
        }

        Command::Tag => {
            require_progress(&session)?;
            let tagged = session.auto_tag();
            session.persist()?;
            println!("Tagged {tagged} bills");
        }

        Command::Assign { file } => {
            require_progress(&session)?;
            let assignments: Vec<TagAssignment> = read_json(&file)?;
            let categories = data.load_categories()?;
            for a in &assignments {
                if !categories.is_empty() && !categories.contains_key(&a.category) {
                    tracing::warn!("{}: category {} is not in categories.json", a.id, a.category);
                }
            }
            let applied = session.apply_tags(&assignments);
            session.persist()?;
            println!("Applied {applied} of {} assignments", assignments.len());
        }

        Command::MergeRules { file } => {
            let suggested: Vec<Rule> = read_json(&file)?;
            let count = suggested.len();
            session.merge_rules(suggested);
            data.rules().save(session.rules())?;
            println!(
                "Merged {count} suggestions, {} rules total",
                session.rules().len()
            );
        }

        Command::List { limit } => {
            require_progress(&session)?;
            for (id, bill) in session.sorted_bills().into_iter().take(limit) {
                println!(
                    "{} | {} | {} | {} | {}/{} | {}",
                    bill.time, id, bill.counterparty, bill.amount, bill.category, bill.tag, bill.book
                );
            }
        }

        Command::Stats => {
            require_progress(&session)?;
            println!("{}", serde_json::to_string_pretty(&session.stats())?);
        }

        Command::Clear => {
            session.clear()?;
            println!("Progress cleared");
        }
    }

    Ok(())
}

fn require_progress(session: &Session) -> Result<()> {
    if session.bills().is_empty() {
        bail!("no bills loaded; run `tally import` first");
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
