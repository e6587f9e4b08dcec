use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pb_app::{default_config_path, App, AppConfig, PublishController};
use pb_core::{Article, Draft, PublishStatus, SeoAdvice, SeoAnalysisResult, SeoMetadata};
use pb_inference::{ArticleBrief, ArticleGenerator};
use pb_publishers::PublishSummary;
use tokio::sync::oneshot;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "postblog", author, version, about = "Score markdown articles for SEO and publish them to several blogs at once", long_about = None)]
pub struct Cli {
    /// Config file. Defaults to ~/.postblog/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a markdown file against a target keyword
    Seo {
        file: PathBuf,
        #[arg(long)]
        keyword: String,
        /// Defaults to the first `# ` heading
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "")]
        meta: String,
        #[arg(long)]
        json: bool,
    },
    /// Publish a markdown file to one or more services
    Publish {
        file: PathBuf,
        #[arg(long = "to", required = true, num_args = 1..)]
        services: Vec<String>,
        #[arg(long)]
        draft: bool,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Services {
        #[command(subcommand)]
        command: ServicesCommands,
    },
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    Drafts {
        #[command(subcommand)]
        command: DraftsCommands,
    },
    Llm {
        #[command(subcommand)]
        command: LlmCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ServicesCommands {
    List,
    /// Check a service's credentials and reachability
    Test { name: String },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    List,
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum DraftsCommands {
    List,
    Save {
        file: PathBuf,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum LlmCommands {
    /// Check that the configured chat model answers
    Check,
    /// Draft an article from a brief, with SEO advice
    Generate {
        /// What the article should cover
        #[arg(long)]
        summary: String,
        #[arg(long)]
        keyword: String,
        #[arg(long, default_value = "")]
        audience: String,
        #[arg(long, default_value = "")]
        intent: String,
        #[arg(long, default_value = "")]
        blog_type: String,
        /// Write the article here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Title from the first H1, falling back to the file stem.
fn read_article(path: &Path, tags: Vec<String>) -> anyhow::Result<Article> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let title = pb_seo::text::first_h1(&body)
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();
    Ok(Article::new(title, body).with_tags(tags))
}

fn print_seo(result: &SeoAnalysisResult) {
    println!("SEO score: {}/{}", result.score, pb_seo::MAX_SCORE);
    for item in &result.items {
        println!(
            "  [{:<4}] {:>2}/{:<2} {} / {}: {}",
            item.status.as_str(), item.score, item.max_score, item.category, item.name, item.message
        );
    }
    if !result.suggestions.is_empty() {
        println!("Suggestions:");
        for suggestion in &result.suggestions {
            println!("  - {}", suggestion);
        }
    }
}

fn print_advice(advice: &SeoAdvice) {
    if advice.is_empty() {
        return;
    }
    println!("SEO advice for \"{}\":", advice.target_keyword);
    for item in &advice.items {
        println!("  [{}] {}", item.category, item.point);
        println!("      why: {}", item.reason);
        println!("      when editing: {}", item.edit_tip);
    }
    if !advice.summary.is_empty() {
        println!("  {}", advice.summary);
    }
}

fn print_summary(summary: &PublishSummary) {
    println!(
        "Published {}/{} ({} failed)",
        summary.success_count, summary.total, summary.failure_count
    );
    for success in &summary.successes {
        println!("  ✔ {}: {}", success.service_name, success.article_url);
    }
    for failure in &summary.failures {
        println!("  ✘ {}: {}", failure.service_name, failure.error_message);
    }
}

async fn publish(app: &App, article: Article, services: Vec<String>, status: PublishStatus) -> anyhow::Result<()> {
    let (tx, rx) = oneshot::channel();
    // Only one of the callbacks runs; both hold the sender.
    let ok_tx = Arc::new(Mutex::new(Some(tx)));
    let err_tx = ok_tx.clone();
    app.controller.publish(
        &article,
        &services,
        status,
        move |results| {
            if let Some(tx) = ok_tx.lock().ok().and_then(|mut tx| tx.take()) {
                let _ = tx.send(Ok(results));
            }
        },
        move |e| {
            if let Some(tx) = err_tx.lock().ok().and_then(|mut tx| tx.take()) {
                let _ = tx.send(Err(e));
            }
        },
    )?;

    let results = rx.await.context("background runner stopped before publishing finished")??;
    let summary = PublishController::summarize_results(&results);
    print_summary(&summary);
    if summary.all_failed() {
        bail!("every target failed");
    }
    Ok(())
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    if let Commands::Seo { file, keyword, title, meta, json } = &cli.command {
        let article = read_article(file, Vec::new())?;
        let title = title.clone().unwrap_or(article.title);
        let result = pb_seo::analyze_seo(&title, &article.body, keyword, meta);
        if *json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_seo(&result);
        }
        return Ok(());
    }

    if let Commands::Llm { command: LlmCommands::Check } = &cli.command {
        let model = pb_inference::models::create_model(&config.openai)?;
        info!("🧠 Checking chat model {}", model.name());
        if model.test_connection().await? {
            println!("{}: OK", model.name());
            return Ok(());
        }
        bail!("{} returned no answer", model.name());
    }

    if let Commands::Llm {
        command: LlmCommands::Generate { summary, keyword, audience, intent, blog_type, output },
    } = &cli.command
    {
        let model = pb_inference::models::create_model(&config.openai)?;
        let brief = ArticleBrief {
            blog_type_id: blog_type.clone(),
            summary: summary.clone(),
            seo: SeoMetadata {
                keyword: keyword.clone(),
                target_audience: audience.clone(),
                search_intent: intent.clone(),
            },
        };
        let (article, advice) = ArticleGenerator::new(model).generate(&brief).await?;
        match output {
            Some(path) => {
                std::fs::write(path, &article.body)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!("Wrote \"{}\" to {}", article.title, path.display());
            }
            None => println!("{}\n", article.body),
        }
        print_advice(&advice);
        return Ok(());
    }

    let app = App::init(config).await?;
    let outcome = match cli.command {
        Commands::Publish { file, services, draft, tags } => {
            let status = if draft { PublishStatus::Draft } else { PublishStatus::Publish };
            let article = read_article(&file, tags)?;
            publish(&app, article, services, status).await
        }
        Commands::Services { command } => match command {
            ServicesCommands::List => {
                for name in app.controller.available_services() {
                    println!("{}", name);
                }
                Ok(())
            }
            ServicesCommands::Test { name } => {
                if app.manager.test_connection(&name).await {
                    println!("{}: OK", name);
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("{}: connection failed", name))
                }
            }
        },
        Commands::History { command } => match command {
            HistoryCommands::List => {
                for record in app.storage.history.find_all_history().await? {
                    println!(
                        "{:>4}  {}  {:<16} {:<9} {}",
                        record.id.unwrap_or_default(),
                        record.published_at.format("%Y-%m-%d %H:%M"),
                        record.service_name,
                        record.status.as_str(),
                        record.article_url.as_deref().unwrap_or("-")
                    );
                }
                Ok(())
            }
            HistoryCommands::Delete { id } => {
                if !app.storage.history.delete_history(id).await? {
                    bail!("no history entry with id {}", id);
                }
                Ok(())
            }
        },
        Commands::Drafts { command } => match command {
            DraftsCommands::List => {
                for draft in app.storage.drafts.find_all_drafts().await? {
                    println!(
                        "{:>4}  {}  {}",
                        draft.id.unwrap_or_default(),
                        draft.updated_at.format("%Y-%m-%d %H:%M"),
                        draft.title
                    );
                }
                Ok(())
            }
            DraftsCommands::Save { file, tags } => {
                let article = read_article(&file, tags)?;
                let saved = app.storage.drafts.save_draft(&Draft::from_article(&article)).await?;
                println!("Saved draft {}", saved.id.unwrap_or_default());
                Ok(())
            }
            DraftsCommands::Delete { id } => {
                if !app.storage.drafts.delete_draft(id).await? {
                    bail!("no draft with id {}", id);
                }
                Ok(())
            }
        },
        Commands::Seo { .. } | Commands::Llm { .. } => Ok(()),
    };
    app.shutdown();
    outcome
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = AppConfig::load(&path).with_env_overrides();
    run(cli, config).await
}
