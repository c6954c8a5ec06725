use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{CatalogStore, DataIndex};
use ml_client::RankingClient;
use rand::seq::IndexedRandom;
use server::{EngineConfig, RecommendationOrchestrator, RecommendationResponse, ServedFrom};
use sources::{select_strategy, CandidateSource, TrainOutcome};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

/// vidrec - Video Recommendation Engine
#[derive(Parser)]
#[command(name = "vidrec")]
#[command(about = "Video recommendations from a ranking service with content fallback", long_about = None)]
struct Cli {
    /// Directory holding users.json and videos.json
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Engine configuration (YAML); defaults apply when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ranking service base URL, overriding the config
    #[arg(long)]
    ranking_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get video recommendations for a user
    Recommend {
        #[arg(long)]
        username: String,

        /// Number of recommendations (default from config)
        #[arg(long)]
        count: Option<usize>,

        /// Exclude everything already served in this session
        #[arg(long)]
        refresh: bool,

        /// Consecutive requests in one session; all but the first are refreshes
        #[arg(long, default_value = "1")]
        rounds: usize,

        /// Print the responses as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user's profile and watch history
    User {
        #[arg(long)]
        username: String,
    },

    /// Search the catalog by tag, title or description
    Search {
        /// Case-insensitive substring
        #[arg(long)]
        pattern: String,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Refit the ranking model on the current corpus
    Train,

    /// Show what the ranking model was last trained on
    Status,

    /// Fire concurrent requests for random users and report latency
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = cli.ranking_url {
        config.ranking.url = url;
    }

    println!("Loading catalog from {}...", cli.data_dir.display());
    let start = Instant::now();
    let data_index = Arc::new(
        DataIndex::load_from_files(&cli.data_dir).context("Failed to load users and videos")?,
    );
    let (users, videos) = data_index.counts();
    println!(
        "{} Loaded {} users and {} videos in {:?}",
        "✓".green(),
        users,
        videos,
        start.elapsed()
    );

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            username,
            count,
            refresh,
            rounds,
            json,
        } => {
            let orchestrator = build_orchestrator(data_index, &config)?;
            let count = count.unwrap_or(orchestrator.default_count());
            handle_recommend(&orchestrator, &username, count, refresh, rounds, json).await?
        }
        Commands::User { username } => handle_user(&data_index, &username)?,
        Commands::Search { pattern, limit } => handle_search(&data_index, &pattern, limit).await?,
        Commands::Train => handle_train(&build_orchestrator(data_index, &config)?).await?,
        Commands::Status => handle_status(&build_orchestrator(data_index, &config)?).await?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => {
            let orchestrator = build_orchestrator(data_index.clone(), &config)?;
            handle_benchmark(&data_index, orchestrator, requests, concurrent).await?
        }
    }

    Ok(())
}

fn build_orchestrator(
    data_index: Arc<DataIndex>,
    config: &EngineConfig,
) -> Result<RecommendationOrchestrator> {
    // The client's own deadline is a backstop; the orchestrator enforces
    // the per-call timeouts.
    let client_timeout = config
        .ranking
        .recommend_timeout()
        .max(config.ranking.training_timeout());
    let client = RankingClient::new(config.ranking.url.clone(), client_timeout)
        .context("Failed to build ranking client")?;
    info!(
        "Ranking calls time out after {:?} (recommend) and {:?} (train) at {}",
        config.ranking.recommend_timeout(),
        config.ranking.training_timeout(),
        client.service_address()
    );

    Ok(RecommendationOrchestrator::new(
        data_index.clone(),
        data_index,
        Arc::new(client),
        config,
    ))
}

/// Handle the 'recommend' command
async fn handle_recommend(
    orchestrator: &RecommendationOrchestrator,
    username: &str,
    count: usize,
    refresh: bool,
    rounds: usize,
    json: bool,
) -> Result<()> {
    let mut responses = Vec::with_capacity(rounds);
    for round in 0..rounds.max(1) {
        let refresh = refresh || round > 0;
        let response = orchestrator.recommend(username, count, refresh).await?;
        if !json {
            print_recommendations(round + 1, refresh, &response);
        }
        responses.push(response);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&responses)?);
    } else if responses.len() > 1 {
        let distinct: HashSet<&str> = responses
            .iter()
            .flat_map(|r| r.items.iter().map(|item| item.video_id()))
            .collect();
        let served: usize = responses.iter().map(|r| r.items.len()).sum();
        println!(
            "{} {} videos served over {} rounds, {} distinct",
            "Σ".cyan(),
            served,
            responses.len(),
            distinct.len()
        );
    }
    Ok(())
}

/// Handle the 'user' command
fn handle_user(data_index: &DataIndex, username: &str) -> Result<()> {
    let user = data_index
        .get_user(username)
        .ok_or_else(|| anyhow!("User {} not found", username))?;

    println!("{}", format!("User: {}", user.username).bold().blue());
    if let Some(age) = user.age {
        println!("{}Age: {}", "• ".green(), age);
    }
    let interests = if user.interests.is_empty() {
        "(none)".to_string()
    } else {
        user.interests.join(", ")
    };
    println!("{}Interests: {}", "• ".green(), interests);
    println!("{}Strategy: {:?}", "• ".green(), select_strategy(user));

    println!("{}Watch events: {}", "• ".cyan(), user.watch_history.len());
    let corrupt = user.corrupt_history_count();
    if corrupt > 0 {
        println!("{}Corrupt watch events: {}", "• ".red(), corrupt);
    }
    println!("{}Liked videos: {}", "• ".cyan(), user.liked_videos.len());

    let mut recent: Vec<_> = user.valid_watch_history().collect();
    recent.sort_by_key(|event| std::cmp::Reverse(event.watched_at));
    println!("Recently watched:");
    for event in recent.iter().take(10) {
        let id = event.valid_video_id().unwrap_or_default();
        let title = event
            .title
            .as_deref()
            .or_else(|| data_index.get_video(id).map(|v| v.title.as_str()))
            .unwrap_or("(untitled)");
        let when = event
            .watched_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown time".to_string());
        println!("  - {} [{}] {}", title, id, when.dimmed());
    }
    Ok(())
}

/// Handle the 'search' command
async fn handle_search(data_index: &DataIndex, pattern: &str, limit: usize) -> Result<()> {
    let matches = data_index
        .find_by_tags_or_title(&[pattern.to_string()], &HashSet::new(), limit)
        .await
        .context("Catalog search failed")?;

    println!("{}", format!("Search results for '{}':", pattern).bold().blue());
    if matches.is_empty() {
        println!("  (no matches)");
    }
    for item in &matches {
        println!(
            "{}: {} [{}]{}",
            item.video_id,
            item.title,
            item.tags.join(", "),
            item.channel
                .channel_title
                .as_deref()
                .map(|c| format!(" by {}", c))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Handle the 'train' command
async fn handle_train(orchestrator: &RecommendationOrchestrator) -> Result<()> {
    let start = Instant::now();
    match orchestrator.train_ranking_model().await? {
        TrainOutcome::Trained {
            users,
            videos,
            message,
        } => println!(
            "{} Trained on {} users and {} videos in {:?}{}",
            "✓".green(),
            users,
            videos,
            start.elapsed(),
            message.map(|m| format!(": {}", m)).unwrap_or_default()
        ),
        TrainOutcome::Skipped => println!(
            "{} Skipped: no user has a valid watch history",
            "!".yellow()
        ),
    }
    Ok(())
}

/// Handle the 'status' command
async fn handle_status(orchestrator: &RecommendationOrchestrator) -> Result<()> {
    let status = orchestrator.ranking_status().await?;
    println!("{}", "Ranking model:".bold().blue());
    println!("{}Trained: {}", "• ".green(), status.trained);
    println!(
        "{}Last trained: {}",
        "• ".green(),
        status.last_trained.as_deref().unwrap_or("never")
    );
    println!("{}Users: {}", "• ".cyan(), status.users_count);
    println!("{}Videos: {}", "• ".cyan(), status.videos_count);
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    data_index: &DataIndex,
    orchestrator: RecommendationOrchestrator,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    let usernames: Vec<String> = data_index.users().map(|u| u.username.clone()).collect();
    if usernames.is_empty() || requests == 0 {
        return Err(anyhow!("Nothing to benchmark"));
    }

    let picks: Vec<String> = {
        let mut rng = rand::rng();
        (0..requests)
            .filter_map(|_| usernames.choose(&mut rng).cloned())
            .collect()
    };

    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall = Instant::now();
    let mut handles = vec![];
    for username in picks {
        let orchestrator = orchestrator.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            let count = orchestrator.default_count();
            let response = orchestrator.recommend(&username, count, true).await?;
            Ok::<_, anyhow::Error>((start.elapsed(), response.served_from))
        }));
    }

    let mut timings: Vec<Duration> = vec![];
    let mut paths: BTreeMap<&'static str, usize> = BTreeMap::new();
    for handle in handles {
        let (elapsed, served_from) = handle.await??;
        timings.push(elapsed);
        *paths.entry(served_label(served_from)).or_default() += 1;
    }
    let total_time = wall.elapsed();

    timings.sort();
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;
    let percentile = |p: f64| timings[((timings.len() - 1) as f64 * p) as usize];

    println!("Benchmark results:");
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        timings.len() as f64 / total_time.as_secs_f64()
    );
    for (path, n) in &paths {
        println!("Served via {}: {}", path, n);
    }

    Ok(())
}

fn served_label(served_from: ServedFrom) -> &'static str {
    match served_from {
        ServedFrom::CacheHit => "session cache",
        ServedFrom::Ranking => "ranking service",
        ServedFrom::RankingFallback => "content fallback (ranking unavailable)",
        ServedFrom::ColdStartFallback => "content fallback (cold start)",
        ServedFrom::NothingRequested => "nothing requested",
    }
}

/// Helper function to format and print one response
fn print_recommendations(round: usize, refresh: bool, response: &RecommendationResponse) {
    let via = served_label(response.served_from);
    println!(
        "{}",
        format!(
            "Round {}{} for {}: {} videos via {}",
            round,
            if refresh { " (refresh)" } else { "" },
            response.username,
            response.items.len(),
            via
        )
        .bold()
        .blue()
    );

    for (i, rec) in response.items.iter().enumerate() {
        let source = match rec.source {
            CandidateSource::Ranking => "ranked".green(),
            CandidateSource::Interest => "interest".cyan(),
            CandidateSource::Random => "random".yellow(),
        };
        let tags = if rec.item.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", rec.item.tags.join(", "))
        };
        println!(
            "{}. {} ({}){} - {}",
            (i + 1).to_string().green(),
            rec.item.title,
            rec.video_id(),
            tags,
            source
        );
    }
}
