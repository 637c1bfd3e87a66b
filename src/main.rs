use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use shelfkeeper::config::{AppConfig, DEFAULT_CONFIG_PATH};
use shelfkeeper::holders::{step_progress, Category, CategoryFilter, CommunityHolder, Observable, ProfileHolder};
use shelfkeeper::utils::logger;
use shelfkeeper::{open_repository, Book, BookRepository};

#[derive(Parser)]
#[command(name = "shelfkeeper")]
#[command(about = "Personal reading shelf with Open Library search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the database
    Init,
    /// Show community discussions
    Community {
        /// Category filter, e.g. "recommendation"
        #[arg(short, long)]
        category: Option<String>,
    },
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that need an open store.
#[derive(Subcommand)]
enum StoreCommand {
    /// List shelf books, newest first
    Shelf,
    /// Search the catalog (or the shelf when the query is blank)
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// Add a book to the shelf
    Add {
        title: String,
        author: String,
        #[arg(short, long, default_value_t = 0.0)]
        rating: f64,
    },
    /// Set exact reading progress (0.0 - 1.0)
    Progress { id: i64, value: f64 },
    /// Advance reading progress by 10%
    Advance { id: i64 },
    /// Rate and review a book
    Rate {
        id: i64,
        rating: f64,
        #[arg(short, long, default_value = "")]
        review: String,
    },
    /// Remove a book from the store
    Remove { id: i64 },
    /// Reading statistics and goal progress
    Stats {
        /// Yearly reading goal
        #[arg(short, long)]
        goal: Option<i64>,
    },
    /// Insert the sample shelf when the store is empty
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init_command().await?,
        Commands::Community { category } => community_command(category)?,
        Commands::Store(command) => {
            let config = AppConfig::load().context("loading config")?;
            let repo = open_repository(&config).await?;
            run(command, &repo, &config).await?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("initializing shelfkeeper...");

    tokio::fs::create_dir_all("config").await?;
    let config = AppConfig::load()?;
    config.save(DEFAULT_CONFIG_PATH)?;
    info!("wrote {}", DEFAULT_CONFIG_PATH);

    let repo = open_repository(&config).await?;
    if repo.ensure_sample_data().await? {
        info!("sample shelf created");
    }

    info!("database ready at {}", config.storage.database_path);
    Ok(())
}

async fn run(command: StoreCommand, repo: &BookRepository, config: &AppConfig) -> Result<()> {
    match command {
        StoreCommand::Shelf => {
            print_books(&repo.shelf_books().await?);
        }
        StoreCommand::Search { query } => {
            let results = repo.search(&query).await?;
            if results.is_empty() {
                println!("No results");
            }
            print_books(&results);
        }
        StoreCommand::Add { title, author, rating } => {
            let id = repo.add_book(&title, &author, rating).await?;
            println!("added #{}", id);
        }
        StoreCommand::Progress { id, value } => {
            repo.update_progress(id, value).await?;
            print_book(repo, id).await?;
        }
        StoreCommand::Advance { id } => {
            let Some(book) = repo.book(id).await? else {
                println!("Book not found");
                return Ok(());
            };
            repo.update_progress(id, step_progress(book.progress)).await?;
            print_book(repo, id).await?;
        }
        StoreCommand::Rate { id, rating, review } => {
            repo.update_rating_and_review(id, rating, &review).await?;
            print_book(repo, id).await?;
        }
        StoreCommand::Remove { id } => {
            if repo.delete_book(id).await? {
                println!("removed #{}", id);
            } else {
                println!("Book not found");
            }
        }
        StoreCommand::Stats { goal } => {
            let profile = ProfileHolder::spawn(repo.clone(), config.profile.default_reading_goal);
            if let Some(goal) = goal {
                profile.update_reading_goal(goal);
            }
            profile.refresh_stats().await?;

            let state = profile.state();
            println!("total:       {}", state.total_books);
            println!("finished:    {}", state.finished_books);
            println!("in progress: {}", state.in_progress_books);
            println!(
                "goal:        {}/{} ({:.0}%)",
                state.finished_books,
                state.reading_goal,
                state.goal_progress() * 100.0
            );
        }
        StoreCommand::Seed => {
            if repo.ensure_sample_data().await? {
                println!("sample shelf created");
            } else {
                println!("store not empty, nothing seeded");
            }
        }
    }

    Ok(())
}

fn community_command(category: Option<String>) -> Result<()> {
    let board = CommunityHolder::new();
    if let Some(raw) = category {
        let category = Category::parse(&raw).with_context(|| format!("unknown category '{}'", raw))?;
        board.select_category(CategoryFilter::Only(category));
    }

    for post in board.state().visible() {
        println!(
            "[{}] {} - {} ({} replies, {} likes, {})",
            post.category, post.title, post.author, post.replies, post.likes, post.time_ago
        );
    }
    Ok(())
}

async fn print_book(repo: &BookRepository, id: i64) -> Result<()> {
    match repo.book(id).await? {
        Some(book) => print_books(&[book]),
        None => println!("Book not found"),
    }
    Ok(())
}

fn print_books(books: &[Book]) {
    for book in books {
        let id = if book.is_transient() {
            "-".to_string()
        } else {
            format!("#{}", book.id)
        };
        println!(
            "{:>5}  {} - {}  [{:.1}/5, {:.0}%]",
            id,
            book.title,
            book.author,
            book.rating,
            book.progress * 100.0
        );
        if !book.review.is_empty() {
            println!("       \"{}\"", book.review);
        }
    }
}
