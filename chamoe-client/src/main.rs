use anyhow::{anyhow, Result};
use chamoe::config::ClientConfig;
use chamoe::error::ClientError;
use chamoe::formatting::{format_relative, format_timestamp, wrap_content};
use chamoe::gateway::memory::InMemoryBackend;
use chamoe::gateway::ContentGateway;
use chamoe::logging::{self, LogConfig};
use chamoe::storage::FileTokenStore;
use chamoe::{
    FeedStateController, PageLoad, ProfileStateController, SessionContext, ThreadStateController,
    ToggleOutcome,
};
use chamoe_types::{Comment, Post, ProfileTab};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

const WRAP_WIDTH: usize = 72;

/// Chamoe - a social feed client running against the built-in demo backend
#[derive(Parser)]
#[command(name = "chamoe")]
#[command(about = "Browse the chamoe demo feed from the terminal")]
#[command(version)]
struct Cli {
    /// Directory holding the session token (defaults to ~/.chamoe)
    #[arg(long, env = "CHAMOE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the home feed
    Feed {
        /// Extra pages to load after the first
        #[arg(long, default_value_t = 0)]
        more: usize,
        /// Like a post before printing
        #[arg(long)]
        like: Vec<String>,
        /// Share a post before printing
        #[arg(long)]
        share: Vec<String>,
        /// Publish a new post first
        #[arg(long)]
        post: Option<String>,
    },
    /// Show a post with its comments
    Thread {
        post_id: String,
        /// Comment pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Like the post
        #[arg(long)]
        like: bool,
        /// Add a comment
        #[arg(long)]
        comment: Option<String>,
        /// Reply to a comment, prefixing the author's mention
        #[arg(long, requires = "comment")]
        reply_to: Option<String>,
        /// Delete one of your comments
        #[arg(long)]
        delete: Option<String>,
    },
    /// Show a user's profile
    Profile {
        username: String,
        /// Tab to show: posts or likes
        #[arg(long, default_value = "posts")]
        tab: String,
        /// Follow or unfollow the user
        #[arg(long)]
        follow: bool,
    },
    /// Sign in and remember the session
    Login { email: String, password: String },
    /// Create an account and sign in
    Signup {
        email: String,
        password: String,
        username: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
}

fn client_error(err: ClientError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn print_post(post: &Post) {
    println!(
        "[{}] {} (@{}) - {}",
        post.id,
        post.author.display_name,
        post.author.username,
        format_relative(&post.created_at)
    );
    println!("{}", wrap_content(&post.content, WRAP_WIDTH, "  "));
    println!(
        "  {} {} likes  {} {} shares  {} comments",
        if post.is_liked { "♥" } else { "♡" },
        post.likes,
        if post.is_shared { "↻" } else { "·" },
        post.shares,
        post.comments
    );
    println!();
}

fn print_comment(comment: &Comment) {
    println!(
        "  [{}] @{} - {}",
        comment.id,
        comment.author.username,
        format_relative(&comment.created_at)
    );
    println!("{}", wrap_content(&comment.content, WRAP_WIDTH, "    "));
    println!(
        "    {} {} likes",
        if comment.is_liked { "♥" } else { "♡" },
        comment.likes
    );
}

fn report_toggle(label: &str, outcome: ToggleOutcome) {
    match outcome {
        ToggleOutcome::Applied(counts) => println!("{}: now {} ({})", label, counts.active, counts.count),
        ToggleOutcome::Missing => println!("{}: not found in this view", label),
        ToggleOutcome::RolledBack(counts) => {
            println!("{}: not saved, reverted to {} ({})", label, counts.active, counts.count)
        }
    }
}

async fn run_feed(
    feed: &FeedStateController,
    more: usize,
    like: &[String],
    share: &[String],
    post: Option<&str>,
) -> Result<()> {
    feed.load_initial().await.map_err(client_error)?;
    for _ in 0..more {
        match feed.load_more().await.map_err(client_error)? {
            PageLoad::Loaded { .. } => {}
            _ => break,
        }
    }
    if let Some(content) = post {
        let created = feed.compose(content).await.map_err(client_error)?;
        println!("Posted {}", created.id);
    }
    for id in like {
        report_toggle(&format!("like {}", id), feed.toggle_like(id).await.map_err(client_error)?);
    }
    for id in share {
        report_toggle(&format!("share {}", id), feed.toggle_share(id).await.map_err(client_error)?);
    }

    let view = feed.snapshot().await;
    println!("== Feed ({} posts) ==\n", view.posts.len());
    for post in &view.posts {
        print_post(post);
    }
    if view.has_more {
        println!("(more posts available, use --more)");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_thread(
    thread: &ThreadStateController,
    post_id: &str,
    pages: usize,
    like: bool,
    comment: Option<&str>,
    reply_to: Option<&str>,
    delete: Option<&str>,
) -> Result<()> {
    thread.load(post_id).await.map_err(client_error)?;
    for _ in 0..pages {
        match thread.load_more().await.map_err(client_error)? {
            PageLoad::Loaded { .. } => {}
            _ => break,
        }
    }
    if like {
        report_toggle("like", thread.toggle_like().await.map_err(client_error)?);
    }
    if let Some(id) = delete {
        thread.delete_comment(id).await.map_err(client_error)?;
        println!("Deleted {}", id);
    }
    if let Some(content) = comment {
        let text = match reply_to {
            Some(id) => match thread.mention_for(id).await {
                Some(mention) => format!("{}{}", mention, content),
                None => return Err(anyhow!("No comment {} to reply to", id)),
            },
            None => content.to_string(),
        };
        let created = thread.submit_comment(&text).await.map_err(client_error)?;
        println!("Commented {}", created.id);
    }

    let view = thread.snapshot().await;
    if let Some(post) = &view.post {
        print_post(post);
    }
    println!("== Comments ({}) ==", view.comments.len());
    for comment in &view.comments {
        print_comment(comment);
    }
    if view.has_more_comments {
        println!("(more comments available, use --pages)");
    }
    Ok(())
}

async fn run_profile(
    profile: &ProfileStateController,
    username: &str,
    tab: ProfileTab,
    follow: bool,
) -> Result<()> {
    profile.load(username).await.map_err(client_error)?;
    if follow {
        report_toggle("follow", profile.toggle_follow().await.map_err(client_error)?);
    }
    if tab != ProfileTab::Posts {
        profile.select_tab(tab).await;
        profile.load_more().await.map_err(client_error)?;
    }

    let view = profile.snapshot().await;
    if let Some(p) = &view.profile {
        println!("{} (@{})", p.display_name, p.username);
        if let Some(bio) = &p.bio {
            println!("{}", wrap_content(bio, WRAP_WIDTH, "  "));
        }
        println!(
            "  {} followers  {} following  joined {}",
            p.followers_count,
            p.following_count,
            format_timestamp(&p.joined_at)
        );
        if profile.is_own_profile().await {
            println!("  (this is you)");
        } else if p.is_following {
            println!("  (following)");
        }
    }
    if let Some(error) = &view.error {
        println!("! {}", error);
    }
    println!("\n== {} ==\n", view.active_tab.as_str());
    for post in &view.posts {
        print_post(post);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file before reading configuration
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    let config = ClientConfig::load()?;
    let mut log_config = LogConfig::from_settings(&config.log)?;
    if cli.verbose {
        log_config.level = log::LevelFilter::Debug;
    }
    logging::init_logging(&log_config)?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => config.data_dir()?,
    };

    let backend = InMemoryBackend::seeded(config.page_size);
    let session = Arc::new(SessionContext::new(
        Arc::new(backend.session_gateway()),
        Arc::new(FileTokenStore::in_dir(&data_dir)),
    ));
    if let Err(e) = session.init().await {
        log::warn!(target: "session", "Continuing without a session: {}", e);
    }
    let content: Arc<dyn ContentGateway> = Arc::new(backend.content_gateway());
    let options = config.controller_options();

    match cli.command {
        Command::Feed {
            more,
            like,
            share,
            post,
        } => {
            let feed = FeedStateController::new(content, session, options);
            run_feed(&feed, more, &like, &share, post.as_deref()).await
        }
        Command::Thread {
            post_id,
            pages,
            like,
            comment,
            reply_to,
            delete,
        } => {
            let thread = ThreadStateController::new(content, session, options);
            run_thread(
                &thread,
                &post_id,
                pages,
                like,
                comment.as_deref(),
                reply_to.as_deref(),
                delete.as_deref(),
            )
            .await
        }
        Command::Profile {
            username,
            tab,
            follow,
        } => {
            let tab = ProfileTab::parse(&tab)
                .ok_or_else(|| anyhow!("Unknown tab '{}', expected posts or likes", tab))?;
            let profile = ProfileStateController::new(content, session, options);
            run_profile(&profile, &username, tab, follow).await
        }
        Command::Login { email, password } => {
            let user = session.login(&email, &password).await.map_err(client_error)?;
            println!("Signed in as {} (@{})", user.display_name, user.username);
            Ok(())
        }
        Command::Signup {
            email,
            password,
            username,
        } => {
            let user = session
                .signup(&email, &password, &username)
                .await
                .map_err(client_error)?;
            println!("Welcome, @{}", user.username);
            Ok(())
        }
        Command::Logout => {
            session.logout().await.map_err(client_error)?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match session.current_user().await {
                Some(user) => println!("{} (@{}) <{}>", user.display_name, user.username, user.email),
                None => println!("Not signed in"),
            }
            Ok(())
        }
    }
}
