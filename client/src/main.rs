//! Shelf - command-line book catalog with optimistic remote mirroring.

use clap::{Args, Parser, Subcommand};
use shelf_client::{
    Bootstrap, CatalogService, Config, Controller, FormInput, Intent, MockApi, Notice,
    PresentationSink, TextSink,
};
use shelf_engine::BookId;
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shelf - manage a small book catalog.
#[derive(Debug, Parser)]
#[command(name = "shelf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Remote collection URL.
    #[arg(long, env = "SHELF_API_URL")]
    api_url: Option<String>,

    /// Directory holding the catalog slot.
    #[arg(long, env = "SHELF_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show a page of books, or search titles.
    List {
        /// One-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Case-insensitive title substring.
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a book.
    Add(BookArgs),
    /// Change fields of a book.
    Edit {
        id: String,
        #[command(flatten)]
        fields: BookArgs,
    },
    /// Delete a book.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Replace the catalog with a fresh seed from the remote.
    Refresh,
    /// Run the mock placeholder API.
    ServeMock {
        /// Answer every POST, PUT and DELETE with 500.
        #[arg(long)]
        fail_mutations: bool,
        /// Number of posts served.
        #[arg(long, default_value_t = shelf_client::mock::DEFAULT_POST_COUNT)]
        posts: u64,
    },
}

#[derive(Debug, Args)]
struct BookArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    year: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl BookArgs {
    /// Overlay the given fields on `form`.
    fn apply(self, mut form: FormInput) -> FormInput {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(author) = self.author {
            form.author = author;
        }
        if let Some(year) = self.year {
            form.year = year;
        }
        if let Some(genre) = self.genre {
            form.genre = genre;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        form
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelf_client=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    if let Commands::ServeMock {
        fail_mutations,
        posts,
    } = cli.command
    {
        let api = MockApi::new(posts);
        api.set_failing(fail_mutations);
        let addr = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        api.serve(listener).await?;
        return Ok(());
    }

    let service = Arc::new(CatalogService::from_config(&config)?);
    let mut controller = Controller::new(Arc::clone(&service), TextSink::new(io::stdout()));

    let bootstrap = service.initialize().await?;
    if let Bootstrap::Unavailable(reason) = bootstrap {
        controller
            .sink_mut()
            .notify(&Notice::error(format!("Could not load books: {reason}")));
    }

    match cli.command {
        Commands::List { page, search } => match search {
            Some(term) => controller.handle(Intent::Search(term)).await,
            None => controller.handle(Intent::GoToPage(page)).await,
        },
        Commands::Add(fields) => {
            let form = fields.apply(FormInput::default());
            controller.handle(Intent::Submit(form)).await;
        }
        Commands::Edit { id, fields } => {
            let id = parse_id(&id);
            controller.handle(Intent::Edit(id)).await;
            if service.edit_target().await.is_some() {
                let form = fields.apply(controller.form().clone());
                controller.handle(Intent::Submit(form)).await;
            }
        }
        Commands::Delete { id, yes } => {
            let id = parse_id(&id);
            let confirmed = yes || confirm(&format!("Delete book {id}?"))?;
            controller.handle(Intent::Delete { id, confirmed }).await;
        }
        Commands::Refresh => controller.handle(Intent::Refresh).await,
        Commands::ServeMock { .. } => {}
    }

    Ok(())
}

fn parse_id(raw: &str) -> BookId {
    raw.parse().unwrap_or_else(|never| match never {})
}

fn confirm(question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
