use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use storyqa_core::config::{Config, Settings};
use storyqa_core::library::Library;
use storyqa_core::traits::Embedder;
use storyqa_core::types::{Category, DocumentId};
use storyqa_embed::default_embedder;
use storyqa_session::{ask, select_document, ExtractiveGenerator, Selection, Session};

#[derive(Parser, Debug)]
#[command(name = "storyqa", about = "Ask questions about books and movie scripts")]
struct Cli {
    /// Chunks retrieved per question.
    #[arg(long, global = true)]
    top_k: Option<usize>,
    /// Abort an index build after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Print the retrieved chunks with each answer.
    #[arg(long, global = true)]
    show_context: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the titles on one shelf, or on every shelf.
    Titles { category: Option<Category> },
    /// Answer a single question.
    Ask { category: Category, title: String, question: String },
    /// Read questions from stdin until `:quit`.
    Chat { category: Category, title: String },
}

struct App {
    session: Session,
    library: Library,
    embedder: Box<dyn Embedder>,
    generator: ExtractiveGenerator,
    show_context: bool,
}

impl App {
    fn select(&mut self, id: DocumentId) -> anyhow::Result<()> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        spinner.set_message(format!("Loading '{}'...", id.title));
        spinner.enable_steady_tick(Duration::from_millis(100));
        let result = select_document(&mut self.session, id.clone(), &self.library, self.embedder.as_ref());
        spinner.finish_and_clear();
        match result? {
            Selection::Built { chunks, elapsed } => {
                println!("'{}' loaded successfully in {:.2}s ({} chunks)", id.title, elapsed.as_secs_f64(), chunks);
            }
            Selection::Reused => println!("'{}' is already loaded", id.title),
        }
        match self.library.cover_path(&id) {
            Some(path) => println!("Cover: {}", path.display()),
            None => println!("Cover image not found for {}", id.title),
        }
        Ok(())
    }

    fn answer(&mut self, question: &str) -> anyhow::Result<String> {
        let reply = ask(&mut self.session, question, self.embedder.as_ref(), &self.generator)?;
        if self.show_context {
            for hit in &reply.context.hits {
                println!("--- chunk {} (score {:.3})", hit.chunk.sequence_index, hit.score);
                println!("{}", hit.chunk.text.trim());
            }
            println!("---");
        }
        Ok(reply.text)
    }
}

fn open_app(cli: &Cli) -> anyhow::Result<App> {
    let config = Config::load().context("loading configuration")?;
    let mut settings: Settings = config.settings()?;
    if let Some(k) = cli.top_k {
        settings.retrieval.top_k = k;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.retrieval.build_timeout_secs = Some(secs);
    }
    let library = Library::new(settings.library_root(config.base_dir()));
    tracing::debug!(root = %library.root().display(), "opened library");
    let embedder = default_embedder(&settings.embedding)?;
    Ok(App {
        session: Session::new(settings)?,
        library,
        embedder,
        generator: ExtractiveGenerator::default(),
        show_context: cli.show_context,
    })
}

fn chat(app: &mut App) -> anyhow::Result<()> {
    println!("Ask a question, ':select <book|movie> <title>' to switch, ':quit' to leave.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" {
            break;
        }
        if let Some(rest) = line.strip_prefix(":select") {
            let Some((category, title)) = rest.trim().split_once(' ') else {
                println!("usage: :select <book|movie> <title>");
                continue;
            };
            match category.parse::<Category>() {
                Ok(category) => {
                    if let Err(e) = app.select(DocumentId::new(category, title.trim())) {
                        println!("An error occurred: {e}");
                    }
                }
                Err(e) => println!("{e}"),
            }
            continue;
        }
        match app.answer(line) {
            Ok(reply) => println!("{reply}"),
            Err(e) => println!("An error occurred: {e}"),
        }
    }
    app.session.end();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Titles { category } => {
            let config = Config::load().context("loading configuration")?;
            let settings = config.settings()?;
            let library = Library::new(settings.library_root(config.base_dir()));
            let shelves = match category {
                Some(category) => vec![*category],
                None => Category::ALL.to_vec(),
            };
            for category in shelves {
                let titles = library.titles(category)?;
                if titles.is_empty() {
                    println!("No {category} titles under {}", library.root().display());
                }
                for title in titles {
                    println!("{category}: {title}");
                }
            }
        }
        Command::Ask { category, title, question } => {
            let mut app = open_app(&cli)?;
            app.select(DocumentId::new(*category, title.clone()))?;
            println!("{}", app.answer(question)?);
        }
        Command::Chat { category, title } => {
            let mut app = open_app(&cli)?;
            if let Err(e) = app.select(DocumentId::new(*category, title.clone())) {
                println!("An error occurred: {e}");
            }
            chat(&mut app)?;
        }
    }
    Ok(())
}
