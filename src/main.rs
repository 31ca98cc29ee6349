mod app;
mod config;
mod extract;
mod history;
mod llm;
mod retriever;
mod search;
mod utils;
mod vector_db;
mod wordcloud;

use anyhow::Result;
use app::App;
use clap::{Parser, Subcommand};
use config::AppConfig;
use history::HistoryLog;
use llm::{AnswerGenerator, LLM};
use log::{error, info};
use retriever::Retriever;
use search::{DuckDuckGo, WebSearch};
use std::io::Write;
use std::path::PathBuf;
use vector_db::DocumentStore;

#[derive(Parser)]
#[command(name = "ollama-rag", about = "RAG system with Ollama", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Show the welcome page
    Home,
    /// Generate a word cloud for every stored document
    Wordcloud,
    /// Upload PDF or TXT files into the collection
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a question
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// View saved documents
    Docs,
}

const MENU: &str = "\
Choose an action:
  1) Home Page
  2) Show Word Cloud
  3) Upload and Add Document
  4) Ask Ollama a Question
  5) View Saved Documents";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let mut store = DocumentStore::open(config.collection_dir(), &config.collection)?;
    info!(
        "Using collection '{}' ({}) at {:?}",
        store.name(),
        store.description(),
        store.path()
    );

    let llm = LLM::new(config.llm.clone())?;
    info!("Answering with Ollama model '{}'", llm.model());
    let retriever = Retriever::new(llm, DuckDuckGo::new(config.search_results)?);
    let app = App::new(retriever, HistoryLog::new(config.history_path()), config.wordcloud_dir.clone());

    let result = match cli.command {
        Some(command) => run_command(&app, &mut store, command).await,
        None => run_menu(&app, &mut store).await,
    };

    let closed = store.close();
    finish(result, closed)
}

/// Reports the command's error first; a close failure after it is only logged.
fn finish(result: Result<()>, closed: Result<()>) -> Result<()> {
    match (result, closed) {
        (Err(e), Err(close_err)) => {
            error!("Failed to close the collection: {close_err:#}");
            Err(e)
        }
        (result, closed) => result.and(closed),
    }
}

#[derive(Debug, PartialEq)]
enum MenuAction {
    Run(Command),
    Skip,
    Quit,
}

/// Maps one menu selection to an action, reading follow-up input (file path
/// or question) through `next_line`. `next_line` returns `None` on EOF.
fn menu_action(mut next_line: impl FnMut(&str) -> Result<Option<String>>) -> Result<MenuAction> {
    let Some(choice) = next_line("> ")? else {
        return Ok(MenuAction::Quit);
    };

    let command = match choice.as_str() {
        "" => return Ok(MenuAction::Skip),
        "q" | "quit" | "exit" => return Ok(MenuAction::Quit),
        "1" => Command::Home,
        "2" => Command::Wordcloud,
        "3" => match next_line("Choose a PDF or TXT file: ")? {
            None => return Ok(MenuAction::Quit),
            Some(path) if path.is_empty() => return Ok(MenuAction::Skip),
            Some(path) => Command::Upload {
                files: vec![PathBuf::from(path)],
            },
        },
        "4" => match next_line("Ask a question: ")? {
            None => return Ok(MenuAction::Quit),
            Some(query) if query.is_empty() => return Ok(MenuAction::Skip),
            Some(query) => Command::Ask { query: vec![query] },
        },
        "5" => Command::Docs,
        other => {
            println!("Unknown choice {other:?}");
            return Ok(MenuAction::Skip);
        }
    };
    Ok(MenuAction::Run(command))
}

async fn run_command<G, S>(app: &App<G, S>, store: &mut DocumentStore, command: Command) -> Result<()>
where
    G: AnswerGenerator,
    S: WebSearch,
{
    match command {
        Command::Home => app.home(),
        Command::Wordcloud => {
            app.show_word_clouds(store)?;
        }
        Command::Upload { files } => {
            app.upload(store, &files);
        }
        Command::Ask { query } => {
            app.ask(store, &query.join(" ")).await?;
        }
        Command::Docs => app.view_documents(store),
    }
    Ok(())
}

/// Interactive loop over the five screens until EOF or `q`.
async fn run_menu<G, S>(app: &App<G, S>, store: &mut DocumentStore) -> Result<()>
where
    G: AnswerGenerator,
    S: WebSearch,
{
    loop {
        println!("\n{MENU}");
        let command = match menu_action(prompt)? {
            MenuAction::Run(command) => command,
            MenuAction::Skip => continue,
            MenuAction::Quit => break,
        };

        if let Err(e) = run_command(app, store, command).await {
            eprintln!("Error: {e:#}");
        }
    }

    Ok(())
}

/// Reads one trimmed line from stdin; `None` on EOF.
fn prompt(label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    fn action_for(lines: &[&str]) -> MenuAction {
        let mut input: VecDeque<String> = lines.iter().map(|l| l.to_string()).collect();
        menu_action(|_label| Ok(input.pop_front())).unwrap()
    }

    #[test]
    fn test_menu_choices_map_to_the_five_screens() {
        assert_eq!(action_for(&["1"]), MenuAction::Run(Command::Home));
        assert_eq!(action_for(&["2"]), MenuAction::Run(Command::Wordcloud));
        assert_eq!(
            action_for(&["3", "notes.pdf"]),
            MenuAction::Run(Command::Upload {
                files: vec![PathBuf::from("notes.pdf")]
            })
        );
        assert_eq!(
            action_for(&["4", "what is a trait?"]),
            MenuAction::Run(Command::Ask {
                query: vec!["what is a trait?".to_string()]
            })
        );
        assert_eq!(action_for(&["5"]), MenuAction::Run(Command::Docs));
    }

    #[test]
    fn test_menu_skips_empty_and_unknown_input() {
        assert_eq!(action_for(&[""]), MenuAction::Skip);
        assert_eq!(action_for(&["3", ""]), MenuAction::Skip);
        assert_eq!(action_for(&["4", ""]), MenuAction::Skip);
        assert_eq!(action_for(&["9"]), MenuAction::Skip);
    }

    #[test]
    fn test_menu_quits_on_eof_or_q() {
        assert_eq!(action_for(&[]), MenuAction::Quit);
        assert_eq!(action_for(&["q"]), MenuAction::Quit);
        assert_eq!(action_for(&["exit"]), MenuAction::Quit);
        assert_eq!(action_for(&["3"]), MenuAction::Quit);
        assert_eq!(action_for(&["4"]), MenuAction::Quit);
    }

    #[test]
    fn test_menu_propagates_read_errors() {
        assert!(menu_action(|_label| Err(anyhow!("stdin closed"))).is_err());
    }

    #[test]
    fn test_finish_keeps_command_error_over_close_error() {
        let err = finish(Err(anyhow!("ask failed")), Err(anyhow!("disk full"))).unwrap_err();
        assert_eq!(err.to_string(), "ask failed");

        let err = finish(Ok(()), Err(anyhow!("disk full"))).unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        assert!(finish(Ok(()), Ok(())).is_ok());
    }
}
