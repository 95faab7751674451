use anyhow::{bail, Context};
use clap::Parser;
use inquire::error::InquireResult;
use inquire::list_option::ListOption;
use inquire::InquireError;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod clipboard;
mod config;
mod display;
mod semantic;
#[cfg(test)]
mod tests;

use app::{App, AppFactory};
use display::Renderer;
use semantic::{EmbeddingModel, Freshness, Searcher};

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    // logs go to stderr so stdout stays clean for --json
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        cli::Command::Copy { path } => clipboard::copy_image(&path),

        cli::Command::Index {} => {
            let app = create_app()?;
            let entries = app.rebuild()?;
            println!(
                "{} images indexed into {}",
                entries,
                app.storage().dir().display()
            );
            Ok(())
        }

        cli::Command::Check {} => {
            let app = create_app()?;
            match app.check()? {
                Freshness::Fresh { entries } => println!("Index is up to date ({entries} entries)"),
                Freshness::Missing => println!("No index found, run `pictsearch index`"),
                Freshness::Unreadable(e) => println!("Index metadata is unreadable: {e}"),
                Freshness::Stale { on_disk, indexed } => {
                    println!("Index is stale: {on_disk} images on disk, {indexed} indexed")
                }
            }
            Ok(())
        }

        cli::Command::Search {
            query,
            top_k,
            threshold,
            json,
        } => {
            let app = create_app()?;
            let sem = &app.config().semantic_search;
            let top_k = resolve_top_k(top_k, sem.top_k)?;
            let threshold = resolve_threshold(threshold, sem.min_score)?;

            let searcher = app.open_searcher()?;
            let results = searcher.search(&query, top_k, threshold);

            let renderer = Renderer::new(app.config().display.clone());
            if json {
                println!("{}", renderer.format_json(&query, &results)?);
            } else {
                println!("{}", renderer.format_human(&query, &results));
            }
            Ok(())
        }

        cli::Command::Interactive { top_k } => {
            let app = create_app()?;
            let top_k = resolve_top_k(top_k, app.config().semantic_search.top_k)?;
            interactive(&app, top_k)
        }
    }
}

fn create_app() -> anyhow::Result<App> {
    let paths = AppFactory::get_paths()?;
    AppFactory::create_app(&paths)
}

fn resolve_top_k(flag: Option<usize>, configured: usize) -> anyhow::Result<usize> {
    match flag {
        Some(0) => bail!("--top-k must be greater than 0"),
        Some(k) => Ok(k),
        None => Ok(configured),
    }
}

fn resolve_threshold(flag: Option<f32>, configured: Option<f32>) -> anyhow::Result<Option<f32>> {
    match flag {
        Some(t) if !(-1.0..=1.0).contains(&t) => {
            bail!("--threshold must be between -1.0 and 1.0, got {t}")
        }
        Some(t) => Ok(Some(t)),
        None => Ok(configured),
    }
}

/// Query loop: load once, then prompt until Esc or Ctrl-C.
fn interactive(app: &App, top_k: usize) -> anyhow::Result<()> {
    let searcher = app.open_searcher()?;
    let renderer = Renderer::new(app.config().display.clone());
    let threshold = app.config().semantic_search.min_score;

    log::info!("{} images ready, Esc or Ctrl-C to quit", searcher.indexed_count());

    if let Some(query) = &app.config().display.initial_query {
        if !show_and_pick(&searcher, &renderer, query, top_k, threshold)? {
            return Ok(());
        }
    }

    loop {
        let query = match inquire::Text::new("Search:").prompt() {
            Ok(query) => query,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                return Ok(())
            }
            Err(err) => bail!("An error occurred: {}", err),
        };

        if query.trim().is_empty() {
            log::warn!("Please enter something to search for");
            continue;
        }

        if !show_and_pick(&searcher, &renderer, &query, top_k, threshold)? {
            return Ok(());
        }
    }
}

/// Print results and offer to copy one. Returns false when the user quits.
fn show_and_pick(
    searcher: &Searcher<EmbeddingModel>,
    renderer: &Renderer,
    query: &str,
    top_k: usize,
    threshold: Option<f32>,
) -> anyhow::Result<bool> {
    let results = searcher.search(query, top_k, threshold);
    println!("{}", renderer.format_human(query, &results));

    if results.is_empty() {
        return Ok(true);
    }

    let labels: Vec<String> = results.iter().map(|r| renderer.label(r)).collect();
    let pick = pick_from(inquire::Select::new("Copy to clipboard (Esc to skip):", labels).raw_prompt())?;

    match pick {
        Pick::Quit => return Ok(false),
        Pick::Skip => {}
        Pick::Copy(index) => {
            let path = &results[index].path;
            if let Err(e) = clipboard::copy_image(path).with_context(|| path.display().to_string()) {
                log::error!("{:#}", e);
            }
        }
    }

    Ok(true)
}

/// What the user chose in the copy prompt.
#[derive(Debug, PartialEq)]
enum Pick {
    Copy(usize),
    Skip,
    Quit,
}

/// Esc skips the copy, Ctrl-C ends the session.
fn pick_from(answer: InquireResult<ListOption<String>>) -> anyhow::Result<Pick> {
    match answer {
        Ok(option) => Ok(Pick::Copy(option.index)),
        Err(InquireError::OperationCanceled) => Ok(Pick::Skip),
        Err(InquireError::OperationInterrupted) => Ok(Pick::Quit),
        Err(err) => bail!("An error occurred: {}", err),
    }
}

#[cfg(test)]
mod main_tests {
    use super::*;

    #[test]
    fn test_pick_from_select_answer() {
        let answer = Ok(ListOption::new(2, "[0.87] 你好世界".to_string()));
        assert_eq!(pick_from(answer).unwrap(), Pick::Copy(2));
    }

    #[test]
    fn test_escape_skips_and_interrupt_quits() {
        assert_eq!(pick_from(Err(InquireError::OperationCanceled)).unwrap(), Pick::Skip);
        assert_eq!(
            pick_from(Err(InquireError::OperationInterrupted)).unwrap(),
            Pick::Quit
        );
        assert!(pick_from(Err(InquireError::NotTTY)).is_err());
    }

    #[test]
    fn test_resolve_flags() {
        assert_eq!(resolve_top_k(None, 6).unwrap(), 6);
        assert!(resolve_top_k(Some(0), 6).is_err());
        assert_eq!(resolve_threshold(None, Some(0.3)).unwrap(), Some(0.3));
        assert!(resolve_threshold(Some(1.5), None).is_err());
    }
}
