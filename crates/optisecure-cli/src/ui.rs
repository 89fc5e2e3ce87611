//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, BufRead, IsTerminal, Write};

use optisecure_core::{FeedbackStats, Result, SearchHit};

use crate::Answer;

const PROMPT: &str = "optisecure>";

/// Display startup banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(40);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));
    let padded = |text: &str| {
        let fill = banner_width.saturating_sub(text.chars().count() + 4);
        format!("│  {}{}│", text, " ".repeat(fill))
    };

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());
    println!("{}", padded("OptiSecure - Assistant assurance").blue().bold());
    println!("{}", empty_line.blue());

    let feature_lines = [
        "Questions en langage naturel sur vos contrats",
        "Réponses fondées sur les documents indexés",
        "",
        concat!("v", env!("CARGO_PKG_VERSION"), " • Powered by Gemini"),
    ];

    for line in feature_lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
        } else {
            println!("{}", padded(line).blue());
        }
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "💡 Tip: Ask a question about your insurance documents, or 'help' for commands".dimmed()
    );
    println!();
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question about the indexed documents", "question".green());
    println!("  {} - Show the passages closest to a query", "search <query>".green());
    println!("  {} - Show feedback statistics", "stats".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  Quelles sont les exclusions de garantie ?");
    println!("  search franchise");
}

/// Handle input with question history navigation.
///
/// Returns `None` once input is exhausted: end of piped input, or Ctrl-D on
/// an empty line and Ctrl-C in a terminal.
pub async fn handle_input_with_history(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        return read_piped_line(&mut io::stdin().lock(), history);
    }

    enable_raw_mode()?;
    let result = read_line_raw(history);
    disable_raw_mode()?;
    println!();

    let input = result?;
    if let Some(line) = input.as_ref().filter(|line| !line.is_empty()) {
        history.push(line.clone());
    }
    Ok(input)
}

/// Read one trimmed line from non-interactive input, `None` at end of input
pub fn read_piped_line(
    reader: &mut impl BufRead,
    history: &mut Vec<String>,
) -> Result<Option<String>> {
    let mut input = String::new();
    if reader.read_line(&mut input)? == 0 {
        return Ok(None);
    }

    let input = input.trim().to_string();
    if !input.is_empty() {
        history.push(input.clone());
    }
    Ok(Some(input))
}

fn read_line_raw(history: &[String]) -> Result<Option<String>> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    redraw(&input)?;
    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            KeyCode::Enter => return Ok(Some(input.trim().to_string())),
            KeyCode::Esc => return Ok(Some(String::new())),
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Char('d')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) && input.is_empty() =>
            {
                return Ok(None);
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up if !history.is_empty() => {
                let index = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(index);
                input = history[index].clone();
            }
            KeyCode::Down => match history_index {
                Some(idx) if idx + 1 < history.len() => {
                    history_index = Some(idx + 1);
                    input = history[idx + 1].clone();
                }
                Some(_) => {
                    history_index = None;
                    input.clear();
                }
                None => {}
            },
            _ => continue,
        }
        redraw(&input)?;
    }
}

fn redraw(input: &str) -> Result<()> {
    print!(
        "\r{}\r{} {}",
        " ".repeat(input.chars().count() + PROMPT.len() + 8),
        PROMPT.green().bold(),
        input
    );
    io::stdout().flush()?;
    Ok(())
}

/// Interpret an answer to the helpfulness question
pub fn parse_helpful(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" | "o" | "oui" | "👍" => Some(true),
        "n" | "no" | "non" | "👎" => Some(false),
        _ => None,
    }
}

/// Ask whether the last answer helped; `None` when skipped
pub fn prompt_feedback() -> Result<Option<bool>> {
    print!("{} Was this helpful? [y/n/Enter to skip]: ", "❓".cyan());
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(parse_helpful(&response))
}

/// One line per hit: rank, source, score and the start of the passage
pub fn format_sources(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let preview: String = hit.text.chars().take(80).collect();
            let ellipsis = if hit.text.chars().count() > 80 { "…" } else { "" };
            format!(
                "{}. [{}] ({:.3}) {}{}",
                i + 1,
                hit.metadata.source,
                hit.score,
                preview.replace('\n', " "),
                ellipsis
            )
        })
        .collect()
}

pub fn print_answer(answer: &Answer) {
    println!();
    println!("{}", answer.text);
    println!();
    if !answer.hits.is_empty() {
        println!("{}", "Sources:".bold());
        for line in format_sources(&answer.hits) {
            println!("  {}", line.dimmed());
        }
        println!();
    }
}

pub fn format_statistics(stats: &FeedbackStats) -> Vec<String> {
    let mut lines = vec![
        format!("Positive: {}", stats.positive),
        format!("Negative: {}", stats.negative),
        format!("Total:    {}", stats.total()),
    ];
    match stats.satisfaction_rate() {
        Some(rate) => lines.push(format!("Satisfaction: {:.1}%", rate)),
        None => lines.push("No feedback yet".to_string()),
    }
    lines
}

pub fn print_statistics(stats: &FeedbackStats) {
    println!("{}", "Feedback statistics".bold());
    for line in format_statistics(stats) {
        let line = if line.starts_with("Satisfaction") {
            line.green().to_string()
        } else if line.starts_with("No feedback") {
            line.dimmed().to_string()
        } else {
            line
        };
        println!("  {}", line);
    }
}
