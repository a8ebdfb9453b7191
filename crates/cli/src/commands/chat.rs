//! `docchat chat` — Interactive question loop in the terminal.

use std::io::Write;
use std::path::PathBuf;

use docchat_core::error::SubmitError;
use docchat_core::session::Session;
use docchat_documents::PdfExtractor;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use super::{attach_pdf, build_chat, load_config, render, submit_interruptible};

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput {
    Question(String),
    AttachPdf(PathBuf),
    ClearPdf,
    History,
    Help,
    Exit,
}

/// Parse a line typed at the prompt.
///
/// Anything that is not a slash command is a question, blank lines
/// included; the loop rejects those the same way the web form does.
pub fn parse_input(line: &str) -> Result<ChatInput, String> {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Ok(match trimmed {
            "exit" | "quit" | ":q" => ChatInput::Exit,
            _ => ChatInput::Question(line.trim_end_matches(['\r', '\n']).to_string()),
        });
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "pdf" if arg.is_empty() => Err("Usage: /pdf <path>".into()),
        "pdf" => Ok(ChatInput::AttachPdf(PathBuf::from(arg))),
        "clear-pdf" => Ok(ChatInput::ClearPdf),
        "history" => Ok(ChatInput::History),
        "help" | "?" => Ok(ChatInput::Help),
        "exit" | "quit" => Ok(ChatInput::Exit),
        _ => Err(format!("Unknown command '/{name}'. Type /help for commands.")),
    }
}

fn print_help() {
    println!("  Commands:");
    println!("    /pdf <path>   Use a PDF's text as context");
    println!("    /clear-pdf    Stop using the current PDF");
    println!("    /history      Show previous questions and responses");
    println!("    /exit         Quit (Ctrl+C or Ctrl+D also work)");
    println!("  Ctrl+C while waiting for a response cancels that request.");
}

pub async fn run(pdf: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let chat = build_chat(&config)?;
    let extractor = PdfExtractor::new(config.documents.max_bytes);
    let mut session = Session::new(config.history.ordering);

    println!();
    println!("  ╔══════════════════════════════════════╗");
    println!("  ║       DocChat — Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.effective_model());
    println!();
    print_help();
    println!();

    if let Some(path) = pdf {
        if let Err(e) = attach_pdf(&chat, &mut session, &extractor, &path).await {
            eprintln!("  [Warning] {e}");
        }
    }

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(msg) => {
                eprintln!("  {msg}");
                continue;
            }
        };

        match input {
            ChatInput::Exit => break,
            ChatInput::Help => print_help(),
            ChatInput::History => print!("{}", render::history_panel(&session.list_history())),
            ChatInput::ClearPdf => match session.detach_document() {
                Some(doc) => println!("  Stopped using {}.", doc.file_name),
                None => println!("  No document attached."),
            },
            ChatInput::AttachPdf(path) => {
                if let Err(e) = attach_pdf(&chat, &mut session, &extractor, &path).await {
                    eprintln!("  [Warning] {e}");
                }
            }
            ChatInput::Question(question) => {
                eprint!("  ...");
                let result = submit_interruptible(&chat, &mut session, &question).await;
                eprint!("\r     \r");

                match result {
                    Ok(answer) => {
                        println!();
                        println!("{}", render::response(&answer.response));
                        println!();
                    }
                    Err(SubmitError::EmptyQuestion) => {
                        eprintln!("  [Warning] {}", SubmitError::EmptyQuestion);
                    }
                    Err(SubmitError::Cancelled) => eprintln!("  [Cancelled]"),
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
