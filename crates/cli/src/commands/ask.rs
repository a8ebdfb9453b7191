//! `docchat ask` — Ask a single question and print the response.

use std::path::PathBuf;

use docchat_core::session::Session;
use docchat_documents::PdfExtractor;

use super::{attach_pdf, build_chat, load_config, render, submit_interruptible};

pub async fn run(question: String, pdf: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let chat = build_chat(&config)?;
    let mut session = Session::new(config.history.ordering);

    if let Some(path) = pdf {
        let extractor = PdfExtractor::new(config.documents.max_bytes);
        if let Err(e) = attach_pdf(&chat, &mut session, &extractor, &path).await {
            eprintln!("  [Warning] {e}. Continuing without document context.");
        }
    }

    eprint!("  Thinking...");
    let result = submit_interruptible(&chat, &mut session, &question).await;
    eprint!("\r              \r");

    let answer = result?;
    println!("{}", render::response(&answer.response));
    Ok(())
}
