//! Terminal rendering of answers and the history panel.

use docchat_core::history::HistoryEntry;

pub const NO_HISTORY: &str = "No history available.";

/// History panel text, one labelled block per entry, in display order.
pub fn history_panel(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return format!("  {NO_HISTORY}\n");
    }

    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("  {}: {}\n", entry.question_label(), entry.question));
        out.push_str(&format!("  {}:\n", entry.response_label()));
        for line in entry.response.lines() {
            out.push_str(&format!("    {line}\n"));
        }
        out.push('\n');
    }
    out
}

/// Indent every line of a response with a visible prefix.
pub fn response(text: &str) -> String {
    text.lines()
        .map(|line| format!("  Assistant > {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
