use planboard_core::types::{Board, ColumnKind, Label};
use planboard_core::wire::ChatReply;

use crate::events::{Notice, NoticeLevel};

pub fn format_board(board: &Board) -> String {
    if board.columns.is_empty() {
        return "(empty board)\n".to_string();
    }
    let mut out = String::new();
    for column in &board.columns {
        let marker = match column.kind {
            ColumnKind::Normal => "",
            ColumnKind::Done => " [done]",
            ColumnKind::Cancelled => " [cancelled]",
        };
        out.push_str(&format!(
            "== {} ({}){} ==\n",
            column.title, column.id, marker
        ));
        if column.tasks.is_empty() {
            out.push_str("  (no tasks)\n");
        }
        for task in &column.tasks {
            let check = if task.completed { "x" } else { " " };
            out.push_str(&format!("  [{}] {:<9} {}", check, task.id.to_string(), task.title));
            if !task.labels.is_empty() {
                let names: Vec<&str> = task.labels.iter().map(|l| l.text.as_str()).collect();
                out.push_str(&format!("  {{{}}}", names.join(", ")));
            }
            out.push('\n');
            if let Some(description) = &task.description {
                out.push_str(&format!("      {}\n", description));
            }
        }
    }
    out
}

pub fn format_labels(labels: &[Label]) -> String {
    let mut out = String::new();
    for label in labels {
        out.push_str(&format!(
            "{:<14} {:<10} {} (text {})\n",
            label.id,
            label.text,
            label.color,
            label.contrast_color()
        ));
    }
    out
}

pub fn format_notice(notice: &Notice) -> String {
    let prefix = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!("{}: {}\n", prefix, notice.message)
}

pub fn format_chat_reply(reply: &ChatReply) -> String {
    let mut out = String::new();
    if let Some(reasoning) = reply.reasoning.as_deref().filter(|r| !r.trim().is_empty()) {
        out.push_str(&format!("(reasoning) {}\n", reasoning.trim()));
    }
    out.push_str(&format!("assistant: {}\n", reply.message));
    if let Some(tokens) = &reply.tokens {
        out.push_str(&format!("({} tokens)\n", tokens.total_tokens));
    }
    out
}
