/// Command-line front end. Each invocation loads the board, runs one
/// operation through a `BoardSession`, waits for its remote calls to
/// settle, then prints the resulting notices and board.
use std::error::Error;
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use planboard_core::reorder::{DragEvent, DropResult, Slot};
use planboard_core::storage::memory::MemoryStore;
use planboard_core::storage::BoardStore;
use planboard_core::types::{catalog_label, label_catalog, Board, Label, SectionId, TaskId};
use planboard_core::validate::{dedupe_labels, SectionName, Title};
use tokio::sync::broadcast;

use crate::chat::{ChatClient, Conversation};
use crate::config::{self, ClientConfig};
use crate::events::{BoardEvent, Notice};
use crate::output;
use crate::rest::RestStore;
use crate::session::{BoardHandle, BoardSession, NewTask, TaskEdit};

pub type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "planboard", version, about = "Kanban board client")]
pub struct Cli {
    /// Base URL of the board API [default: http://localhost:8000/api/v1]
    #[arg(long, env = "PLANBOARD_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Model name passed to the chat endpoint
    #[arg(long, env = "PLANBOARD_CHAT_MODEL", global = true)]
    pub model: Option<String>,

    /// Path to client.json [default: <config dir>/planboard/client.json]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use an in-process sample board instead of the API
    #[arg(long, global = true)]
    pub demo: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Board(BoardCommand),

    /// List the label catalog
    Labels,

    /// Talk to the assistant; reads one message per line from stdin when
    /// no message is given
    Chat {
        message: Option<String>,
        /// System prompt for the conversation
        #[arg(long)]
        system: Option<String>,
    },
}

/// Sections are given as `section-N`, `N`, or their title; tasks as
/// `task-N` or `N`.
#[derive(Subcommand, Debug)]
pub enum BoardCommand {
    /// Print the board
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Add a task at the end of a section
    AddTask {
        #[arg(short, long)]
        section: String,
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Catalog label id or name (repeatable)
        #[arg(short, long = "label")]
        labels: Vec<String>,
    },

    /// Edit a task; omitted fields keep their current value
    EditTask {
        task: String,
        #[arg(short, long)]
        title: Option<String>,
        /// New description ("" removes it)
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "open")]
        done: bool,
        #[arg(long)]
        open: bool,
        /// Replace the labels (repeatable)
        #[arg(short, long = "label")]
        labels: Vec<String>,
        /// Remove every label
        #[arg(long, conflicts_with = "labels")]
        clear_labels: bool,
    },

    /// Flip a task's completion
    Toggle { task: String },

    /// Delete a task (asks for confirmation)
    DeleteTask {
        task: String,
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a task to a section, at the end unless --index is given
    MoveTask {
        task: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        index: Option<usize>,
    },

    /// Create a section (at least 3 characters)
    AddSection { name: String },

    RenameSection { section: String, title: String },

    /// Delete a section and its tasks (asks for confirmation)
    DeleteSection {
        section: String,
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a section to a zero-based position
    MoveSection {
        section: String,
        #[arg(long)]
        index: usize,
    },

    /// Apply a raw drop result as JSON ("-" reads stdin)
    Drop { json: String },
}

fn usage(message: String) -> Box<dyn Error> {
    message.into()
}

pub fn parse_task(raw: &str) -> CliResult<TaskId> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(TaskId(n));
    }
    Ok(raw.parse::<TaskId>()?)
}

pub fn resolve_section(board: &Board, raw: &str) -> CliResult<SectionId> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(SectionId(n));
    }
    if let Ok(id) = raw.parse::<SectionId>() {
        return Ok(id);
    }
    board
        .column_by_title(raw)
        .map(|c| c.id)
        .ok_or_else(|| usage(format!("no section named {:?}", raw)))
}

fn resolve_labels(keys: &[String]) -> CliResult<Vec<Label>> {
    let labels = keys
        .iter()
        .map(|key| {
            catalog_label(key)
                .ok_or_else(|| usage(format!("unknown label {:?} (see `planboard labels`)", key)))
        })
        .collect::<CliResult<Vec<Label>>>()?;
    Ok(dedupe_labels(labels))
}

fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> CliResult<bool> {
    write!(out, "{} [y/N] ", prompt)?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn drain_notices(events: &mut broadcast::Receiver<BoardEvent>) -> Vec<Notice> {
    let mut notices = Vec::new();
    loop {
        match events.try_recv() {
            Ok(BoardEvent::Notice(notice)) => notices.push(notice),
            Ok(BoardEvent::Changed) => {}
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                log::warn!("[planboard.cli] missed {} board events", n);
            }
            Err(_) => break,
        }
    }
    notices
}

pub async fn run<R: BufRead, W: Write>(cli: Cli, input: &mut R, out: &mut W) -> CliResult<()> {
    let mut config = config::resolve(cli.config.as_deref());
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(model) = cli.model {
        config.chat_model = model;
    }

    match cli.command {
        Command::Labels => {
            write!(out, "{}", output::format_labels(&label_catalog()))?;
            Ok(())
        }
        Command::Chat { message, system } => chat(&config, message, system, input, out).await,
        Command::Board(command) if cli.demo => {
            log::info!("[planboard.cli] using the in-process demo board");
            run_board(Arc::new(MemoryStore::seeded()), &config, command, input, out).await
        }
        Command::Board(command) => {
            let store = RestStore::new(config.api_base(), config.request_timeout())?;
            run_board(Arc::new(store), &config, command, input, out).await
        }
    }
}

async fn run_board<S: BoardStore, R: BufRead, W: Write>(
    store: Arc<S>,
    config: &ClientConfig,
    command: BoardCommand,
    input: &mut R,
    out: &mut W,
) -> CliResult<()> {
    let handle = BoardSession::spawn(store, config.terminal_titles.clone());
    handle.load().await?;
    let board = handle.snapshot().await?;
    let mut events = handle.subscribe();

    let show_board = execute(&handle, &board, command, input, out).await?;
    handle.idle().await?;

    for notice in drain_notices(&mut events) {
        write!(out, "{}", output::format_notice(&notice))?;
    }
    if show_board {
        write!(out, "{}", output::format_board(&handle.snapshot().await?))?;
    }
    Ok(())
}

/// Run one board command. Returns whether the board should be printed
/// afterwards.
async fn execute<R: BufRead, W: Write>(
    handle: &BoardHandle,
    board: &Board,
    command: BoardCommand,
    input: &mut R,
    out: &mut W,
) -> CliResult<bool> {
    match command {
        BoardCommand::Show { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(board)?)?;
            } else {
                write!(out, "{}", output::format_board(board))?;
            }
            return Ok(false);
        }
        BoardCommand::AddTask {
            section,
            title,
            description,
            labels,
        } => {
            let section = resolve_section(board, &section)?;
            let task = NewTask {
                title: Title::parse(&title)?,
                description,
                labels: resolve_labels(&labels)?,
            };
            handle.create_task(section, task).await?;
        }
        BoardCommand::EditTask {
            task,
            title,
            description,
            done,
            open,
            labels,
            clear_labels,
        } => {
            let id = parse_task(&task)?;
            let current = handle.open_task(id).await?;
            let labels = if clear_labels {
                Vec::new()
            } else if labels.is_empty() {
                current.labels.clone()
            } else {
                resolve_labels(&labels)?
            };
            let edit = TaskEdit {
                title: Title::parse(title.as_deref().unwrap_or(current.title.as_str()))?,
                description: description.or(current.description),
                completed: (current.completed || done) && !open,
                labels,
            };
            handle.update_task(id, edit).await?;
        }
        BoardCommand::Toggle { task } => handle.toggle_task(parse_task(&task)?).await?,
        BoardCommand::DeleteTask { task, yes } => {
            let id = parse_task(&task)?;
            handle.request_task_delete(id).await?;
            let title = board
                .find_task(id)
                .map(|(_, t)| t.title.as_str())
                .unwrap_or_default();
            if yes || confirm(input, out, &format!("Delete {} {:?}?", id, title))? {
                handle.confirm_delete().await?;
            } else {
                handle.cancel_delete().await?;
                writeln!(out, "cancelled")?;
                return Ok(false);
            }
        }
        BoardCommand::MoveTask { task, to, index } => {
            let id = parse_task(&task)?;
            let (column, _) = board
                .find_task(id)
                .ok_or_else(|| usage(format!("no task {} on the board", id)))?;
            let from_index = column.tasks.iter().position(|t| t.id == id).unwrap_or_default();
            let to_section = resolve_section(board, &to)?;
            let to_index = index.unwrap_or_else(|| {
                board
                    .columns
                    .iter()
                    .find(|c| c.id == to_section)
                    .map_or(0, |c| c.tasks.len())
            });
            handle
                .drag(DragEvent::Task {
                    task: id,
                    from: Slot {
                        section: column.id,
                        index: from_index,
                    },
                    to: Some(Slot {
                        section: to_section,
                        index: to_index,
                    }),
                })
                .await?;
        }
        BoardCommand::AddSection { name } => {
            handle.create_section(SectionName::parse(&name)?).await?
        }
        BoardCommand::RenameSection { section, title } => {
            let section = resolve_section(board, &section)?;
            let title = Title::parse(&title)?;
            handle.begin_rename(section).await?;
            handle.rename_section(title).await?;
        }
        BoardCommand::DeleteSection { section, yes } => {
            let section = resolve_section(board, &section)?;
            handle.request_section_delete(section).await?;
            let prompt = match board.columns.iter().find(|c| c.id == section) {
                Some(column) => format!(
                    "Delete {} {:?} and its {} task(s)?",
                    section,
                    column.title,
                    column.tasks.len()
                ),
                None => format!("Delete {}?", section),
            };
            if yes || confirm(input, out, &prompt)? {
                handle.confirm_delete().await?;
            } else {
                handle.cancel_delete().await?;
                writeln!(out, "cancelled")?;
                return Ok(false);
            }
        }
        BoardCommand::MoveSection { section, index } => {
            let section = resolve_section(board, &section)?;
            let from = board
                .columns
                .iter()
                .position(|c| c.id == section)
                .ok_or_else(|| usage(format!("no section {} on the board", section)))?;
            handle
                .drag(DragEvent::Column {
                    section,
                    from,
                    to: Some(index),
                })
                .await?;
        }
        BoardCommand::Drop { json } => {
            let raw = if json.trim() == "-" {
                let mut buf = String::new();
                input.read_to_string(&mut buf)?;
                buf
            } else {
                json
            };
            let result: DropResult = serde_json::from_str(&raw)?;
            handle.drop_result(result).await?;
        }
    }
    Ok(true)
}

async fn chat<R: BufRead, W: Write>(
    config: &ClientConfig,
    message: Option<String>,
    system: Option<String>,
    input: &mut R,
    out: &mut W,
) -> CliResult<()> {
    let client = ChatClient::new(config.api_base(), &config.chat_model, config.request_timeout())?;
    log::debug!("[planboard.cli] chatting with model {}", client.model());
    let mut conversation = match system {
        Some(prompt) => Conversation::with_system_prompt(&prompt),
        None => Conversation::new(),
    };

    if let Some(message) = message {
        let reply = conversation
            .ask(&client, &message)
            .await
            .ok_or_else(|| usage("message is empty".to_string()))?;
        write!(out, "{}", output::format_chat_reply(&reply))?;
        return Ok(());
    }

    let mut line = String::new();
    loop {
        write!(out, "you: ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        if let Some(reply) = conversation.ask(&client, &line).await {
            write!(out, "{}", output::format_chat_reply(&reply))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_mock, ChatMode};
    use clap::CommandFactory;
    use planboard_core::config::TerminalTitles;
    use planboard_core::storage::memory::StoreCall;
    use std::io::Cursor;

    fn cli(args: &[&str], config_dir: &tempfile::TempDir) -> Cli {
        let config = config_dir.path().join("client.json");
        let mut argv = vec!["planboard", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    async fn run_demo(args: &[&str], stdin: &str) -> CliResult<String> {
        let dir = tempfile::tempdir().unwrap();
        let mut argv = vec!["--demo"];
        argv.extend_from_slice(args);
        let mut input = Cursor::new(stdin.as_bytes().to_vec());
        let mut out = Vec::new();
        run(cli(&argv, &dir), &mut input, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    /// Session over `store` with the board loaded and the journal cleared.
    async fn loaded(store: &Arc<MemoryStore>) -> (BoardHandle, Board) {
        let handle = BoardSession::spawn(store.clone(), TerminalTitles::default());
        handle.load().await.unwrap();
        store.clear_journal();
        let board = handle.snapshot().await.unwrap();
        (handle, board)
    }

    async fn execute_args(handle: &BoardHandle, board: &Board, args: &[&str]) -> CliResult<bool> {
        let dir = tempfile::tempdir().unwrap();
        let Command::Board(command) = cli(args, &dir).command else {
            panic!("not a board command: {:?}", args);
        };
        let mut out = Vec::<u8>::new();
        execute(handle, board, command, &mut Cursor::new(Vec::new()), &mut out).await
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_task("task-7").unwrap(), TaskId(7));
        assert_eq!(parse_task(" 7 ").unwrap(), TaskId(7));
        assert!(parse_task("seven").is_err());

        let board = Board {
            columns: vec![planboard_core::types::Column {
                id: SectionId(3),
                title: "Done".to_string(),
                kind: Default::default(),
                tasks: Vec::new(),
            }],
        };
        assert_eq!(resolve_section(&board, "done").unwrap(), SectionId(3));
        assert_eq!(resolve_section(&board, "section-9").unwrap(), SectionId(9));
        assert!(resolve_section(&board, "Review").is_err());
    }

    #[tokio::test]
    async fn test_demo_show() {
        let text = run_demo(&["show"], "").await.unwrap();
        assert!(text.contains("== To Do (section-1) =="));
        assert!(text.contains("== Done (section-3) [done] =="));
        assert!(text.contains("[x] task-3"));
    }

    #[tokio::test]
    async fn test_demo_add_task_reports_notice() {
        let text = run_demo(&["add-task", "-s", "In Progress", "Write tests", "-l", "bug"], "")
            .await
            .unwrap();
        assert!(text.contains("ok: Task created\n"));
        assert!(text.contains("Write tests  {Bug}"));
    }

    #[tokio::test]
    async fn test_demo_move_into_done_completes() {
        let text = run_demo(&["move-task", "1", "--to", "Done"], "").await.unwrap();
        let done = text.split("== Done").nth(1).unwrap();
        assert!(done.contains("[x] task-1"));
    }

    #[tokio::test]
    async fn test_demo_delete_asks_first() {
        let text = run_demo(&["delete-task", "task-1"], "n\n").await.unwrap();
        assert!(text.contains("cancelled"));
        assert!(!text.contains("Task deleted"));

        let text = run_demo(&["delete-task", "task-1"], "y\n").await.unwrap();
        let (prompt, rest) = text.split_once("[y/N] ").unwrap();
        assert!(prompt.contains("\"Design UI\""));
        assert!(rest.contains("ok: Task deleted"));
        assert!(!rest.contains("Design UI"));
    }

    #[tokio::test]
    async fn test_demo_short_section_name_fails() {
        let err = run_demo(&["add-section", "QA"], "").await.unwrap_err();
        assert!(err.to_string().contains("at least 3"));
    }

    #[tokio::test]
    async fn test_blank_title_edit_never_reaches_store() {
        let store = Arc::new(MemoryStore::seeded());
        let (handle, board) = loaded(&store).await;

        let err = execute_args(&handle, &board, &["edit-task", "1", "--title", "   "])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Title must not be empty");
        handle.idle().await.unwrap();

        assert!(!store
            .journal()
            .iter()
            .any(|call| matches!(call, StoreCall::UpdateTask(..))));
        assert_eq!(handle.snapshot().await.unwrap(), board);
    }

    #[tokio::test]
    async fn test_short_section_name_never_reaches_store() {
        let store = Arc::new(MemoryStore::seeded());
        let (handle, board) = loaded(&store).await;

        let err = execute_args(&handle, &board, &["add-section", "  QA "])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 3"));
        handle.idle().await.unwrap();

        assert!(store.journal().is_empty());
        assert_eq!(handle.snapshot().await.unwrap(), board);
    }

    #[tokio::test]
    async fn test_repeated_label_flags_are_sent_once() {
        let store = Arc::new(MemoryStore::seeded());
        let (handle, board) = loaded(&store).await;

        execute_args(
            &handle,
            &board,
            &["add-task", "-s", "To Do", "Fix login", "-l", "bug", "-l", "Bug", "-l", "design"],
        )
        .await
        .unwrap();
        handle.idle().await.unwrap();

        let sent = store
            .writes()
            .into_iter()
            .find_map(|call| match call {
                StoreCall::ReplaceTaskLabels(_, labels) => Some(labels),
                _ => None,
            })
            .unwrap();
        let texts: Vec<&str> = sent.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Bug", "Design"]);
    }

    #[tokio::test]
    async fn test_demo_drop_json() {
        let json = r#"{"draggableId":"section-3","type":"column",
            "source":{"droppableId":"board","index":2},
            "destination":{"droppableId":"board","index":0}}"#;
        let text = run_demo(&["drop", "-"], json).await.unwrap();
        let first = text.lines().find(|l| l.starts_with("==")).unwrap();
        assert!(first.starts_with("== Done"));
    }

    #[tokio::test]
    async fn test_chat_one_shot() {
        let mock = spawn_mock(MemoryStore::new()).await;
        mock.state.set_chat(ChatMode::Stream(vec![
            r#"{"delta":"Start with the API."}"#.to_string(),
            "[DONE]".to_string(),
        ]));
        let dir = tempfile::tempdir().unwrap();
        let args = cli(
            &["--api-url", mock.base_url.as_str(), "chat", "what first?"],
            &dir,
        );
        let mut out = Vec::new();
        run(args, &mut Cursor::new(Vec::new()), &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "assistant: Start with the API.\n");
    }
}
