//! CLI command execution.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use loyalty_chat::export::{format_metric_value, metric_label, strip_markup, ExportKind};
use loyalty_chat::form::FormState;
use loyalty_chat::models::{cell_text, FieldKind, FileUpload, FormField, Message, Sender};
use loyalty_chat::session::{FileStorage, SessionManager, SessionStorage};
use loyalty_chat::share::{MemoryClipboard, ShareOutcome, Unsupported};
use loyalty_chat::store::MessageSubscription;
use loyalty_chat::{ChatConfig, ChatService, TurnOptions};

use super::args::{Cli, Commands, ExportArg};

type Input = Lines<BufReader<Stdin>>;

/// Table rows shown inline before the rest is summarized.
const PREVIEW_ROWS: usize = 5;

fn build_config(cli: &Cli) -> ChatConfig {
    ChatConfig {
        api_url: cli.api_url.clone(),
        auth_token: cli.token.clone(),
        username: cli.user.clone(),
        role: cli.role(),
        model: cli.model.into(),
        agent: cli.agent.into(),
        request_timeout: Duration::from_secs(cli.timeout),
        export_dir: cli.export_dir.clone(),
        ..ChatConfig::default()
    }
}

fn open_storage(cli: &Cli) -> Result<Arc<dyn SessionStorage>> {
    let storage = match &cli.session_file {
        Some(path) => FileStorage::open_at(path),
        None => FileStorage::open().context("Failed to locate session file")?,
    };
    debug!(path = %storage.path().display(), "using session file");
    Ok(Arc::new(storage))
}

fn build_service(cli: &Cli) -> Result<ChatService> {
    let storage = open_storage(cli)?;
    ChatService::new(build_config(cli), storage).context("Invalid chat configuration")
}

fn upload_for(path: &Path) -> Result<FileUpload> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Attachment path has no file name")?;
    Ok(FileUpload {
        name,
        size: metadata.len(),
    })
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    match &cli.command {
        None | Some(Commands::Chat) => run_chat(&cli).await,
        Some(Commands::Ask {
            file,
            export,
            message,
        }) => {
            let message = message.join(" ");
            if message.trim().is_empty() {
                bail!("Message is required for ask command");
            }
            ask(&cli, &message, file.as_deref(), export).await
        }
        Some(Commands::New) => {
            let service = build_service(&cli)?;
            let id = service.start_new_chat().await;
            println!("Started a new chat. Session ID: {id}");
            Ok(())
        }
        Some(Commands::Session { reset }) => {
            let sessions = SessionManager::new(open_storage(&cli)?);
            let id = if *reset {
                sessions.reset_id()
            } else {
                sessions.get_id()
            };
            println!("{id}");
            Ok(())
        }
    }
}

async fn ask(
    cli: &Cli,
    message: &str,
    file: Option<&Path>,
    exports: &[ExportArg],
) -> Result<()> {
    let service = build_service(cli)?;
    service.handle_page_load().await;

    let mut options = TurnOptions::default();
    if let Some(path) = file {
        options = options.with_file(upload_for(path)?);
    }

    let reply = service.send(message, options).await;
    print_message(&reply, 0);

    for kind in exports.iter().copied().map(ExportKind::from) {
        let id = kind.is_per_message().then_some(reply.id.as_str());
        let path = service
            .export(kind, id)
            .with_context(|| format!("Failed to export {kind}"))?;
        println!("Exported {kind}: {}", path.display());
    }
    Ok(())
}

// === Interactive Chat ===

async fn run_chat(cli: &Cli) -> Result<()> {
    let service = build_service(cli)?;
    if service.handle_page_load().await {
        println!("Previous chat was closed; starting fresh.");
    }

    println!("Loyalty Chat - connected to {}", service.api_url());
    println!("Session ID: {}", service.session_id());
    println!("Type /help for commands.");
    println!();

    let mut view = View::new(service.subscribe());
    view.render();

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = prompt(&mut input, "> ").await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !run_slash_command(&service, &view, command).await? {
                break;
            }
        } else if let Some(n) = line.strip_prefix('#') {
            click_suggestion(&service, &view, n).await;
        } else {
            service.send(line, TurnOptions::default()).await;
        }
        view.render();

        if let Some(message) = view.pending_form() {
            fill_form(&service, &message, &mut input).await?;
            view.render();
        }
    }

    service.mark_unloading();
    Ok(())
}

async fn run_slash_command(service: &ChatService, view: &View, command: &str) -> Result<bool> {
    let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
    let arg = arg.trim();

    match name {
        "quit" | "exit" | "q" => return Ok(false),
        "help" => print_help(),
        "new" => {
            let id = service.start_new_chat().await;
            println!("Started a new chat. Session ID: {id}");
        }
        "session" => println!("{}", service.session_id()),
        "url" if !arg.is_empty() => {
            service.update_api_url(arg);
            println!("API URL set to {}", service.api_url());
        }
        "token" => {
            service.update_auth_token(arg);
            println!("Auth token updated.");
        }
        "regenerate" => {
            let regenerated = match view.last_assistant() {
                Some(message) => service.regenerate(&message.id).await.is_some(),
                None => false,
            };
            if !regenerated {
                println!("Nothing to regenerate.");
            }
        }
        "copy" | "share" => match view.resolve(arg) {
            Some(message) => {
                let clipboard = MemoryClipboard::new();
                match service.share_message(&message.id, &Unsupported, &clipboard) {
                    Some(ShareOutcome::Copied | ShareOutcome::Shared) => {
                        println!("{}", clipboard.contents().unwrap_or_default());
                    }
                    _ => println!("Could not copy message."),
                }
            }
            None => println!("No such message."),
        },
        "export" => {
            let (kind, which) = arg.split_once(' ').unwrap_or((arg, ""));
            let Some(kind) = ExportKind::from_str(kind) else {
                println!("Usage: /export <report|transcript|metrics|table|accounts> [message #]");
                return Ok(true);
            };
            let message_id = if kind.is_per_message() {
                match view.resolve(which) {
                    Some(message) => Some(message.id),
                    None => {
                        println!("No such message.");
                        return Ok(true);
                    }
                }
            } else {
                None
            };
            match service.export(kind, message_id.as_deref()) {
                Ok(path) => println!("Exported {kind}: {}", path.display()),
                Err(e) => println!("Export failed: {e}"),
            }
        }
        _ => println!("Unknown command /{name}. Type /help for commands."),
    }
    Ok(true)
}

fn print_help() {
    println!("Commands:");
    println!("  /new                 Clear the chat and start a new session");
    println!("  /session             Show the session ID");
    println!("  /regenerate          Ask again for the last answer");
    println!("  /copy [N]            Print message N (default: last answer) as copied text");
    println!("  /export KIND [N]     Export report, transcript, metrics, table or accounts");
    println!("  /url URL             Point at another API server");
    println!("  /token TOKEN         Set the auth token (empty to clear)");
    println!("  /quit                Leave");
    println!("  #N                   Pick suggestion N of the last answer");
}

async fn click_suggestion(service: &ChatService, view: &View, n: &str) {
    let Some(message) = view.last_assistant() else {
        return;
    };
    let suggestion = n
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| message.suggestions.as_ref()?.get(i).cloned());
    match suggestion {
        Some(suggestion) => {
            service.click_suggestion(&message.id, &suggestion).await;
        }
        None => println!("No such suggestion."),
    }
}

async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>> {
    use std::io::Write;

    print!("{label}");
    std::io::stdout().flush().context("Failed to flush stdout")?;
    input.next_line().await.context("Failed to read input")
}

// === Forms ===

async fn fill_form(service: &ChatService, message: &Message, input: &mut Input) -> Result<()> {
    let Some(form) = message.form.clone() else {
        return Ok(());
    };
    println!("{}", form.title);
    if let Some(description) = &form.description {
        println!("{description}");
    }
    println!("(enter /cancel to dismiss the form)");

    let mut state = FormState::new(form.clone());
    let mut pending: Vec<FormField> = form.fields.clone();

    loop {
        for field in &pending {
            let Some(answer) = prompt(input, &field_prompt(field)).await? else {
                return Ok(());
            };
            if answer.trim() == "/cancel" {
                service.cancel_form(&message.id, &state);
                println!("Form cancelled.");
                return Ok(());
            }
            state.set_value(&field.key, parse_answer(field, answer.trim()));
            state.touch(&field.key);
        }

        if service.submit_form(&message.id, &mut state).await.is_some() {
            return Ok(());
        }

        pending = form
            .fields
            .iter()
            .filter(|f| state.is_field_invalid(&f.key))
            .cloned()
            .collect();
        for field in &pending {
            if let Some(error) = state.field_error(&field.key) {
                println!("  {}: {error}", field.label);
            }
        }
    }
}

fn field_prompt(field: &FormField) -> String {
    let mut label = field.label.clone();
    if field.required {
        label.push('*');
    }
    if field.kind.is_enumerable() && !field.options.is_empty() {
        let options: Vec<&str> = field.options.iter().map(|o| o.label.as_str()).collect();
        label.push_str(&format!(" [{}]", options.join("/")));
    } else if field.kind == FieldKind::Checkbox {
        label.push_str(" [y/n]");
    } else if let Some(placeholder) = &field.placeholder {
        label.push_str(&format!(" ({placeholder})"));
    }
    label.push_str(": ");
    label
}

fn parse_answer(field: &FormField, answer: &str) -> Value {
    match field.kind {
        FieldKind::Checkbox => Value::Bool(matches!(
            answer.to_lowercase().as_str(),
            "y" | "yes" | "true" | "1"
        )),
        FieldKind::Number if answer.is_empty() => Value::Null,
        FieldKind::Number => answer
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| Value::String(answer.to_string()), Value::Number),
        _ if field.kind.is_enumerable() => field
            .options
            .iter()
            .find(|o| o.label.eq_ignore_ascii_case(answer) || cell_text(&o.value) == answer)
            .map_or_else(|| Value::String(answer.to_string()), |o| o.value.clone()),
        _ => Value::String(answer.to_string()),
    }
}

// === Rendering ===

/// Follows the store's snapshots and prints messages as they arrive.
struct View {
    subscription: MessageSubscription,
    messages: Vec<Message>,
    printed: usize,
}

impl View {
    fn new(subscription: MessageSubscription) -> Self {
        Self {
            subscription,
            messages: Vec::new(),
            printed: 0,
        }
    }

    fn render(&mut self) {
        while let Some(snapshot) = self.subscription.try_next() {
            if snapshot.len() < self.printed
                || snapshot.first().map(|m| &m.id) != self.messages.first().map(|m| &m.id)
            {
                self.printed = 0;
            }
            self.messages = snapshot;
        }

        for (idx, message) in self.messages.iter().enumerate().skip(self.printed) {
            print_message(message, idx + 1);
        }
        self.printed = self.messages.len();
    }

    fn last_assistant(&self) -> Option<Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Assistant)
            .cloned()
    }

    /// Message by 1-based number, or the last answer when `which` is empty.
    fn resolve(&self, which: &str) -> Option<Message> {
        if which.trim().is_empty() {
            return self.last_assistant();
        }
        let idx = which.trim().parse::<usize>().ok()?.checked_sub(1)?;
        self.messages.get(idx).cloned()
    }

    fn pending_form(&self) -> Option<Message> {
        self.messages.last().filter(|m| m.has_form()).cloned()
    }
}

fn print_message(message: &Message, number: usize) {
    let who = if message.is_user() { "You" } else { "Bonnie" };
    let time = message.timestamp.format("%-I:%M %p");
    if number > 0 {
        println!("[{number}] {who} ({time}):");
    } else {
        println!("{who} ({time}):");
    }

    let text = strip_markup(message.text.as_deref().unwrap_or_default());
    if !text.is_empty() {
        println!("{text}");
    }

    if let Some(attachments) = &message.attachments {
        for attachment in attachments {
            let size = attachment.size.as_deref().unwrap_or("?");
            println!("  attached: {} ({size})", attachment.name);
        }
    }

    if let Some(metrics) = message.metrics.as_ref().filter(|m| !m.is_empty()) {
        println!("  Key Performance Indicators:");
        for (key, value) in metrics {
            println!("    {}: {}", metric_label(key), format_metric_value(value));
        }
    }

    if let Some(table) = &message.table_data {
        println!("  {}", table.headers.join(" | "));
        for row in table.rows.iter().take(PREVIEW_ROWS) {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            println!("  {}", cells.join(" | "));
        }
        if table.rows.len() > PREVIEW_ROWS {
            println!("  ... and {} more rows", table.rows.len() - PREVIEW_ROWS);
        }
    }

    if let Some(link) = &message.file_link {
        println!("  Download: {link}");
    }

    if let Some(suggestions) = message.suggestions.as_ref().filter(|s| !s.is_empty()) {
        for (idx, suggestion) in suggestions.iter().enumerate() {
            println!("  #{} {suggestion}", idx + 1);
        }
    }
    println!();
}
