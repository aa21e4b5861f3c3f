//! Interactive REPL for the AgenticLocator picker.
//!
//! Launch with `agentic-locator-picker repl` to enter interactive mode.
//! Type `/help` for available commands, Tab for completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use agentic_locator::{
    compute_noise_ban, extract_segments, resolve, synthesize, DocumentQuery, HtmlDocument,
    NodeId, SynthesisOptions,
};

use crate::config::resolve_document_path;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/load", "Load an HTML document"),
    ("/pick", "Synthesize a locator for a CSS selector"),
    ("/segments", "Show the extracted segments of a target"),
    ("/resolve", "Evaluate a path expression"),
    ("/info", "Show the loaded document"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct PickerHelper;

impl Completer for PickerHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // .html file completion
        let parts: Vec<&str> = input.splitn(2, ' ').collect();
        let cmd = parts[0];
        let args = if parts.len() > 1 { parts[1] } else { "" };

        if cmd == "/load" {
            let mut files = Vec::new();
            if let Ok(entries) = std::fs::read_dir(".") {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().is_some_and(|e| e == "html" || e == "htm") {
                        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                            files.push(name.to_string());
                        }
                    }
                }
            }
            files.sort();
            let prefix_start = input.len() - args.len();
            let matches: Vec<Pair> = files
                .iter()
                .filter(|f| f.starts_with(args.trim()))
                .map(|f| Pair {
                    display: f.clone(),
                    replacement: format!("{f} "),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for PickerHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for PickerHelper {}
impl Validator for PickerHelper {}
impl Helper for PickerHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Session state.
struct ReplState {
    document: Option<(String, HtmlDocument)>,
    options: SynthesisOptions,
}

/// Run the interactive REPL.
pub fn run(options: SynthesisOptions) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1magentic-locator-picker v{}\x1b[0m \x1b[90m\u{2014} Robust Locators for Picked Elements\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<PickerHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(PickerHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".agentic_locator_picker_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let mut state = ReplState {
        document: None,
        options,
    };
    if let Some(path) = resolve_document_path(None) {
        cmd_load(&path, &mut state);
    }
    let prompt = " \x1b[36mpicker>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "load" => cmd_load(args, &mut state),
                    "pick" => cmd_pick(args, &state),
                    "segments" => cmd_segments(args, &state),
                    "resolve" => cmd_resolve(args, &state),
                    "info" => cmd_info(&state),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(std::path::Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completion works for commands and .html files.");
    eprintln!();
}

fn cmd_load(args: &str, state: &mut ReplState) {
    if args.is_empty() {
        eprintln!("  Usage: /load <file.html>");
        return;
    }
    let path = load_path(args);
    match HtmlDocument::from_path(&path) {
        Ok(doc) => {
            eprintln!("  Loaded: {path} ({} elements)", doc.element_count());
            state.document = Some((path, doc));
        }
        Err(e) => {
            eprintln!("  Failed to load: {e}");
        }
    }
}

/// The `/load` argument as a path. Spaces are part of the path; one pair of
/// surrounding quotes is stripped.
fn load_path(args: &str) -> String {
    let args = args.trim();
    ['"', '\'']
        .iter()
        .find_map(|&q| args.strip_prefix(q).and_then(|a| a.strip_suffix(q)))
        .unwrap_or(args)
        .to_string()
}

/// The loaded document and the first element matching `css`.
fn target<'a>(args: &str, state: &'a ReplState) -> Option<(&'a HtmlDocument, NodeId)> {
    let Some((_, doc)) = &state.document else {
        eprintln!("  No document loaded. Use /load <file.html> first.");
        return None;
    };
    if args.is_empty() {
        eprintln!("  Usage: <css selector>");
        return None;
    }
    match doc.select_first(args) {
        Ok(node) => Some((doc, node)),
        Err(e) => {
            eprintln!("  {e}");
            None
        }
    }
}

fn cmd_pick(args: &str, state: &ReplState) {
    let Some((doc, node)) = target(args, state) else {
        return;
    };
    let synthesis = synthesize(doc, node, &state.options);
    let stats = &synthesis.outcome.stats;
    eprintln!();
    eprintln!("  Full:      {}", synthesis.selection.full_expression);
    match &synthesis.outcome.locator {
        Some(locator) => eprintln!(
            "  Minimized: \x1b[1m{}\x1b[0m (cost {})",
            locator.expression, locator.cost
        ),
        None => eprintln!("  Minimized: none found"),
    }
    eprintln!(
        "  Search:    {} explored, {} pruned, {}ms of {}ms ({:?})",
        stats.explored,
        stats.pruned,
        stats.elapsed_ms,
        synthesis.selection.budget_ms(),
        stats.stop_reason
    );
    eprintln!();
}

fn cmd_segments(args: &str, state: &ReplState) {
    let Some((doc, node)) = target(args, state) else {
        return;
    };
    let ban = compute_noise_ban(doc);
    eprintln!();
    if let Some(len) = ban {
        eprintln!("  Noise ban: class names of length {len}");
    }
    for (i, segment) in extract_segments(doc, node, ban).iter().enumerate() {
        eprintln!(
            "    {i:>2} {:<10} id={:<12} n={:<3} name={:<10} classes={}",
            segment.tag_name,
            segment.identifier.as_deref().unwrap_or("-"),
            segment
                .sibling_index
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            segment.input_name.as_deref().unwrap_or("-"),
            segment.classes().join(" ")
        );
    }
    eprintln!();
}

fn cmd_resolve(args: &str, state: &ReplState) {
    let Some((_, doc)) = &state.document else {
        eprintln!("  No document loaded. Use /load <file.html> first.");
        return;
    };
    if args.is_empty() {
        eprintln!("  Usage: /resolve <expression>");
        return;
    }
    match resolve(doc, args) {
        Ok(nodes) => {
            eprintln!("  {} match(es)", nodes.len());
            for node in nodes.iter().take(10) {
                eprintln!("    #{} <{}>", node.0, doc.tag_name(*node));
            }
        }
        Err(e) => eprintln!("  Invalid expression: {e}"),
    }
}

fn cmd_info(state: &ReplState) {
    eprintln!();
    match &state.document {
        Some((path, doc)) => {
            eprintln!("  Document: {path}");
            eprintln!("    Elements:  {}", doc.element_count());
            if let Some(ban) = compute_noise_ban(doc) {
                eprintln!("    Noise ban: length {ban}");
            }
        }
        None => eprintln!("  No document loaded."),
    }
    match state.options.budget_override {
        Some(budget) => eprintln!("  Budget:   {}ms (override)", budget.as_millis()),
        None => eprintln!("  Budget:   estimated per target"),
    }
    eprintln!("  Yield:    every {} dequeues", state.options.yield_every);
    eprintln!();
}
