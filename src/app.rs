//! Terminal front end.
//!
//! Input lines, suggestion results and narration progress all arrive on the
//! main thread, which is the only one touching the session. Stdin and the
//! suggestion lookups run on helper threads and report through channels.

use crate::narrator::PacedNarrator;
use anyhow::Result;
use lexileaf_core::config::{AppConfig, save_config};
use lexileaf_core::store::FileStore;
use lexileaf_core::suggest::{HttpSuggestionService, SuggestionRequest, SuggestionService};
use lexileaf_core::{
    NoticeLevel, ReaderSnapshot, ReadingSession, SessionCommand, SessionEffect, TokenKind,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_millis(50);

pub type Session = ReadingSession<FileStore, PacedNarrator>;

/// Events delivered to the main loop.
#[derive(Debug)]
enum Message {
    Line(String),
    InputClosed,
    Suggestions {
        request: SuggestionRequest,
        suggestions: Vec<String>,
    },
}

/// Commands typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Next,
    Prev,
    Page(usize),
    Select(usize),
    Clear,
    Comfort(u8),
    Translate(Option<String>),
    Pick(usize),
    PageSize(usize),
    Play(Option<usize>),
    Pause,
    Resume,
    Stop,
    Show,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  n | next            next page
  p | prev            previous page
  page N              go to page N (1-based)
  sel N               select token N (index shown in brackets)
  clear               clear the selection
  rate 0-5            set comfort of the selected word
  tr [TEXT]           set (or clear) translation of the selected word
  pick N              use suggestion N as translation
  size N              tokens per page
  play [N]            narrate from token N, the highlight or page start
  pause | resume | stop
  show | help | quit";

pub struct App {
    session: Session,
    config: AppConfig,
    config_path: PathBuf,
    suggest_tx: Sender<SuggestionRequest>,
    running: bool,
}

pub fn run_app(
    session: Session,
    initial: Vec<SessionEffect>,
    service: HttpSuggestionService,
    config: AppConfig,
    config_path: PathBuf,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Message>();
    spawn_stdin_reader(tx.clone())?;
    let suggest_tx = spawn_suggestion_worker(service, tx)?;

    let mut app = App {
        session,
        config,
        config_path,
        suggest_tx,
        running: true,
    };
    app.handle_effects(initial);
    app.render();
    app.prompt();
    app.run(&rx);

    let (_store, _narrator) = app.session.close();
    info!("Reader closed");
    Ok(())
}

impl App {
    fn run(&mut self, rx: &Receiver<Message>) {
        while self.running {
            match rx.recv_timeout(TICK) {
                Ok(message) => self.update(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            let effects = self.session.pump_narration();
            if !effects.is_empty() {
                self.handle_effects(effects);
            }
        }
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::Line(line) => {
                match parse_input(&line) {
                    Ok(Some(input)) => self.handle_input(input),
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
                if self.running {
                    self.prompt();
                }
            }
            Message::InputClosed => self.running = false,
            Message::Suggestions {
                request,
                suggestions,
            } => {
                let effects = self.session.apply(SessionCommand::SuggestionsArrived {
                    request_id: request.request_id,
                    word: request.word_id,
                    suggestions,
                });
                self.handle_effects(effects);
                if let Some(selection) = self.session.snapshot().selection {
                    print_selection(&selection);
                }
            }
        }
    }

    fn handle_input(&mut self, input: Input) {
        let snapshot = self.session.snapshot();
        let command = match input {
            Input::Show => {
                self.render();
                return;
            }
            Input::Help => {
                println!("{HELP}");
                return;
            }
            Input::Quit => {
                self.running = false;
                return;
            }
            Input::PageSize(size) => {
                self.persist_page_size(size);
                SessionCommand::SetPageSize { page_size: size }
            }
            other => match to_command(other, &snapshot) {
                Ok(command) => command,
                Err(err) => {
                    println!("{err}");
                    return;
                }
            },
        };
        let effects = self.session.apply(command);
        self.handle_effects(effects);
    }

    fn handle_effects(&mut self, effects: Vec<SessionEffect>) {
        let mut rerender = false;
        for effect in effects {
            match effect {
                SessionEffect::PageTurn { .. } => rerender = true,
                SessionEffect::Highlight { token } => {
                    if let Some(word) = self.session.layout().tokens().get(token) {
                        print!("\r  ▶ {:<24}", word.text);
                        let _ = io::stdout().flush();
                    }
                }
                SessionEffect::ClearHighlight => println!(),
                SessionEffect::FetchSuggestions(request) => {
                    debug!(
                        request_id = request.request_id,
                        word = %request.word,
                        "Queued suggestion lookup"
                    );
                    if self.suggest_tx.send(request).is_err() {
                        warn!("Suggestion worker has stopped");
                    }
                    if let Some(selection) = self.session.snapshot().selection {
                        print_selection(&selection);
                    }
                }
                SessionEffect::Notify(notice) => {
                    let label = match notice.level {
                        NoticeLevel::Info => "note",
                        NoticeLevel::Warning => "warning",
                        NoticeLevel::Error => "error",
                    };
                    println!("[{label}] {}", notice.message);
                }
            }
        }
        if rerender {
            self.render();
        }
    }

    fn persist_page_size(&mut self, size: usize) {
        self.config.page_size = size;
        self.config = self.config.clone().sanitized();
        if let Err(err) = save_config(&self.config_path, &self.config) {
            warn!("Could not save page size: {err:#}");
        }
    }

    fn render(&self) {
        let snapshot = self.session.snapshot();
        println!();
        println!(
            "== {} [{}] page {}/{} | vocabulary {:.0}% | seen {} of {} words",
            snapshot.title,
            snapshot.language,
            snapshot.current_page + 1,
            snapshot.progress.token_pages.max(1),
            snapshot.progress.progress_pct,
            snapshot.progress.seen_words,
            snapshot.progress.distinct_words,
        );
        println!("{}", render_tokens(&snapshot));
        let counts: Vec<String> = snapshot
            .progress
            .comfort_counts
            .iter()
            .enumerate()
            .map(|(level, count)| format!("{level}:{count}"))
            .collect();
        println!("comfort {}", counts.join(" "));
        if snapshot.degraded_rules {
            println!("(language rules unusable; using a simple letter splitter)");
        }
    }

    fn prompt(&self) {
        print!("> ");
        let _ = io::stdout().flush();
    }
}

fn render_tokens(snapshot: &ReaderSnapshot) -> String {
    let mut out = String::new();
    for token in &snapshot.tokens {
        if !out.is_empty() {
            out.push_str(&token.leading);
        }
        let selected = snapshot
            .selection
            .as_ref()
            .is_some_and(|selection| selection.token == token.index);
        match (token.kind, token.comfort) {
            (TokenKind::Word, Some(comfort)) if selected => {
                out.push_str(&format!("{{{}}}{}", token.text, comfort.level()));
            }
            (TokenKind::Word, Some(comfort)) => {
                out.push_str(&format!("{}[{}:{}]", token.text, token.index, comfort.level()));
            }
            _ => out.push_str(&token.text),
        }
    }
    out
}

fn print_selection(selection: &lexileaf_core::session::SelectionView) {
    println!(
        "{} (comfort {}) = {}",
        selection.word,
        selection.comfort.level(),
        selection.translation.as_deref().unwrap_or("?")
    );
    if let Some(sentence) = &selection.sentence {
        println!("  \"{sentence}\"");
    }
    for (idx, suggestion) in selection.suggestions.iter().enumerate() {
        println!("  {}. {suggestion}", idx + 1);
    }
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let number = |what: &str| -> Result<usize, String> {
        rest.parse::<usize>()
            .map_err(|_| format!("{head}: expected {what}, got {rest:?}"))
    };

    let input = match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Input::Next,
        "p" | "prev" => Input::Prev,
        "page" => Input::Page(number("a page number")?.saturating_sub(1)),
        "sel" | "select" => Input::Select(number("a token index")?),
        "clear" => Input::Clear,
        "rate" => {
            let level = rest
                .parse::<u8>()
                .map_err(|_| format!("rate: expected 0-5, got {rest:?}"))?;
            Input::Comfort(level)
        }
        "tr" | "translate" => Input::Translate((!rest.is_empty()).then(|| rest.to_string())),
        "pick" => Input::Pick(number("a suggestion number")?),
        "size" => Input::PageSize(number("a page size")?),
        "play" if rest.is_empty() => Input::Play(None),
        "play" => Input::Play(Some(number("a token index")?)),
        "pause" => Input::Pause,
        "resume" => Input::Resume,
        "stop" => Input::Stop,
        "show" => Input::Show,
        "help" | "?" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command {other:?}; type help")),
    };
    Ok(Some(input))
}

/// Resolve prompt input against the current view. Word commands act on the
/// selected word.
fn to_command(input: Input, snapshot: &ReaderSnapshot) -> Result<SessionCommand, String> {
    let selected = || {
        snapshot
            .selection
            .as_ref()
            .ok_or_else(|| "select a word first (sel N)".to_string())
    };
    let command = match input {
        Input::Next => SessionCommand::NextPage,
        Input::Prev => SessionCommand::PrevPage,
        Input::Page(page) => SessionCommand::SetPage { page },
        Input::Select(token) => SessionCommand::SelectToken { token },
        Input::Clear => SessionCommand::ClearSelection,
        Input::Comfort(level) => SessionCommand::SetComfort {
            word: selected()?.word_id.clone(),
            level,
        },
        Input::Translate(text) => SessionCommand::SetTranslation {
            word: selected()?.word_id.clone(),
            text,
        },
        Input::Pick(number) => {
            let selection = selected()?;
            let text = number
                .checked_sub(1)
                .and_then(|idx| selection.suggestions.get(idx))
                .ok_or_else(|| format!("no suggestion {number}"))?;
            SessionCommand::SetTranslation {
                word: selection.word_id.clone(),
                text: Some(text.clone()),
            }
        }
        Input::PageSize(page_size) => SessionCommand::SetPageSize { page_size },
        Input::Play(from) => SessionCommand::NarrationPlay { from },
        Input::Pause => SessionCommand::NarrationPause,
        Input::Resume => SessionCommand::NarrationResume,
        Input::Stop => SessionCommand::NarrationStop,
        Input::Show | Input::Help | Input::Quit => {
            return Err("not a session command".to_string());
        }
    };
    Ok(command)
}

fn spawn_stdin_reader(tx: Sender<Message>) -> Result<()> {
    thread::Builder::new()
        .name("lexileaf-input".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(Message::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(Message::InputClosed);
        })?;
    Ok(())
}

fn spawn_suggestion_worker(
    service: HttpSuggestionService,
    tx: Sender<Message>,
) -> Result<Sender<SuggestionRequest>> {
    let (request_tx, request_rx) = mpsc::channel::<SuggestionRequest>();
    thread::Builder::new()
        .name("lexileaf-suggest".to_string())
        .spawn(move || {
            for request in request_rx {
                let suggestions = service.suggest(
                    &request.word,
                    &request.source_language,
                    &request.target_language,
                );
                if tx
                    .send(Message::Suggestions {
                        request,
                        suggestions,
                    })
                    .is_err()
                {
                    return;
                }
            }
        })?;
    Ok(request_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexileaf_core::language::builtin_rules;
    use lexileaf_core::narration::{NarrationState, NullNarrator};
    use lexileaf_core::session::{NarrationView, ProgressView, SelectionView};
    use lexileaf_core::store::{ArticleId, Comfort, MemoryStore, WordId};
    use lexileaf_core::{SessionSettings, import_article};

    fn snapshot(selection: Option<SelectionView>) -> ReaderSnapshot {
        ReaderSnapshot {
            article_id: ArticleId("a".to_string()),
            title: "T".to_string(),
            language: "es".to_string(),
            current_page: 0,
            page_size: 250,
            tokens: Vec::new(),
            highlighted_token: None,
            selection,
            narration: NarrationView {
                state: NarrationState::Idle,
                available: true,
                current_token: None,
            },
            progress: ProgressView {
                token_pages: 1,
                vocabulary_pages: 1,
                progress_pct: 100.0,
                distinct_words: 0,
                seen_words: 0,
                comfort_counts: vec![0; 6],
            },
            degraded_rules: false,
        }
    }

    fn selection() -> SelectionView {
        SelectionView {
            token: 0,
            word_id: WordId("w1".to_string()),
            word: "casa".to_string(),
            comfort: Comfort::UNSEEN,
            translation: None,
            suggestions: vec!["house".to_string(), "home".to_string()],
            sentence: None,
        }
    }

    #[test]
    fn parses_prompt_commands() {
        assert_eq!(parse_input("  "), Ok(None));
        assert_eq!(parse_input("n"), Ok(Some(Input::Next)));
        assert_eq!(parse_input("page 3"), Ok(Some(Input::Page(2))));
        assert_eq!(parse_input("play"), Ok(Some(Input::Play(None))));
        assert_eq!(parse_input("play 12"), Ok(Some(Input::Play(Some(12)))));
        assert_eq!(
            parse_input("tr la casa"),
            Ok(Some(Input::Translate(Some("la casa".to_string()))))
        );
        assert_eq!(parse_input("tr"), Ok(Some(Input::Translate(None))));
        assert!(parse_input("rate high").is_err());
        assert!(parse_input("dance").is_err());
    }

    #[test]
    fn word_commands_need_a_selection() {
        assert!(to_command(Input::Comfort(3), &snapshot(None)).is_err());
        assert_eq!(
            to_command(Input::Comfort(3), &snapshot(Some(selection()))),
            Ok(SessionCommand::SetComfort {
                word: WordId("w1".to_string()),
                level: 3
            })
        );
    }

    #[test]
    fn pick_uses_one_based_suggestion_numbers() {
        let view = snapshot(Some(selection()));
        assert_eq!(
            to_command(Input::Pick(2), &view),
            Ok(SessionCommand::SetTranslation {
                word: WordId("w1".to_string()),
                text: Some("home".to_string())
            })
        );
        assert!(to_command(Input::Pick(0), &view).is_err());
        assert!(to_command(Input::Pick(3), &view).is_err());
    }

    #[test]
    fn renders_source_spacing_and_marks_words() {
        let mut store = MemoryStore::new();
        let article = import_article(&mut store, "T", "es", "Hola mundo, que tal").unwrap();
        let (mut session, _) = ReadingSession::open(
            store,
            NullNarrator,
            &article.id,
            &builtin_rules(),
            SessionSettings::default(),
        )
        .unwrap();

        assert_eq!(
            render_tokens(&session.snapshot()),
            "Hola[0:0] mundo[1:0], que[3:0] tal[4:0]"
        );

        session.apply(SessionCommand::SelectToken { token: 1 });
        assert_eq!(
            render_tokens(&session.snapshot()),
            "Hola[0:0] {mundo}0, que[3:0] tal[4:0]"
        );
    }
}
