use std::borrow::Cow;
use std::collections::HashSet;

use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{EditMode, Helper, Highlighter, Hinter, Validator};

use nanoscript::lexer::{is_alpha, tokenize};
use nanoscript::{EnvRef, Environment, TokenKind, init_tracing, run};

const HISTORY_FILE: &str = "nanoscript_history.txt";
const KEYWORDS: [&str; 3] = ["let", "const", "fn"];

struct NanoCompleter {
    env: EnvRef,
}

impl NanoCompleter {
    fn new(env: EnvRef) -> Self {
        NanoCompleter { env }
    }

    fn candidates(&self, prefix: &str) -> Vec<String> {
        let mut names: HashSet<String> = self.env.borrow().identifiers();
        names.extend(KEYWORDS.iter().map(|k| k.to_string()));
        let mut matches: Vec<String> = names
            .into_iter()
            .filter(|name| name.starts_with(prefix) && name != prefix)
            .collect();
        matches.sort();
        matches
    }
}

impl rustyline::completion::Completer for NanoCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let before = &line[..pos];
        let start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_alpha(*c))
            .last()
            .map_or(pos, |(i, _)| i);
        if start == pos {
            return Ok((pos, vec![]));
        }
        Ok((start, self.candidates(&before[start..])))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct ReplHelper {
    #[rustyline(Validator)]
    validator: BalanceValidator,
    #[rustyline(Highlighter)]
    highlighter: NanoHighlighter,
    #[rustyline(Completer)]
    completer: NanoCompleter,
}

fn closes(opening: char, closing: char) -> bool {
    matches!((opening, closing), ('(', ')') | ('[', ']') | ('{', '}'))
}

struct BalanceValidator;

impl Validator for BalanceValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut stack = Vec::new();

        for (i, c) in ctx.input().char_indices() {
            match c {
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => match stack.pop() {
                    Some(opening) if closes(opening, c) => {}
                    _ => {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched '{}' at position {}",
                            c, i
                        ))));
                    }
                },
                _ => {}
            }
        }

        if stack.is_empty() {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

struct NanoHighlighter;

impl NanoHighlighter {
    // Byte offsets of the bracket under the cursor and its partner, if any
    fn matching_pair(line: &str, pos: usize) -> Option<(usize, usize)> {
        let mut stack: Vec<(char, usize)> = Vec::new();
        let mut pairs = Vec::new();
        for (i, c) in line.char_indices() {
            match c {
                '(' | '[' | '{' => stack.push((c, i)),
                ')' | ']' | '}' => {
                    if let Some((opening, start)) = stack.pop() {
                        if closes(opening, c) {
                            pairs.push((start, i));
                        }
                    }
                }
                _ => {}
            }
        }
        pairs.into_iter().find(|&(open, close)| {
            [pos, pos.wrapping_sub(1)]
                .iter()
                .any(|&p| p == open || p == close)
        })
    }
}

impl Highlighter for NanoHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let Ok(tokens) = tokenize(line) else {
            return Cow::Borrowed(line);
        };
        let pair = Self::matching_pair(line, pos);
        let mut highlighted = String::with_capacity(line.len() * 2);
        let mut cursor = 0;

        for token in tokens.iter().filter(|t| t.kind != TokenKind::EndOfInput) {
            let range = token.span.to_range();
            highlighted.push_str(&line[cursor..range.start]);
            let text = &line[range.clone()];
            let is_paired =
                pair.is_some_and(|(open, close)| range.start == open || range.start == close);
            match token.kind {
                _ if is_paired => highlighted.push_str(&format!("\x1b[1;34m{}\x1b[0m", text)),
                kind if kind.is_keyword() => {
                    highlighted.push_str(&format!("\x1b[35m{}\x1b[0m", text))
                }
                TokenKind::Number => highlighted.push_str(&format!("\x1b[33m{}\x1b[0m", text)),
                _ => highlighted.push_str(text),
            }
            cursor = range.end;
        }
        highlighted.push_str(&line[cursor..]);

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn edit_mode() -> EditMode {
    match std::env::var("NANOSCRIPT_EDIT_MODE").as_deref() {
        Ok("vi") => EditMode::Vi,
        _ => EditMode::Emacs,
    }
}

fn main() -> rustyline::Result<()> {
    init_tracing();
    println!("NanoScript REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let global_env = Environment::new_global();
    let helper = ReplHelper {
        highlighter: NanoHighlighter,
        validator: BalanceValidator,
        completer: NanoCompleter::new(global_env.clone()),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(edit_mode())
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(HISTORY_FILE).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("nano> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match run(input, &global_env) {
                    Ok(value) => println!("{}", value),
                    Err(err) => {
                        if err.pretty_print("<repl>", input).is_err() {
                            eprintln!("{}", err);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}
