// パス: src/repl/cmd.rs
// 役割: 入力行をコマンド表と照合し、一致したハンドラを呼び出す
// 意図: 式として評価される前に、セッション制御用のコマンド行を横取りする
// 関連ファイル: src/repl/reader.rs, src/repl/session.rs, src/repl/printer.rs
//! コマンド表と標準コマンド群。
//!
//! - 照合は定義順で、最初に一致したものだけが動く（最良一致ではない）。
//! - キーは固定文字列の集合か、捕獲グループ付きの正規表現。前後の空白を除いた行と照合する。
//! - ハンドラは保留バッファを空にしてその行を評価対象から外せる。巻き戻しを起こしてもよい。

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::config::OutputRef;
use super::context::{ContextRef, Target};
use super::printer::{render_command_help, render_help};
use super::session::Session;
use super::state::Frame;
use crate::errors::Interrupt;
use crate::value::{Outcome, Value};

static HELP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^help(?:\s+(\S+))?$").expect("help パターンは固定"));
static CD_UP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cd\s*\.\.$").expect("cd .. パターンは固定"));
static CD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cd\s+(.+)$").expect("cd パターンは固定"));
static JUMP_TO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^jump_to\s*(\d*)$").expect("jump_to パターンは固定"));

/// コマンドキーの 1 要素。
#[derive(Clone, Debug)]
pub enum Matcher {
    Literal(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn literal(text: impl Into<String>) -> Self {
        Matcher::Literal(text.into())
    }

    pub fn pattern(re: &str) -> Result<Self, regex::Error> {
        Regex::new(re).map(Matcher::Pattern)
    }

    /// 一致すれば捕獲グループ（1 番目以降）を返す。固定文字列では常に空。
    fn captures(&self, line: &str) -> Option<Vec<Option<String>>> {
        match self {
            Matcher::Literal(text) => (text == line).then(Vec::new),
            Matcher::Pattern(re) => re.captures(line).map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect()
            }),
        }
    }
}

impl From<&str> for Matcher {
    fn from(text: &str) -> Self {
        Matcher::literal(text)
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        Matcher::Pattern(re)
    }
}

pub type Handler = Rc<dyn Fn(&mut CommandContext<'_>) -> Result<(), Interrupt>>;

/// ハンドラへ渡す引数束。
pub struct CommandContext<'a> {
    pub captures: Vec<Option<String>>,
    pub buffer: &'a mut String,
    pub context: &'a ContextRef,
    pub line: &'a str,
    pub nesting: Vec<Frame>,
    pub output: OutputRef,
    pub session: &'a Session,
}

impl CommandContext<'_> {
    pub fn capture(&self, idx: usize) -> Option<&str> {
        self.captures.get(idx).and_then(|c| c.as_deref())
    }

    /// 現在の入れ子レベル（最内フレームの深さ）。
    pub fn level(&self) -> usize {
        self.nesting.last().map(|f| f.depth).unwrap_or(0)
    }

    pub fn say(&self, msg: impl fmt::Display) -> Result<(), Interrupt> {
        writeln!(self.output.borrow_mut(), "{}", msg)?;
        Ok(())
    }
}

pub struct Command {
    keys: Vec<Matcher>,
    usage: String,
    description: String,
    handler: Handler,
}

impl Command {
    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    fn matches(&self, line: &str) -> Option<Vec<Option<String>>> {
        self.keys.iter().find_map(|k| k.captures(line))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("keys", &self.keys)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// 定義順を保つコマンド表。
#[derive(Debug, Default)]
pub struct CommandSet {
    commands: Vec<Command>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// コマンドを末尾に追加する。
    pub fn command(
        mut self,
        keys: Vec<Matcher>,
        usage: &str,
        description: &str,
        handler: impl Fn(&mut CommandContext<'_>) -> Result<(), Interrupt> + 'static,
    ) -> Self {
        self.commands.push(Command {
            keys,
            usage: usage.to_string(),
            description: description.to_string(),
            handler: Rc::new(handler),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// 最初に一致したコマンドと捕獲グループ。
    pub fn find(&self, line: &str) -> Option<(&Command, Vec<Option<String>>)> {
        let line = line.trim();
        self.commands
            .iter()
            .find_map(|c| c.matches(line).map(|caps| (c, caps)))
    }

    /// `help NAME` 用の検索。キーとの一致か、使用法の先頭語との一致で探す。
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.find(name).map(|(c, _)| c).or_else(|| {
            self.commands.iter().find(|c| {
                c.usage
                    .split(", ")
                    .any(|u| u.split_whitespace().next() == Some(name))
            })
        })
    }

    /// 一致したコマンドがあれば実行し、実行したかどうかを返す。
    pub fn dispatch(
        &self,
        line: &str,
        buffer: &mut String,
        context: &ContextRef,
        session: &Session,
    ) -> Result<bool, Interrupt> {
        let Some((command, captures)) = self.find(line) else {
            return Ok(false);
        };
        debug!(command = %command.usage, "command dispatched");
        let handler = Rc::clone(&command.handler);
        let mut cx = CommandContext {
            captures,
            buffer,
            context,
            line,
            nesting: session.manager().nesting(),
            output: Rc::clone(&session.config().output),
            session,
        };
        handler(&mut cx)?;
        Ok(true)
    }

    /// 標準コマンド群。どのハンドラも保留バッファを空にする。
    pub fn standard() -> Self {
        Self::new()
            .command(
                vec!["exit_program".into(), "quit_program".into()],
                "exit_program, quit_program",
                "End the program",
                |cx| {
                    cx.buffer.clear();
                    Err(Interrupt::Exit(0))
                },
            )
            .command(vec!["!".into()], "!", "Clear the input buffer", |cx| {
                cx.buffer.clear();
                cx.say("Input buffer cleared")
            })
            .command(
                vec![Regex::clone(&HELP_PATTERN).into()],
                "help [name]",
                "Show the command list, or the help for one command",
                |cx| {
                    cx.buffer.clear();
                    let commands = Rc::clone(&cx.session.config().commands);
                    let mut out = cx.output.borrow_mut();
                    match cx.capture(0) {
                        None => render_help(&mut *out, &commands)?,
                        Some(name) => match commands.lookup(name) {
                            Some(command) => render_command_help(&mut *out, command)?,
                            None => writeln!(out, "No such command: {}", name)?,
                        },
                    }
                    Ok(())
                },
            )
            .command(vec!["nesting".into()], "nesting", "Show the nesting stack", |cx| {
                cx.buffer.clear();
                cx.say("Nesting status:")?;
                cx.say("--")?;
                for frame in &cx.nesting {
                    if frame.depth == 0 {
                        cx.say(format_args!("{}. {} (top level)", frame.depth, frame.receiver.inspect()))?;
                    } else {
                        cx.say(format_args!("{}. {}", frame.depth, frame.receiver.inspect()))?;
                    }
                }
                Ok(())
            })
            .command(
                vec!["status".into()],
                "status",
                "Show receiver, nesting level and last result",
                |cx| {
                    cx.buffer.clear();
                    let last = cx.session.manager().last_result();
                    cx.say("Status:")?;
                    cx.say("--")?;
                    cx.say(format_args!("Receiver: {}", cx.context.receiver().inspect()))?;
                    cx.say(format_args!("Nesting level: {}", cx.level()))?;
                    cx.say(format_args!("Last result: {}", last.inspect()))
                },
            )
            .command(vec!["ls".into()], "ls", "List the names bound in this context", |cx| {
                cx.buffer.clear();
                let names = cx
                    .context
                    .binding_names()
                    .into_iter()
                    .map(Value::Str)
                    .collect();
                cx.say(Value::List(names).inspect())
            })
            .command(
                vec!["exit_all".into()],
                "exit_all",
                "Leave every session back to the caller of the top level",
                |cx| {
                    cx.buffer.clear();
                    Err(Interrupt::Breakout(0))
                },
            )
            .command(
                vec![
                    "exit".into(),
                    "quit".into(),
                    "back".into(),
                    Regex::clone(&CD_UP_PATTERN).into(),
                ],
                "exit, quit, back",
                "Leave the current session (`cd ..` does the same)",
                |cx| {
                    cx.buffer.clear();
                    Err(Interrupt::Breakout(cx.level()))
                },
            )
            .command(
                vec![Regex::clone(&CD_PATTERN).into()],
                "cd <expr>",
                "Start a nested session on the value of <expr>",
                |cx| {
                    cx.buffer.clear();
                    let Some(source) = cx.capture(0).map(str::to_string) else {
                        return Ok(());
                    };
                    match cx.context.evaluate(&source, cx.session)? {
                        Outcome::Value(target) => {
                            cx.session.nest(Target::Object(target))?;
                            Ok(())
                        }
                        fault @ Outcome::Fault(_) => cx.session.print(&fault),
                    }
                },
            )
            .command(
                vec![Regex::clone(&JUMP_TO_PATTERN).into()],
                "jump_to <level>",
                "Unwind to the given nesting level",
                |cx| {
                    cx.buffer.clear();
                    let level = cx.level();
                    let raw = cx.capture(0).unwrap_or("").to_string();
                    let requested: Option<usize> = if raw.is_empty() {
                        Some(0)
                    } else {
                        raw.parse().ok()
                    };
                    match requested {
                        Some(n) if n == level => {
                            cx.say(format_args!("Already at nesting level {}", level))
                        }
                        Some(n) if n < level => Err(Interrupt::Breakout(n + 1)),
                        _ => cx.say(format_args!(
                            "Invalid nest level. Must be between 0 and {}. Got {}.",
                            level as i64 - 1,
                            if raw.is_empty() { "0" } else { raw.as_str() }
                        )),
                    }
                },
            )
    }
}
