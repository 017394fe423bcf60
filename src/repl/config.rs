// パス: src/repl/config.rs
// 役割: セッション設定（6 つの協調者）と上書き指定のマージを提供する
// 意図: 既定値に呼び出し側の上書きを重ね、全フィールドが必ず埋まった設定を作る
// 関連ファイル: src/repl/state.rs, src/repl/session.rs, src/repl/printer.rs
//! セッション設定。
//!
//! 6 つの協調者（入力・出力・コマンド表・表示関数・プロンプト対・フック表）はすべて `Rc`
//! ハンドルで持ち、入れ子セッションと共有できるようにする。構築後は変更しない。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use super::cmd::CommandSet;
use super::io::LineSource;
use super::line_editor::LineEditor;
use super::printer;
use crate::value::{Outcome, Value};

pub type InputRef = Rc<RefCell<dyn LineSource>>;
pub type OutputRef = Rc<RefCell<dyn Write>>;
pub type PrintFn = Rc<dyn Fn(&mut dyn Write, &Outcome) -> io::Result<()>>;
/// `(受け手, 入れ子レベル) -> プロンプト文字列`
pub type PromptFn = Rc<dyn Fn(&Value, usize) -> String>;
pub type HookFn = Rc<dyn Fn(&mut dyn Write, &[Value]) -> io::Result<()>>;

pub const BEFORE_SESSION: &str = "before_session";
pub const AFTER_SESSION: &str = "after_session";

/// 新規行用と継続行用のプロンプト関数の対。
#[derive(Clone)]
pub struct Prompts {
    pub fresh: PromptFn,
    pub continuation: PromptFn,
}

impl Prompts {
    pub fn new(
        fresh: impl Fn(&Value, usize) -> String + 'static,
        continuation: impl Fn(&Value, usize) -> String + 'static,
    ) -> Self {
        Self {
            fresh: Rc::new(fresh),
            continuation: Rc::new(continuation),
        }
    }

    /// `nest(<receiver>)[<level>]> ` / `nest(<receiver>)[<level>]* `
    pub fn standard() -> Self {
        Self::labelled("nest")
    }

    pub fn labelled(label: &str) -> Self {
        let fresh_label = label.to_string();
        let cont_label = label.to_string();
        Self::new(
            move |receiver, level| format!("{}({})[{}]> ", fresh_label, receiver, level),
            move |receiver, level| format!("{}({})[{}]* ", cont_label, receiver, level),
        )
    }

    /// 保留バッファが空なら新規行用、そうでなければ継続行用を選ぶ。
    pub fn select(&self, buffer_empty: bool) -> &PromptFn {
        if buffer_empty {
            &self.fresh
        } else {
            &self.continuation
        }
    }
}

/// フック名 → コールバック。未登録の名前を発火しても何も起きない。
#[derive(Clone, Default)]
pub struct Hooks {
    table: HashMap<String, HookFn>,
}

impl Hooks {
    pub fn empty() -> Self {
        Self::default()
    }

    /// セッション開始・終了時に受け手を告げる既定のフック。
    pub fn standard() -> Self {
        Self::empty()
            .with(BEFORE_SESSION, |out, args| {
                writeln!(out, "Beginning session for {}", view(args))
            })
            .with(AFTER_SESSION, |out, args| {
                writeln!(out, "Ending session for {}", view(args))
            })
    }

    pub fn with(
        mut self,
        name: &str,
        hook: impl Fn(&mut dyn Write, &[Value]) -> io::Result<()> + 'static,
    ) -> Self {
        self.insert(name, hook);
        self
    }

    pub fn insert(
        &mut self,
        name: &str,
        hook: impl Fn(&mut dyn Write, &[Value]) -> io::Result<()> + 'static,
    ) {
        self.table.insert(name.to_string(), Rc::new(hook));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn fire(&self, name: &str, output: &OutputRef, args: &[Value]) -> io::Result<()> {
        let Some(hook) = self.table.get(name) else {
            return Ok(());
        };
        let mut out = output.borrow_mut();
        hook(&mut *out, args)?;
        out.flush()
    }
}

fn view(args: &[Value]) -> String {
    args.first().map(Value::inspect).unwrap_or_default()
}

/// セッション 1 つ分の設定。全フィールドが必ず埋まっている。
#[derive(Clone)]
pub struct Config {
    pub input: InputRef,
    pub output: OutputRef,
    pub commands: Rc<CommandSet>,
    pub print: PrintFn,
    pub prompts: Prompts,
    pub hooks: Hooks,
}

impl Config {
    /// 端末入力・標準出力・標準コマンド群・既定の表示とフック。
    pub fn standard() -> Self {
        Self {
            input: Rc::new(RefCell::new(LineEditor::new())),
            output: Rc::new(RefCell::new(io::stdout())),
            commands: Rc::new(CommandSet::standard()),
            print: Rc::new(printer::print_outcome),
            prompts: Prompts::standard(),
            hooks: Hooks::standard(),
        }
    }

    /// 指定された上書きだけを差し替えた設定を作る。
    pub fn merge(&self, overrides: ConfigOverrides) -> Config {
        Config {
            input: overrides.input.unwrap_or_else(|| Rc::clone(&self.input)),
            output: overrides.output.unwrap_or_else(|| Rc::clone(&self.output)),
            commands: overrides
                .commands
                .unwrap_or_else(|| Rc::clone(&self.commands)),
            print: overrides.print.unwrap_or_else(|| Rc::clone(&self.print)),
            prompts: overrides.prompts.unwrap_or_else(|| self.prompts.clone()),
            hooks: overrides.hooks.unwrap_or_else(|| self.hooks.clone()),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("commands", &self.commands.len())
            .field("hooks", &self.hooks.table.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// セッション単位の上書き指定。`None` の項目は既定値を使う。
#[derive(Clone, Default)]
pub struct ConfigOverrides {
    pub input: Option<InputRef>,
    pub output: Option<OutputRef>,
    pub commands: Option<Rc<CommandSet>>,
    pub print: Option<PrintFn>,
    pub prompts: Option<Prompts>,
    pub hooks: Option<Hooks>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: InputRef) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: OutputRef) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_commands(mut self, commands: CommandSet) -> Self {
        self.commands = Some(Rc::new(commands));
        self
    }

    pub fn with_print(
        mut self,
        print: impl Fn(&mut dyn Write, &Outcome) -> io::Result<()> + 'static,
    ) -> Self {
        self.print = Some(Rc::new(print));
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Some(hooks);
        self
    }
}
