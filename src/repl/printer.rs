// パス: src/repl/printer.rs
// 役割: 評価結果とヘルプの表示形式を提供する
// 意図: セッションと標準コマンドの出力書式を一箇所にまとめる
// 関連ファイル: src/repl/cmd.rs, src/repl/config.rs, src/value.rs
//! 既定の表示関数とヘルプ描画。

use std::io::{self, Write};

use super::cmd::{Command, CommandSet};
use crate::value::Outcome;

/// 既定の表示関数。値は `=> 検査表示`、障害は `分類: メッセージ`。
pub fn print_outcome(out: &mut dyn Write, outcome: &Outcome) -> io::Result<()> {
    match outcome {
        Outcome::Value(v) => writeln!(out, "=> {}", v.inspect()),
        Outcome::Fault(f) => writeln!(out, "{}", f),
    }
}

/// コマンド一覧を定義順に描画する。
pub(crate) fn render_help(out: &mut dyn Write, commands: &CommandSet) -> io::Result<()> {
    writeln!(out, "Command list:")?;
    writeln!(out, "--")?;
    let width = commands
        .iter()
        .map(|c| c.usage().chars().count())
        .max()
        .unwrap_or(0);
    for command in commands.iter() {
        writeln!(
            out,
            "{:<width$}  {}",
            command.usage(),
            command.description(),
            width = width
        )?;
    }
    Ok(())
}

pub(crate) fn render_command_help(out: &mut dyn Write, command: &Command) -> io::Result<()> {
    writeln!(out, "{}", command.usage())?;
    writeln!(out, "  {}", command.description())
}
