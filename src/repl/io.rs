// パス: src/repl/io.rs
// 役割: セッションの入出力協調者（行入力元・出力先）を定義する
// 意図: 端末・ファイル・テスト台本を同じ `LineSource` 越しに差し替えられるようにする
// 関連ファイル: src/repl/line_editor.rs, src/repl/reader.rs, src/repl/config.rs
//! 入出力の協調者。
//!
//! - `LineSource`: プロンプトを受け取り 1 行を返す入力元。
//! - `ScriptedInput`: 行の待ち行列を順に返し、尽きたら `Eof` を返すテスト用入力元。
//! - `PlainInput`: 任意の `BufRead` から行を読む非対話入力元。
//! - `SharedBuffer`: 複数の所有者から書き込める出力先。テストで出力を検査するのに使う。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// 行入力が返す 3 種類の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Line(String),
    Eof,
    Interrupted,
}

/// 1 行ずつ入力を供給する協調者。読み取りはブロックしてよい。
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;

    /// 空でない入力行を履歴へ登録する。履歴を持たない入力元では何もしない。
    fn add_history(&mut self, _entry: &str) {}
}

/// 台本どおりに行を返す入力元。表示されたプロンプトと履歴も記録する。
#[derive(Debug, Default)]
pub struct ScriptedInput {
    queue: VecDeque<ReadResult>,
    prompts: Vec<String>,
    history: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(lines.into_iter().map(|l| ReadResult::Line(l.into())))
    }

    pub fn from_results(results: impl IntoIterator<Item = ReadResult>) -> Self {
        Self {
            queue: results.into_iter().collect(),
            prompts: Vec::new(),
            history: Vec::new(),
        }
    }

    /// これまでに提示されたプロンプト（呼び出し順）。
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        self.prompts.push(prompt.to_string());
        Ok(self.queue.pop_front().unwrap_or(ReadResult::Eof))
    }

    fn add_history(&mut self, entry: &str) {
        self.history.push(entry.to_string());
    }
}

/// `BufRead` から改行区切りで読む入力元。`echo` があればプロンプトをそこへ書く。
pub struct PlainInput<R: BufRead> {
    reader: R,
    echo: Option<Box<dyn Write>>,
}

impl<R: BufRead> PlainInput<R> {
    /// プロンプトを表示しない（スクリプト実行向け）。
    pub fn silent(reader: R) -> Self {
        Self { reader, echo: None }
    }

    pub fn with_echo(reader: R, echo: Box<dyn Write>) -> Self {
        Self {
            reader,
            echo: Some(echo),
        }
    }
}

impl<R: BufRead> LineSource for PlainInput<R> {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        if let Some(echo) = self.echo.as_mut() {
            write!(echo, "{}", prompt)?;
            echo.flush()?;
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(ReadResult::Eof);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(ReadResult::Line(line))
    }
}

/// 共有可能なメモリ上の出力先。
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに書かれた内容を（不正な UTF-8 は置換して）文字列で返す。
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LineSource, PlainInput, ReadResult, ScriptedInput, SharedBuffer};
    use std::io::{Cursor, Write};

    #[test]
    /// 台本の行を順に返し、尽きたら Eof を返し続けることを確認する。
    fn scripted_input_replays_then_reports_eof() {
        let mut input = ScriptedInput::new(["1 + 1", "exit"]);
        assert_eq!(input.read_line("> ").unwrap(), ReadResult::Line("1 + 1".into()));
        assert_eq!(input.read_line("* ").unwrap(), ReadResult::Line("exit".into()));
        assert_eq!(input.read_line("> ").unwrap(), ReadResult::Eof);
        assert_eq!(input.read_line("> ").unwrap(), ReadResult::Eof);
        assert_eq!(input.prompts(), &["> ", "* ", "> ", "> "]);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    /// 改行コード（LF / CRLF）が取り除かれ、終端で Eof になることを確認する。
    fn plain_input_strips_line_endings() {
        let mut input = PlainInput::silent(Cursor::new("a\r\nb\nc"));
        assert_eq!(input.read_line("").unwrap(), ReadResult::Line("a".into()));
        assert_eq!(input.read_line("").unwrap(), ReadResult::Line("b".into()));
        assert_eq!(input.read_line("").unwrap(), ReadResult::Line("c".into()));
        assert_eq!(input.read_line("").unwrap(), ReadResult::Eof);
    }

    #[test]
    /// エコー先を指定した場合はプロンプトが書き出される。
    fn plain_input_echoes_prompt() {
        let echo = SharedBuffer::new();
        let mut input = PlainInput::with_echo(Cursor::new("x\n"), Box::new(echo.clone()));
        input.read_line("calc> ").unwrap();
        assert_eq!(echo.contents(), "calc> ");
    }

    #[test]
    fn shared_buffer_is_shared_between_clones() {
        let buf = SharedBuffer::new();
        let mut writer = buf.clone();
        write!(writer, "hello").unwrap();
        assert_eq!(buf.contents(), "hello");
        buf.clear();
        assert_eq!(writer.contents(), "");
    }
}
