// パス: src/repl/line_editor.rs
// 役割: 端末向けの行エディタ（カーソル移動・行頭/行末・行消去・セッション中の履歴呼び出し）
// 意図: 既定の入力元として、標準入力が端末なら Raw モード編集、そうでなければ素の行読みを行う
// 関連ファイル: src/repl/io.rs, src/repl/config.rs, src/bin/nestrepl.rs
//! 既定の入力元。
//!
//! 編集ループ `edit_line` は任意の `Read`/`Write` 上で動くので、端末なしでも検証できる。
//! 端末固有の処理は Raw モードの切り替え（`RawMode`）だけに閉じ込める。
//! 履歴はメモリ上だけに保持し、プロセス終了とともに捨てる。

use std::io::{self, IsTerminal, Read, Write};

use super::io::{LineSource, PlainInput, ReadResult};

const HISTORY_LIMIT: usize = 1000;

/// 履歴付きの行編集を提供する簡易ラインエディタ。
pub struct LineEditor {
    history: History,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            history: History::with_limit(HISTORY_LIMIT),
        }
    }

    /// プロンプトを出力し、1 行分の入力または制御シグナルを取得する。
    pub fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        if !io::stdin().is_terminal() {
            return self.read_plain(prompt);
        }
        #[cfg(unix)]
        {
            let _raw = RawMode::enable()?;
            let stdin = io::stdin();
            edit_line(&mut stdin.lock(), &mut io::stdout(), prompt, &self.history)
        }
        #[cfg(not(unix))]
        {
            self.read_plain(prompt)
        }
    }

    fn read_plain(&mut self, prompt: &str) -> io::Result<ReadResult> {
        PlainInput::with_echo(io::stdin().lock(), Box::new(io::stdout())).read_line(prompt)
    }
}

impl LineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        LineEditor::read_line(self, prompt)
    }

    fn add_history(&mut self, entry: &str) {
        self.history.push(entry);
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// キー入力を 1 行分読み、確定・中断・終端のいずれかで返す。
#[cfg_attr(not(unix), allow(dead_code))]
fn edit_line<R: Read, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    history: &History,
) -> io::Result<ReadResult> {
    write!(out, "{}", prompt)?;
    out.flush()?;
    let mut line = LineBuffer::default();
    let mut recall = Recall::new(history);
    loop {
        let Some(key) = next_key(input)? else {
            return Ok(ReadResult::Eof);
        };
        let changed = match key {
            Key::Enter => {
                write!(out, "\r\n")?;
                out.flush()?;
                return Ok(ReadResult::Line(line.text()));
            }
            Key::CtrlC => {
                write!(out, "^C\r\n")?;
                out.flush()?;
                return Ok(ReadResult::Interrupted);
            }
            Key::CtrlD if line.is_empty() => {
                write!(out, "\r\n")?;
                out.flush()?;
                return Ok(ReadResult::Eof);
            }
            Key::CtrlD => line.delete_right(),
            Key::Backspace => line.delete_left(),
            Key::Left => line.left(),
            Key::Right => line.right(),
            Key::Home => line.home(),
            Key::End => line.end(),
            Key::KillLine => line.kill(),
            Key::Up => recall.older(&mut line),
            Key::Down => recall.newer(&mut line),
            Key::Char(ch) => {
                line.insert(ch);
                recall.detach();
                true
            }
            Key::Other => false,
        };
        if changed {
            redraw(out, prompt, &line)?;
        }
    }
}

/// 編集操作に翻訳したキー入力。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Key {
    Enter,
    CtrlC,
    CtrlD,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    KillLine,
    Char(char),
    Other,
}

/// 入力から次のキーを 1 つ取り出す。入力が尽きていれば `None`。
fn next_key<R: Read>(input: &mut R) -> io::Result<Option<Key>> {
    let Some(first) = read_byte(input)? else {
        return Ok(None);
    };
    let key = match first {
        b'\r' | b'\n' => Key::Enter,
        0x01 => Key::Home,
        0x03 => Key::CtrlC,
        0x04 => Key::CtrlD,
        0x05 => Key::End,
        0x15 => Key::KillLine,
        0x08 | 0x7f => Key::Backspace,
        0x1b => escape_sequence(input)?,
        0x00..=0x1f => Key::Other,
        lead => match decode_utf8(lead, input)? {
            Some(ch) => Key::Char(ch),
            None => Key::Other,
        },
    };
    Ok(Some(key))
}

/// `ESC [ X` 形式の矢印キーと Home/End を読む。途中で切れた列は無視する。
fn escape_sequence<R: Read>(input: &mut R) -> io::Result<Key> {
    if read_byte(input)? != Some(b'[') {
        return Ok(Key::Other);
    }
    Ok(match read_byte(input)? {
        Some(b'A') => Key::Up,
        Some(b'B') => Key::Down,
        Some(b'C') => Key::Right,
        Some(b'D') => Key::Left,
        Some(b'H') => Key::Home,
        Some(b'F') => Key::End,
        _ => Key::Other,
    })
}

fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match input.read(&mut byte)? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}

/// 先頭バイトから幅を決めて UTF-8 の 1 文字を組み立てる。不正な列は `None`。
fn decode_utf8<R: Read>(lead: u8, input: &mut R) -> io::Result<Option<char>> {
    let width = match lead {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Ok(None),
    };
    let mut bytes = [lead, 0, 0, 0];
    if width > 1 {
        input.read_exact(&mut bytes[1..width])?;
    }
    Ok(std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next()))
}

/// 編集中の 1 行。各操作は表示の更新が必要なら `true` を返す。
#[derive(Debug, Default)]
struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl LineBuffer {
    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn insert(&mut self, ch: char) {
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    fn delete_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    fn delete_right(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    fn left(&mut self) -> bool {
        let moved = self.cursor > 0;
        self.cursor = self.cursor.saturating_sub(1);
        moved
    }

    fn right(&mut self) -> bool {
        let moved = self.cursor < self.chars.len();
        if moved {
            self.cursor += 1;
        }
        moved
    }

    fn home(&mut self) -> bool {
        std::mem::replace(&mut self.cursor, 0) != 0
    }

    fn end(&mut self) -> bool {
        let end = self.chars.len();
        std::mem::replace(&mut self.cursor, end) != end
    }

    fn kill(&mut self) -> bool {
        let had_text = !self.chars.is_empty();
        self.chars.clear();
        self.cursor = 0;
        had_text
    }

    /// 内容を置き換え、カーソルを行末へ置く。
    fn replace(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.cursor = self.chars.len();
    }
}

/// 上下キーによる履歴の辿り。履歴に入る前の入力は `stash` に退避する。
struct Recall<'a> {
    history: &'a History,
    /// 現在表示している履歴の位置。`None` は履歴の外（編集中の入力）。
    index: Option<usize>,
    stash: String,
}

impl<'a> Recall<'a> {
    fn new(history: &'a History) -> Self {
        Self {
            history,
            index: None,
            stash: String::new(),
        }
    }

    fn older(&mut self, line: &mut LineBuffer) -> bool {
        let next = match self.index {
            None if self.history.is_empty() => return false,
            None => {
                self.stash = line.text();
                self.history.len() - 1
            }
            Some(0) => return false,
            Some(i) => i - 1,
        };
        self.index = Some(next);
        line.replace(self.history.get(next).unwrap_or_default());
        true
    }

    fn newer(&mut self, line: &mut LineBuffer) -> bool {
        let Some(i) = self.index else {
            return false;
        };
        if i + 1 < self.history.len() {
            self.index = Some(i + 1);
            line.replace(self.history.get(i + 1).unwrap_or_default());
        } else {
            self.index = None;
            line.replace(&self.stash);
        }
        true
    }

    /// 文字が打たれたら履歴の外に出たものとみなす。
    fn detach(&mut self) {
        self.index = None;
    }
}

/// プロンプトと行を描き直し、カーソルを編集位置へ戻す。
fn redraw<W: Write>(out: &mut W, prompt: &str, line: &LineBuffer) -> io::Result<()> {
    write!(out, "\r{}{}\x1b[K", prompt, line.text())?;
    let back = line.chars.len() - line.cursor;
    if back > 0 {
        write!(out, "\x1b[{}D", back)?;
    }
    out.flush()
}

/// セッション中の入力履歴（古いものから順）。
struct History {
    entries: Vec<String>,
    limit: usize,
}

impl History {
    fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    /// 前後の空白を除いて追加する。空行と直前と同じ入力は捨てる。
    fn push(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() || self.entries.last().map(String::as_str) == Some(entry) {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.remove(0);
        }
        self.entries.push(entry.to_string());
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(String::as_str)
    }
}

/// 標準入力を Raw モードにし、破棄時に元の端末属性へ戻すガード。
#[cfg(unix)]
struct RawMode {
    saved: Termios,
}

#[cfg(unix)]
impl RawMode {
    #[allow(unexpected_cfgs)]
    #[cfg_attr(coverage, coverage(off))]
    fn enable() -> io::Result<Self> {
        let mut saved = Termios::zeroed();
        // SAFETY: `Termios` はどの対応 OS の `struct termios` よりも大きく、8 バイト境界に揃えてある。
        if unsafe { tcgetattr(STDIN_FD, &mut saved) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut raw = saved;
        unsafe { cfmakeraw(&mut raw) };
        if unsafe { tcsetattr(STDIN_FD, TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { saved })
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    #[allow(unexpected_cfgs)]
    #[cfg_attr(coverage, coverage(off))]
    fn drop(&mut self) {
        unsafe {
            let _ = tcsetattr(STDIN_FD, TCSANOW, &self.saved);
        }
    }
}

#[cfg(unix)]
const STDIN_FD: i32 = 0;
#[cfg(unix)]
const TCSANOW: i32 = 0;

/// `struct termios` をそのまま受け渡すための不透明な領域。
///
/// 中身は libc 側だけが解釈するので、OS ごとのフィールド配置を写す必要はない。
#[cfg(unix)]
#[repr(C, align(8))]
#[derive(Clone, Copy)]
struct Termios([u8; 256]);

#[cfg(unix)]
impl Termios {
    fn zeroed() -> Self {
        Self([0; 256])
    }
}

#[cfg(unix)]
extern "C" {
    fn tcgetattr(fd: i32, termios: *mut Termios) -> i32;
    fn tcsetattr(fd: i32, optional_actions: i32, termios: *const Termios) -> i32;
    fn cfmakeraw(termios: *mut Termios);
}
