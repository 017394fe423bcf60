// パス: src/errors.rs
// 役割: 字句・構文エラーとセッション間を伝搬する制御シグナルを定義する
// 意図: 評価時の障害 (Fault) と脱出シグナル (Interrupt) の経路を型で分離する
// 関連ファイル: src/lexer.rs, src/parser.rs, src/repl/session.rs
//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col / @pos）。

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;

use thiserror::Error;

/// 入力が途中で終わったことを示す構文エラーコード。
pub const INCOMPLETE_CODES: &[&str] = &["PAR001", "LEX002"];

#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>,      // バイトオフセット（任意）
    pub line: Option<usize>,     // 1-origin（任意）
    pub col: Option<usize>,      // 1-origin（任意）
    pub snippet: Option<String>, // エラー行のスニペット（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line: None,
            col: None,
            snippet: None,
        }
    }
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line,
            col,
            snippet: None,
        }
    }
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.line, self.col, self.pos) {
            (Some(l), Some(c), _) => write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)?,
            (_, _, Some(p)) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p)?,
            _ => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        if let (Some(s), Some(c)) = (&self.snippet, self.col) {
            let caret = " ".repeat(c.saturating_sub(1)) + "^";
            write!(f, "\n{}\n{}", s, caret)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LexerError(pub ErrorInfo);
impl LexerError {
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self(ErrorInfo::at(code, msg, pos, line, col))
    }
}

#[derive(Debug, Clone)]
pub struct ParseError(pub ErrorInfo);
impl ParseError {
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self(ErrorInfo::at(code, msg, pos, line, col))
    }

    /// 入力不足（後続行で解消しうる）エラーかどうか。
    pub fn is_incomplete(&self) -> bool {
        INCOMPLETE_CODES.contains(&self.0.code)
    }
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        Self(err.0)
    }
}

impl Display for LexerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for LexerError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for ParseError {}

/// セッションの活性化レコードをまたいで伝搬する制御シグナル。
///
/// 評価中の障害はここに含めず `Outcome::Fault` として値の側で運ぶ。
#[derive(Debug, Error)]
pub enum Interrupt {
    /// 指定した入れ子レベルを開始した活性化まで巻き戻す。
    #[error("breakout to nesting level {0}")]
    Breakout(usize),
    /// 評価コードからのプロセス終了要求。
    #[error("exit requested with status {0}")]
    Exit(i32),
    /// 入力元が尽きた。
    #[error("end of input")]
    EndOfInput,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::{ErrorInfo, Interrupt, LexerError, ParseError};

    #[test]
    /// 行・列付きのエラーがスニペットとキャレットを含めて整形されるか確認する。
    fn error_info_renders_snippet_with_caret() {
        let info = ErrorInfo::at("PAR002", "unexpected token", Some(4), Some(1), Some(5))
            .with_snippet("1 + )");
        assert_eq!(
            info.to_string(),
            "[PAR002] unexpected token @line=1,col=5\n1 + )\n    ^"
        );
    }

    #[test]
    /// 入力不足コードのみが incomplete と判定されることを確認する。
    fn parse_error_incomplete_codes() {
        let eof = ParseError::at("PAR001", "unexpected end of input", None, None, None);
        assert!(eof.is_incomplete());
        let lex: ParseError =
            LexerError::at("LEX002", "unterminated string", Some(0), Some(1), Some(1)).into();
        assert!(lex.is_incomplete());
        let other = ParseError::at("PAR002", "unexpected token", None, None, None);
        assert!(!other.is_incomplete());
    }

    #[test]
    /// I/O エラーが `?` 経由で Interrupt に変換されることを確認する。
    fn interrupt_from_io_error() {
        fn fails() -> Result<(), Interrupt> {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Interrupt::Io(_))));
        assert_eq!(Interrupt::Breakout(2).to_string(), "breakout to nesting level 2");
    }
}
