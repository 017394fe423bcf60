// パス: src/lexer.rs
// 役割: calc 言語の字句解析器とトークン定義を提供する
// 意図: 構文解析と完結判定に必要な位置付きトークンを生成する
// 関連ファイル: src/parser.rs, src/errors.rs, src/host.rs
//! 字句解析モジュール
//!
//! - 改行は文の区切りとして `NEWLINE` トークンで残す。
//! - `#` から行末まではコメントとして読み飛ばす。
//! - 閉じていない文字列は `LEX002`（入力不足）として報告し、REPL の継続入力に使わせる。

use crate::errors::LexerError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub enum TokenKind {
    EOF,
    NEWLINE,
    SEMI,
    // 演算子・記号トークン
    LPAREN,
    RPAREN,
    LBRACK,
    RBRACK,
    COMMA,
    EQUAL,
    EQ,
    NE,
    LT,
    LE,
    GT,
    GE,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    PERCENT,
    BANG,
    ANDAND,
    OROR,
    // リテラル・識別子
    INT,
    STRING,
    IDENT,
    // キーワード
    LET,
    DO,
    END,
    IF,
    THEN,
    ELSE,
    WHILE,
    TRUE,
    FALSE,
    NIL,
    SELF,
}

#[derive(Debug)]
/// 行頭オフセットを事前計算し、行・列情報を素早く算出するヘルパ。
struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + 1);
            }
        }
        Self { starts }
    }

    /// 指定バイト位置の行番号と桁位置を返す。
    fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let col = src[start..pos].chars().count() + 1;
        (idx + 1, col)
    }
}

fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "let" => TokenKind::LET,
        "do" => TokenKind::DO,
        "end" => TokenKind::END,
        "if" => TokenKind::IF,
        "then" => TokenKind::THEN,
        "else" => TokenKind::ELSE,
        "while" => TokenKind::WHILE,
        "true" => TokenKind::TRUE,
        "false" => TokenKind::FALSE,
        "nil" => TokenKind::NIL,
        "self" => TokenKind::SELF,
        _ => return None,
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// ソース全体をトークン列へ変換する。末尾には必ず `EOF` が付く。
pub fn lex(src: &str) -> Result<Vec<Token>, LexerError> {
    let map = LineMap::new(src);
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let push = |tokens: &mut Vec<Token>, kind: TokenKind, value: String, pos: usize| {
        let (line, col) = map.locate(src, pos);
        tokens.push(Token {
            kind,
            value,
            pos,
            line,
            col,
        });
    };
    let error = |code: &'static str, msg: String, pos: usize| {
        let (line, col) = map.locate(src, pos);
        LexerError::at(code, msg, Some(pos), Some(line), Some(col))
    };

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, n)| n);
        match c {
            ' ' | '\t' | '\r' => i += 1,
            '#' => {
                while i < chars.len() && chars[i].1 != '\n' {
                    i += 1;
                }
            }
            '\n' => {
                push(&mut tokens, TokenKind::NEWLINE, "\n".into(), pos);
                i += 1;
            }
            '"' => {
                let mut value = String::new();
                i += 1;
                let mut closed = false;
                while i < chars.len() {
                    let (epos, ch) = chars[i];
                    match ch {
                        '"' => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        '\\' => {
                            let Some(&(_, esc)) = chars.get(i + 1) else {
                                break;
                            };
                            value.push(match esc {
                                'n' => '\n',
                                't' => '\t',
                                '"' => '"',
                                '\\' => '\\',
                                other => {
                                    return Err(error(
                                        "LEX003",
                                        format!("unknown escape sequence `\\{}`", other),
                                        epos,
                                    ))
                                }
                            });
                            i += 2;
                        }
                        other => {
                            value.push(other);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(error("LEX002", "unterminated string literal".into(), pos));
                }
                push(&mut tokens, TokenKind::STRING, value, pos);
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|&(_, ch)| ch).collect();
                if text.parse::<i64>().is_err() {
                    return Err(error(
                        "LEX004",
                        format!("integer literal out of range: {}", text),
                        pos,
                    ));
                }
                push(&mut tokens, TokenKind::INT, text, pos);
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i].1) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|&(_, ch)| ch).collect();
                let kind = keyword(&text).unwrap_or(TokenKind::IDENT);
                push(&mut tokens, kind, text, pos);
            }
            _ => {
                let two = match (c, next) {
                    ('=', Some('=')) => Some(TokenKind::EQ),
                    ('!', Some('=')) => Some(TokenKind::NE),
                    ('<', Some('=')) => Some(TokenKind::LE),
                    ('>', Some('=')) => Some(TokenKind::GE),
                    ('&', Some('&')) => Some(TokenKind::ANDAND),
                    ('|', Some('|')) => Some(TokenKind::OROR),
                    _ => None,
                };
                if let Some(kind) = two {
                    let text: String = [c, next.unwrap_or_default()].iter().collect();
                    push(&mut tokens, kind, text, pos);
                    i += 2;
                    continue;
                }
                let kind = match c {
                    ';' => TokenKind::SEMI,
                    '(' => TokenKind::LPAREN,
                    ')' => TokenKind::RPAREN,
                    '[' => TokenKind::LBRACK,
                    ']' => TokenKind::RBRACK,
                    ',' => TokenKind::COMMA,
                    '=' => TokenKind::EQUAL,
                    '<' => TokenKind::LT,
                    '>' => TokenKind::GT,
                    '+' => TokenKind::PLUS,
                    '-' => TokenKind::MINUS,
                    '*' => TokenKind::STAR,
                    '/' => TokenKind::SLASH,
                    '%' => TokenKind::PERCENT,
                    '!' => TokenKind::BANG,
                    other => {
                        return Err(error(
                            "LEX001",
                            format!("unexpected character `{}`", other),
                            pos,
                        ))
                    }
                };
                push(&mut tokens, kind, c.to_string(), pos);
                i += 1;
            }
        }
    }
    push(&mut tokens, TokenKind::EOF, String::new(), src.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{lex, TokenKind};

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    /// 演算子・キーワード・改行が期待したトークン列になるか確認する。
    fn lex_operators_keywords_and_newlines() {
        use TokenKind::*;
        assert_eq!(
            kinds("let x = 1 <= 2\nif x then y end"),
            vec![LET, IDENT, EQUAL, INT, LE, INT, NEWLINE, IF, IDENT, THEN, IDENT, END, EOF]
        );
        assert_eq!(
            kinds("a && !b || c != d"),
            vec![IDENT, ANDAND, BANG, IDENT, OROR, IDENT, NE, IDENT, EOF]
        );
    }

    #[test]
    /// コメントが行末まで読み飛ばされ、改行は残ることを確認する。
    fn lex_skips_comments() {
        use TokenKind::*;
        assert_eq!(kinds("1 # note\n2"), vec![INT, NEWLINE, INT, EOF]);
    }

    #[test]
    /// 文字列のエスケープ解除と位置情報を確認する。
    fn lex_string_escapes_and_positions() {
        let toks = lex("\n  \"a\\n\\\"b\"").unwrap();
        let s = &toks[1];
        assert_eq!(s.kind, TokenKind::STRING);
        assert_eq!(s.value, "a\n\"b");
        assert_eq!((s.line, s.col), (2, 3));
    }

    #[test]
    /// 閉じていない文字列は入力不足コードで報告される。
    fn lex_unterminated_string_is_incomplete() {
        let err = lex("\"abc").unwrap_err();
        assert_eq!(err.0.code, "LEX002");
    }

    #[test]
    fn lex_rejects_unknown_characters_and_huge_ints() {
        assert_eq!(lex("1 @ 2").unwrap_err().0.code, "LEX001");
        assert_eq!(lex("99999999999999999999").unwrap_err().0.code, "LEX004");
        assert_eq!(lex("\"\\q\"").unwrap_err().0.code, "LEX003");
    }

    #[test]
    /// アンダースコア始まりの識別子（`_`, `_session_`）を扱えるか確認する。
    fn lex_underscore_identifiers() {
        let toks = lex("_ _session_").unwrap();
        assert_eq!(toks[0].kind, TokenKind::IDENT);
        assert_eq!(toks[0].value, "_");
        assert_eq!(toks[1].value, "_session_");
    }
}
