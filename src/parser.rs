// パス: src/parser.rs
// 役割: トークン列から calc 言語の AST を生成する再帰下降パーサを実装する
// 意図: 評価器への入力と、REPL の「入力が完結したか」の判定を同じ文法で行う
// 関連ファイル: src/lexer.rs, src/ast.rs, src/host.rs
//! 構文解析モジュール
//!
//! - 文は改行または `;` で区切る。ブロックは `do … end` / `if … then … else … end` / `while … do … end`。
//! - 二項演算子の優先順位は `|| < && < cmp < add < mul` の順で表に持つ。
//! - 演算子の直後・括弧の内側では改行を読み飛ばし、式が行をまたげるようにする。
//! - 入力が尽きたことによる失敗は `PAR001` で報告する（完結判定が継続入力に使う）。
//! - 式の入れ子は `MAX_NESTING` 段までで、超えたら `PAR003`（入力不足ではない）を返す。

use crate::ast::{BinOp, Expr, Program, Stmt, UnaryOp};
use crate::errors::ParseError;
use crate::lexer::{lex, Token, TokenKind};

/// 式の入れ子の上限。貼り付けられた巨大な入力でもスタックを使い切らない深さに抑える。
pub const MAX_NESTING: usize = 128;

/// 再帰下降パーサの進行状態を保持する構造体。
pub struct Parser {
    ts: Vec<Token>,
    i: usize,
    depth: usize,
}

#[derive(Clone, Copy)]
enum Assoc {
    Left,
    Non,
}

struct InfixSpec {
    tokens: &'static [(TokenKind, BinOp)],
    assoc: Assoc,
}

impl InfixSpec {
    fn lookup(&self, kind: TokenKind) -> Option<BinOp> {
        self.tokens
            .iter()
            .find(|(tk, _)| *tk == kind)
            .map(|&(_, op)| op)
    }
}

const INFIX_LEVELS: &[InfixSpec] = &[
    InfixSpec {
        tokens: &[(TokenKind::OROR, BinOp::Or)],
        assoc: Assoc::Left,
    },
    InfixSpec {
        tokens: &[(TokenKind::ANDAND, BinOp::And)],
        assoc: Assoc::Left,
    },
    InfixSpec {
        tokens: &[
            (TokenKind::EQ, BinOp::Eq),
            (TokenKind::NE, BinOp::Ne),
            (TokenKind::LT, BinOp::Lt),
            (TokenKind::LE, BinOp::Le),
            (TokenKind::GT, BinOp::Gt),
            (TokenKind::GE, BinOp::Ge),
        ],
        assoc: Assoc::Non,
    },
    InfixSpec {
        tokens: &[(TokenKind::PLUS, BinOp::Add), (TokenKind::MINUS, BinOp::Sub)],
        assoc: Assoc::Left,
    },
    InfixSpec {
        tokens: &[
            (TokenKind::STAR, BinOp::Mul),
            (TokenKind::SLASH, BinOp::Div),
            (TokenKind::PERCENT, BinOp::Rem),
        ],
        assoc: Assoc::Left,
    },
];

/// ソース全体をプログラムとして解析する。
pub fn parse_program(src: &str) -> Result<Program, ParseError> {
    let tokens = lex(src)?;
    let mut p = Parser::new(tokens);
    let stmts = p.parse_stmts(&[])?;
    p.pop(TokenKind::EOF)?;
    Ok(Program { stmts })
}

/// 単一の式として解析する（前後の改行は許容）。
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let tokens = lex(src)?;
    let mut p = Parser::new(tokens);
    p.skip_newlines();
    let e = p.parse_expr()?;
    p.skip_newlines();
    p.pop(TokenKind::EOF)?;
    Ok(e)
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            ts: tokens,
            i: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        &self.ts[self.i.min(self.ts.len() - 1)]
    }

    fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.ts.get(self.i + offset).map(|t| t.kind)
    }

    fn pop_any(&mut self) -> Token {
        let t = self.peek().clone();
        if self.i < self.ts.len() - 1 {
            self.i += 1;
        }
        t
    }

    fn pop(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek().kind != kind {
            return Err(self.unexpected(&format!("{:?}", kind)));
        }
        Ok(self.pop_any())
    }

    fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek().kind == kind {
            Some(self.pop_any())
        } else {
            None
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::NEWLINE {
            self.pop_any();
        }
    }

    /// 現在位置のトークンが想定外であることを報告する。EOF なら入力不足扱い。
    fn unexpected(&self, expected: &str) -> ParseError {
        let t = self.peek();
        if t.kind == TokenKind::EOF {
            ParseError::at(
                "PAR001",
                format!("unexpected end of input, expected {}", expected),
                Some(t.pos),
                Some(t.line),
                Some(t.col),
            )
        } else {
            ParseError::at(
                "PAR002",
                format!("unexpected `{}`, expected {}", t.value.escape_default(), expected),
                Some(t.pos),
                Some(t.line),
                Some(t.col),
            )
        }
    }

    /// 区切り付きの文の並びを、終端トークン（または EOF）まで読む。
    ///
    /// `terminators` が空でないのに EOF に達した場合はブロックが閉じていないので `PAR001`。
    fn parse_stmts(&mut self, terminators: &[TokenKind]) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            while matches!(self.peek().kind, TokenKind::NEWLINE | TokenKind::SEMI) {
                self.pop_any();
            }
            let kind = self.peek().kind;
            if terminators.contains(&kind) {
                return Ok(stmts);
            }
            if kind == TokenKind::EOF {
                if terminators.is_empty() {
                    return Ok(stmts);
                }
                return Err(self.unexpected("`end`"));
            }
            stmts.push(self.parse_stmt()?);
            let kind = self.peek().kind;
            let separated = matches!(kind, TokenKind::NEWLINE | TokenKind::SEMI | TokenKind::EOF);
            if !separated && !terminators.contains(&kind) {
                return Err(self.unexpected("newline or `;`"));
            }
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.accept(TokenKind::LET).is_some() {
            let name = self.pop(TokenKind::IDENT)?.value;
            self.pop(TokenKind::EQUAL)?;
            self.skip_newlines();
            let expr = self.parse_expr()?;
            return Ok(Stmt::Let { name, expr });
        }
        if self.peek().kind == TokenKind::IDENT && self.peek_kind(1) == Some(TokenKind::EQUAL) {
            let name = self.pop_any().value;
            self.pop_any();
            self.skip_newlines();
            let expr = self.parse_expr()?;
            return Ok(Stmt::Assign { name, expr });
        }
        Ok(Stmt::Expr(self.parse_expr()?))
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(|p| p.parse_level(0))
    }

    /// 入れ子を 1 段深くして `f` を実行する。上限を超えたら `PAR003`。
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            let t = self.peek();
            return Err(ParseError::at(
                "PAR003",
                format!("expression nested deeper than {} levels", MAX_NESTING),
                Some(t.pos),
                Some(t.line),
                Some(t.col),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_level(&mut self, level: usize) -> Result<Expr, ParseError> {
        let Some(spec) = INFIX_LEVELS.get(level) else {
            return self.parse_unary();
        };
        let mut left = self.parse_level(level + 1)?;
        while let Some(op) = spec.lookup(self.peek().kind) {
            self.pop_any();
            self.skip_newlines();
            let right = self.parse_level(level + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
            if matches!(spec.assoc, Assoc::Non) {
                if spec.lookup(self.peek().kind).is_some() {
                    return Err(self.unexpected("end of comparison"));
                }
                break;
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::MINUS => UnaryOp::Neg,
            TokenKind::BANG => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.pop_any();
        let expr = self.nested(Self::parse_unary)?;
        // 負の整数リテラルはその場で畳み込む
        if let (UnaryOp::Neg, Expr::Int(n)) = (op, &expr) {
            return Ok(Expr::Int(-n));
        }
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.parse_primary()?;
        while self.accept(TokenKind::LBRACK).is_some() {
            self.skip_newlines();
            let index = self.parse_expr()?;
            self.skip_newlines();
            self.pop(TokenKind::RBRACK)?;
            e = Expr::Index {
                target: Box::new(e),
                index: Box::new(index),
            };
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::INT => {
                self.pop_any();
                t.value
                    .parse::<i64>()
                    .map(Expr::Int)
                    .map_err(|_| self.unexpected("integer"))
            }
            TokenKind::STRING => {
                self.pop_any();
                Ok(Expr::Str(t.value))
            }
            TokenKind::TRUE => {
                self.pop_any();
                Ok(Expr::Bool(true))
            }
            TokenKind::FALSE => {
                self.pop_any();
                Ok(Expr::Bool(false))
            }
            TokenKind::NIL => {
                self.pop_any();
                Ok(Expr::Nil)
            }
            TokenKind::SELF => {
                self.pop_any();
                Ok(Expr::SelfRef)
            }
            TokenKind::IDENT => {
                self.pop_any();
                if self.accept(TokenKind::LPAREN).is_some() {
                    let args = self.parse_items(TokenKind::RPAREN)?;
                    return Ok(Expr::Call { name: t.value, args });
                }
                Ok(Expr::Var {
                    name: t.value,
                    pos: t.pos,
                })
            }
            TokenKind::LPAREN => {
                self.pop_any();
                self.skip_newlines();
                let e = self.parse_expr()?;
                self.skip_newlines();
                self.pop(TokenKind::RPAREN)?;
                Ok(e)
            }
            TokenKind::LBRACK => {
                self.pop_any();
                Ok(Expr::List(self.parse_items(TokenKind::RBRACK)?))
            }
            TokenKind::DO => {
                self.pop_any();
                let body = self.parse_stmts(&[TokenKind::END])?;
                self.pop(TokenKind::END)?;
                Ok(Expr::Block(body))
            }
            TokenKind::IF => {
                self.pop_any();
                let cond = self.parse_expr()?;
                self.skip_newlines();
                self.pop(TokenKind::THEN)?;
                let then_branch = self.parse_stmts(&[TokenKind::ELSE, TokenKind::END])?;
                let else_branch = if self.accept(TokenKind::ELSE).is_some() {
                    Some(self.parse_stmts(&[TokenKind::END])?)
                } else {
                    None
                };
                self.pop(TokenKind::END)?;
                Ok(Expr::If {
                    cond: Box::new(cond),
                    then_branch,
                    else_branch,
                })
            }
            TokenKind::WHILE => {
                self.pop_any();
                let cond = self.parse_expr()?;
                self.skip_newlines();
                self.pop(TokenKind::DO)?;
                let body = self.parse_stmts(&[TokenKind::END])?;
                self.pop(TokenKind::END)?;
                Ok(Expr::While {
                    cond: Box::new(cond),
                    body,
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `,` 区切りの要素列を閉じ括弧まで読む（末尾カンマ可）。
    fn parse_items(&mut self, close: TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.accept(close).is_some() {
                return Ok(items);
            }
            items.push(self.parse_expr()?);
            self.skip_newlines();
            if self.accept(TokenKind::COMMA).is_none() {
                self.skip_newlines();
                self.pop(close)?;
                return Ok(items);
            }
        }
    }
}
