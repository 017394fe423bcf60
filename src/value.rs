// パス: src/value.rs
// 役割: セッションが扱う値・障害・評価結果の表現を定義する
// 意図: 評価結果を `Value | Fault` のタグ付き型で運び、例外経路と分離する
// 関連ファイル: src/evaluator.rs, src/repl/printer.rs, src/repl/session.rs
//! 値モデル。
//!
//! - `Value`: 受け手 (receiver) や評価結果として流通する値。
//! - `Fault`: 評価中に発生した障害。セッションはこれを結果として表示し継続する。
//! - `Outcome`: 1 回の評価の結果（値か障害のどちらか）。

use std::fmt::{self, Display, Formatter};

/// セッションインスタンスの識別子。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    /// トップレベルの受け手。
    Main,
    /// 評価コードから参照できるセッションインスタンス。
    Session(SessionId),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Main => "Object",
            Value::Session(_) => "Session",
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// 利用者向けの検査表示（文字列は引用符付き）。
    pub fn inspect(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::inspect).collect();
                format!("[{}]", parts.join(", "))
            }
            other => other.to_string(),
        }
    }
}

/// `str(x)` 相当の素の表示。
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(_) => write!(f, "{}", self.inspect()),
            Value::Main => write!(f, "main"),
            Value::Session(id) => write!(f, "#<session {}>", id),
        }
    }
}

/// 評価中に発生した障害。`class` は障害の分類名。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    pub class: &'static str,
    pub message: String,
}

impl Fault {
    pub fn new(class: &'static str, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

impl std::error::Error for Fault {}

/// 1 回の評価結果。障害も結果の一種として扱う。
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Value(Value),
    Fault(Fault),
}

impl Outcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Fault(_) => None,
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Fault(f) => Some(f),
            Outcome::Value(_) => None,
        }
    }
}

impl From<Value> for Outcome {
    fn from(v: Value) -> Self {
        Outcome::Value(v)
    }
}

impl From<Fault> for Outcome {
    fn from(f: Fault) -> Self {
        Outcome::Fault(f)
    }
}
