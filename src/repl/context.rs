// パス: src/repl/context.rs
// 役割: 実行コンテキストの抽象と、任意のハンドルからの解決手順を定義する
// 意図: セッション本体を具体的な評価器から切り離し、偽のコンテキストで検証できるようにする
// 関連ファイル: src/repl/session.rs, src/host.rs, src/repl/state.rs
//! 実行コンテキスト（スコープ + 受け手）とその解決。
//!
//! セッションはコンテキストを生成も破棄もせず、`Target` を `resolve` で
//! `ContextRef` に変換して使うだけである。

use std::fmt;
use std::rc::Rc;

use crate::errors::Interrupt;
use crate::repl::Session;
use crate::value::{Outcome, Value};

/// ソース文字列を動的に評価できる「評価地点」。
pub trait ExecutionContext {
    /// このコンテキストの受け手（`self`）。プロンプトやフックに渡す。
    fn receiver(&self) -> Value;

    /// 完結した単位を評価する。障害は `Outcome::Fault`、終了要求や入れ子の巻き戻しは `Err`。
    fn evaluate(&self, source: &str, session: &Session) -> Result<Outcome, Interrupt>;

    /// 利便用の名前（`_`, `_session_` など）をこのコンテキストに束縛する。
    fn bind(&self, name: &str, value: Value);

    /// 見えている束縛名の一覧。`ls` が使う。
    fn binding_names(&self) -> Vec<String> {
        Vec::new()
    }
}

pub type ContextRef = Rc<dyn ExecutionContext>;

/// セッション開始時に渡すハンドル。
#[derive(Clone)]
pub enum Target {
    /// 既にコンテキストであるもの。そのまま使う。
    Context(ContextRef),
    /// トップレベルを表す特別なハンドル。
    TopLevel,
    /// 任意の値。値を受け手とするコンテキストを提供者に作らせる。
    Object(Value),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Context(ctx) => write!(f, "Context({})", ctx.receiver().inspect()),
            Target::TopLevel => write!(f, "TopLevel"),
            Target::Object(v) => write!(f, "Object({})", v.inspect()),
        }
    }
}

impl From<Value> for Target {
    fn from(v: Value) -> Self {
        Target::Object(v)
    }
}

impl From<ContextRef> for Target {
    fn from(ctx: ContextRef) -> Self {
        Target::Context(ctx)
    }
}

/// ホスト側が実装する、コンテキストの供給元。
pub trait ContextProvider {
    fn top_level(&self) -> ContextRef;

    fn top_level_receiver(&self) -> Value {
        Value::Main
    }

    /// `receiver` を受け手とする新しいコンテキストを作る。
    fn anchor(&self, receiver: Value) -> ContextRef;
}

/// ハンドルを実行コンテキストへ解決する。
pub fn resolve(target: Target, provider: &dyn ContextProvider) -> ContextRef {
    match target {
        Target::Context(ctx) => ctx,
        Target::TopLevel => provider.top_level(),
        Target::Object(v) if v == provider.top_level_receiver() => provider.top_level(),
        Target::Object(v) => provider.anchor(v),
    }
}
