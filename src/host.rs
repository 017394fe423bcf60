// パス: src/host.rs
// 役割: calc 言語をセッションエンジンへ接続する（コンテキスト供給と完結判定）
// 意図: エンジンが抽象として扱う「動的評価」と「完結判定」の具体実装を与える
// 関連ファイル: src/evaluator.rs, src/parser.rs, src/repl/context.rs, src/repl/reader.rs
//! calc ホスト。
//!
//! - トップレベルのコンテキストは大域スコープを直接使い、受け手は `main`。
//! - 任意の値に対するコンテキストは、大域スコープの子スコープを持つ。
//! - 完結判定は「構文解析が入力不足で失敗したか」で決める。その他の構文エラーは
//!   完結扱いにして、評価時に `SyntaxError` として表示させる。

use std::rc::Rc;

use tracing::trace;

use crate::evaluator::{Interpreter, Raise, Scope, ScopeRef};
use crate::errors::Interrupt;
use crate::parser::parse_program;
use crate::repl::{
    CompletenessOracle, ContextProvider, ContextRef, ExecutionContext, Session, SessionManager,
};
use crate::value::{Fault, Outcome, Value};

/// 受け手とスコープの組。
pub struct CalcContext {
    receiver: Value,
    scope: ScopeRef,
}

impl CalcContext {
    pub fn new(receiver: Value, scope: ScopeRef) -> Self {
        Self { receiver, scope }
    }

    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }
}

impl ExecutionContext for CalcContext {
    fn receiver(&self) -> Value {
        self.receiver.clone()
    }

    fn evaluate(&self, source: &str, session: &Session) -> Result<Outcome, Interrupt> {
        let program = match parse_program(source) {
            Ok(p) => p,
            Err(e) => return Ok(Outcome::Fault(Fault::new("SyntaxError", e.to_string()))),
        };
        let interp = Interpreter::new(&self.receiver, Rc::clone(&self.scope)).with_session(session);
        match interp.eval_program(&program) {
            Ok(v) => Ok(Outcome::Value(v)),
            Err(Raise::Fault(f)) => Ok(Outcome::Fault(f)),
            Err(Raise::Interrupt(i)) => Err(i),
        }
    }

    fn bind(&self, name: &str, value: Value) {
        Scope::define(&self.scope, name, value);
    }

    fn binding_names(&self) -> Vec<String> {
        Scope::names(&self.scope)
    }
}

/// calc 言語のコンテキスト供給元 兼 完結判定器。
pub struct CalcHost {
    globals: ScopeRef,
    top: ContextRef,
}

impl CalcHost {
    pub fn new() -> Rc<Self> {
        let globals = Scope::root();
        let top: ContextRef = Rc::new(CalcContext::new(Value::Main, Rc::clone(&globals)));
        Rc::new(Self { globals, top })
    }

    pub fn globals(&self) -> &ScopeRef {
        &self.globals
    }

    /// このホストを供給元と判定器に使うマネージャを作る。
    pub fn manager(self: &Rc<Self>) -> Rc<SessionManager> {
        let provider: Rc<dyn ContextProvider> = self.clone();
        let oracle: Rc<dyn CompletenessOracle> = self.clone();
        SessionManager::new(provider, oracle)
    }
}

impl ContextProvider for CalcHost {
    fn top_level(&self) -> ContextRef {
        Rc::clone(&self.top)
    }

    fn anchor(&self, receiver: Value) -> ContextRef {
        Rc::new(CalcContext::new(receiver, Scope::child(&self.globals)))
    }
}

impl CompletenessOracle for CalcHost {
    fn is_complete(&self, source: &str) -> Result<bool, Fault> {
        match parse_program(source) {
            Ok(_) => Ok(true),
            Err(e) if e.is_incomplete() => {
                trace!(error = %e, "unit not complete yet");
                Ok(false)
            }
            Err(_) => Ok(true),
        }
    }
}
