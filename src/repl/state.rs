// パス: src/repl/state.rs
// 役割: 活性化をまたいで共有される状態（入れ子スタック・直近結果・アクティブセッション）を保持する
// 意図: 大域変数の代わりに共有所有のマネージャを各活性化へ渡す
// 関連ファイル: src/repl/session.rs, src/repl/config.rs, src/repl/context.rs
//! セッションマネージャ。
//!
//! 単一スレッド・再入前提のため、各フィールドは `RefCell` / `Cell` で内部可変にし、
//! 借用は読み書きの瞬間だけに限定する（評価中に入れ子セッションが同じ状態へ触れるため）。
//!
//! 不変条件: スタック長 = 現在の入れ子の深さ。push と pop は活性化ごとにちょうど 1 回ずつ。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use super::config::Config;
use super::context::ContextProvider;
use super::reader::CompletenessOracle;
use crate::value::{SessionId, Value};

/// 入れ子の 1 段分: (push 時の深さ, その段の受け手)。
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub depth: usize,
    pub receiver: Value,
}

pub struct SessionManager {
    stack: RefCell<Vec<Frame>>,
    last_result: RefCell<Value>,
    active: Cell<Option<SessionId>>,
    next_id: Cell<u64>,
    provider: Rc<dyn ContextProvider>,
    oracle: Rc<dyn CompletenessOracle>,
    defaults: RefCell<Config>,
}

impl SessionManager {
    /// 標準の既定値（端末入力・標準出力・標準コマンド群など）でマネージャを作る。
    pub fn new(
        provider: Rc<dyn ContextProvider>,
        oracle: Rc<dyn CompletenessOracle>,
    ) -> Rc<Self> {
        Self::with_defaults(provider, oracle, Config::standard())
    }

    pub fn with_defaults(
        provider: Rc<dyn ContextProvider>,
        oracle: Rc<dyn CompletenessOracle>,
        defaults: Config,
    ) -> Rc<Self> {
        Rc::new(Self {
            stack: RefCell::new(Vec::new()),
            last_result: RefCell::new(Value::Nil),
            active: Cell::new(None),
            next_id: Cell::new(1),
            provider,
            oracle,
            defaults: RefCell::new(defaults),
        })
    }

    /// プロセス全体の既定設定を差し替える。以降に作られるセッションから有効。
    pub fn set_defaults(&self, defaults: Config) {
        *self.defaults.borrow_mut() = defaults;
    }

    pub fn defaults(&self) -> Config {
        self.defaults.borrow().clone()
    }

    pub fn provider(&self) -> &dyn ContextProvider {
        self.provider.as_ref()
    }

    pub fn oracle(&self) -> &dyn CompletenessOracle {
        self.oracle.as_ref()
    }

    /// 積まれているフレーム数。
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// 最内フレームの深さ（フレームが無ければ 0）。プロンプトやコマンドが使う「現在のレベル」。
    pub fn level(&self) -> usize {
        self.stack.borrow().last().map(|f| f.depth).unwrap_or(0)
    }

    /// 入れ子スタックの写し（外側から順）。
    pub fn nesting(&self) -> Vec<Frame> {
        self.stack.borrow().clone()
    }

    pub fn last_result(&self) -> Value {
        self.last_result.borrow().clone()
    }

    pub(crate) fn set_last_result(&self, value: Value) {
        *self.last_result.borrow_mut() = value;
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.get()
    }

    pub(crate) fn allocate_id(&self) -> SessionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        SessionId(id)
    }

    /// `id` をアクティブにしてフレームを積む。返したガードが破棄されるとき元に戻す。
    pub(crate) fn enter(self: &Rc<Self>, id: SessionId, receiver: Value) -> FrameGuard {
        let previous = self.active.replace(Some(id));
        let depth = {
            let mut stack = self.stack.borrow_mut();
            let depth = stack.len();
            stack.push(Frame { depth, receiver });
            depth
        };
        debug!(session = %id, depth, "frame pushed");
        FrameGuard {
            manager: Rc::clone(self),
            previous,
            depth,
        }
    }
}

/// 活性化 1 回分のフレームを保持する RAII ガード。
///
/// 巻き戻し・終了要求・入力エラーのどの経路で抜けても、ちょうど 1 回だけ pop する。
pub(crate) struct FrameGuard {
    manager: Rc<SessionManager>,
    previous: Option<SessionId>,
    depth: usize,
}

impl FrameGuard {
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let popped = self.manager.stack.borrow_mut().pop();
        self.manager.active.set(self.previous);
        debug!(depth = self.depth, popped = popped.is_some(), "frame popped");
    }
}

#[cfg(test)]
mod tests {
    use super::SessionManager;
    use crate::repl::context::{ContextProvider, ContextRef, ExecutionContext};
    use crate::repl::Session;
    use crate::errors::Interrupt;
    use crate::value::{Fault, Outcome, SessionId, Value};
    use std::rc::Rc;

    struct Nothing;
    impl ExecutionContext for Nothing {
        fn receiver(&self) -> Value {
            Value::Main
        }
        fn evaluate(&self, _source: &str, _session: &Session) -> Result<Outcome, Interrupt> {
            Ok(Outcome::Value(Value::Nil))
        }
        fn bind(&self, _name: &str, _value: Value) {}
    }
    impl ContextProvider for Nothing {
        fn top_level(&self) -> ContextRef {
            Rc::new(Nothing)
        }
        fn anchor(&self, _receiver: Value) -> ContextRef {
            Rc::new(Nothing)
        }
    }

    fn manager() -> Rc<SessionManager> {
        let oracle = |_: &str| -> Result<bool, Fault> { Ok(true) };
        SessionManager::new(Rc::new(Nothing), Rc::new(oracle))
    }

    #[test]
    /// ガードの破棄でフレームが 1 つ下ろされ、アクティブセッションが元に戻ることを確認する。
    fn frame_guard_pops_and_restores_active() {
        let m = manager();
        assert_eq!((m.depth(), m.level()), (0, 0));
        let outer = m.enter(SessionId(1), Value::Main);
        {
            let inner = m.enter(SessionId(2), Value::Int(5));
            assert_eq!(inner.depth(), 1);
            assert_eq!((m.depth(), m.level()), (2, 1));
            assert_eq!(m.active_session(), Some(SessionId(2)));
            assert_eq!(m.nesting()[1].receiver, Value::Int(5));
        }
        assert_eq!(m.depth(), 1);
        assert_eq!(m.active_session(), Some(SessionId(1)));
        drop(outer);
        assert_eq!(m.depth(), 0);
        assert_eq!(m.active_session(), None);
    }

    #[test]
    fn ids_are_allocated_in_order() {
        let m = manager();
        assert_eq!(m.allocate_id(), SessionId(1));
        assert_eq!(m.allocate_id(), SessionId(2));
    }

    #[test]
    fn last_result_starts_nil_and_is_overwritten() {
        let m = manager();
        assert_eq!(m.last_result(), Value::Nil);
        m.set_last_result(Value::Int(2));
        assert_eq!(m.last_result(), Value::Int(2));
    }
}
