// パス: src/repl/session.rs
// 役割: セッションループ（読む・評価する・表示する）と入れ子セッションの巻き戻しを実装する
// 意図: 入れ子の各活性化がフレームの pop と終了フックをちょうど 1 回ずつ実行することを保証する
// 関連ファイル: src/repl/reader.rs, src/repl/state.rs, src/repl/cmd.rs, src/repl/context.rs
//! セッションループ。
//!
//! 制御の流れ:
//! `run` → フレームを積む → `rep` を繰り返す（読み取り → コマンド or 評価 → 表示）
//! → フレームを下ろす → 必要なら巻き戻しを外側へ再送出。
//!
//! 巻き戻し（`Interrupt::Breakout(level)`）は `Err` 経路で運び、`rep` が `Flow` に変換する。
//! 評価中の障害は `Outcome::Fault` として表示され、ループは継続する。

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use tracing::debug;

use super::config::{Config, ConfigOverrides, AFTER_SESSION, BEFORE_SESSION};
use super::context::{resolve, ContextRef, Target};
use super::reader::read_unit;
use super::state::SessionManager;
use crate::errors::Interrupt;
use crate::value::{Outcome, SessionId, Value};

/// 活性化内の 1 ステップの帰結。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// 指定レベルまでの巻き戻しが要求された。
    Breakout(usize),
}

/// セッションインスタンス。設定はセッションが単独で所有し、構築後は変更しない。
pub struct Session {
    id: SessionId,
    config: Config,
    manager: Rc<SessionManager>,
}

impl Session {
    /// マネージャの既定設定へ `overrides` を重ねて新しいセッションを作る。
    pub fn new(manager: &Rc<SessionManager>, overrides: ConfigOverrides) -> Self {
        let config = manager.defaults().merge(overrides);
        Self {
            id: manager.allocate_id(),
            config,
            manager: Rc::clone(manager),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &Rc<SessionManager> {
        &self.manager
    }

    /// `target` を対象にセッションを実行し、最終的な受け手を返す。
    ///
    /// 自分の開始深さと異なるレベルへの巻き戻しは `Err(Interrupt::Breakout(level))` として
    /// 呼び出し元の活性化へ再送出する。それ以外の巻き戻しはここで吸収する。
    pub fn run(&self, target: Target) -> Result<Value, Interrupt> {
        let ctx = resolve(target, self.manager.provider());
        let receiver = ctx.receiver();
        self.fire(BEFORE_SESSION, &receiver)?;

        let entry_depth = self.manager.depth();
        debug!(session = %self.id, entry_depth, receiver = %receiver.inspect(), "session start");
        let exit = {
            let frame = self.manager.enter(self.id, receiver.clone());
            debug_assert_eq!(frame.depth(), entry_depth);
            self.bind_conveniences(&ctx);
            loop {
                match self.rep(&ctx) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Breakout(level)) => break Ok(level),
                    Err(other) => break Err(other),
                }
            }
        };
        let level = match exit {
            Ok(level) => level,
            Err(other) => {
                debug!(session = %self.id, reason = %other, "session aborted");
                return Err(other);
            }
        };

        self.fire(AFTER_SESSION, &receiver)?;
        if level != entry_depth {
            debug!(session = %self.id, level, entry_depth, "breakout propagated");
            return Err(Interrupt::Breakout(level));
        }
        debug!(session = %self.id, level, "session end");
        Ok(receiver)
    }

    /// 同じ設定・新しい識別子で入れ子セッションを開く。
    pub fn nest(&self, target: Target) -> Result<Value, Interrupt> {
        let child = Session {
            id: self.manager.allocate_id(),
            config: self.config.clone(),
            manager: Rc::clone(&self.manager),
        };
        child.run(target)
    }

    /// 1 回分の読み取り・評価・表示。巻き戻しは `Flow::Breakout` として返す。
    pub fn rep(&self, ctx: &ContextRef) -> Result<Flow, Interrupt> {
        match self.eval_step(ctx) {
            Ok(()) => Ok(Flow::Continue),
            Err(Interrupt::Breakout(level)) => Ok(Flow::Breakout(level)),
            Err(other) => Err(other),
        }
    }

    fn eval_step(&self, ctx: &ContextRef) -> Result<(), Interrupt> {
        let unit = read_unit(self, ctx)?;
        let outcome = self.evaluate(ctx, &unit)?;
        self.print(&outcome)
    }

    /// 単位を評価する。成功した値だけが直近結果になる。
    ///
    /// 障害は結果として返し、終了要求と巻き戻しは `Err` のまま伝搬する。
    pub fn evaluate(&self, ctx: &ContextRef, source: &str) -> Result<Outcome, Interrupt> {
        self.bind_conveniences(ctx);
        let outcome = ctx.evaluate(source, self)?;
        match &outcome {
            Outcome::Value(v) => {
                self.manager.set_last_result(v.clone());
                self.bind_conveniences(ctx);
            }
            Outcome::Fault(fault) => debug!(%fault, "evaluation fault captured"),
        }
        Ok(outcome)
    }

    pub fn print(&self, outcome: &Outcome) -> Result<(), Interrupt> {
        let mut out = self.config.output.borrow_mut();
        (self.config.print)(&mut *out, outcome)?;
        out.flush()?;
        Ok(())
    }

    /// `_session_` と `_` をコンテキストへ束縛する。
    fn bind_conveniences(&self, ctx: &ContextRef) {
        let active = self.manager.active_session().unwrap_or(self.id);
        ctx.bind("_session_", Value::Session(active));
        ctx.bind("_", self.manager.last_result());
    }

    fn fire(&self, hook: &str, receiver: &Value) -> Result<(), Interrupt> {
        self.config
            .hooks
            .fire(hook, &self.config.output, std::slice::from_ref(receiver))?;
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
