// パス: src/repl/reader.rs
// 役割: 入力行を完結した単位になるまで保留バッファへ蓄積する
// 意図: 行ごとにコマンド判定を挟み、完結判定はホスト言語の判定器へ委ねる
// 関連ファイル: src/repl/session.rs, src/repl/cmd.rs, src/host.rs
//! 複数行入力の蓄積。
//!
//! 1 行読むごとに:
//! 1. バッファが空かどうかでプロンプトを選び、受け手と入れ子レベルを渡して描画する。
//! 2. 行を（改行付きで）バッファへ追加し、コマンド表へ回す。
//! 3. バッファが完結していれば返す。そうでなければ次の行へ。
//!
//! コマンドがバッファを空にした場合、空のバッファは評価単位とせず読み続ける。

use tracing::trace;

use super::context::ContextRef;
use super::io::ReadResult;
use super::session::Session;
use crate::errors::Interrupt;
use crate::value::Fault;

/// 蓄積中のソースが完結した単位かどうかを判定する外部の判定器。
pub trait CompletenessOracle {
    /// 判定中の障害は読み手側で「未完結」として扱われる。
    fn is_complete(&self, source: &str) -> Result<bool, Fault>;
}

impl<F> CompletenessOracle for F
where
    F: Fn(&str) -> Result<bool, Fault>,
{
    fn is_complete(&self, source: &str) -> Result<bool, Fault> {
        self(source)
    }
}

/// 完結判定を全域関数として扱う。判定器の障害は未完結とみなす。
pub(crate) fn judge_complete(oracle: &dyn CompletenessOracle, source: &str) -> bool {
    match oracle.is_complete(source) {
        Ok(done) => done,
        Err(fault) => {
            trace!(%fault, "completeness check failed; treating as incomplete");
            false
        }
    }
}

/// 完結した単位を 1 つ読み取る。
pub(crate) fn read_unit(session: &Session, ctx: &ContextRef) -> Result<String, Interrupt> {
    let config = session.config();
    let manager = session.manager();
    let mut buffer = String::new();
    loop {
        let prompt = {
            let render = config.prompts.select(buffer.is_empty());
            render(&ctx.receiver(), manager.level())
        };
        // 借用は読み取りの間だけ（コマンドが入れ子セッションを開いても衝突しない）
        let read = config.input.borrow_mut().read_line(&prompt)?;
        let line = match read {
            ReadResult::Line(line) => line,
            ReadResult::Interrupted => {
                trace!("input interrupted; discarding pending buffer");
                buffer.clear();
                continue;
            }
            ReadResult::Eof => return Err(Interrupt::EndOfInput),
        };
        trace!(line = %line, "line read");
        if !line.trim().is_empty() {
            config.input.borrow_mut().add_history(&line);
        }

        buffer.push_str(&line);
        buffer.push('\n');
        config.commands.dispatch(&line, &mut buffer, ctx, session)?;

        if buffer.is_empty() {
            continue;
        }
        if judge_complete(manager.oracle(), &buffer) {
            return Ok(buffer);
        }
    }
}
