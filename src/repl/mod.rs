// パス: src/repl/mod.rs
// 役割: 入れ子可能なセッションエンジンのファサードと再公開
// 意図: セッション・設定・協調者の型を一箇所から使えるようにする
// 関連ファイル: src/repl/session.rs, src/repl/state.rs, src/bin/nestrepl.rs
//! 入れ子可能な読み取り・評価・表示セッションのエンジン。
//!
//! - `session`: セッションループと巻き戻し
//! - `reader`: 複数行入力の蓄積と完結判定
//! - `cmd`: コマンド表と標準コマンド群
//! - `context`: 実行コンテキストとハンドルの解決
//! - `state`: 活性化をまたぐ共有状態
//! - `config`: 6 つの協調者からなる設定
//! - `io` / `line_editor`: 入力元と出力先
//! - `printer`: 表示形式

pub mod cmd;
pub mod config;
pub mod context;
pub mod io;
mod line_editor;
mod printer;
pub mod reader;
pub mod session;
pub mod state;

pub use cmd::{CommandContext, CommandSet, Matcher};
pub use config::{
    Config, ConfigOverrides, Hooks, InputRef, OutputRef, Prompts, AFTER_SESSION, BEFORE_SESSION,
};
pub use context::{resolve, ContextProvider, ContextRef, ExecutionContext, Target};
pub use io::{LineSource, PlainInput, ReadResult, ScriptedInput, SharedBuffer};
pub use line_editor::LineEditor;
pub use printer::print_outcome;
pub use reader::CompletenessOracle;
pub use session::{Flow, Session};
pub use state::{Frame, SessionManager};
