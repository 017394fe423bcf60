// パス: src/lib.rs
// 役割: クレートルート（モジュール配線と公開 API）
// 意図: セッションエンジンと calc ホスト言語を最小限の面で公開する
// 関連ファイル: src/repl/mod.rs, src/host.rs, src/bin/nestrepl.rs
//! nestrepl ルートモジュール
//!
//! 目的:
//! - 入れ子可能な読み取り・評価・表示セッションのエンジン（`repl`）を提供する。
//! - エンジンへ接続する小さな式言語（calc）を同梱し、単体で対話実行できるようにする。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 巻き戻しや終了要求は `Interrupt`（`Err` 側）、評価中の障害は `Outcome::Fault`（値側）で運ぶ。
#![allow(unexpected_cfgs)]
#![cfg_attr(coverage, feature(coverage_attribute))]

pub mod ast;
pub mod errors;
pub mod evaluator;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod value;

pub use crate::errors::{ErrorInfo, Interrupt, LexerError, ParseError};
pub use crate::host::{CalcContext, CalcHost};
pub use crate::repl::{ConfigOverrides, Session, SessionManager, Target};
pub use crate::value::{Fault, Outcome, SessionId, Value};
