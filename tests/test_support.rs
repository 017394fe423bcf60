// パス: tests/test_support.rs
// 役割: 統合テスト共通のハーネス・偽コンテキスト・判定器を提供する
// 意図: 台本入力と共有出力でセッションを駆動するお膳立てを一元化しテストを簡潔に保つ
// 関連ファイル: tests/session_loop.rs, tests/nesting.rs, tests/calc_language.rs
#![allow(dead_code)]
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use nestrepl::repl::{
    CompletenessOracle, ConfigOverrides, ContextProvider, ContextRef, ExecutionContext, Hooks,
    InputRef, OutputRef, Prompts, ReadResult, ScriptedInput, Session, SessionManager, SharedBuffer, Target,
};
use nestrepl::{CalcHost, Fault, Interrupt, Outcome, Value};

/// 台本入力・共有出力・セッションをまとめたフィクスチャ。
pub struct Harness {
    pub manager: Rc<SessionManager>,
    pub input: Rc<RefCell<ScriptedInput>>,
    pub output: SharedBuffer,
    pub session: Session,
}

impl Harness {
    /// calc ホスト上のセッション（開始・終了の告知なし）。
    pub fn calc(lines: &[&str]) -> Self {
        Self::calc_with(lines, ConfigOverrides::new().with_hooks(Hooks::empty()))
    }

    /// calc ホスト上のセッション（既定フックで開始・終了を告知）。
    pub fn calc_with_banners(lines: &[&str]) -> Self {
        Self::calc_with(lines, ConfigOverrides::new())
    }

    pub fn calc_with(lines: &[&str], overrides: ConfigOverrides) -> Self {
        let host = CalcHost::new();
        let provider: Rc<dyn ContextProvider> = host.clone();
        let oracle: Rc<dyn CompletenessOracle> = host;
        Self::build(
            provider,
            oracle,
            ScriptedInput::new(lines.to_vec()),
            overrides,
        )
    }

    /// 任意の供給元・判定器・入力で組み立てる。
    pub fn build(
        provider: Rc<dyn ContextProvider>,
        oracle: Rc<dyn CompletenessOracle>,
        input: ScriptedInput,
        overrides: ConfigOverrides,
    ) -> Self {
        let manager = SessionManager::new(provider, oracle);
        let input = Rc::new(RefCell::new(input));
        let shared_input: InputRef = input.clone();
        let output = SharedBuffer::new();
        let out: OutputRef = Rc::new(RefCell::new(output.clone()));
        let overrides = ConfigOverrides {
            input: Some(shared_input),
            output: Some(out),
            ..overrides
        };
        let session = Session::new(&manager, overrides);
        Self {
            manager,
            input,
            output,
            session,
        }
    }

    pub fn run(&self) -> Result<Value, Interrupt> {
        self.session.run(Target::TopLevel)
    }

    pub fn output(&self) -> String {
        self.output.contents()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.input.borrow().prompts().to_vec()
    }

    pub fn history(&self) -> Vec<String> {
        self.input.borrow().history().to_vec()
    }

    pub fn remaining(&self) -> usize {
        self.input.borrow().remaining()
    }
}

/// 評価された単位を記録し、単純な規則で結果を返す偽コンテキスト。
///
/// - `boom` → `RuntimeError` 障害
/// - `quit!` → 終了要求（状態 7）
/// - `nest NAME` → `NAME` を受け手に入れ子セッション
/// - 束縛済みの名前 → その値
/// - それ以外 → 前後空白を除いたソースの文字列
pub struct FakeContext {
    pub receiver: Value,
    pub log: Rc<RefCell<Vec<String>>>,
    pub bindings: RefCell<HashMap<String, Value>>,
}

impl ExecutionContext for FakeContext {
    fn receiver(&self) -> Value {
        self.receiver.clone()
    }

    fn evaluate(&self, source: &str, session: &Session) -> Result<Outcome, Interrupt> {
        self.log.borrow_mut().push(source.to_string());
        let src = source.trim();
        if src == "boom" {
            return Ok(Outcome::Fault(Fault::new("RuntimeError", "boom")));
        }
        if src == "quit!" {
            return Err(Interrupt::Exit(7));
        }
        if let Some(name) = src.strip_prefix("nest ") {
            let v = session.nest(Target::Object(Value::Str(name.to_string())))?;
            return Ok(Outcome::Value(v));
        }
        let bound = self.bindings.borrow().get(src).cloned();
        Ok(Outcome::Value(bound.unwrap_or_else(|| Value::Str(src.to_string()))))
    }

    fn bind(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    fn binding_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

/// `FakeContext` を配る供給元。評価ログは全コンテキストで共有する。
pub struct FakeProvider {
    pub top: ContextRef,
    pub log: Rc<RefCell<Vec<String>>>,
}

impl FakeProvider {
    pub fn new() -> Rc<Self> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let top: ContextRef = Rc::new(FakeContext {
            receiver: Value::Main,
            log: Rc::clone(&log),
            bindings: RefCell::default(),
        });
        Rc::new(Self { top, log })
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl ContextProvider for FakeProvider {
    fn top_level(&self) -> ContextRef {
        Rc::clone(&self.top)
    }

    fn anchor(&self, receiver: Value) -> ContextRef {
        Rc::new(FakeContext {
            receiver,
            log: Rc::clone(&self.log),
            bindings: RefCell::default(),
        })
    }
}

/// `do` と `end` の語数が釣り合えば完結とみなす判定器。
pub fn balanced_oracle() -> Rc<dyn CompletenessOracle> {
    Rc::new(|src: &str| -> Result<bool, Fault> {
        let words = src.split_whitespace();
        let (mut open, mut close) = (0, 0);
        for w in words {
            match w {
                "do" => open += 1,
                "end" => close += 1,
                _ => {}
            }
        }
        Ok(open <= close)
    })
}

/// 偽コンテキスト上のハーネス（告知なし、判定器は `balanced_oracle`）。
pub fn fake_harness(lines: &[&str]) -> (Harness, Rc<FakeProvider>) {
    fake_harness_with(
        ScriptedInput::new(lines.to_vec()),
        ConfigOverrides::new().with_hooks(Hooks::empty()),
    )
}

pub fn fake_harness_with(
    input: ScriptedInput,
    overrides: ConfigOverrides,
) -> (Harness, Rc<FakeProvider>) {
    let provider = FakeProvider::new();
    let as_provider: Rc<dyn ContextProvider> = provider.clone();
    let harness = Harness::build(as_provider, balanced_oracle(), input, overrides);
    (harness, provider)
}

/// 受け手とレベルが見える検査用プロンプト。
pub fn tagged_prompts() -> Prompts {
    Prompts::new(
        |receiver, level| format!("F:{}:{}", receiver, level),
        |receiver, level| format!("C:{}:{}", receiver, level),
    )
}

pub fn lines_then(lines: &[&str], tail: ReadResult) -> ScriptedInput {
    let mut results: Vec<ReadResult> = lines
        .iter()
        .map(|l| ReadResult::Line(l.to_string()))
        .collect();
    results.push(tail);
    ScriptedInput::from_results(results)
}
