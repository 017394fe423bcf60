// パス: src/evaluator.rs
// 役割: calc 言語の AST をスコープ付きで評価する
// 意図: REPL に渡す実行コンテキストの中身（動的評価）を提供する
// 関連ファイル: src/ast.rs, src/host.rs, src/repl/session.rs
//! 評価器（evaluator）
//!
//! 目的:
//! - 文の並びを評価し、最後の文の値を結果とする。
//! - 実行時の障害は `Fault` として返し、セッション制御のシグナルは `Interrupt` として素通しする。
//!
//! 仕様要点:
//! - スコープは `Rc<RefCell<Scope>>` の親子連鎖。借用は参照・更新の瞬間だけに限り、
//!   `nest(...)` による再入評価中に借用が残らないようにする。
//! - 整数演算はオーバーフローを `RangeError` として報告する。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{BinOp, Expr, Program, Stmt, UnaryOp};
use crate::errors::Interrupt;
use crate::repl::{Session, Target};
use crate::value::{Fault, Value};

pub type ScopeRef = Rc<RefCell<Scope>>;

/// 変数束縛の 1 段分。
#[derive(Debug, Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<ScopeRef>,
}

impl Scope {
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// 現在の段に束縛を作る（既存の同名束縛は上書き）。
    pub fn define(scope: &ScopeRef, name: &str, value: Value) {
        scope.borrow_mut().vars.insert(name.to_string(), value);
    }

    pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
        let mut current = Some(Rc::clone(scope));
        while let Some(s) = current {
            let s = s.borrow();
            if let Some(v) = s.vars.get(name) {
                return Some(v.clone());
            }
            current = s.parent.clone();
        }
        None
    }

    /// 最も内側の既存束縛を更新する。見つからなければ現在の段に作る。
    pub fn assign(scope: &ScopeRef, name: &str, value: Value) {
        let mut current = Some(Rc::clone(scope));
        while let Some(s) = current {
            if let Some(slot) = s.borrow_mut().vars.get_mut(name) {
                *slot = value;
                return;
            }
            current = s.borrow().parent.clone();
        }
        Scope::define(scope, name, value);
    }

    /// 親をたどって見える束縛名をすべて返す（整列・重複除去済み）。
    pub fn names(scope: &ScopeRef) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(Rc::clone(scope));
        while let Some(s) = current {
            let s = s.borrow();
            names.extend(s.vars.keys().cloned());
            current = s.parent.clone();
        }
        names.sort();
        names.dedup();
        names
    }
}

/// 評価の中断理由。障害は結果として扱い、シグナルはセッションへ返す。
#[derive(Debug)]
pub enum Raise {
    Fault(Fault),
    Interrupt(Interrupt),
}

impl From<Fault> for Raise {
    fn from(f: Fault) -> Self {
        Raise::Fault(f)
    }
}

impl From<Interrupt> for Raise {
    fn from(i: Interrupt) -> Self {
        Raise::Interrupt(i)
    }
}

type EvalResult = Result<Value, Raise>;

fn fault(class: &'static str, message: impl Into<String>) -> Raise {
    Raise::Fault(Fault::new(class, message))
}

/// 受け手・スコープ・（あれば）セッションを束ねた評価器。
pub struct Interpreter<'a> {
    receiver: &'a Value,
    scope: ScopeRef,
    session: Option<&'a Session>,
}

impl<'a> Interpreter<'a> {
    pub fn new(receiver: &'a Value, scope: ScopeRef) -> Self {
        Self {
            receiver,
            scope,
            session: None,
        }
    }

    /// `nest(...)` が入れ子セッションを開けるようにセッションを紐付ける。
    pub fn with_session(mut self, session: &'a Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn eval_program(&self, prog: &Program) -> EvalResult {
        self.eval_stmts(&prog.stmts)
    }

    fn eval_stmts(&self, stmts: &[Stmt]) -> EvalResult {
        let mut last = Value::Nil;
        for stmt in stmts {
            last = self.eval_stmt(stmt)?;
        }
        Ok(last)
    }

    fn eval_stmt(&self, stmt: &Stmt) -> EvalResult {
        match stmt {
            Stmt::Let { name, expr } => {
                let v = self.eval_expr(expr)?;
                Scope::define(&self.scope, name, v.clone());
                Ok(v)
            }
            Stmt::Assign { name, expr } => {
                let v = self.eval_expr(expr)?;
                Scope::assign(&self.scope, name, v.clone());
                Ok(v)
            }
            Stmt::Expr(e) => self.eval_expr(e),
        }
    }

    pub fn eval_expr(&self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::SelfRef => Ok(self.receiver.clone()),
            Expr::Var { name, .. } => Scope::lookup(&self.scope, name).ok_or_else(|| {
                fault(
                    "NameError",
                    format!("undefined local variable or function `{}`", name),
                )
            }),
            Expr::List(items) => items
                .iter()
                .map(|e| self.eval_expr(e))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Unary { op, expr } => {
                let v = self.eval_expr(expr)?;
                match (op, v) {
                    (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
                    (UnaryOp::Neg, Value::Int(i)) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| fault("RangeError", "integer overflow")),
                    (UnaryOp::Neg, other) => Err(fault(
                        "TypeError",
                        format!("cannot negate {}", other.type_name()),
                    )),
                }
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Index { target, index } => {
                let target = self.eval_expr(target)?;
                let index = self.eval_expr(index)?;
                eval_index(target, index)
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|e| self.eval_expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_builtin(name, args)
            }
            Expr::Block(stmts) => self.eval_stmts(stmts),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(cond)?.is_truthy() {
                    self.eval_stmts(then_branch)
                } else if let Some(branch) = else_branch {
                    self.eval_stmts(branch)
                } else {
                    Ok(Value::Nil)
                }
            }
            Expr::While { cond, body } => {
                while self.eval_expr(cond)?.is_truthy() {
                    self.eval_stmts(body)?;
                }
                Ok(Value::Nil)
            }
        }
    }

    fn eval_binary(&self, op: BinOp, left: &Expr, right: &Expr) -> EvalResult {
        // 論理演算は短絡評価し、被演算子の値そのものを返す
        match op {
            BinOp::And => {
                let l = self.eval_expr(left)?;
                return if l.is_truthy() { self.eval_expr(right) } else { Ok(l) };
            }
            BinOp::Or => {
                let l = self.eval_expr(left)?;
                return if l.is_truthy() { Ok(l) } else { self.eval_expr(right) };
            }
            _ => {}
        }
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        binary(op, l, r)
    }

    fn call_builtin(&self, name: &str, args: Vec<Value>) -> EvalResult {
        match name {
            "nest" => {
                let [target] = take_args::<1>(name, args)?;
                let Some(session) = self.session else {
                    return Err(fault("RuntimeError", "no session to nest into"));
                };
                Ok(session.nest(Target::Object(target))?)
            }
            "exit" => {
                let status = match args.as_slice() {
                    [] => 0,
                    [Value::Int(code)] => i32::try_from(*code)
                        .map_err(|_| fault("RangeError", format!("exit status out of range: {}", code)))?,
                    [other] => {
                        return Err(fault(
                            "TypeError",
                            format!("exit status must be Int, got {}", other.type_name()),
                        ))
                    }
                    _ => return Err(arity_error(args.len(), "0..1")),
                };
                Err(Raise::Interrupt(Interrupt::Exit(status)))
            }
            "raise" => {
                let [msg] = take_args::<1>(name, args)?;
                Err(fault("RuntimeError", msg.to_string()))
            }
            "len" => match take_args::<1>(name, args)? {
                [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
                [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
                [other] => Err(fault(
                    "TypeError",
                    format!("len() is not defined for {}", other.type_name()),
                )),
            },
            "str" => {
                let [v] = take_args::<1>(name, args)?;
                Ok(Value::Str(v.to_string()))
            }
            "type" => {
                let [v] = take_args::<1>(name, args)?;
                Ok(Value::Str(v.type_name().to_string()))
            }
            _ => Err(fault(
                "NoMethodError",
                format!("undefined function `{}`", name),
            )),
        }
    }
}

fn arity_error(given: usize, expected: &str) -> Raise {
    fault(
        "ArgumentError",
        format!(
            "wrong number of arguments (given {}, expected {})",
            given, expected
        ),
    )
}

fn take_args<const N: usize>(_name: &str, args: Vec<Value>) -> Result<[Value; N], Raise> {
    let given = args.len();
    <[Value; N]>::try_from(args).map_err(|_| arity_error(given, &N.to_string()))
}

fn binary(op: BinOp, l: Value, r: Value) -> EvalResult {
    use Value::*;
    let overflow = || fault("RangeError", "integer overflow");
    match (op, l, r) {
        (BinOp::Eq, l, r) => Ok(Bool(l == r)),
        (BinOp::Ne, l, r) => Ok(Bool(l != r)),
        (BinOp::Add, Int(a), Int(b)) => a.checked_add(b).map(Int).ok_or_else(overflow),
        (BinOp::Add, Str(a), Str(b)) => Ok(Str(a + &b)),
        (BinOp::Add, List(mut a), List(b)) => {
            a.extend(b);
            Ok(List(a))
        }
        (BinOp::Sub, Int(a), Int(b)) => a.checked_sub(b).map(Int).ok_or_else(overflow),
        (BinOp::Mul, Int(a), Int(b)) => a.checked_mul(b).map(Int).ok_or_else(overflow),
        (BinOp::Div | BinOp::Rem, Int(_), Int(0)) => Err(fault("ZeroDivisionError", "divided by 0")),
        (BinOp::Div, Int(a), Int(b)) => a.checked_div(b).map(Int).ok_or_else(overflow),
        (BinOp::Rem, Int(a), Int(b)) => a.checked_rem(b).map(Int).ok_or_else(overflow),
        (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge, l, r) => {
            let ord = match (&l, &r) {
                (Int(a), Int(b)) => a.cmp(b),
                (Str(a), Str(b)) => a.cmp(b),
                _ => {
                    return Err(fault(
                        "TypeError",
                        format!(
                            "comparison of {} with {} failed",
                            l.type_name(),
                            r.type_name()
                        ),
                    ))
                }
            };
            Ok(Bool(match op {
                BinOp::Lt => ord.is_lt(),
                BinOp::Le => ord.is_le(),
                BinOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            }))
        }
        (op, l, r) => Err(fault(
            "TypeError",
            format!(
                "unsupported operand types for {}: {} and {}",
                op.symbol(),
                l.type_name(),
                r.type_name()
            ),
        )),
    }
}

fn eval_index(target: Value, index: Value) -> EvalResult {
    let Value::Int(i) = index else {
        return Err(fault(
            "TypeError",
            format!("index must be Int, got {}", index.type_name()),
        ));
    };
    let resolve = |len: usize| -> Result<usize, Raise> {
        let idx = if i < 0 { len as i64 + i } else { i };
        if idx < 0 || idx >= len as i64 {
            return Err(fault(
                "IndexError",
                format!("index {} outside of sequence of length {}", i, len),
            ));
        }
        Ok(idx as usize)
    };
    match target {
        Value::List(items) => {
            let idx = resolve(items.len())?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve(chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        other => Err(fault(
            "TypeError",
            format!("{} is not indexable", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{Interpreter, Raise, Scope};
    use crate::errors::Interrupt;
    use crate::parser::parse_program;
    use crate::value::Value;

    fn run(src: &str) -> Result<Value, Raise> {
        let scope = Scope::root();
        let receiver = Value::Main;
        let prog = parse_program(src).expect("parse");
        Interpreter::new(&receiver, scope).eval_program(&prog)
    }

    fn value(src: &str) -> Value {
        match run(src) {
            Ok(v) => v,
            Err(e) => panic!("{:?} failed: {:?}", src, e),
        }
    }

    fn fault_class(src: &str) -> &'static str {
        match run(src) {
            Err(Raise::Fault(f)) => f.class,
            other => panic!("{:?}: expected fault, got {:?}", src, other),
        }
    }

    #[test]
    /// 算術・比較・論理演算の代表ケースを確認する。
    fn arithmetic_comparison_and_logic() {
        assert_eq!(value("1 + 1"), Value::Int(2));
        assert_eq!(value("7 / 2 * 2 + 7 % 2"), Value::Int(7));
        assert_eq!(value("-(2 - 5)"), Value::Int(3));
        assert_eq!(value("\"ab\" < \"b\""), Value::Bool(true));
        assert_eq!(value("nil || 3"), Value::Int(3));
        assert_eq!(value("false && missing"), Value::Bool(false));
        assert_eq!(value("!nil"), Value::Bool(true));
        assert_eq!(value("[1] + [2] == [1, 2]"), Value::Bool(true));
    }

    #[test]
    /// let / 代入 / ブロック / if / while の組み合わせで状態が更新されるか確認する。
    fn statements_and_control_flow() {
        let src = "let i = 0\nlet acc = 0\nwhile i < 5 do\n  i = i + 1\n  acc = acc + i\nend\nif acc == 15 then \"ok\" else \"ng\" end";
        assert_eq!(value(src), Value::Str("ok".into()));
        assert_eq!(value("do let x = 2; x * 3 end"), Value::Int(6));
        assert_eq!(value("if false then 1 end"), Value::Nil);
        assert_eq!(value(""), Value::Nil);
    }

    #[test]
    /// 実行時障害が分類名付きで報告されることを確認する。
    fn runtime_faults_are_classified() {
        assert_eq!(fault_class("1 / 0"), "ZeroDivisionError");
        assert_eq!(fault_class("5 % 0"), "ZeroDivisionError");
        assert_eq!(fault_class("missing"), "NameError");
        assert_eq!(fault_class("1 + \"a\""), "TypeError");
        assert_eq!(fault_class("[1][3]"), "IndexError");
        assert_eq!(fault_class("nope(1)"), "NoMethodError");
        assert_eq!(fault_class("len(1, 2)"), "ArgumentError");
        assert_eq!(fault_class("9223372036854775807 + 1"), "RangeError");
        assert_eq!(fault_class("raise(\"boom\")"), "RuntimeError");
    }

    #[test]
    /// exit はシグナルとして返り、障害には化けないことを確認する。
    fn exit_is_an_interrupt() {
        assert!(matches!(run("exit()"), Err(Raise::Interrupt(Interrupt::Exit(0)))));
        assert!(matches!(run("exit(3)"), Err(Raise::Interrupt(Interrupt::Exit(3)))));
        assert!(matches!(run("1; exit(2); 3"), Err(Raise::Interrupt(Interrupt::Exit(2)))));
    }

    #[test]
    /// セッション未接続の評価器で nest を呼ぶと障害になる。
    fn nest_without_session_is_a_fault() {
        assert_eq!(fault_class("nest(1)"), "RuntimeError");
    }

    #[test]
    /// 組み込み関数と self・添字の挙動を確認する。
    fn builtins_self_and_indexing() {
        assert_eq!(value("self"), Value::Main);
        assert_eq!(value("len(\"héllo\")"), Value::Int(5));
        assert_eq!(value("str([1, \"a\"])"), Value::Str("[1, \"a\"]".into()));
        assert_eq!(value("type(nil)"), Value::Str("Nil".into()));
        assert_eq!(value("[1, 2, 3][-1]"), Value::Int(3));
        assert_eq!(value("\"abc\"[1]"), Value::Str("b".into()));
    }

    #[test]
    /// 子スコープからの代入が親の束縛を更新し、名前一覧が親を含むことを確認する。
    fn scope_assignment_walks_parents() {
        let root = Scope::root();
        Scope::define(&root, "x", Value::Int(1));
        let child = Scope::child(&root);
        Scope::assign(&child, "x", Value::Int(2));
        Scope::assign(&child, "y", Value::Int(3));
        assert_eq!(Scope::lookup(&root, "x"), Some(Value::Int(2)));
        assert_eq!(Scope::lookup(&root, "y"), None);
        assert_eq!(Scope::names(&child), vec!["x".to_string(), "y".to_string()]);
    }
}
