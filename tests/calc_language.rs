// パス: tests/calc_language.rs
// 役割: calc ホスト言語をセッション経由で動かしたときの評価・完結判定・障害表示を検証する
// 意図: 文法の未完結が継続行へ、真の構文誤りや実行時障害が表示へ正しく振り分けられることを確かめる
// 関連ファイル: tests/test_support.rs, src/host.rs, src/evaluator.rs, src/parser.rs
#[path = "test_support.rs"]
mod support;

use nestrepl::repl::{ConfigOverrides, Hooks, Prompts};
use support::Harness;

#[test]
/// 閉じていない while ブロックは継続プロンプトで読み進め、`end` で 1 単位として評価される。
fn open_blocks_continue_until_closed() {
    let h = Harness::calc_with(
        &[
            "let i = 0",
            "let acc = 0",
            "while i < 4 do",
            "  acc = acc + i",
            "  i = i + 1",
            "end",
            "acc",
            "exit",
        ],
        ConfigOverrides::new()
            .with_hooks(Hooks::empty())
            .with_prompts(Prompts::labelled("calc")),
    );
    h.run().unwrap();
    assert!(h.output().ends_with("=> 6\n"), "{}", h.output());
    let continuation = h
        .prompts()
        .iter()
        .filter(|p| p.as_str() == "calc(main)[0]* ")
        .count();
    assert_eq!(continuation, 3);
    assert_eq!(h.prompts()[0], "calc(main)[0]> ");
}

#[test]
/// 途中で切れた式も継続行として扱う。
fn dangling_operator_waits_for_more_input() {
    let h = Harness::calc(&["1 +", "2", "exit"]);
    h.run().unwrap();
    assert_eq!(h.output(), "=> 3\n");
}

#[test]
/// 入力不足ではない構文誤りは即座に SyntaxError として表示され、次の単位へ進む。
fn genuine_syntax_errors_are_reported() {
    let h = Harness::calc(&["1 +)", "7", "exit"]);
    h.run().unwrap();
    let out = h.output();
    assert!(out.starts_with("SyntaxError: [PAR002]"), "{}", out);
    assert!(out.ends_with("=> 7\n"), "{}", out);
}

#[test]
fn runtime_faults_carry_their_class() {
    let h = Harness::calc(&[
        "nope",
        "nest()",
        "raise(\"bad\")",
        "1 < \"a\"",
        "[1, 2][5]",
        "exit",
    ]);
    h.run().unwrap();
    let lines: Vec<String> = h.output().lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 5, "{:?}", lines);
    assert_eq!(lines[0], "NameError: undefined local variable or function `nope`");
    assert_eq!(lines[1], "ArgumentError: wrong number of arguments (given 0, expected 1)");
    assert_eq!(lines[2], "RuntimeError: bad");
    assert!(lines[3].starts_with("TypeError:"), "{}", lines[3]);
    assert!(lines[4].starts_with("IndexError:"), "{}", lines[4]);
}

#[test]
/// 文字列・リスト・組み込み関数の結果は inspect 形式で表示される。
fn values_print_in_inspect_form() {
    let h = Harness::calc(&[
        "[1, \"a\"] + [nil]",
        "\"ab\" + \"c\"",
        "len([1, 2, 3])",
        "str(12)",
        "if 1 > 2 then \"yes\" else \"no\" end",
        "exit",
    ]);
    h.run().unwrap();
    assert_eq!(
        h.output(),
        concat!(
            "=> [1, \"a\", nil]\n",
            "=> \"abc\"\n",
            "=> 3\n",
            "=> \"12\"\n",
            "=> \"no\"\n",
        )
    );
}

#[test]
/// 束縛はトップレベルの中で単位をまたいで残り、入れ子セッションからも読める。
fn bindings_persist_and_are_visible_when_nested() {
    let h = Harness::calc(&["let base = 100", "nest(1)", "self + base", "exit", "exit"]);
    h.run().unwrap();
    assert_eq!(h.output(), "=> 100\n=> 101\n=> 1\n");
}

#[test]
/// 空行は nil として評価される。
fn blank_line_evaluates_to_nil() {
    let h = Harness::calc(&["", "exit"]);
    h.run().unwrap();
    assert_eq!(h.output(), "=> nil\n");
}

#[test]
/// 極端に深い入れ子の貼り付けは継続入力を待たず SyntaxError として表示される。
fn pathological_nesting_is_reported_not_overflowed() {
    let deep = "(".repeat(50_000);
    let h = Harness::calc(&[deep.as_str(), "1", "exit"]);
    h.run().unwrap();
    let out = h.output();
    assert!(out.starts_with("SyntaxError: [PAR003]"), "{}", &out[..out.len().min(120)]);
    assert!(out.ends_with("=> 1\n"), "{}", &out[out.len().saturating_sub(120)..]);
}
