// パス: tests/cli.rs
// 役割: nestrepl 実行ファイルのエンドツーエンド検証
// 意図: スクリプト入力からの実行結果と、終了理由ごとの終了コードを確認する
// 関連ファイル: src/bin/nestrepl.rs, src/host.rs

use std::{fs, path::Path, process::Command, process::Output};

use tempfile::tempdir;

fn run_script(dir: &Path, body: &str, extra: &[&str]) -> Result<Output, Box<dyn std::error::Error>> {
    let script = dir.join("input.calc");
    fs::write(&script, body)?;
    let output = Command::new(env!("CARGO_BIN_EXE_nestrepl"))
        .arg("--script")
        .arg(&script)
        .args(extra)
        .env_remove("NESTREPL_LOG")
        .output()?;
    Ok(output)
}

#[cfg_attr(miri, ignore = "spawns the binary, which Miri isolation forbids")]
#[test]
fn script_prints_results_and_exits_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let out = run_script(temp.path(), "1 + 1\nexit\n", &["--quiet"])?;
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "=> 2\n");
    Ok(())
}

#[cfg_attr(miri, ignore = "spawns the binary, which Miri isolation forbids")]
#[test]
fn banners_are_printed_unless_quiet() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let out = run_script(temp.path(), "nest(2)\nexit\nexit\n", &[])?;
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        concat!(
            "Beginning session for main\n",
            "Beginning session for 2\n",
            "Ending session for 2\n",
            "=> 2\n",
            "Ending session for main\n",
        )
    );
    Ok(())
}

#[cfg_attr(miri, ignore = "spawns the binary, which Miri isolation forbids")]
#[test]
fn exit_status_comes_from_evaluated_code() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let out = run_script(temp.path(), "nest(1)\nexit(3)\n1\n", &["--quiet"])?;
    assert_eq!(out.status.code(), Some(3));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "");
    Ok(())
}

#[cfg_attr(miri, ignore = "spawns the binary, which Miri isolation forbids")]
#[test]
fn end_of_input_is_a_normal_exit() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let out = run_script(temp.path(), "do\n1\nend\n", &["--quiet"])?;
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "=> 1\n\n");
    Ok(())
}

#[cfg_attr(miri, ignore = "spawns the binary, which Miri isolation forbids")]
#[test]
fn missing_script_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let out = Command::new(env!("CARGO_BIN_EXE_nestrepl"))
        .arg("--script")
        .arg(temp.path().join("absent.calc"))
        .output()?;
    assert_eq!(out.status.code(), Some(1));
    assert!(!out.stderr.is_empty());
    Ok(())
}
