// パス: src/bin/nestrepl.rs
// 役割: calc ホスト上でトップレベルセッションを起動する実行ファイル
// 意図: コマンドライン引数から設定の上書きを組み立て、終了理由を終了コードへ写す
// 関連ファイル: src/repl/mod.rs, src/host.rs, src/lib.rs
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use nestrepl::repl::{ConfigOverrides, Hooks, InputRef, PlainInput, Prompts};
use nestrepl::{CalcHost, Interrupt, Session, Target};

#[derive(Parser)]
#[command(author, version, about = "Nestable read-eval-print sessions for the calc language")]
struct Args {
    /// Read input lines from FILE instead of the terminal
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,
    /// Read plain lines from stdin (no raw-mode editing)
    #[arg(long)]
    plain: bool,
    /// Do not print session begin/end banners
    #[arg(long)]
    quiet: bool,
    /// Label shown at the start of the prompt
    #[arg(long, value_name = "NAME")]
    prompt: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("NESTREPL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let overrides = match overrides_from(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("入力ファイルを開けませんでした: {}", e);
            process::exit(1);
        }
    };

    let host = CalcHost::new();
    let manager = host.manager();
    let session = Session::new(&manager, overrides);
    let code = match session.run(Target::TopLevel) {
        Ok(receiver) => {
            debug!(receiver = %receiver.inspect(), "top-level session returned");
            0
        }
        Err(Interrupt::EndOfInput) => {
            let _ = writeln!(session.config().output.borrow_mut());
            0
        }
        Err(Interrupt::Exit(status)) => status,
        Err(Interrupt::Breakout(level)) => {
            warn!(level, "breakout escaped the top-level session");
            0
        }
        Err(Interrupt::Io(e)) => {
            eprintln!("入出力エラー: {}", e);
            1
        }
    };
    let _ = session.config().output.borrow_mut().flush();
    process::exit(code);
}

fn overrides_from(args: &Args) -> io::Result<ConfigOverrides> {
    let mut overrides = ConfigOverrides::new();
    if let Some(path) = &args.script {
        let file = File::open(path)?;
        let input: InputRef = Rc::new(RefCell::new(PlainInput::silent(BufReader::new(file))));
        overrides = overrides.with_input(input);
    } else if args.plain {
        let input: InputRef = Rc::new(RefCell::new(PlainInput::with_echo(
            io::stdin().lock(),
            Box::new(io::stdout()),
        )));
        overrides = overrides.with_input(input);
    }
    if args.quiet {
        overrides = overrides.with_hooks(Hooks::empty());
    }
    if let Some(label) = &args.prompt {
        overrides = overrides.with_prompts(Prompts::labelled(label));
    }
    Ok(overrides)
}
