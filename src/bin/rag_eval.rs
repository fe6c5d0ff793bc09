use std::path::PathBuf;

use clap::Parser;

use claims_rag::core::logging;
use claims_rag::eval::{load_eval_set, run_eval, HttpAskTarget, EVAL_TOP_K};

#[derive(Parser)]
#[command(name = "rag-eval")]
#[command(about = "Score /ask answers against an eval set", long_about = None)]
struct Cli {
    /// JSONL file of {"q": ..., "ans_contains": ...} lines
    #[arg(long, default_value = "eval.jsonl")]
    eval_set: PathBuf,
    /// Base URL of a running server
    #[arg(long, default_value = "http://localhost:8000")]
    url: String,
    #[arg(short, long, default_value_t = EVAL_TOP_K)]
    k: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    logging::init_cli();
    let cli = Cli::parse();

    let cases = load_eval_set(&cli.eval_set)?;
    let target = HttpAskTarget::new(cli.url);
    let tally = run_eval(&target, &cases, cli.k).await?;

    println!("{}", tally.summary(cli.k));
    Ok(())
}
