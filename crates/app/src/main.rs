use std::path::PathBuf;

use anyhow::{bail, Context};
use ledgerlink_core::{Money, PaymentId};
use ledgerlink_import::{run_import, BatchMeta, MatchEngine};

struct Args {
    csv_path: PathBuf,
    db_path: Option<PathBuf>,
    user: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut csv_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut user: Option<String> = None;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--db" => db_path = Some(PathBuf::from(iter.next().context("--db needs a path")?)),
            "--user" => user = Some(iter.next().context("--user needs a name")?.clone()),
            other if csv_path.is_none() => csv_path = Some(PathBuf::from(other)),
            other => bail!("unexpected argument: {other}"),
        }
    }

    let Some(csv_path) = csv_path else {
        bail!("usage: ledgerlink <statement.csv> [--db <path>] [--user <name>]");
    };
    Ok(Args { csv_path, db_path, user })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = parse_args()?;

    let db_path = match args.db_path {
        Some(path) => path,
        None => {
            let dirs = directories::ProjectDirs::from("com", "ledgerlink", "Ledgerlink")
                .context("could not determine data directory")?;
            let data_dir = dirs.data_dir().to_path_buf();
            std::fs::create_dir_all(&data_dir)
                .with_context(|| format!("creating {}", data_dir.display()))?;
            data_dir.join("ledgerlink.db")
        }
    };

    let db = ledgerlink_storage::create_db(&db_path)
        .await
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    ledgerlink_storage::seed_demo_data(&db).await?;

    let file = std::fs::File::open(&args.csv_path)
        .with_context(|| format!("opening {}", args.csv_path.display()))?;
    let file_name = args
        .csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.csv_path.display().to_string());

    let meta = BatchMeta {
        file_name,
        imported_by: args.user,
    };
    let summary = run_import(file, &db, &MatchEngine::default(), &meta).await?;

    println!(
        "batch {}: {} transactions, {} auto-linked, {} for review",
        summary.batch_id, summary.total, summary.matched, summary.unmatched
    );

    for outcome in &summary.transactions {
        let amount = Money::from_cents(outcome.amount_cents);
        match outcome.auto_linked {
            Some(payment_id) => {
                let tenant = ledgerlink_storage::get_rental_payment(&db, PaymentId(payment_id))
                    .await?
                    .map(|p| p.tenant_name)
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  row {:>4}  {}  {:<32} -> payment {} ({})",
                    outcome.source_row, amount, outcome.description, payment_id, tenant
                );
            }
            None => {
                println!(
                    "  row {:>4}  {}  {:<32} -> review ({} candidate{})",
                    outcome.source_row,
                    amount,
                    outcome.description,
                    outcome.candidates.len(),
                    if outcome.candidates.len() == 1 { "" } else { "s" }
                );
            }
        }
    }

    let review = ledgerlink_storage::get_unmatched_transactions(&db, summary.batch_id).await?;
    if !review.is_empty() {
        tracing::info!(count = review.len(), "transactions queued for manual review");
    }

    Ok(())
}
