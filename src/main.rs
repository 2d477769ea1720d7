// Entry point and high-level CLI flow.
//
// rust_reorder <on_hand.csv> <transactions.csv> [options]
//
// Reads both tables, runs the reorder pipeline, prints short previews and
// writes the output tables to the output directory. Either every output file
// is written or none is.
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use rust_reorder::output::{preview_table_rows, OutputBatch};
use rust_reorder::{
    compute_order_suggestions, loader, logging, util, ReorderConfig, ReorderError, ReorderReport,
    TrailingWindow,
};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "\
usage: rust_reorder <on_hand.csv> <transactions.csv> [options]

options:
  --config FILE        JSON policy and column mapping
  --today YYYY-MM-DD   reference date for the history window (default: today)
  --out-dir DIR        where output files are written (default: .)
  --window 3|5         trailing window in years
  --cover-months N     months of peak consumption held as safety stock
  --min-order N        minimum nonzero order quantity
  --top-n N            size of the most-used table
  --orders-only        only list items with something to order
  --log-json           JSON log lines on stderr";

const SUGGESTIONS_FILE: &str = "order_suggestions.csv";
const MOST_USED_FILE: &str = "most_used_items.csv";
const HISTORY_FILE: &str = "annual_history.csv";
const SUMMARY_FILE: &str = "reorder_summary.json";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    on_hand: PathBuf,
    transactions: PathBuf,
    config: Option<PathBuf>,
    today: Option<NaiveDate>,
    out_dir: PathBuf,
    window: Option<TrailingWindow>,
    cover_months: Option<u32>,
    min_order: Option<u64>,
    top_n: Option<usize>,
    orders_only: bool,
    log_json: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliArgs> {
    let mut it = args.into_iter();
    let mut positional = Vec::new();
    let mut cli = CliArgs { out_dir: PathBuf::from("."), ..CliArgs::default() };

    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().ok_or_else(|| anyhow!("{flag} needs a value"));
        match arg.as_str() {
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--today" => {
                let v = value("--today")?;
                let d = NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                    .with_context(|| format!("--today: invalid date {v:?}"))?;
                cli.today = Some(d);
            }
            "--out-dir" => cli.out_dir = PathBuf::from(value("--out-dir")?),
            "--window" => {
                let years: u32 = value("--window")?.parse().context("--window")?;
                cli.window = Some(TrailingWindow::try_from(years).map_err(|e| anyhow!(e))?);
            }
            "--cover-months" => cli.cover_months = Some(value("--cover-months")?.parse().context("--cover-months")?),
            "--min-order" => cli.min_order = Some(value("--min-order")?.parse().context("--min-order")?),
            "--top-n" => cli.top_n = Some(value("--top-n")?.parse().context("--top-n")?),
            "--orders-only" => cli.orders_only = true,
            "--log-json" => cli.log_json = true,
            s if s.starts_with("--") => bail!("unknown option {s}"),
            _ => positional.push(PathBuf::from(&arg)),
        }
    }

    match <[PathBuf; 2]>::try_from(positional) {
        Ok([on_hand, transactions]) => {
            cli.on_hand = on_hand;
            cli.transactions = transactions;
            Ok(cli)
        }
        Err(_) => bail!("expected exactly two input files"),
    }
}

/// Config file first, then individual flags on top of it.
fn build_config(cli: &CliArgs) -> Result<ReorderConfig> {
    let mut config = match &cli.config {
        Some(path) => ReorderConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReorderConfig::default(),
    };
    let policy = &mut config.policy;
    if let Some(w) = cli.window {
        policy.trailing_window_years = w;
    }
    if let Some(m) = cli.cover_months {
        policy.safety_stock_cover_months = m;
    }
    if let Some(m) = cli.min_order {
        policy.minimum_order_qty = m;
    }
    if let Some(n) = cli.top_n {
        policy.top_n_most_used = n;
    }
    if cli.orders_only {
        policy.orders_only = true;
    }
    policy.validate()?;
    Ok(config)
}

fn write_outputs(report: &ReorderReport, cli: &CliArgs) -> Result<Vec<PathBuf>> {
    let mut batch = OutputBatch::new(&cli.out_dir);
    batch.stage_csv(SUGGESTIONS_FILE, &report.suggestions)?;
    batch.stage_csv(MOST_USED_FILE, &report.most_used)?;
    batch.stage_csv(HISTORY_FILE, &report.annual_history())?;
    batch.stage_json(SUMMARY_FILE, report.summary())?;
    Ok(batch.commit()?)
}

fn print_report(report: &ReorderReport, config: &ReorderConfig) {
    let d = &report.diagnostics;
    println!(
        "Processing dataset... ({} on-hand rows -> {} items, {} transactions in the {}-year window)",
        util::format_int(d.on_hand_rows),
        util::format_int(report.on_hand.len()),
        util::format_int(d.transactions_in_window),
        config.policy.trailing_window_years.years()
    );
    if d.total_warnings() > 0 {
        println!("Note: {} rows skipped due to parse errors:", util::format_int(d.total_warnings()));
        for (warning, count) in &d.warnings {
            println!("  - {}: {}", warning, util::format_int(*count));
        }
    }
    if d.transactions_for_unknown_items > 0 {
        println!(
            "Info: {} transactions refer to items not in the on-hand file.",
            util::format_int(d.transactions_for_unknown_items)
        );
    }
    println!();

    let title = if config.policy.orders_only { "Items Needing Reorder" } else { "Order Suggestions" };
    println!("{title}");
    println!(
        "(Safety stock = {} months of peak-year consumption, minimum order {})\n",
        config.policy.safety_stock_cover_months, config.policy.minimum_order_qty
    );
    preview_table_rows(&report.suggestions, 5);
    println!("(Full table exported to {})\n", SUGGESTIONS_FILE);

    println!("Most Used Items");
    println!("(Top {} by average annual consumption)\n", config.policy.top_n_most_used);
    preview_table_rows(&report.most_used, 5);
    println!("(Full table exported to {})\n", MOST_USED_FILE);

    let s = report.summary();
    println!("Summary Stats ({}):", SUMMARY_FILE);
    println!(
        "{{\"items\": {}, \"needing_order\": {}, \"needing_review\": {}, \"total_order_qty\": {}}}\n",
        util::format_int(s.total_items),
        util::format_int(s.items_needing_order),
        util::format_int(s.items_needing_review),
        util::format_int(s.total_final_order_qty)
    );
}

fn run(cli: CliArgs) -> Result<()> {
    let config = build_config(&cli)?;
    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());

    let on_hand = loader::read_table_file("on-hand", &cli.on_hand)
        .with_context(|| format!("reading {}", cli.on_hand.display()))?;
    let transactions = loader::read_table_file("transactions", &cli.transactions)
        .with_context(|| format!("reading {}", cli.transactions.display()))?;

    let report = compute_order_suggestions(&on_hand, &transactions, &config, today)?;
    write_outputs(&report, &cli).context("writing outputs")?;
    print_report(&report, &config);
    Ok(())
}

fn main() -> ExitCode {
    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e:#}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    logging::init(cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            // Input files that need fixing get their own exit code.
            match e.downcast_ref::<ReorderError>() {
                Some(ReorderError::Schema { .. }) | Some(ReorderError::EmptyInput { .. }) => ExitCode::from(3),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn parses_inputs_and_overrides() {
        let cli = parse_args(args(
            "on_hand.csv tx.csv --window 3 --cover-months 6 --min-order 10 --top-n 3 \
             --today 2026-10-16 --orders-only --out-dir out",
        ))
        .unwrap();
        assert_eq!(cli.on_hand, PathBuf::from("on_hand.csv"));
        assert_eq!(cli.transactions, PathBuf::from("tx.csv"));
        assert_eq!(cli.window, Some(TrailingWindow::ThreeYears));
        assert_eq!(cli.today, NaiveDate::from_ymd_opt(2026, 10, 16));
        assert_eq!(cli.out_dir, PathBuf::from("out"));

        let config = build_config(&cli).unwrap();
        assert_eq!(config.policy.safety_stock_cover_months, 6);
        assert_eq!(config.policy.minimum_order_qty, 10);
        assert_eq!(config.policy.top_n_most_used, 3);
        assert!(config.policy.orders_only);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(args("only_one.csv")).is_err());
        assert!(parse_args(args("a.csv b.csv --window 4")).is_err());
        assert!(parse_args(args("a.csv b.csv --today 16/10/2026")).is_err());
        assert!(parse_args(args("a.csv b.csv --min-order")).is_err());
        assert!(parse_args(args("a.csv b.csv --frobnicate")).is_err());
    }

    #[test]
    fn zero_cover_months_fails_validation() {
        let cli = parse_args(args("a.csv b.csv --cover-months 0")).unwrap();
        assert!(build_config(&cli).is_err());
    }
}
