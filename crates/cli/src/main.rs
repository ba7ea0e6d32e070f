use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tipjar_core::{BillHistory, BillRecord, Money, Sentiment, TipBreakdown, TipChoice};
use tipjar_ocr::{spawn_frame_worker, ScanSession, ScannedBillAmounts, ScannerConfig};

mod frames;

#[derive(Parser, Debug)]
#[command(name = "tipjar")]
#[command(version, about = "Read bill amounts from recorded receipt OCR frames and work out the tip", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay recorded OCR frames through a scan session
    Scan {
        /// Frames file: JSON, or text with `---` between frames
        input: PathBuf,

        /// TOML file overriding scanner thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tip preset (poor, okay, good, great, amazing) or a percentage
        #[arg(short, long)]
        tip: Option<String>,

        /// Number of people sharing the bill
        #[arg(short, long)]
        split: Option<u32>,

        /// Append the result to this bill history JSON file
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Compute a tip for a typed-in amount
    Tip {
        /// Bill amount, e.g. 45.50
        amount: String,

        #[arg(short, long, default_value = "good")]
        tip: String,

        #[arg(short, long, default_value_t = 1)]
        split: u32,
    },
}

#[derive(Serialize)]
struct ScanReport {
    frames: usize,
    state: String,
    amounts: ScannedBillAmounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    tip: Option<TipBreakdown>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { input, config, tip, split, history } => {
            let config = load_config(config.as_deref())?;
            let report = scan(&input, config, tip.as_deref(), split, history.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Tip { amount, tip, split } => {
            let bill = parse_money(&amount)?;
            let breakdown = TipBreakdown::compute(bill, parse_tip_choice(&tip)?, split)?;
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
    }
    Ok(())
}

async fn scan(
    input: &Path,
    config: ScannerConfig,
    tip: Option<&str>,
    split: Option<u32>,
    history: Option<&Path>,
) -> Result<ScanReport> {
    let frames = frames::load(input)?;
    info!(frames = frames.len(), input = %input.display(), "replaying frames");

    let (frames_tx, frames_rx) = mpsc::channel(16);
    let (updates_tx, mut updates_rx) = mpsc::channel(16);
    let worker = spawn_frame_worker(ScanSession::new(config), frames_rx, updates_tx);

    let frame_count = frames.len();
    let feeder = tokio::spawn(async move {
        for frame in frames {
            if frames_tx.send(frame).await.is_err() {
                break;
            }
        }
    });
    while let Some(update) = updates_rx.recv().await {
        info!(subtotal = ?update.subtotal, total = ?update.total, "scan updated");
    }
    feeder.await.context("Frame feeder task failed")?;
    let session = worker.await.context("Scan worker task failed")?;
    let amounts = session.current().clone();

    let breakdown = match (tip.is_some() || split.is_some(), amounts.bill_amount()) {
        (false, _) => None,
        (true, None) => bail!("No bill amount found in {}", input.display()),
        (true, Some(bill)) => Some(breakdown_for(&amounts, bill, tip, split.unwrap_or(1))?),
    };

    if let (Some(path), Some(b)) = (history, &breakdown) {
        append_history(path, &amounts, b)?;
    }

    Ok(ScanReport {
        frames: frame_count,
        state: format!("{:?}", session.state()),
        amounts,
        tip: breakdown,
    })
}

fn breakdown_for(
    amounts: &ScannedBillAmounts,
    bill: Money,
    tip: Option<&str>,
    split: u32,
) -> Result<TipBreakdown> {
    // A printed gratuity wins unless the user asked for a specific tip.
    let included = amounts.gratuity.as_ref().and_then(|g| Money::from_f64(g.amount));
    let breakdown = match (included, tip) {
        (Some(gratuity), None) => TipBreakdown::with_included_gratuity(bill, gratuity, split)?,
        (_, tip) => TipBreakdown::compute(bill, tip.map(parse_tip_choice).transpose()?.unwrap_or_default(), split)?,
    };
    Ok(breakdown)
}

fn append_history(path: &Path, amounts: &ScannedBillAmounts, breakdown: &TipBreakdown) -> Result<()> {
    let mut history = if path.exists() {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        BillHistory::from_json(&json)?
    } else {
        BillHistory::default()
    };
    let mut record = BillRecord::from_breakdown(history.next_id(), chrono::Utc::now(), breakdown);
    amounts.apply_to(&mut record);
    history.push(record);
    std::fs::write(path, history.to_json()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(entries = history.len(), path = %path.display(), "history updated");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ScannerConfig> {
    let Some(path) = path else {
        return Ok(ScannerConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ScannerConfig::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
}

fn parse_money(s: &str) -> Result<Money> {
    let cleaned = s.trim().trim_start_matches('$');
    let decimal = Decimal::from_str(cleaned).with_context(|| format!("Invalid amount '{s}'"))?;
    if decimal.is_sign_negative() {
        bail!("Amount must not be negative: '{s}'");
    }
    Ok(Money::from_decimal(decimal))
}

/// A sentiment name, or a custom percentage such as `17` or `17.5%`.
fn parse_tip_choice(s: &str) -> Result<TipChoice> {
    if let Ok(sentiment) = Sentiment::from_str(s) {
        return Ok(TipChoice::Preset(sentiment));
    }
    let percent = Decimal::from_str(s.trim().trim_end_matches('%'))
        .with_context(|| format!("Unknown tip '{s}': expected a sentiment or a percentage"))?;
    Ok(TipChoice::Custom(percent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_choice_parsing() {
        assert_eq!(parse_tip_choice("great").unwrap(), TipChoice::Preset(Sentiment::Great));
        assert_eq!(parse_tip_choice("17.5%").unwrap(), TipChoice::Custom(Decimal::new(175, 1)));
        assert!(parse_tip_choice("generous").is_err());
    }

    #[test]
    fn money_parsing() {
        assert_eq!(parse_money("$45.50").unwrap(), Money::from_cents(4550));
        assert!(parse_money("-3").is_err());
        assert!(parse_money("abc").is_err());
    }

    #[test]
    fn printed_gratuity_is_used_unless_tip_given() {
        let amounts = ScannedBillAmounts {
            subtotal: Some(67.0),
            total: Some(87.52),
            gratuity: Some(tipjar_ocr::DetectedGratuity {
                amount: 14.59,
                percentage: Some(20.0),
                label: "Gratuity".into(),
            }),
        };
        let bill = amounts.bill_amount().unwrap();

        let b = breakdown_for(&amounts, bill, None, 1).unwrap();
        assert!(b.gratuity_included);
        assert_eq!(b.tip, Money::from_cents(1459));

        let b = breakdown_for(&amounts, bill, Some("10"), 1).unwrap();
        assert!(!b.gratuity_included);
        assert_eq!(b.tip, Money::from_cents(670));
    }
}
