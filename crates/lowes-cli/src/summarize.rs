//! The `summarize` command: per-store and per-category totals over JSON
//! Lines output files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use lowes_core::ProductRecord;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub records: usize,
    /// Captured with the pickup filter verified.
    pub confirmed_pickup: usize,
    pub unconfirmed_pickup: usize,
    pub clearance: usize,
    pub max_pct_off: Option<Decimal>,
}

impl Tally {
    fn add(&mut self, record: &ProductRecord) {
        self.records += 1;
        if record.is_confirmed_pickup() {
            self.confirmed_pickup += 1;
        } else {
            self.unconfirmed_pickup += 1;
        }
        if record.clearance {
            self.clearance += 1;
        }
        if let Some(pct) = record.pct_off {
            self.max_pct_off = Some(self.max_pct_off.map_or(pct, |m| m.max(pct)));
        }
    }
}

/// Totals keyed by `(store_id, category)`, plus the number of lines that
/// could not be parsed.
#[derive(Debug, Default)]
pub(crate) struct Summary {
    pub groups: BTreeMap<(String, String), Tally>,
    pub skipped_lines: usize,
}

impl Summary {
    pub(crate) fn ingest(&mut self, text: &str, source: &str) {
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ProductRecord>(line) {
                Ok(record) => self
                    .groups
                    .entry((record.store_id.clone(), record.category.clone()))
                    .or_default()
                    .add(&record),
                Err(e) => {
                    tracing::warn!(file = source, line = n + 1, error = %e, "skipping malformed record");
                    self.skipped_lines += 1;
                }
            }
        }
    }

    /// Per-store totals across categories.
    pub(crate) fn by_store(&self) -> BTreeMap<&str, Tally> {
        let mut stores: BTreeMap<&str, Tally> = BTreeMap::new();
        for ((store_id, _), tally) in &self.groups {
            let total = stores.entry(store_id.as_str()).or_default();
            total.records += tally.records;
            total.confirmed_pickup += tally.confirmed_pickup;
            total.unconfirmed_pickup += tally.unconfirmed_pickup;
            total.clearance += tally.clearance;
            total.max_pct_off = match (total.max_pct_off, tally.max_pct_off) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
        stores
    }
}

/// # Errors
///
/// Returns an error if any file cannot be read.
pub(crate) async fn run_summarize(files: &[PathBuf]) -> anyhow::Result<()> {
    let mut summary = Summary::default();
    for path in files {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        summary.ingest(&text, &path.display().to_string());
    }

    println!(
        "{:<8} {:<28} {:>8} {:>10} {:>12} {:>10} {:>8}",
        "store", "category", "records", "confirmed", "unconfirmed", "clearance", "max off"
    );
    for ((store_id, category), tally) in &summary.groups {
        print_row(store_id, category, tally);
    }
    for (store_id, tally) in summary.by_store() {
        print_row(store_id, "(all)", &tally);
    }
    if summary.skipped_lines > 0 {
        println!("skipped {} malformed lines", summary.skipped_lines);
    }
    Ok(())
}

fn print_row(store_id: &str, category: &str, tally: &Tally) {
    let max_off = tally.max_pct_off.map_or_else(
        || "-".to_string(),
        |pct| format!("{}%", (pct * Decimal::ONE_HUNDRED).round_dp(1)),
    );
    println!(
        "{store_id:<8} {category:<28} {:>8} {:>10} {:>12} {:>10} {max_off:>8}",
        tally.records, tally.confirmed_pickup, tally.unconfirmed_pickup, tally.clearance
    );
}
