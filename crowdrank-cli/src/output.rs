/// Output formatting: terminal table and JSON.
use serde::Serialize;

use crate::simulate::SimReport;

#[derive(Serialize)]
struct JsonRankedItem {
    rank: usize,
    name: String,
    mu: f64,
    sigma_sq: f64,
    wins: usize,
    losses: usize,
    true_rank: usize,
}

#[derive(Serialize)]
struct JsonOutput {
    items: Vec<JsonRankedItem>,
    decisions: usize,
    spearman: f64,
}

/// Print the recovered leaderboard as a formatted terminal table.
pub fn print_table(report: &SimReport) {
    let name_width = report
        .leaderboard
        .iter()
        .map(|i| i.name.len())
        .max()
        .unwrap_or(4)
        .max(4); // at least "Item"

    println!(" # | {:<name_width$} |      mu | sigma^2 |   W-L | True rank", "Item");
    println!("---|-{}-|---------|---------|-------|----------", "-".repeat(name_width));

    for (rank, item) in report.leaderboard.iter().enumerate() {
        let stats = report.stats.get(&item.id).copied().unwrap_or_default();
        let true_rank = report.true_ranks.get(&item.id).copied().unwrap_or(0);
        println!(
            "{:>2} | {:<name_width$} | {:>7.3} | {:>7.4} | {:>2}-{:<2} | {:>9}",
            rank + 1,
            item.name,
            item.mu,
            item.sigma_sq,
            stats.wins,
            stats.losses,
            true_rank + 1,
        );
    }

    println!(
        "\n{} items ranked from {} decisions (Spearman vs truth: {:.3})",
        report.leaderboard.len(),
        report.decisions,
        report.spearman,
    );
}

/// Print the leaderboard as JSON.
pub fn print_json(report: &SimReport) {
    let items: Vec<JsonRankedItem> = report
        .leaderboard
        .iter()
        .enumerate()
        .map(|(rank, item)| {
            let stats = report.stats.get(&item.id).copied().unwrap_or_default();
            JsonRankedItem {
                rank: rank + 1,
                name: item.name.clone(),
                mu: item.mu,
                sigma_sq: item.sigma_sq,
                wins: stats.wins,
                losses: stats.losses,
                true_rank: report.true_ranks.get(&item.id).copied().unwrap_or(0) + 1,
            }
        })
        .collect();

    let output = JsonOutput { items, decisions: report.decisions, spearman: report.spearman };

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}
