//! Terminal output formatting.

use colored::Colorize;

use cmbs_core::export::BatchReport;
use cmbs_db::Table;
use cmbs_graph::queries::{DealSummary, PropertySummary};
use cmbs_graph::LoadReport;

/// Widest a table column is allowed to grow.
const MAX_COLUMN_WIDTH: usize = 32;

/// Print a query result as an aligned table.
pub fn print_table(table: &Table) {
    if table.is_empty() {
        println!("{}", "No rows found.".dimmed());
        return;
    }

    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, w)| format!("{:<w$}", truncate(name, *w), w = *w))
        .collect();
    println!("{}", header.join(" ").bold());
    println!("{}", "─".repeat(widths.iter().sum::<usize>() + widths.len().saturating_sub(1)));

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", truncate(cell, *w), w = *w))
            .collect();
        println!("{}", line.join(" "));
    }

    println!();
    println!("{} row(s)", table.len());
}

pub fn print_batch_report(report: &BatchReport) {
    println!("\n{}", "Export complete:".green().bold());
    println!("  Exported:       {}", report.exported.len().to_string().green());
    println!("  Not applicable: {}", report.not_applicable.len().to_string().yellow());
    println!("  Failed:         {}", report.failed.len().to_string().red());

    for (cusip, reason) in &report.not_applicable {
        println!("  {} {} {}", "–".yellow(), cusip, reason.to_string().dimmed());
    }
    for (cusip, error) in &report.failed {
        println!("  {} {} {}", "✗".red(), cusip, error);
    }
}

pub fn print_load_report(report: &LoadReport) {
    if report.rolled_back {
        println!("{}", "Transaction rolled back; nothing was applied.".red().bold());
    } else {
        println!(
            "{} {}/{} statements applied",
            if report.failed.is_empty() { "✓".green() } else { "!".yellow() },
            report.applied,
            report.total
        );
    }
    for failure in &report.failed {
        if failure.index > 0 {
            println!("  {} #{}: {}", "✗".red(), failure.index, failure.error);
            println!("    {}", truncate(&failure.statement, 100).dimmed());
        } else {
            println!("  {} {}", "✗".red(), failure.error);
        }
    }
}

pub fn print_deals(deals: &[DealSummary]) {
    if deals.is_empty() {
        println!("{}", "No Deal nodes found in the database.".dimmed());
        return;
    }

    println!("{:<10} {:<30} {:<12} {:>10}", "Deal", "Display name", "CUSIP", "Properties");
    println!("{}", "─".repeat(65));
    for deal in deals {
        println!(
            "{:<10} {:<30} {:<12} {:>10}",
            deal.id.cyan(),
            truncate(deal.display_name.as_deref().unwrap_or("-"), 28),
            deal.cusip.as_deref().unwrap_or("-"),
            deal.properties
        );
    }
    println!();
    println!("{} deal(s) total", deals.len());
}

pub fn print_properties(properties: &[PropertySummary]) {
    if properties.is_empty() {
        println!("{}", "No properties found.".dimmed());
        return;
    }

    for property in properties {
        println!("{}", property.id.cyan().bold());
        let fields = [
            ("Address", &property.address),
            ("Name", &property.name),
            ("Type", &property.property_type),
            ("Year built", &property.year_built),
            ("MSA", &property.msa),
        ];
        for (label, value) in fields {
            println!("  {:<11} {}", format!("{}:", label), value.as_deref().unwrap_or("-"));
        }
    }
    println!();
    println!("{} propert(ies) total", properties.len());
}

/// Truncate to `max` characters, marking the cut with `...`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return ".".repeat(max);
    }
    let kept: String = s.chars().take(max - 3).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("SAMPLE CMBS 2014-1", 40), "SAMPLE CMBS 2014-1");
        assert_eq!(truncate("SAMPLE CMBS 2014-1", 9), "SAMPLE...");
        assert_eq!(truncate("abcdef", 2), "..");
    }
}
