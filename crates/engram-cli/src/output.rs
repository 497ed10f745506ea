//! Table and JSON rendering for store results

use std::io::Write;

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use engram::memory::Tombstone;
use engram::storage::{ConsolidationReport, RetrievedMemory};
use engram::{MemoryItem, StoreStats};
use serde::Serialize;

use crate::error::CliResult;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> CliResult<()> {
    writeln!(out, "{}", serde_json::to_string(value)?)?;
    Ok(())
}

pub fn items(out: &mut dyn Write, items: &[MemoryItem], format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return json(out, items);
    }
    if items.is_empty() {
        writeln!(out, "(empty)")?;
        return Ok(());
    }

    let mut table = table(&["ID", "Importance", "Accesses", "Tags", "Created", "Content"]);
    for item in items {
        let tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
        table.add_row([
            item.id.to_string(),
            format!("{:.3}", item.importance),
            item.access_count.to_string(),
            tags.join(","),
            format_timestamp(&item.created_at),
            truncate_string(item.content.text(), 60),
        ]);
    }
    writeln!(out, "{table}")?;
    Ok(())
}

pub fn retrieved(
    out: &mut dyn Write,
    results: &[RetrievedMemory],
    format: OutputFormat,
) -> CliResult<()> {
    if format == OutputFormat::Json {
        return json(out, results);
    }
    if results.is_empty() {
        writeln!(out, "No matching memories")?;
        return Ok(());
    }

    let mut table = table(&["ID", "Tier", "Relevance", "Importance", "Accesses", "Content"]);
    for hit in results {
        let m = &hit.memory;
        table.add_row([
            m.id.to_string(),
            m.tier.to_string(),
            format!("{:.3}", hit.relevance),
            format!("{:.3}", m.importance),
            m.access_count.to_string(),
            truncate_string(m.content.text(), 60),
        ]);
    }
    writeln!(out, "{table}")?;
    Ok(())
}

pub fn report(out: &mut dyn Write, report: &ConsolidationReport, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return json(out, report);
    }

    let promoted: Vec<String> = report.promoted.iter().map(ToString::to_string).collect();
    writeln!(
        out,
        "Promoted {} ({}), evicted {}, decayed {}{}",
        report.promoted.len(),
        if promoted.is_empty() { "none".to_string() } else { promoted.join(" ") },
        report.evictions.len(),
        report.decayed,
        if report.decay_applied { "" } else { " (decay skipped, no new activity)" }
    )?;
    for eviction in &report.evictions {
        writeln!(
            out,
            "  {} from {}: {}",
            eviction.item.id, eviction.item.tier, eviction.reason
        )?;
    }
    Ok(())
}

pub fn stats(out: &mut dyn Write, stats: &StoreStats, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return json(out, stats);
    }

    let mut table = table(&["Tier", "Count", "Capacity", "Utilization", "Accesses", "Mean Importance"]);
    for tier in &stats.tiers {
        table.add_row([
            tier.tier.to_string(),
            tier.count.to_string(),
            tier.capacity.to_string(),
            format!("{:.0}%", tier.utilization() * 100.0),
            tier.total_accesses.to_string(),
            format!("{:.3}", tier.mean_importance),
        ]);
    }
    writeln!(out, "{table}")?;
    writeln!(
        out,
        "Total: {} memories, {} stores ({} rejected), {} retrievals, {} passes, {} promotions",
        stats.total_items,
        stats.stores,
        stats.rejected_stores,
        stats.retrievals,
        stats.consolidation_passes,
        stats.promotions
    )?;
    writeln!(
        out,
        "Evictions: {} capacity, {} forgotten, {} expired",
        stats.evictions.capacity_pressure, stats.evictions.forgotten, stats.evictions.expired
    )?;
    Ok(())
}

pub fn tombstones(out: &mut dyn Write, tombstones: &[Tombstone], format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return json(out, tombstones);
    }
    if tombstones.is_empty() {
        writeln!(out, "No evictions recorded")?;
        return Ok(());
    }
    for tombstone in tombstones {
        writeln!(out, "{tombstone}")?;
    }
    Ok(())
}

pub fn message(out: &mut dyn Write, text: &str, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return json(out, &serde_json::json!({ "message": text }));
    }
    writeln!(out, "{text}")?;
    Ok(())
}

pub fn error(out: &mut dyn Write, text: &str, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Json {
        return json(out, &serde_json::json!({ "error": text }));
    }
    writeln!(out, "error: {text}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a much longer string", 10), "a much ...");
        assert_eq!(truncate_string("ééééé", 4), "é...");
    }

    #[test]
    fn test_error_json() {
        let mut out = Vec::new();
        error(&mut out, "bad", OutputFormat::Json).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"error\":\"bad\"}\n");
    }
}
