use std::io::{self, Write};

use crate::dashboard::{Chart, ChartName, Snapshot, Variant};
use crate::data::aggregate::{
    Coefficient, CorrelationMatrix, GroupCounts, GroupSummary, Histogram, Statistic, ValueCounts,
};
use crate::data::model::{Table, Value};

/// Widest histogram bar, in characters.
const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Write `snapshot` to `out` in the requested format.
pub fn write_report<W: Write>(
    out: &mut W,
    snapshot: &Snapshot,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, snapshot)?;
            writeln!(out)
        }
        OutputFormat::Text => write_text(out, snapshot),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn write_text<W: Write>(out: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let m = &snapshot.metrics;
    let label = match snapshot.variant {
        Variant::Overview => "overview",
        Variant::Explorer => "explorer",
    };
    writeln!(out, "== Attrition dashboard ({label}) ==")?;
    writeln!(
        out,
        "Rows after filter: {} of {}",
        m.visible_rows, m.total_rows
    )?;
    writeln!(out, "Attrition Rate (%): {:.2}%", m.attrition_rate)?;
    writeln!(
        out,
        "Avg Age: {}",
        format_stat(m.mean_age, |v| format!("{v:.1} yrs"))
    )?;
    writeln!(
        out,
        "Avg Monthly Income: {}",
        format_stat(m.mean_income, format_money)
    )?;

    for name in ChartName::ALL {
        let Some(chart) = snapshot.chart(name) else {
            continue;
        };
        writeln!(out)?;
        writeln!(out, "-- {} --", name.title())?;
        match chart {
            Chart::Counts(grid) => write_counts(out, grid)?,
            Chart::Histogram(hist) => write_histogram(out, hist)?,
            Chart::Correlation(matrix) => write_correlation(out, matrix)?,
            Chart::Summary(groups) => write_summary(out, groups)?,
            Chart::ValueCounts(counts) => write_value_counts(out, counts)?,
        }
    }

    if let Some(rows) = &snapshot.rows {
        writeln!(out)?;
        writeln!(out, "-- Filtered Data Details --")?;
        write_rows(out, rows)?;
    }
    Ok(())
}

fn format_stat(stat: Statistic, f: impl Fn(f64) -> String) -> String {
    match stat {
        Statistic::Value(v) => f(v),
        Statistic::NoData => "no data".to_string(),
    }
}

/// `$1,234.50` style.
pub fn format_money(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

/// Left-aligned first column, right-aligned numbers.
fn write_table<W: Write>(out: &mut W, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &w))| {
                if i == 0 {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    writeln!(out, "{}", line(header).trim_end())?;
    for row in rows {
        writeln!(out, "{}", line(row.as_slice()).trim_end())?;
    }
    Ok(())
}

fn write_counts<W: Write>(out: &mut W, grid: &GroupCounts) -> io::Result<()> {
    let header: Vec<String> = std::iter::once(grid.outer_column.clone())
        .chain(grid.inner_keys.iter().map(Value::to_string))
        .collect();
    let rows: Vec<Vec<String>> = grid
        .outer_keys
        .iter()
        .zip(&grid.counts)
        .map(|(key, counts)| {
            std::iter::once(key.to_string())
                .chain(counts.iter().map(u64::to_string))
                .collect()
        })
        .collect();
    write_table(out, &header, &rows)
}

fn write_histogram<W: Write>(out: &mut W, hist: &Histogram) -> io::Result<()> {
    if hist.buckets.is_empty() {
        return writeln!(out, "(no values)");
    }
    let peak = hist.buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let rows: Vec<Vec<String>> = hist
        .buckets
        .iter()
        .map(|b| {
            let bar = (b.count as usize * BAR_WIDTH) / peak as usize;
            vec![
                format!("{:.0} - {:.0}", b.low, b.high),
                b.count.to_string(),
                "#".repeat(bar),
            ]
        })
        .collect();
    let header = vec![hist.column.clone(), "count".to_string(), String::new()];
    write_table(out, &header, &rows)
}

fn write_correlation<W: Write>(out: &mut W, matrix: &CorrelationMatrix) -> io::Result<()> {
    let header: Vec<String> = std::iter::once(String::new())
        .chain(matrix.columns.iter().cloned())
        .collect();
    let rows: Vec<Vec<String>> = matrix
        .columns
        .iter()
        .zip(&matrix.values)
        .map(|(name, row)| {
            std::iter::once(name.clone())
                .chain(row.iter().map(|c| match c {
                    Coefficient::Defined(r) => format!("{r:.2}"),
                    Coefficient::Undefined => "n/a".to_string(),
                }))
                .collect()
        })
        .collect();
    write_table(out, &header, &rows)
}

fn write_summary<W: Write>(out: &mut W, groups: &[GroupSummary]) -> io::Result<()> {
    if groups.is_empty() {
        return writeln!(out, "(no values)");
    }
    let header: Vec<String> = ["group", "count", "min", "q1", "median", "q3", "max", "mean"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|g| {
            vec![
                g.key.to_string(),
                g.count.to_string(),
                format!("{:.0}", g.min),
                format!("{:.0}", g.q1),
                format!("{:.0}", g.median),
                format!("{:.0}", g.q3),
                format!("{:.0}", g.max),
                format!("{:.2}", g.mean),
            ]
        })
        .collect();
    write_table(out, &header, &rows)
}

fn write_value_counts<W: Write>(out: &mut W, counts: &ValueCounts) -> io::Result<()> {
    let header = vec![counts.column.clone(), "count".to_string()];
    let rows: Vec<Vec<String>> = counts
        .counts
        .iter()
        .map(|vc| vec![vc.value.to_string(), vc.count.to_string()])
        .collect();
    write_table(out, &header, &rows)
}

/// Visible rows as CSV, header included. Missing cells are left blank.
pub fn write_rows<W: Write>(out: &mut W, table: &Table) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.schema().column_names())?;
    for record in table.records() {
        writer.write_record(record.values().iter().map(|v| match v {
            Value::Null => String::new(),
            other => other.to_string(),
        }))?;
    }
    writer.flush()
}
