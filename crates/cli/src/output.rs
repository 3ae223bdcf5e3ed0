use crate::error::CliError;
use clap::ValueEnum;
use model::{ColumnMetadata, Row};
use std::{io::Write, sync::Arc};
use stream_core::{CloseOutcome, IterationSession, QueryExecutor, QueryOutcome, StreamOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Table,
    Csv,
    /// One JSON array of row objects
    Json,
}

/// What a non-interactive run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySummary {
    Rows(usize),
    Updated(u64),
}

/// Executes `sql` and streams every row into `out`.
///
/// Rows go through an [`IterationSession`] like the browser's, so a slow or
/// failing cursor behaves the same in both. The cursor close runs detached and
/// is awaited for at most the close budget.
pub async fn run_query<W: Write>(
    executor: &dyn QueryExecutor,
    sql: &str,
    options: StreamOptions,
    format: OutputFormat,
    out: W,
    shutdown: CancellationToken,
) -> Result<QuerySummary, CliError> {
    let cursor = match executor.execute(sql).await? {
        QueryOutcome::Updated(count) => {
            let mut out = out;
            writeln!(out, "Affected Rows: {count}")?;
            out.flush()?;
            return Ok(QuerySummary::Updated(count));
        }
        QueryOutcome::Rows(cursor) => cursor,
    };

    let session = IterationSession::start(cursor, options)?;
    let mut writer = RowWriter::new(format, session.columns().clone(), out)?;
    let result = stream_rows(&session, &mut writer, options, &shutdown).await;

    if result.is_err() {
        session.cancel();
    }
    match session.wait_closed().await {
        Some(CloseOutcome::TimedOut) => {
            warn!(session = %session.id(), "Cursor close still pending after the close budget")
        }
        outcome => debug!(session = %session.id(), ?outcome, "Cursor released"),
    }

    let fetch_error = result?;
    let total = writer.finish()?;
    let metrics = session.metrics().snapshot();
    info!(session = %session.id(), total, runs = metrics.fetch_runs, "Query output complete");

    match fetch_error {
        Some(error) => Err(CliError::Fetch(error)),
        None => Ok(QuerySummary::Rows(total)),
    }
}

/// Drains until the end of the stream. Returns the fetch error, if any, so
/// the rows read before it are still flushed.
async fn stream_rows<W: Write>(
    session: &Arc<IterationSession>,
    writer: &mut RowWriter<W>,
    options: StreamOptions,
    shutdown: &CancellationToken,
) -> Result<Option<String>, CliError> {
    loop {
        let delivery = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(CliError::ShutdownRequested),
            delivery = session.drain(options.drain_deadline) => delivery,
        };
        let Some(delivery) = delivery else {
            return Err(CliError::ShutdownRequested);
        };

        for row in delivery.rows.iter() {
            writer.write_row(row)?;
        }
        if let Some(end) = delivery.end {
            return Ok(end.error);
        }
        session.request_more_rows();
    }
}

enum RowWriter<W: Write> {
    /// Buffered so column widths can be computed.
    Table {
        out: W,
        columns: ColumnMetadata,
        rows: Vec<Vec<String>>,
    },
    Csv {
        writer: csv::Writer<W>,
        count: usize,
    },
    Json {
        out: W,
        columns: ColumnMetadata,
        count: usize,
    },
}

impl<W: Write> RowWriter<W> {
    fn new(format: OutputFormat, columns: ColumnMetadata, out: W) -> Result<Self, CliError> {
        Ok(match format {
            OutputFormat::Table => RowWriter::Table {
                out,
                columns,
                rows: Vec::new(),
            },
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(out);
                writer.write_record(columns.iter())?;
                RowWriter::Csv { writer, count: 0 }
            }
            OutputFormat::Json => {
                let mut out = out;
                out.write_all(b"[")?;
                RowWriter::Json {
                    out,
                    columns,
                    count: 0,
                }
            }
        })
    }

    fn write_row(&mut self, row: &Row) -> Result<(), CliError> {
        match self {
            RowWriter::Table { rows, .. } => {
                rows.push(row.values().iter().map(ToString::to_string).collect());
            }
            RowWriter::Csv { writer, count } => {
                writer.write_record(row.values().iter().map(|v| v.as_string().unwrap_or_default()))?;
                *count += 1;
            }
            RowWriter::Json {
                out,
                columns,
                count,
            } => {
                let object: serde_json::Map<String, serde_json::Value> = columns
                    .iter()
                    .zip(row.values())
                    .map(|(name, value)| (name.to_string(), value.to_json()))
                    .collect();
                if *count > 0 {
                    out.write_all(b",")?;
                }
                out.write_all(b"\n  ")?;
                serde_json::to_writer(&mut *out, &object)?;
                *count += 1;
            }
        }
        Ok(())
    }

    /// Writes trailers and flushes. Returns the number of rows written.
    fn finish(self) -> Result<usize, CliError> {
        match self {
            RowWriter::Table { mut out, columns, rows } => {
                write_table(&mut out, &columns, &rows)?;
                out.flush()?;
                Ok(rows.len())
            }
            RowWriter::Csv { mut writer, count } => {
                writer.flush()?;
                Ok(count)
            }
            RowWriter::Json { mut out, count, .. } => {
                if count > 0 {
                    out.write_all(b"\n")?;
                }
                out.write_all(b"]\n")?;
                out.flush()?;
                Ok(count)
            }
        }
    }
}

fn write_table<W: Write>(out: &mut W, columns: &ColumnMetadata, rows: &[Vec<String>]) -> Result<(), CliError> {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(out, "{}", table_line(columns.iter(), &widths))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    writeln!(out, "{}", rule.join("+"))?;
    for row in rows {
        writeln!(out, "{}", table_line(row.iter().map(String::as_str), &widths))?;
    }
    let noun = if rows.len() == 1 { "row" } else { "rows" };
    writeln!(out, "({} {noun})", rows.len())?;
    Ok(())
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!(" {cell:<width$} "))
        .collect::<Vec<_>>()
        .join("|")
        .trim_end()
        .to_string()
}
