//! Batch pricing of an uploaded CSV file

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::client::{ApiClient, ApiError, PreviewResponse};
use crate::output::{
    cell_text, print_info, print_json, print_success, print_warning, render_grid,
    OutputFormat,
};
use crate::session::{BatchSession, SessionError, SessionState};

pub const DEFAULT_OUTPUT: &str = "saudi_used_car_predictions.csv";

pub struct BatchOptions<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub assume_yes: bool,
    pub preview_rows: usize,
    pub format: OutputFormat,
    pub verbose: bool,
}

pub async fn run_batch(client: &ApiClient, opts: BatchOptions<'_>) -> Result<()> {
    let csv = std::fs::read(opts.input)
        .with_context(|| format!("Failed to read {}", opts.input.display()))?;

    let mut session = BatchSession::new(client, opts.preview_rows);

    let preview = match session.upload(csv).await {
        Ok(preview) => preview,
        Err(SessionError::Api(err)) => return Err(describe_rejection(err)),
        Err(err) => return Err(err.into()),
    };

    if opts.verbose {
        print_info(&format!("Session: {}", session.state().name()));
    }

    if let OutputFormat::Table = opts.format {
        print_success(&format!(
            "{} is valid: {} rows, {} columns",
            opts.input.display(),
            preview.rows,
            preview.columns.len()
        ));
        print_preview(&preview);
    }

    if preview.rows == 0 {
        print_warning("File has no rows to price");
    }

    if !opts.assume_yes && !confirm(&format!("Predict prices for {} rows?", preview.rows))? {
        print_info("Cancelled; no predictions were made");
        return Ok(());
    }

    let priced = session.predict().await?;
    if let SessionState::Succeeded { rows, .. } = session.state() {
        if opts.verbose {
            print_info(&format!("Session: {} ({} rows priced)", session.state().name(), rows));
        }
    }
    std::fs::write(opts.output, &priced)
        .with_context(|| format!("Failed to write {}", opts.output.display()))?;

    match opts.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "rows": preview.rows,
            "output": opts.output.display().to_string(),
        }))?,
        OutputFormat::Table => {
            print_success(&format!(
                "Predictions written to {}",
                opts.output.display().to_string().cyan()
            ));
            println!("{}", render_head(&priced, opts.preview_rows)?);
        }
    }

    Ok(())
}

/// Missing columns are listed by name; other rejections keep the server message
fn describe_rejection(err: ApiError) -> anyhow::Error {
    match err.missing_columns() {
        Some(missing) => anyhow!("Missing required columns: {}", missing.join(", ")),
        None => err.into(),
    }
}

fn print_preview(preview: &PreviewResponse) {
    let rows = preview.preview.iter().map(|row| {
        preview
            .columns
            .iter()
            .map(|c| row.get(c).map(cell_text).unwrap_or_default())
            .collect::<Vec<_>>()
    });
    println!("{}", render_grid(&preview.columns, rows));
}

/// First rows of the priced CSV as a table
fn render_head(csv: &[u8], rows: usize) -> Result<String> {
    let mut reader = csv::Reader::from_reader(csv);
    let header: Vec<String> = reader
        .headers()
        .context("Server returned malformed CSV")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut body = Vec::new();
    for record in reader.records().take(rows) {
        let record = record.context("Server returned malformed CSV")?;
        body.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(render_grid(&header, body))
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question.bold());
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_head_limits_rows() {
        let csv = b"ID,Predicted_Price\n1,84000\n2,93000\n3,51000\n";
        let grid = render_head(csv, 2).unwrap();
        assert!(grid.contains("84000"));
        assert!(grid.contains("93000"));
        assert!(!grid.contains("51000"));
    }

    #[test]
    fn test_missing_columns_rejection_names_columns() {
        let err = describe_rejection(ApiError::Api {
            kind: "schema_error".to_string(),
            message: "Missing required columns: [\"Region\", \"Origin\"]".to_string(),
            missing: vec!["Region".to_string(), "Origin".to_string()],
        });
        assert_eq!(err.to_string(), "Missing required columns: Region, Origin");
    }

    #[test]
    fn test_other_rejection_keeps_server_message() {
        let err = describe_rejection(ApiError::Api {
            kind: "parse_error".to_string(),
            message: "Could not read CSV: bad row".to_string(),
            missing: Vec::new(),
        });
        assert_eq!(err.to_string(), "Could not read CSV: bad row");
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = run_batch(
            &client,
            BatchOptions {
                input: &dir.path().join("absent.csv"),
                output: &dir.path().join("out.csv"),
                assume_yes: true,
                preview_rows: 5,
                format: OutputFormat::Table,
                verbose: false,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
