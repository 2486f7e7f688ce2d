//! Listing of selection choices and numeric bounds

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, FormSpec};
use crate::output::{print_json, OutputFormat};

/// Row for the numeric bounds table
#[derive(Tabled)]
struct RangeRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Default")]
    default: String,
}

pub async fn show_options(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let form: FormSpec = client.get("api/v1/options").await?;

    match format {
        OutputFormat::Json => print_json(&form)?,
        OutputFormat::Table => {
            println!("{}", "Choices".bold());
            println!("{}", "=".repeat(60));
            for (column, values) in &form.choices {
                println!("{} ({})", column.cyan(), values.len());
                println!("  {}", values.join(", "));
            }
            println!();

            let rows = vec![
                RangeRow {
                    field: "Year",
                    min: form.year.min.to_string(),
                    max: form.year.max.to_string(),
                    step: form.year.step.to_string(),
                    default: form.year.default.to_string(),
                },
                RangeRow {
                    field: "Engine_Size",
                    min: format!("{:.1}", form.engine_size.min),
                    max: format!("{:.1}", form.engine_size.max),
                    step: format!("{:.1}", form.engine_size.step),
                    default: format!("{:.1}", form.engine_size.default),
                },
                RangeRow {
                    field: "Mileage",
                    min: form.mileage.min.to_string(),
                    max: form.mileage.max.to_string(),
                    step: form.mileage.step.to_string(),
                    default: form.mileage.default.to_string(),
                },
            ];
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", "Numeric inputs".bold());
            println!("{}", table);
        }
    }

    Ok(())
}
