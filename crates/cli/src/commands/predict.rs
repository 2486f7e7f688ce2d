//! Single car price estimate

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, CarListing, PredictResponse};
use crate::output::{print_json, OutputFormat};

pub async fn predict_price(
    client: &ApiClient,
    listing: &CarListing,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let result: PredictResponse = client.post_json("api/v1/predict", listing).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Estimated Price:".bold(),
                result.formatted.green().bold()
            );
            if verbose {
                println!(
                    "{} {} {} ({}), {:.1} L, {} km",
                    "Listing:".dimmed(),
                    listing.make,
                    listing.model,
                    listing.year,
                    listing.engine_size,
                    listing.mileage
                );
                println!("{} {}", "Model:".dimmed(), result.model_version);
            }
        }
    }

    Ok(())
}
