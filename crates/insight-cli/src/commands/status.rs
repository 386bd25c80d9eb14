//! Service status and cluster catalogue commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_label, format_loaded, print_json, print_success, print_warning, OutputFormat};

/// Row for clusters table
#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "ID")]
    cluster_id: i64,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Tag")]
    concept_tag: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Show whether the model and dataset are loaded
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            if health.model_loaded && health.data_loaded {
                print_success("Service is fully loaded");
            } else {
                print_warning("Service is running degraded");
            }
            println!("Status:  {}", health.status);
            println!("Model:   {}", format_loaded(health.model_loaded));
            println!("Dataset: {}", format_loaded(health.data_loaded));
        }
    }

    Ok(())
}

/// List the cluster profiles
pub async fn list_clusters(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let clusters = client.clusters().await?;

    match format {
        OutputFormat::Json => print_json(&clusters)?,
        OutputFormat::Table => {
            if clusters.is_empty() {
                print_warning("No clusters found");
                return Ok(());
            }

            let rows: Vec<ClusterRow> = clusters
                .iter()
                .map(|c| ClusterRow {
                    cluster_id: c.cluster_id,
                    label: color_label(&c.label_id, c.concept_tag.as_deref()),
                    concept_tag: c.concept_tag.clone().unwrap_or_else(|| "-".to_string()),
                    description: c.short_description.clone(),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
