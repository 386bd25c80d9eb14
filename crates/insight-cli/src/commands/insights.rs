//! Insight lookup and prediction commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Insight, PredictRequest};
use crate::output::{color_label, print_json, print_warning, truncate, OutputFormat};

const INSIGHT_CELL_CHARS: usize = 60;

/// Row for insights table
#[derive(Tabled)]
struct InsightRow {
    #[tabled(rename = "Developer")]
    developer_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Cluster")]
    cluster_id: i64,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Insight")]
    insight: String,
}

/// Show the stored insight for one developer
pub async fn get_insight(client: &ApiClient, developer_id: i64, format: OutputFormat) -> Result<()> {
    let insight = client.insight(developer_id).await?;

    match format {
        OutputFormat::Json => print_json(&insight)?,
        OutputFormat::Table => print_insight(&insight),
    }

    Ok(())
}

/// List the first `limit` stored insights
pub async fn list_insights(client: &ApiClient, limit: i64, format: OutputFormat) -> Result<()> {
    let insights = client.list_insights(limit).await?;

    match format {
        OutputFormat::Json => print_json(&insights)?,
        OutputFormat::Table => {
            if insights.is_empty() {
                print_warning("No insights found");
                return Ok(());
            }

            let rows: Vec<InsightRow> = insights
                .iter()
                .map(|i| InsightRow {
                    developer_id: i
                        .developer_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    name: i.developer_name.clone().unwrap_or_default(),
                    cluster_id: i.cluster_id,
                    label: color_label(&i.cluster_label, i.concept_tag.as_deref()),
                    insight: truncate(&i.insight_text, INSIGHT_CELL_CHARS),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} insights", insights.len());
        }
    }

    Ok(())
}

/// Predict a cluster for ad-hoc features and show the insight
pub async fn predict(client: &ApiClient, request: PredictRequest, format: OutputFormat) -> Result<()> {
    let insight = client.predict(&request).await?;

    match format {
        OutputFormat::Json => print_json(&insight)?,
        OutputFormat::Table => print_insight(&insight),
    }

    Ok(())
}

fn print_insight(insight: &Insight) {
    let who = match (&insight.developer_id, &insight.developer_name) {
        (Some(id), Some(name)) => format!("{} (#{})", name, id),
        (Some(id), None) => format!("#{}", id),
        (None, Some(name)) => name.clone(),
        (None, None) => "-".to_string(),
    };

    println!("{}", "Learning Insight".bold());
    println!("Developer: {}", who);
    println!(
        "Cluster:   {} {}",
        insight.cluster_id,
        color_label(&insight.cluster_label, insight.concept_tag.as_deref())
    );
    if let Some(tag) = &insight.concept_tag {
        println!("Tag:       {}", tag);
    }
    if !insight.short_description.is_empty() {
        println!("Profile:   {}", insight.short_description);
    }
    if !insight.insight_text.is_empty() {
        println!("\n{}", insight.insight_text);
    }
}
