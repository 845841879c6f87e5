use financial_risk_graph::{
    config::Settings,
    database::{InMemoryStore, RiskStore},
    risk::RiskAnalyzer,
    utils::init_tracing,
};
use serde_json::json;
use std::fs;
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;

    info!("Starting financial risk graph analysis");

    let store = InMemoryStore::load_snapshot(&settings.data.snapshot_path)?;
    let mut analyzer = RiskAnalyzer::new(store, &settings)?;

    let report = analyzer.run_analysis();
    for failure in &report.failures {
        warn!(scope = %failure.scope, error = %failure.error, "Analysis step failed");
    }

    let output = json!({
        "identified_risks": report.risk_ids,
        "transmission": report.transmission,
        "risks": analyzer.store().get_all_risks()?,
        "paths": analyzer.find_risk_transmission_paths(),
        "metrics": analyzer.calculate_risk_metrics(),
        "failures": report.failures.iter().map(ToString::to_string).collect::<Vec<String>>(),
    });
    let rendered = serde_json::to_string_pretty(&output)?;

    match &settings.data.output_path {
        Some(path) => {
            fs::write(path, rendered)?;
            info!(path = %path, "Report written");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
