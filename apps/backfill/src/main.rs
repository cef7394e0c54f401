use anyhow::{anyhow, Result};
use dotenv::dotenv;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod plan;

use plan::{plan_forward, DiuType};
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

/// One-shot batch that replaces the free-text `diu_type` column on history
/// rows with a foreign key into `diu_types`. `forward` links, `reverse` puts
/// the text back and clears the key.
#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let direction = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "forward".to_string());

    let config = AppConfig::from_env();
    let db = PostgrestClient::new(&config);

    match direction.as_str() {
        "forward" => run_forward(&db).await,
        "reverse" => run_reverse(&db).await,
        other => Err(anyhow!(
            "Unknown direction '{}', expected 'forward' or 'reverse'",
            other
        )),
    }
}

async fn run_forward(db: &PostgrestClient) -> Result<()> {
    info!("Linking history rows to diu type records");

    let rows: Vec<Value> = db
        .request(
            Method::GET,
            "/rest/v1/histories?select=diu_type&diu_type=not.is.null&deleted_at=is.null",
            None,
            None,
        )
        .await?;

    let values: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get("diu_type").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    let existing: Vec<DiuType> = db
        .request(Method::GET, "/rest/v1/diu_types?select=id,name", None, None)
        .await?;

    let mut plan = plan_forward(values, &existing);

    for name in std::mem::take(&mut plan.creates) {
        let created: Vec<DiuType> = db
            .request_with_headers(
                Method::POST,
                "/rest/v1/diu_types",
                None,
                Some(json!({ "name": name })),
                Some(representation_headers()),
            )
            .await?;

        let row = created
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Diu type '{}' was not created", name))?;

        info!("Created diu type '{}'", row.name);
        plan.mapping.insert(row.name, row.id);
    }

    // Only rows whose key is still null are touched, so rerunning the batch
    // updates nothing.
    let mut linked = 0usize;
    for (name, id) in &plan.mapping {
        let path = format!(
            "/rest/v1/histories?diu_type=eq.{}&diu_type_id=is.null",
            urlencoding::encode(name)
        );

        let updated: Vec<Value> = db
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!({ "diu_type_id": id })),
                Some(representation_headers()),
            )
            .await?;

        linked += updated.len();
    }

    info!(
        "Linked {} history rows across {} diu types",
        linked,
        plan.mapping.len()
    );
    Ok(())
}

async fn run_reverse(db: &PostgrestClient) -> Result<()> {
    info!("Restoring free-text diu types on history rows");

    let types: Vec<DiuType> = db
        .request(Method::GET, "/rest/v1/diu_types?select=id,name", None, None)
        .await?;

    let mut cleared = 0usize;
    for diu_type in &types {
        let path = format!("/rest/v1/histories?diu_type_id=eq.{}", diu_type.id);

        let updated: Vec<Value> = db
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!({ "diu_type": diu_type.name, "diu_type_id": Value::Null })),
                Some(representation_headers()),
            )
            .await?;

        cleared += updated.len();
    }

    info!("Cleared the key on {} history rows", cleared);
    Ok(())
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
