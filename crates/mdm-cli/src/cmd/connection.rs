use crate::output::print_json;
use anyhow::Context;
use mdm_core::client::{remote_error, MdmApi, RestClient};
use mdm_core::model::field;
use serde_json::{json, Value};

/// List entities to prove the URL and client id work.
pub fn run(client: &RestClient, json: bool) -> anyhow::Result<()> {
    let c = client
        .get_entities()
        .with_context(|| format!("failed to connect to {}", client.base_url()))?;
    if !c.is_success() {
        return Err(remote_error(&c)).context("connection test failed");
    }

    let count = field(&c.raw, "TotalRecords")
        .and_then(Value::as_u64)
        .or_else(|| c.data().as_array().map(|a| a.len() as u64))
        .unwrap_or(0);

    if json {
        print_json(&json!({ "url": client.base_url(), "entities": count }))?;
    } else {
        println!("Connected to {}. Found {count} entities.", client.base_url());
    }
    Ok(())
}
