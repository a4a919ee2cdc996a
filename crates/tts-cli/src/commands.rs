use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tts_modules::{clear_all_modules_data, clear_module_data};
use tts_persistence::{Backup, PersistError, PersistenceContext};
use tts_standards::{InsulationTable, StandardFamily, format_kv};

use tts_cli::render::{
    classes_table, describe_outcome, explain, level_table, restore_summary, stores_table,
};
use tts_cli::session::parse_object;

use crate::cli::ClearArgs;

fn persist_error(error: PersistError) -> anyhow::Error {
    let message = explain(&error);
    anyhow::Error::new(error).context(message)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
}

async fn warn_if_offline(context: &PersistenceContext) {
    context.init().await;
    if context.is_fallback_active() {
        eprintln!("warning: backend unreachable, using the local copy");
    }
}

pub async fn run_health(context: &PersistenceContext) -> Result<()> {
    context.remote().health().await.map_err(persist_error)?;
    println!("Backend is healthy");
    Ok(())
}

pub async fn run_stores(context: &PersistenceContext) -> Result<()> {
    let stores = context.remote().list_stores().await.map_err(persist_error)?;
    println!("{}", stores_table(&stores));
    Ok(())
}

pub async fn run_get(context: &PersistenceContext, store_id: &str) -> Result<()> {
    warn_if_offline(context).await;
    let value = context.get_store(store_id).get_data().await;
    print_json(&value)
}

pub async fn run_update(context: &PersistenceContext, store_id: &str, json: &str) -> Result<()> {
    let partial = parse_object(json)?;
    warn_if_offline(context).await;
    let store = context.get_store(store_id);
    let outcome = store.update_data(&partial).await.map_err(persist_error)?;
    println!("{store_id}: {}", describe_outcome(outcome));
    Ok(())
}

pub async fn run_set(context: &PersistenceContext, store_id: &str, json: &str) -> Result<()> {
    let full = parse_object(json)?;
    warn_if_offline(context).await;
    let outcome = context
        .get_store(store_id)
        .set_data(Value::Object(full))
        .await
        .map_err(persist_error)?;
    println!("{store_id}: {}", describe_outcome(outcome));
    Ok(())
}

pub async fn run_clear(context: &PersistenceContext, args: &ClearArgs) -> Result<()> {
    let (target, outcome) = match (&args.module, args.all) {
        (_, true) => (
            "all stores".to_string(),
            clear_all_modules_data(context).await?,
        ),
        (Some(module), false) => (module.clone(), clear_module_data(context, module).await?),
        (None, false) => bail!("name a module or pass --all"),
    };
    println!("Cleared {target}: {}", describe_outcome(outcome));
    Ok(())
}

pub async fn run_export(context: &PersistenceContext, store_id: &str) -> Result<()> {
    let export = context
        .remote()
        .export_store(store_id)
        .await
        .map_err(persist_error)?;
    print_json(&serde_json::to_value(&export)?)
}

/// Accepts an export file (`{store_id, data, ...}`) or a bare store value.
pub async fn run_import(context: &PersistenceContext, store_id: &str, file: &Path) -> Result<()> {
    let content = read_json(file)?;
    let data = match content {
        Value::Object(mut map) if map.contains_key("store_id") && map.contains_key("data") => {
            map.remove("data").unwrap_or_else(|| json!({}))
        }
        other => other,
    };

    let imported = context
        .remote()
        .import_store(store_id, &data)
        .await
        .map_err(persist_error)?;
    context.get_store(store_id).invalidate();

    let keys = imported.as_object().map_or(0, serde_json::Map::len);
    println!("Imported {store_id} ({keys} top-level keys)");
    Ok(())
}

pub async fn run_backup(context: &PersistenceContext, file: &Path) -> Result<()> {
    let backup = context.remote().backup().await.map_err(persist_error)?;
    let content = serde_json::to_string_pretty(&backup)?;
    fs::write(file, content).with_context(|| format!("write {}", file.display()))?;
    println!(
        "Backed up {} store(s) to {}",
        backup.stores.len(),
        file.display()
    );
    Ok(())
}

pub async fn run_restore(context: &PersistenceContext, file: &Path) -> Result<()> {
    let backup: Backup = serde_json::from_value(read_json(file)?)
        .with_context(|| format!("{} is not a backup file", file.display()))?;
    let report = context
        .remote()
        .restore(&backup)
        .await
        .map_err(persist_error)?;
    println!("{}", restore_summary(&report));
    Ok(())
}

pub fn run_classes(family: StandardFamily) -> Result<()> {
    let table = InsulationTable::embedded()?;
    println!("{}", classes_table(table, family));
    Ok(())
}

pub fn run_levels(family: StandardFamily, um_kv: f64) -> Result<()> {
    let table = InsulationTable::embedded()?;
    let Some(level) = table.find(family, um_kv) else {
        bail!(
            "{family} has no voltage class {} kV (see `tts classes --standard {}`)",
            format_kv(um_kv),
            family.prefix().to_lowercase()
        );
    };
    println!("{}", level_table(level, family));
    Ok(())
}
