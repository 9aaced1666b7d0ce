//! End-to-end tests: YAML settings through the registry into the cache helpers.

use anyhow::Result;
use rediskit::collections::{group_by, reduce_to_map, top_n, OrderType, TieBreak};
use rediskit::storage::KeyTtl;
use rediskit::{DataSourceRegistry, Error, MemoryConnector, RedisSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tracing_subscriber::EnvFilter;

const SETTINGS: &str = r#"
data-source:
  orders:
    host: 127.0.0.1
    port: 6379
    database: 1
    pool:
      max-active: 16
      max-idle: 4
      time-between-eviction-runs-ms: 20
  reporting:
    database: 2
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u32,
    customer: String,
    version: u32,
    total: u64,
}

fn order(id: u32, customer: &str, version: u32, total: u64) -> Order {
    Order {
        id,
        customer: customer.to_string(),
        version,
        total,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn registry() -> Result<DataSourceRegistry> {
    let settings = RedisSettings::from_yaml_str(SETTINGS)?;
    Ok(DataSourceRegistry::from_settings(
        &settings,
        MemoryConnector::new(),
    )?)
}

#[test]
fn test_latest_versions_cached_per_source() -> Result<()> {
    init_tracing();
    let registry = registry()?;
    let orders = registry.service("orders")?;

    let history = vec![
        order(1, "ann", 1, 100),
        order(1, "ann", 3, 120),
        order(2, "bob", 1, 40),
        order(1, "ann", 2, 110),
    ];

    let latest = reduce_to_map(history, |o| o.id, |o| o.version, |o| o, TieBreak::Max);
    for (id, order) in &latest {
        orders.hash_put_json("orders:latest", &id.to_string(), order)?;
    }

    let cached: Option<Order> = orders.hash_get_json("orders:latest", "1")?;
    assert_eq!(cached, Some(order(1, "ann", 3, 120)));

    // Separate database, separate keyspace
    let reporting = registry.service("reporting")?;
    assert_eq!(reporting.hash_values_json::<Order>("orders:latest")?, Vec::new());
    Ok(())
}

#[test]
fn test_leaderboard_from_top_n() -> Result<()> {
    let registry = registry()?;
    let cache = registry.client("reporting")?;

    let totals = vec![("ann", 300u64), ("bob", 120), ("cy", 480), ("dee", 90)];
    let podium: Vec<(&str, u64)> = top_n(totals.clone(), |t| t.1, OrderType::Desc, 0, 3).collect();
    assert_eq!(podium, vec![("cy", 480), ("ann", 300), ("bob", 120)]);

    cache.zset_add_all("leaderboard", totals.iter().map(|(name, total)| (*name, *total as f64)))?;
    assert_eq!(cache.zset_reverse_range("leaderboard", 0, 2)?, vec!["cy", "ann", "bob"]);
    assert_eq!(cache.zset_rank("leaderboard", "dee")?, Some(0));
    Ok(())
}

#[test]
fn test_grouped_lists() -> Result<()> {
    let registry = registry()?;
    let service = registry.service("orders")?;

    let orders = vec![
        order(1, "ann", 1, 10),
        order(2, "bob", 1, 20),
        order(3, "ann", 1, 30),
    ];
    let by_customer: HashMap<String, Vec<Order>> = group_by(orders, |o| o.customer.clone());

    for (customer, orders) in &by_customer {
        for order in orders {
            service.list_right_push_json(&format!("orders:{}", customer), order)?;
        }
    }

    let ann: Vec<Order> = service.list_range_json("orders:ann", 0, -1)?;
    assert_eq!(ann.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(service.client().list_size("orders:bob")?, 1);
    Ok(())
}

#[test]
fn test_errors_surface() -> Result<()> {
    let registry = registry()?;

    assert!(matches!(
        registry.get("archive"),
        Err(Error::UnknownDataSource(_))
    ));

    let cache = registry.client("orders")?;
    cache.set("name", "plain text");
    assert_err!(cache.hash_get("name", "field"));
    assert_err!(registry.service("orders")?.get_json::<Order>("name"));
    assert_ok!(cache.get("name"));
    Ok(())
}

#[test]
fn test_invalid_settings() {
    let yaml = "data-source:\n  broken:\n    pool:\n      max-active: 0\n";
    let settings = assert_ok!(RedisSettings::from_yaml_str(yaml));
    assert_err!(DataSourceRegistry::from_settings(
        &settings,
        MemoryConnector::new()
    ));
}

#[tokio::test]
async fn test_expired_entries_swept() -> Result<()> {
    init_tracing();
    let yaml = format!("{}expiry:\n  min-interval-ms: 5\n", SETTINGS);
    let settings = RedisSettings::from_yaml_str(&yaml)?;
    assert_eq!(settings.expiry.min_interval_ms, 5);

    let registry = DataSourceRegistry::in_memory(&settings)?;
    let cache = registry.client("orders")?;

    cache.set_with_ttl("session:1", "token", Duration::from_millis(30));
    cache.set("config", "persistent");
    assert!(matches!(cache.ttl("session:1"), KeyTtl::Expires(_)));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(cache.ttl("session:1"), KeyTtl::Missing);
    assert_eq!(cache.keys("*")?.len(), 1);
    Ok(())
}
