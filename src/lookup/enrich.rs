use serde_json::Value;
use std::collections::HashMap;

use super::kinds::{Address, Installer, SalesOrder};
use crate::tasks::Task;

/// Task fields holding foreign keys.
pub const INSTALLER_FIELD: &str = "installateur_id";
pub const SALES_ORDER_FIELD: &str = "sale_order_id";
pub const ADDRESS_FIELD: &str = "address_id";

/// Fill the display fields of one task that the backend left blank.
/// Fields that already carry a value are never touched.
pub fn enrich_task(
  task: &mut Task,
  installers: &HashMap<u64, Installer>,
  sales_orders: &HashMap<u64, SalesOrder>,
  addresses: &HashMap<u64, Address>,
) {
  if let Some(project) = task
    .reference(SALES_ORDER_FIELD)
    .and_then(|id| sales_orders.get(&id))
    .and_then(|order| order.project_name.clone())
  {
    task.fill("project_name", Value::String(project));
  }

  if let Some(address) = task.reference(ADDRESS_FIELD).and_then(|id| addresses.get(&id)) {
    fill_text(task, "address_full", address.full());
    fill_text(task, "address_name", address.street.clone());
    fill_text(task, "address_street", address.street.clone());
    fill_text(task, "address_zip", address.zip.clone());
    fill_text(task, "address_city", address.city.clone());
  }

  let workers: Vec<Value> = task
    .references(INSTALLER_FIELD)
    .into_iter()
    .filter_map(|id| installers.get(&id))
    .filter_map(|installer| installer.name.clone())
    .map(Value::String)
    .collect();
  task.fill("workers", Value::Array(workers));
}

fn fill_text(task: &mut Task, field: &str, value: Option<String>) {
  if let Some(value) = value {
    task.fill(field, Value::String(value));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  struct Tables {
    installers: HashMap<u64, Installer>,
    sales_orders: HashMap<u64, SalesOrder>,
    addresses: HashMap<u64, Address>,
  }

  fn tables() -> Tables {
    let installer = |id, name: &str| {
      (
        id,
        Installer {
          id,
          name: Some(name.to_string()),
        },
      )
    };

    Tables {
      installers: [installer(7, "Jan"), installer(9, "Piet")].into_iter().collect(),
      sales_orders: [(
        12,
        SalesOrder {
          id: 12,
          project_name: Some("Renovatie Dewitte".to_string()),
        },
      )]
      .into_iter()
      .collect(),
      addresses: [(
        30,
        Address {
          id: 30,
          street: Some("Kerkstraat 1".to_string()),
          zip: Some("9000".to_string()),
          city: None,
        },
      )]
      .into_iter()
      .collect(),
    }
  }

  fn enrich(value: Value) -> Task {
    let t = tables();
    let mut task = Task::from_value(value).unwrap();
    enrich_task(&mut task, &t.installers, &t.sales_orders, &t.addresses);
    task
  }

  #[test]
  fn test_fills_every_display_field() {
    let task = enrich(json!({
      "id": 1,
      "installateur_id": [[7, "Jan"], [9, "Piet"], [11, "Unknown"]],
      "sale_order_id": [12, "S00012"],
      "address_id": 30,
    }));

    assert_eq!(task.text("project_name"), Some("Renovatie Dewitte"));
    assert_eq!(task.text("address_full"), Some("Kerkstraat 1, 9000"));
    assert_eq!(task.text("address_name"), Some("Kerkstraat 1"));
    assert_eq!(task.text("address_zip"), Some("9000"));
    assert!(task.is_blank("address_city"));
    assert_eq!(task.workers(), vec!["Jan", "Piet"]);
  }

  #[test]
  fn test_backend_values_win() {
    let task = enrich(json!({
      "id": 1,
      "installateur_id": 7,
      "sale_order_id": 12,
      "project_name": "From backend",
      "workers": ["Someone else"],
    }));

    assert_eq!(task.text("project_name"), Some("From backend"));
    assert_eq!(task.workers(), vec!["Someone else"]);
  }

  #[test]
  fn test_unknown_references_change_nothing() {
    let before = Task::from_value(json!({"id": 1, "sale_order_id": 99, "address_id": false})).unwrap();
    let after = enrich(json!({"id": 1, "sale_order_id": 99, "address_id": false}));
    assert_eq!(before, after);
  }

  #[test]
  fn test_enrichment_is_idempotent() {
    let t = tables();
    let mut task = enrich(json!({"id": 1, "installateur_id": 7, "address_id": 30}));
    let once = task.clone();
    enrich_task(&mut task, &t.installers, &t.sales_orders, &t.addresses);
    assert_eq!(task, once);
  }
}
