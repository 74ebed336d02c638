// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record validation and outbound transformation through the mapping table.

use std::collections::HashMap;

use serde_json::Value;

use ledgerlink_core::types::FieldMapping;
use ledgerlink_tally::StockItem;

/// Semantic fields whose required mapped value is empty for this record.
pub fn missing_required(record: &Value, mappings: &[FieldMapping]) -> Vec<String> {
    mappings
        .iter()
        .filter(|m| m.required)
        .filter(|m| {
            match record.get(&m.api_field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            }
        })
        .map(|m| m.semantic_field.clone())
        .collect()
}

/// Transform one exported stock item into a commerce row, applying the
/// mapping table in reverse (Tally XML key -> API field). The raw stock
/// columns always ride along.
pub fn stock_item_row(item: &StockItem, mappings: &[FieldMapping]) -> Value {
    let columns: HashMap<&str, &str> = HashMap::from([
        ("STOCKITEMNAME", item.name.as_str()),
        ("CLOSINGBALANCE", item.closing_balance.as_str()),
        ("CLOSINGRATE", item.closing_rate.as_str()),
        ("CLOSINGQTY", item.closing_quantity.as_str()),
        ("PARENT", item.group.as_str()),
        ("BASEUNITS", item.unit.as_str()),
    ]);

    let mut row = serde_json::Map::new();
    for mapping in mappings {
        if let Some(value) = columns.get(mapping.tally_xml_key.as_str()) {
            row.insert(
                mapping.api_field.clone(),
                Value::String((*value).to_string()),
            );
        }
    }

    row.insert(
        "stock_item_name".to_string(),
        Value::String(item.name.clone()),
    );
    row.insert(
        "closing_balance".to_string(),
        Value::String(item.closing_balance.clone()),
    );
    row.insert(
        "closing_quantity".to_string(),
        Value::String(item.closing_quantity.clone()),
    );

    Value::Object(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(api: &str, tally: &str, semantic: &str, required: bool) -> FieldMapping {
        FieldMapping {
            api_field: api.into(),
            tally_xml_key: tally.into(),
            semantic_field: semantic.into(),
            required,
            sort_order: 0,
        }
    }

    #[test]
    fn missing_required_flags_absent_null_and_blank() {
        let mappings = vec![
            mapping("order_date", "DATE", "date", true),
            mapping("customer", "PARTYNAME", "party_name", true),
            mapping("unit_price", "RATE", "rate", true),
            mapping("note", "NARRATION", "narration", false),
        ];

        let record = json!({
            "order_date": "2026-04-01",
            "customer": "  ",
            "unit_price": null
        });
        let missing = missing_required(&record, &mappings);
        assert_eq!(missing, vec!["party_name".to_string(), "rate".to_string()]);
    }

    #[test]
    fn complete_record_has_no_missing_fields() {
        let mappings = vec![
            mapping("order_date", "DATE", "date", true),
            mapping("quantity", "BILLEDQTY", "quantity", true),
        ];
        let record = json!({"order_date": "2026-04-01", "quantity": 2});
        assert!(missing_required(&record, &mappings).is_empty());
    }

    #[test]
    fn stock_row_applies_reverse_mapping_and_raw_columns() {
        let item = StockItem {
            name: "Widget".into(),
            closing_balance: "12 nos".into(),
            closing_rate: "150.00/nos".into(),
            closing_quantity: "12".into(),
            group: "Widgets".into(),
            unit: "nos".into(),
        };
        let mappings = vec![
            mapping("sku", "STOCKITEMNAME", "item_name", true),
            mapping("quantity", "CLOSINGQTY", "quantity", true),
            mapping("unmapped", "NOSUCHTAG", "other", false),
        ];

        let row = stock_item_row(&item, &mappings);
        assert_eq!(row["sku"], "Widget");
        assert_eq!(row["quantity"], "12");
        assert!(row.get("unmapped").is_none());
        // Raw columns always present.
        assert_eq!(row["stock_item_name"], "Widget");
        assert_eq!(row["closing_balance"], "12 nos");
        assert_eq!(row["closing_quantity"], "12");
    }
}
