// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tally XML envelope builders.
//!
//! The tag schema is defined by TallyPrime's import/export interface and is
//! reproduced byte-for-byte — Tally is strict about envelope shape.

use serde_json::Value;

use ledgerlink_core::types::{FieldMapping, LedgerSettings};

/// Company list probe, used for the connection test.
pub const PROBE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ENVELOPE>
  <HEADER>
    <VERSION>1</VERSION>
    <TALLYREQUEST>Export</TALLYREQUEST>
    <TYPE>Data</TYPE>
    <ID>List of Companies</ID>
  </HEADER>
  <BODY>
    <DESC>
      <STATICVARIABLES>
        <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>
      </STATICVARIABLES>
    </DESC>
  </BODY>
</ENVELOPE>"#;

/// Closing stock export (Stock Summary, exploded).
pub const STOCK_EXPORT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ENVELOPE>
  <HEADER>
    <VERSION>1</VERSION>
    <TALLYREQUEST>Export</TALLYREQUEST>
    <TYPE>Data</TYPE>
    <ID>Stock Summary</ID>
  </HEADER>
  <BODY>
    <DESC>
      <STATICVARIABLES>
        <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>
        <EXPLODEFLAG>Yes</EXPLODEFLAG>
      </STATICVARIABLES>
    </DESC>
  </BODY>
</ENVELOPE>"#;

/// Named report export over a date range (dates as YYYYMMDD).
pub fn report_export_xml(report_name: &str, from_date: &str, to_date: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ENVELOPE>
  <HEADER>
    <VERSION>1</VERSION>
    <TALLYREQUEST>Export</TALLYREQUEST>
    <TYPE>Data</TYPE>
    <ID>{}</ID>
  </HEADER>
  <BODY>
    <DESC>
      <STATICVARIABLES>
        <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>
        <SVFROMDATE>{from_date}</SVFROMDATE>
        <SVTODATE>{to_date}</SVTODATE>
      </STATICVARIABLES>
    </DESC>
  </BODY>
</ENVELOPE>"#,
        escape_xml(report_name)
    )
}

/// Voucher import envelope wrapping pre-built TALLYMESSAGE blocks.
pub fn voucher_import_envelope(messages: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ENVELOPE>
  <HEADER>
    <TALLYREQUEST>Import Data</TALLYREQUEST>
  </HEADER>
  <BODY>
    <IMPORTDATA>
      <REQUESTDESC>
        <REPORTNAME>Vouchers</REPORTNAME>
        <STATICVARIABLES>
          <SVCURRENTCOMPANY>##SVCURRENTCOMPANY</SVCURRENTCOMPANY>
        </STATICVARIABLES>
      </REQUESTDESC>
      <REQUESTDATA>
{messages}
      </REQUESTDATA>
    </IMPORTDATA>
  </BODY>
</ENVELOPE>"#
    )
}

/// All Masters import envelope wrapping pre-built TALLYMESSAGE blocks.
pub fn masters_import_envelope(messages: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ENVELOPE>
  <HEADER>
    <TALLYREQUEST>Import Data</TALLYREQUEST>
  </HEADER>
  <BODY>
    <IMPORTDATA>
      <REQUESTDESC>
        <REPORTNAME>All Masters</REPORTNAME>
      </REQUESTDESC>
      <REQUESTDATA>
{messages}
      </REQUESTDATA>
    </IMPORTDATA>
  </BODY>
</ENVELOPE>"#
    )
}

/// Build one VOUCHER message from a record and the field mapping set.
///
/// Values resolve through an explicit precedence list per slot (first
/// non-empty mapped key wins), so mapping behavior is deterministic.
pub fn voucher_xml(
    record: &Value,
    voucher_type: &str,
    mappings: &[FieldMapping],
    index: usize,
) -> String {
    let date = mapped_value(record, mappings, &["DATE"]).replace('-', "");
    let party = mapped_value(record, mappings, &["PARTYNAME", "PARTYLEDGERNAME"]);
    let reference = mapped_value(record, mappings, &["REFERENCE"]);
    let narration = {
        let n = mapped_value(record, mappings, &["NARRATION"]);
        if n.is_empty() {
            if reference.is_empty() {
                format!("Commerce order: {index}")
            } else {
                format!("Commerce order: {reference}")
            }
        } else {
            n
        }
    };
    let stock_item = mapped_value(record, mappings, &["STOCKITEMNAME"]);
    let qty = non_empty_or(mapped_value(record, mappings, &["BILLEDQTY"]), "0");
    let rate = non_empty_or(mapped_value(record, mappings, &["RATE"]), "0");
    let amount = {
        let a = mapped_value(record, mappings, &["AMOUNT"]);
        if a.is_empty() {
            let q: f64 = qty.parse().unwrap_or(0.0);
            let r: f64 = rate.parse().unwrap_or(0.0);
            format!("{}", q * r)
        } else {
            a
        }
    };
    let address = mapped_value(record, mappings, &["ADDRESS"]);
    let hsn_code = mapped_value(record, mappings, &["HSNCODE"]);

    let mut xml = format!(
        r#"<TALLYMESSAGE xmlns:UDF="TallyUDF">
<VOUCHER VCHTYPE="{voucher_type}" ACTION="Create" OBJVIEW="Invoice Voucher View">
  <DATE>{date}</DATE>
  <VOUCHERTYPENAME>{voucher_type}</VOUCHERTYPENAME>
  <PARTYNAME>{party}</PARTYNAME>
  <NARRATION>{narration}</NARRATION>
  <REFERENCE>{reference}</REFERENCE>
  <PARTYLEDGERNAME>{party}</PARTYLEDGERNAME>
  <BASICBUYERADDRESS.LIST>
    <BASICBUYERADDRESS>{address}</BASICBUYERADDRESS>
  </BASICBUYERADDRESS.LIST>
  <ALLLEDGERENTRIES.LIST>
    <LEDGERNAME>{party}</LEDGERNAME>
    <ISDEEMEDPOSITIVE>Yes</ISDEEMEDPOSITIVE>
    <AMOUNT>-{amount}</AMOUNT>
  </ALLLEDGERENTRIES.LIST>
  <ALLINVENTORYENTRIES.LIST>
    <STOCKITEMNAME>{stock_item}</STOCKITEMNAME>
    <ISDEEMEDPOSITIVE>No</ISDEEMEDPOSITIVE>
    <BILLEDQTY>{qty}</BILLEDQTY>
    <RATE>{rate}</RATE>
    <AMOUNT>{amount}</AMOUNT>
    {hsn}
  </ALLINVENTORYENTRIES.LIST>"#,
        hsn = if hsn_code.is_empty() {
            String::new()
        } else {
            format!("<HSNCODE>{hsn_code}</HSNCODE>")
        },
    );

    // Tax ledger entries only when the mapped amount is a positive number.
    for (ledger, key) in [("CGST", "CGST"), ("SGST", "SGST"), ("IGST", "IGST")] {
        let value = mapped_value(record, mappings, &[key]);
        if value.parse::<f64>().map(|v| v > 0.0).unwrap_or(false) {
            xml.push_str(&format!(
                r#"
  <ALLLEDGERENTRIES.LIST>
    <LEDGERNAME>{ledger}</LEDGERNAME>
    <ISDEEMEDPOSITIVE>No</ISDEEMEDPOSITIVE>
    <AMOUNT>{value}</AMOUNT>
  </ALLLEDGERENTRIES.LIST>"#
            ));
        }
    }

    xml.push_str("\n</VOUCHER>\n</TALLYMESSAGE>");
    xml
}

/// Build one LEDGER message for party master creation.
pub fn party_master_xml(party: &Value, settings: &LedgerSettings) -> String {
    let name = field_value(party, &["party_name", "buyer_name"]);
    let gstin = field_value(party, &["gstin", "buyer_gstin"]);
    let address = field_value(party, &["address", "buyer_address"]);
    let state = non_empty_or(
        field_value(party, &["state", "buyer_state"]),
        &settings.default_state,
    );
    let pincode = field_value(party, &["pincode", "buyer_pincode"]);
    let group = escape_xml(&settings.party_group);
    let reg_type = escape_xml(&settings.gst_reg_type);

    format!(
        r#"<TALLYMESSAGE xmlns:UDF="TallyUDF">
<LEDGER NAME="{name}" ACTION="Create">
  <NAME>{name}</NAME>
  <PARENT>{group}</PARENT>
  <GSTIN>{gstin}</GSTIN>
  <GSTREGISTRATIONTYPE>{reg_type}</GSTREGISTRATIONTYPE>
  <COUNTRYOFRESIDENCE>India</COUNTRYOFRESIDENCE>
  <LEDSTATENAME>{state}</LEDSTATENAME>
  <PINCODE>{pincode}</PINCODE>
  <ADDRESS.LIST>
    <ADDRESS>{address}</ADDRESS>
  </ADDRESS.LIST>
</LEDGER>
</TALLYMESSAGE>"#
    )
}

/// Resolve a voucher slot through the mapping set: for each Tally XML key
/// in precedence order, find its mapping, read the record's mapped API
/// field, and return the first non-empty value (escaped).
pub fn mapped_value(record: &Value, mappings: &[FieldMapping], keys: &[&str]) -> String {
    for key in keys {
        let Some(mapping) = mappings.iter().find(|m| m.tally_xml_key == *key) else {
            continue;
        };
        if let Some(value) = record.get(&mapping.api_field) {
            let text = value_text(value);
            if !text.is_empty() {
                return escape_xml(&text);
            }
        }
    }
    String::new()
}

/// First non-empty record field among `keys`, escaped.
fn field_value(record: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(value) = record.get(*key) {
            let text = value_text(value);
            if !text.is_empty() {
                return escape_xml(&text);
            }
        }
    }
    String::new()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        escape_xml(fallback)
    } else {
        value
    }
}

/// Escape the five XML-reserved characters.
pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
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

    fn sales_mappings() -> Vec<FieldMapping> {
        vec![
            mapping("order_date", "DATE", "date", true),
            mapping("customer", "PARTYNAME", "party_name", true),
            mapping("sku", "STOCKITEMNAME", "item_name", true),
            mapping("quantity", "BILLEDQTY", "quantity", true),
            mapping("unit_price", "RATE", "rate", true),
            mapping("order_id", "REFERENCE", "reference", false),
        ]
    }

    #[test]
    fn escape_covers_reserved_characters() {
        assert_eq!(
            escape_xml(r#"A & B <C> "D" 'E'"#),
            "A &amp; B &lt;C&gt; &quot;D&quot; &apos;E&apos;"
        );
    }

    #[test]
    fn probe_envelope_is_pinned() {
        assert!(PROBE_XML.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(PROBE_XML.contains("<TALLYREQUEST>Export</TALLYREQUEST>"));
        assert!(PROBE_XML.contains("<ID>List of Companies</ID>"));
        assert!(PROBE_XML.contains("<SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>"));
    }

    #[test]
    fn stock_envelope_requests_exploded_summary() {
        assert!(STOCK_EXPORT_XML.contains("<ID>Stock Summary</ID>"));
        assert!(STOCK_EXPORT_XML.contains("<EXPLODEFLAG>Yes</EXPLODEFLAG>"));
    }

    #[test]
    fn report_envelope_carries_date_range() {
        let xml = report_export_xml("Sales Register", "20260401", "20260430");
        assert!(xml.contains("<ID>Sales Register</ID>"));
        assert!(xml.contains("<SVFROMDATE>20260401</SVFROMDATE>"));
        assert!(xml.contains("<SVTODATE>20260430</SVTODATE>"));
    }

    #[test]
    fn voucher_resolves_mapped_values() {
        let record = json!({
            "order_date": "2026-04-12",
            "customer": "Acme & Sons",
            "sku": "WIDGET-1",
            "quantity": 3,
            "unit_price": 150,
            "order_id": "ORD-9"
        });
        let xml = voucher_xml(&record, "Sales", &sales_mappings(), 0);

        // Date dashes are stripped to Tally's YYYYMMDD.
        assert!(xml.contains("<DATE>20260412</DATE>"));
        assert!(xml.contains("<PARTYNAME>Acme &amp; Sons</PARTYNAME>"));
        assert!(xml.contains("<STOCKITEMNAME>WIDGET-1</STOCKITEMNAME>"));
        assert!(xml.contains("<BILLEDQTY>3</BILLEDQTY>"));
        assert!(xml.contains("<RATE>150</RATE>"));
        assert!(xml.contains("<AMOUNT>450</AMOUNT>"));
        assert!(xml.contains("<AMOUNT>-450</AMOUNT>"));
        assert!(xml.contains(r#"VCHTYPE="Sales""#));
        assert!(xml.contains("<REFERENCE>ORD-9</REFERENCE>"));
    }

    #[test]
    fn party_name_precedence_falls_back_to_ledger_name_key() {
        let mut mappings = sales_mappings();
        // Remap the party slot to PARTYLEDGERNAME only.
        mappings.retain(|m| m.tally_xml_key != "PARTYNAME");
        mappings.push(mapping("customer", "PARTYLEDGERNAME", "party_name", true));

        let record = json!({"customer": "Beta Traders"});
        let xml = voucher_xml(&record, "Sales", &mappings, 0);
        assert!(xml.contains("<PARTYNAME>Beta Traders</PARTYNAME>"));
    }

    #[test]
    fn missing_rate_defaults_to_zero_and_is_still_included() {
        let record = json!({
            "order_date": "2026-04-12",
            "customer": "Acme",
            "sku": "WIDGET-1",
            "quantity": 3
        });
        let xml = voucher_xml(&record, "Sales", &sales_mappings(), 0);
        assert!(xml.contains("<RATE>0</RATE>"));
        assert!(xml.contains("<AMOUNT>0</AMOUNT>"));
    }

    #[test]
    fn tax_entries_appear_only_for_positive_amounts() {
        let mut mappings = sales_mappings();
        mappings.push(mapping("cgst", "CGST", "cgst", false));
        mappings.push(mapping("sgst", "SGST", "sgst", false));
        mappings.push(mapping("igst", "IGST", "igst", false));

        let record = json!({
            "customer": "Acme",
            "cgst": "45.0",
            "sgst": "45.0",
            "igst": "0"
        });
        let xml = voucher_xml(&record, "Sales", &mappings, 0);
        assert!(xml.contains("<LEDGERNAME>CGST</LEDGERNAME>"));
        assert!(xml.contains("<LEDGERNAME>SGST</LEDGERNAME>"));
        assert!(!xml.contains("<LEDGERNAME>IGST</LEDGERNAME>"));
    }

    #[test]
    fn narration_falls_back_to_reference_then_index() {
        let record = json!({"order_id": "ORD-1", "customer": "Acme"});
        let xml = voucher_xml(&record, "Sales", &sales_mappings(), 7);
        assert!(xml.contains("<NARRATION>Commerce order: ORD-1</NARRATION>"));

        let record = json!({"customer": "Acme"});
        let xml = voucher_xml(&record, "Sales", &sales_mappings(), 7);
        assert!(xml.contains("<NARRATION>Commerce order: 7</NARRATION>"));
    }

    #[test]
    fn party_master_uses_settings_defaults() {
        let party = json!({"buyer_name": "Gamma LLP", "buyer_gstin": "27AAAAA0000A1Z5"});
        let xml = party_master_xml(&party, &LedgerSettings::default());
        assert!(xml.contains(r#"<LEDGER NAME="Gamma LLP" ACTION="Create">"#));
        assert!(xml.contains("<PARENT>Sundry Debtors</PARENT>"));
        assert!(xml.contains("<GSTIN>27AAAAA0000A1Z5</GSTIN>"));
        assert!(xml.contains("<GSTREGISTRATIONTYPE>Regular</GSTREGISTRATIONTYPE>"));
        assert!(xml.contains("<LEDSTATENAME>Maharashtra</LEDSTATENAME>"));
    }

    #[test]
    fn import_envelopes_are_pinned() {
        let vouchers = voucher_import_envelope("<TALLYMESSAGE/>");
        assert!(vouchers.contains("<TALLYREQUEST>Import Data</TALLYREQUEST>"));
        assert!(vouchers.contains("<REPORTNAME>Vouchers</REPORTNAME>"));
        assert!(vouchers.contains("<SVCURRENTCOMPANY>##SVCURRENTCOMPANY</SVCURRENTCOMPANY>"));
        assert!(vouchers.contains("<TALLYMESSAGE/>"));

        let masters = masters_import_envelope("<TALLYMESSAGE/>");
        assert!(masters.contains("<REPORTNAME>All Masters</REPORTNAME>"));
        assert!(!masters.contains("SVCURRENTCOMPANY"));
    }
}
