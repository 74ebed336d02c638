// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsers for Tally's XML responses.
//!
//! Extraction is regex-based over the raw text: Tally's responses are flat
//! and the interesting values live in a handful of well-known tags.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static CREATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<CREATED>\s*(\d+)").expect("static regex"));
static ALTERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ALTERED>\s*(\d+)").expect("static regex"));
static ERRORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ERRORS>\s*(\d+)").expect("static regex"));
static LINE_ERROR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<LINEERROR>([^<]*)</LINEERROR>").expect("static regex"));
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<NAME[^>]*>([^<]+)</NAME>").expect("static regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<TALLYVERSION>([^<]+)</TALLYVERSION>").expect("static regex"));
static STOCK_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<STOCKITEM\b[^>]*?NAME="([^"]*)"[^>]*>(.*?)</STOCKITEM>"#)
        .expect("static regex")
});

/// Result of the connection test probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionProbe {
    pub connected: bool,
    pub tally_version: String,
    pub company_name: String,
    pub message: String,
}

impl ConnectionProbe {
    /// Probe outcome for an unreachable engine. Never an `Err` — the
    /// dashboard renders this state, it does not handle exceptions.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            tally_version: String::new(),
            company_name: String::new(),
            message: message.into(),
        }
    }
}

/// Outcome of an Import Data request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub created: u64,
    pub altered: u64,
    pub failed: u64,
    pub errors: Vec<String>,
    pub raw: String,
}

impl ImportOutcome {
    /// Records Tally accepted (created plus altered).
    pub fn succeeded(&self) -> u64 {
        self.created + self.altered
    }
}

/// One stock item from a Stock Summary export. Values stay as Tally
/// renders them ("5 nos", "1,500.00") — unit handling is the consumer's
/// concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockItem {
    pub name: String,
    pub closing_balance: String,
    pub closing_rate: String,
    pub closing_quantity: String,
    pub group: String,
    pub unit: String,
}

/// Parse an Import Data response into counts and line-level errors.
pub fn parse_import_response(raw: &str) -> ImportOutcome {
    let created = capture_u64(&CREATED_RE, raw);
    let altered = capture_u64(&ALTERED_RE, raw);

    let errors: Vec<String> = LINE_ERROR_RE
        .captures_iter(raw)
        .map(|c| c[1].trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    // Tally sometimes reports only an aggregate ERRORS count with no
    // line detail; trust whichever signal is larger.
    let failed = (errors.len() as u64).max(capture_u64(&ERRORS_RE, raw));

    ImportOutcome {
        created,
        altered,
        failed,
        errors,
        raw: raw.to_string(),
    }
}

/// Parse the company list probe response.
///
/// An engine that answered at all counts as connected, even with no company
/// open; missing fields degrade to placeholders rather than failing the call.
pub fn parse_probe_response(raw: &str) -> ConnectionProbe {
    let company = NAME_RE
        .captures(raw)
        .map(|c| c[1].trim().to_string())
        .filter(|name| !name.is_empty());

    let tally_version = VERSION_RE
        .captures(raw)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "Tally Prime".to_string());

    let company_name = company.unwrap_or_else(|| {
        if raw.contains("ENVELOPE") {
            "(no company open)".to_string()
        } else {
            "(unknown)".to_string()
        }
    });

    ConnectionProbe {
        connected: true,
        tally_version,
        company_name,
        message: "connected".to_string(),
    }
}

/// Parse a Stock Summary export into items.
pub fn parse_stock_response(raw: &str) -> Vec<StockItem> {
    STOCK_ITEM_RE
        .captures_iter(raw)
        .map(|captures| {
            let name = captures[1].trim().to_string();
            let block = &captures[2];
            StockItem {
                name,
                closing_balance: tag_text(block, &["CLOSINGBALANCE", "CLOSINGVALUE"]),
                closing_rate: tag_text(block, &["CLOSINGRATE"]),
                closing_quantity: tag_text(block, &["CLOSINGQTY"]),
                group: tag_text(block, &["PARENT", "STOCKGROUP"]),
                unit: tag_text(block, &["BASEUNITS"]),
            }
        })
        .collect()
}

fn capture_u64(re: &Regex, raw: &str) -> u64 {
    re.captures(raw)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// Text of the first present tag among `tags` in `block`.
fn tag_text(block: &str, tags: &[&str]) -> String {
    for tag in tags {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        if let (Some(start), Some(end)) = (block.find(&open), block.find(&close)) {
            if end > start {
                return block[start + open.len()..end].trim().to_string();
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_counts_are_extracted() {
        let raw = r#"<ENVELOPE><BODY><DATA><IMPORTRESULT>
            <CREATED>3</CREATED><ALTERED>1</ALTERED><ERRORS>0</ERRORS>
        </IMPORTRESULT></DATA></BODY></ENVELOPE>"#;
        let outcome = parse_import_response(raw);
        assert_eq!(outcome.created, 3);
        assert_eq!(outcome.altered, 1);
        assert_eq!(outcome.succeeded(), 4);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn line_errors_are_collected() {
        let raw = r#"<ENVELOPE>
            <CREATED>1</CREATED>
            <LINEERROR>Ledger 'Acme' does not exist!</LINEERROR>
            <LINEERROR>Voucher totals do not match</LINEERROR>
        </ENVELOPE>"#;
        let outcome = parse_import_response(raw);
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors[0].contains("does not exist"));
    }

    #[test]
    fn aggregate_errors_count_without_line_detail() {
        let raw = "<ENVELOPE><CREATED>0</CREATED><ERRORS>2</ERRORS></ENVELOPE>";
        let outcome = parse_import_response(raw);
        assert_eq!(outcome.failed, 2);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn unparseable_response_yields_zero_counts() {
        let outcome = parse_import_response("not xml at all");
        assert_eq!(outcome.succeeded(), 0);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.raw, "not xml at all");
    }

    #[test]
    fn probe_extracts_company_and_version() {
        let raw = r#"<ENVELOPE><HEADER><TALLYVERSION>6.1</TALLYVERSION></HEADER>
            <BODY><DATA><COLLECTION>
                <COMPANY><NAME TYPE="String">Acme Pvt Ltd</NAME></COMPANY>
            </COLLECTION></DATA></BODY></ENVELOPE>"#;
        let probe = parse_probe_response(raw);
        assert!(probe.connected);
        assert_eq!(probe.tally_version, "6.1");
        assert_eq!(probe.company_name, "Acme Pvt Ltd");
    }

    #[test]
    fn probe_with_no_company_open_is_still_connected() {
        let raw = "<ENVELOPE><BODY><DATA></DATA></BODY></ENVELOPE>";
        let probe = parse_probe_response(raw);
        assert!(probe.connected);
        assert_eq!(probe.company_name, "(no company open)");
        assert_eq!(probe.tally_version, "Tally Prime");
    }

    #[test]
    fn probe_on_unrecognizable_payload_degrades_to_unknown() {
        let probe = parse_probe_response("<html>proxy error page</html>");
        assert!(probe.connected);
        assert_eq!(probe.company_name, "(unknown)");
    }

    #[test]
    fn stock_items_are_parsed_from_export() {
        let raw = r#"<ENVELOPE><BODY><DATA><COLLECTION>
            <STOCKITEM NAME="Widget A" RESERVEDNAME="">
                <PARENT>Widgets</PARENT>
                <BASEUNITS>nos</BASEUNITS>
                <CLOSINGBALANCE>12 nos</CLOSINGBALANCE>
                <CLOSINGRATE>150.00/nos</CLOSINGRATE>
                <CLOSINGQTY>12</CLOSINGQTY>
            </STOCKITEM>
            <STOCKITEM NAME="Widget B">
                <CLOSINGVALUE>900.00</CLOSINGVALUE>
            </STOCKITEM>
        </COLLECTION></DATA></BODY></ENVELOPE>"#;

        let items = parse_stock_response(raw);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Widget A");
        assert_eq!(items[0].group, "Widgets");
        assert_eq!(items[0].unit, "nos");
        assert_eq!(items[0].closing_balance, "12 nos");
        assert_eq!(items[0].closing_quantity, "12");
        // Fallback tag for balance.
        assert_eq!(items[1].name, "Widget B");
        assert_eq!(items[1].closing_balance, "900.00");
    }

    #[test]
    fn empty_export_yields_no_items() {
        assert!(parse_stock_response("<ENVELOPE/>").is_empty());
    }
}
