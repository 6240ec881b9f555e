//! Filing-wide behavior flags read off the namespace documents.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Instance, QName};

static RISK_RETURN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^http://xbrl\.(sec\.gov|us)/rr/20").expect("valid regex"));

const INVEST_PREFIX: &str = "http://xbrl.sec.gov/invest/";

/// Flags and well-known axes for one filing.
#[derive(Debug, Clone, Default)]
pub struct FilingFlags {
    /// Risk/return taxonomy in the DTS.
    pub is_rr: bool,
    /// Investment-company taxonomy in the DTS.
    pub is_invest: bool,
    pub stm_namespace: Option<String>,
    pub dei_namespace: Option<String>,
    /// Axes laid out as columns on a statement of equity.
    pub equity_column_axes: Vec<QName>,
    /// Row axes that force segment heading rows.
    pub segment_stop_list: Vec<QName>,
}

impl FilingFlags {
    pub fn detect(instance: &Instance) -> Self {
        let namespaces: Vec<&String> = instance.namespaces.values().collect();
        let stm = namespaces.iter().find(|ns| ns.contains("/us-gaap/20")).map(|ns| ns.to_string());
        let dei = namespaces.iter().find(|ns| ns.contains("/dei/20")).map(|ns| ns.to_string());

        let in_ns = |ns: &Option<String>, prefix: &str, local: &str| {
            QName::new(prefix, ns.clone().unwrap_or_default(), local)
        };
        let equity_column_axes = vec![
            in_ns(&dei, "dei", "LegalEntityAxis"),
            in_ns(&stm, "us-gaap", "StatementEquityComponentsAxis"),
            in_ns(&stm, "us-gaap", "PartnerCapitalComponentsAxis"),
            in_ns(&stm, "us-gaap", "StatementClassOfStockAxis"),
        ];
        let segment_stop_list = [
            "CreationDateAxis",
            "StatementScenarioAxis",
            "AdjustmentsForNewAccountingPronouncementsAxis",
            "AdjustmentsForChangeInAccountingPrincipleAxis",
            "ErrorCorrectionsAndPriorPeriodAdjustmentsRestatementByRestatementPeriodAndAmountAxis",
        ]
        .iter()
        .map(|local| in_ns(&stm, "us-gaap", local))
        .collect();

        let flags = Self {
            is_rr: namespaces.iter().any(|ns| RISK_RETURN.is_match(ns)),
            is_invest: namespaces.iter().any(|ns| ns.starts_with(INVEST_PREFIX)),
            stm_namespace: stm,
            dei_namespace: dei,
            equity_column_axes,
            segment_stop_list,
        };
        tracing::debug!(
            is_rr = flags.is_rr,
            is_invest = flags.is_invest,
            stm = ?flags.stm_namespace,
            "filing flags"
        );
        flags
    }
}
