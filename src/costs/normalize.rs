use serde::{Deserialize, Serialize};

use super::transport::{Metric, ResultByTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: String,
    pub end: String,
}

/// Canonical cost record returned to API callers.
///
/// `amount` is the provider's decimal string, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostPeriod {
    pub period: Period,
    pub amount: String,
    pub unit: String,
}

/// Map one provider record onto [`CostPeriod`], selecting `metric`.
///
/// A record without the metric yields amount `"0"` and an empty unit.
pub fn normalize(record: &ResultByTime, metric: Metric) -> CostPeriod {
    let (amount, unit) = match record.total.get(metric.as_str()) {
        Some(value) => (value.amount.clone(), value.unit.clone()),
        None => ("0".to_string(), String::new()),
    };

    CostPeriod {
        period: Period {
            start: record.time_period.start.clone(),
            end: record.time_period.end.clone(),
        },
        amount,
        unit,
    }
}

/// Normalize every record and sort ascending by period start.
///
/// `sort_by` is stable, so records sharing a start keep provider order.
pub fn normalize_all(records: &[ResultByTime], metric: Metric) -> Vec<CostPeriod> {
    let mut costs: Vec<CostPeriod> = records.iter().map(|r| normalize(r, metric)).collect();
    costs.sort_by(|a, b| a.period.start.cmp(&b.period.start));
    costs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::transport::{DateInterval, MetricValue};
    use std::collections::HashMap;

    fn record(start: &str, end: &str, metric: &str, amount: &str) -> ResultByTime {
        let mut total = HashMap::new();
        total.insert(
            metric.to_string(),
            MetricValue {
                amount: amount.to_string(),
                unit: "USD".to_string(),
            },
        );
        ResultByTime {
            time_period: DateInterval {
                start: start.to_string(),
                end: end.to_string(),
            },
            total,
            estimated: false,
        }
    }

    #[test]
    fn test_normalize_selects_requested_metric() {
        let mut r = record("2023-05-01", "2023-06-01", "UnblendedCost", "42");
        r.total.insert(
            "BlendedCost".to_string(),
            MetricValue {
                amount: "40.5".to_string(),
                unit: "EUR".to_string(),
            },
        );

        let cost = normalize(&r, Metric::BlendedCost);
        assert_eq!(cost.amount, "40.5");
        assert_eq!(cost.unit, "EUR");
    }

    #[test]
    fn test_normalize_missing_metric() {
        let r = record("2023-05-01", "2023-06-01", "UnblendedCost", "42");
        let cost = normalize(&r, Metric::UsageQuantity);
        assert_eq!(cost.amount, "0");
        assert_eq!(cost.unit, "");
    }

    #[test]
    fn test_amount_precision_preserved() {
        let r = record("2023-05-01", "2023-06-01", "UnblendedCost", "0.0000000123456789012");
        assert_eq!(normalize(&r, Metric::UnblendedCost).amount, "0.0000000123456789012");
    }

    #[test]
    fn test_normalize_all_sorts_by_start() {
        let records = vec![
            record("2023-07-01", "2023-08-01", "UnblendedCost", "3"),
            record("2023-05-01", "2023-06-01", "UnblendedCost", "1"),
            record("2023-06-01", "2023-07-01", "UnblendedCost", "2"),
        ];

        let amounts: Vec<_> = normalize_all(&records, Metric::UnblendedCost)
            .into_iter()
            .map(|c| c.amount)
            .collect();
        assert_eq!(amounts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_normalize_all_is_stable_for_equal_starts() {
        let records = vec![
            record("2023-06-01", "2023-07-01", "UnblendedCost", "b1"),
            record("2023-05-01", "2023-06-01", "UnblendedCost", "a"),
            record("2023-06-01", "2023-07-01", "UnblendedCost", "b2"),
            record("2023-06-01", "2023-07-01", "UnblendedCost", "b3"),
        ];

        let amounts: Vec<_> = normalize_all(&records, Metric::UnblendedCost)
            .into_iter()
            .map(|c| c.amount)
            .collect();
        assert_eq!(amounts, vec!["a", "b1", "b2", "b3"]);
    }

    #[test]
    fn test_cost_period_json_shape() {
        let cost = normalize(
            &record("2023-05-01", "2023-06-01", "UnblendedCost", "42"),
            Metric::UnblendedCost,
        );
        assert_eq!(
            serde_json::to_value(&cost).unwrap(),
            serde_json::json!({
                "period": {"start": "2023-05-01", "end": "2023-06-01"},
                "amount": "42",
                "unit": "USD"
            })
        );
    }
}
