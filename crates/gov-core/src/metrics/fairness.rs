//! Fairness Metrics
//!
//! Inequality across the three areas, measured with Gini coefficients over
//! per-area means, plus the income-based digital divide.

use gov_events::{Area, ResidentSnapshot};
use serde::{Deserialize, Serialize};

use super::mean;

/// Income separating the high and low groups in the digital divide index
pub const HIGH_INCOME_THRESHOLD: f64 = 6000.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FairnessMetrics {
    pub service_access_gini: f64,
    pub usage_depth_gini: f64,
    pub satisfaction_gini: f64,
    pub digital_divide_index: f64,
}

pub fn calculate_fairness(residents: &[ResidentSnapshot]) -> FairnessMetrics {
    if residents.is_empty() {
        return FairnessMetrics::default();
    }

    let mut access = Vec::with_capacity(3);
    let mut usage = Vec::with_capacity(3);
    let mut satisfaction = Vec::with_capacity(3);

    // Empty areas contribute 0 so every area stays in the distribution
    for area in Area::all() {
        let group: Vec<&ResidentSnapshot> = residents.iter().filter(|r| r.area == area).collect();
        if group.is_empty() {
            access.push(0.0);
            usage.push(0.0);
            satisfaction.push(0.0);
            continue;
        }
        access.push(access_rate(&group));
        usage.push(mean(&group.iter().map(|r| r.service_usage_frequency).collect::<Vec<_>>()));
        satisfaction.push(mean(&group.iter().map(|r| r.satisfaction).collect::<Vec<_>>()));
    }

    FairnessMetrics {
        service_access_gini: gini_coefficient(&access),
        usage_depth_gini: gini_coefficient(&usage),
        satisfaction_gini: gini_coefficient(&satisfaction),
        digital_divide_index: digital_divide(residents),
    }
}

/// Gini coefficient of a distribution; 0 is perfect equality.
///
/// Negative values are treated as 0. Fewer than two values, all-equal
/// values, and an all-zero total give 0. For `[0, x]` the result is 0.5,
/// the maximum for two values under this estimator.
pub fn gini_coefficient(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().map(|v| v.max(0.0)).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    if sorted.iter().all(|v| *v == sorted[0]) {
        return 0.0;
    }

    let n = sorted.len() as f64;
    let mut running = 0.0;
    let mut cumulative_sum = 0.0;
    for v in &sorted {
        running += v;
        cumulative_sum += running;
    }
    let total = running;
    if total == 0.0 {
        return 0.0;
    }

    ((n + 1.0 - 2.0 * cumulative_sum / total) / n).clamp(0.0, 1.0)
}

fn access_rate(group: &[&ResidentSnapshot]) -> f64 {
    let flags: Vec<f64> = group
        .iter()
        .map(|r| if r.digital_access { 1.0 } else { 0.0 })
        .collect();
    mean(&flags)
}

fn digital_divide(residents: &[ResidentSnapshot]) -> f64 {
    let (high, low): (Vec<&ResidentSnapshot>, Vec<&ResidentSnapshot>) = residents
        .iter()
        .partition(|r| r.income_level > HIGH_INCOME_THRESHOLD);
    if high.is_empty() || low.is_empty() {
        return 0.0;
    }
    (access_rate(&high) - access_rate(&low)).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resident(area: Area, income: f64, access: bool, usage: f64, satisfaction: f64) -> ResidentSnapshot {
        ResidentSnapshot {
            id: "resident_0".to_string(),
            area,
            information_literacy: 60.0,
            income_level: income,
            technology_acceptance: 70.0,
            trust_in_government: 50.0,
            satisfaction,
            digital_access: access,
            service_usage_frequency: usage,
        }
    }

    #[test]
    fn test_gini_equal_values() {
        assert_eq!(gini_coefficient(&[3.0, 3.0, 3.0, 3.0]), 0.0);
        assert_eq!(gini_coefficient(&[7.5]), 0.0);
        assert_eq!(gini_coefficient(&[]), 0.0);
        assert_eq!(gini_coefficient(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_gini_two_point_maximum() {
        for x in [0.1, 1.0, 42.0, 1e6] {
            assert!((gini_coefficient(&[0.0, x]) - 0.5).abs() < 1e-12);
            assert!((gini_coefficient(&[x, 0.0]) - 0.5).abs() < 1e-12);
        }
        // No other two-point distribution exceeds it
        assert!(gini_coefficient(&[1.0, 9.0]) < 0.5);
    }

    #[test]
    fn test_gini_lorenz_monotonic() {
        // Rich-to-poor transfers that keep order never raise the Gini
        let mut values = vec![0.0, 1.0, 2.0, 10.0];
        let mut previous = gini_coefficient(&values);
        for _ in 0..4 {
            values[3] -= 1.0;
            values[0] += 1.0;
            let current = gini_coefficient(&values);
            assert!(current <= previous + 1e-12, "{} > {}", current, previous);
            previous = current;
        }
    }

    #[test]
    fn test_gini_clamps_negatives() {
        assert_eq!(gini_coefficient(&[-5.0, 4.0]), gini_coefficient(&[0.0, 4.0]));
    }

    #[test]
    fn test_fairness_empty_population() {
        assert_eq!(calculate_fairness(&[]), FairnessMetrics::default());
    }

    #[test]
    fn test_single_area_population_is_unequal() {
        let residents = vec![
            resident(Area::CoreArea, 5000.0, true, 5.0, 3.0),
            resident(Area::CoreArea, 5000.0, true, 5.0, 3.0),
        ];
        let metrics = calculate_fairness(&residents);
        // Two empty areas count as zero
        assert!(metrics.service_access_gini > 0.6);
        assert_eq!(metrics.digital_divide_index, 0.0);
    }

    #[test]
    fn test_digital_divide() {
        let residents = vec![
            resident(Area::CoreArea, 9000.0, true, 5.0, 3.0),
            resident(Area::Rural, 2000.0, false, 1.0, 2.0),
            resident(Area::Rural, 3000.0, true, 1.0, 2.0),
            resident(Area::UrbanRuralFringe, 6000.0, false, 2.0, 3.0),
        ];
        let metrics = calculate_fairness(&residents);
        assert!((metrics.digital_divide_index - (1.0 - 1.0 / 3.0)).abs() < 1e-12);
    }
}
