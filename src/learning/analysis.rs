//! Experiment analysis (§4.8 "Analysis"): frequentist significance testing,
//! Bayesian posterior comparison, guardrail evaluation, and the resulting
//! ship/rollback/continue/inconclusive recommendation.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use uuid::Uuid;

use crate::domain::{ExperimentEvent, ExperimentEventType};
use crate::error::{CellarError, Result};

/// A small relative margin a test variant may trail a guardrail metric by
/// before it counts as a violation (spec §4.8: "beyond a small margin").
const DEFAULT_GUARDRAIL_MARGIN: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Frequentist,
    Bayesian,
    Both,
}

/// Summary statistics for one variant on one metric, reduced from raw
/// [`ExperimentEvent`] rows by [`summarize_rate`]/[`summarize_continuous`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSample {
    pub variant_name: String,
    pub is_control: bool,
    pub n: usize,
    pub mean: f64,
    pub variance: f64,
    /// Count of positive outcomes, used only by the two-proportion z-test
    /// and the beta-binomial posterior.
    pub successes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequentistResult {
    pub p_value: f64,
    /// Cohen's d for continuous metrics, relative lift for rate metrics.
    /// Positive means the test variant outperforms control.
    pub effect_size: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianResult {
    pub probability_test_beats_control: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Ship,
    Rollback,
    Continue,
    Inconclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub metric_name: String,
    pub is_violated: bool,
    pub control_value: f64,
    pub test_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metric_name: String,
    pub confidence_level: f64,
    pub frequentist: Option<FrequentistResult>,
    pub bayesian: Option<BayesianResult>,
    pub guardrails: Vec<GuardrailResult>,
    pub recommendation: Recommendation,
}

pub struct AnalysisInput {
    pub metric_name: String,
    pub analysis_type: AnalysisType,
    pub confidence_level: f64,
    pub minimum_sample_size: usize,
    pub is_rate_metric: bool,
    pub control: VariantSample,
    pub test: VariantSample,
    pub guardrails: Vec<GuardrailResult>,
}

/// Reduces raw events into a rate-metric [`VariantSample`]: `successes` is
/// the conversion count, `n` the impression count (the exposure base).
pub fn summarize_rate(events: &[ExperimentEvent], variant_id: Uuid, variant_name: &str, is_control: bool) -> VariantSample {
    let impressions = events
        .iter()
        .filter(|e| e.variant_id == variant_id && e.event_type == ExperimentEventType::Impression)
        .count();
    let conversions = events
        .iter()
        .filter(|e| e.variant_id == variant_id && e.event_type == ExperimentEventType::Conversion)
        .count();
    let n = impressions.max(1);
    VariantSample {
        variant_name: variant_name.to_string(),
        is_control,
        n,
        mean: conversions as f64 / n as f64,
        variance: 0.0,
        successes: conversions as f64,
    }
}

/// Reduces raw events into a continuous-metric [`VariantSample`] from
/// `rating` event values.
pub fn summarize_continuous(events: &[ExperimentEvent], variant_id: Uuid, variant_name: &str, is_control: bool) -> VariantSample {
    let values: Vec<f64> = events
        .iter()
        .filter(|e| e.variant_id == variant_id && e.event_type == ExperimentEventType::Rating)
        .filter_map(|e| e.value)
        .collect();
    let n = values.len();
    let mean = if n > 0 { values.iter().sum::<f64>() / n as f64 } else { 0.0 };
    let variance = if n > 1 {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    VariantSample {
        variant_name: variant_name.to_string(),
        is_control,
        n: n.max(1),
        mean,
        variance,
        successes: 0.0,
    }
}

/// Welch's t-test, used for continuous metrics that don't assume equal
/// variance between variants.
pub fn welch_t_test(control: &VariantSample, test: &VariantSample, confidence_level: f64) -> Result<FrequentistResult> {
    if control.n < 2 || test.n < 2 {
        return Ok(FrequentistResult { p_value: 1.0, effect_size: 0.0, significant: false });
    }

    let (n1, n2) = (control.n as f64, test.n as f64);
    let (v1, v2) = (control.variance.max(1e-9), test.variance.max(1e-9));
    let se = (v1 / n1 + v2 / n2).sqrt();
    if se == 0.0 {
        return Ok(FrequentistResult { p_value: 1.0, effect_size: 0.0, significant: false });
    }

    let t = (test.mean - control.mean) / se;
    let df_numerator = (v1 / n1 + v2 / n2).powi(2);
    let df_denominator = (v1 / n1).powi(2) / (n1 - 1.0) + (v2 / n2).powi(2) / (n2 - 1.0);
    let df = (df_numerator / df_denominator).max(1.0);

    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| CellarError::internal(format!("t distribution: {e}")))?;
    let p_value = 2.0 * (1.0 - dist.cdf(t.abs()));

    let pooled_sd = (((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0)).sqrt();
    let effect_size = if pooled_sd > 0.0 { (test.mean - control.mean) / pooled_sd } else { 0.0 };

    Ok(FrequentistResult {
        p_value,
        effect_size,
        significant: p_value < (1.0 - confidence_level),
    })
}

/// Two-proportion z-test, used for rate metrics (conversion rate, click
/// rate).
pub fn two_proportion_z_test(control: &VariantSample, test: &VariantSample, confidence_level: f64) -> Result<FrequentistResult> {
    let (n1, n2) = (control.n as f64, test.n as f64);
    let p1 = control.successes / n1;
    let p2 = test.successes / n2;
    let p_pool = (control.successes + test.successes) / (n1 + n2);
    let se = (p_pool * (1.0 - p_pool) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 {
        return Ok(FrequentistResult { p_value: 1.0, effect_size: 0.0, significant: false });
    }

    let z = (p2 - p1) / se;
    let normal = Normal::new(0.0, 1.0).map_err(|e| CellarError::internal(format!("normal distribution: {e}")))?;
    let p_value = 2.0 * (1.0 - normal.cdf(z.abs()));
    let effect_size = if p1 > 0.0 { (p2 - p1) / p1 } else { 0.0 };

    Ok(FrequentistResult {
        p_value,
        effect_size,
        significant: p_value < (1.0 - confidence_level),
    })
}

/// Beta-binomial posterior `P(test > control)` for rate metrics, via a
/// normal approximation to the difference of the two variants' Beta(1,1)
/// posteriors — closed-form and adequate at the sample sizes this system
/// expects, avoiding a numerical integration dependency for an exact
/// comparison.
pub fn beta_binomial_probability(control: &VariantSample, test: &VariantSample) -> f64 {
    let (mean_c, var_c) = beta_posterior_moments(control.successes, control.n as f64);
    let (mean_t, var_t) = beta_posterior_moments(test.successes, test.n as f64);
    normal_superiority_probability(mean_c, var_c, mean_t, var_t)
}

fn beta_posterior_moments(successes: f64, n: f64) -> (f64, f64) {
    let alpha = successes + 1.0;
    let beta = (n - successes).max(0.0) + 1.0;
    let total = alpha + beta;
    let mean = alpha / total;
    let variance = (alpha * beta) / (total.powi(2) * (total + 1.0));
    (mean, variance)
}

/// Normal-normal posterior `P(test > control)` for continuous metrics,
/// using the sample mean/variance as the (non-informative-prior) posterior
/// moments of each variant's mean.
pub fn normal_normal_probability(control: &VariantSample, test: &VariantSample) -> f64 {
    let var_of_mean_c = control.variance / control.n as f64;
    let var_of_mean_t = test.variance / test.n as f64;
    normal_superiority_probability(control.mean, var_of_mean_c, test.mean, var_of_mean_t)
}

fn normal_superiority_probability(mean_c: f64, var_c: f64, mean_t: f64, var_t: f64) -> f64 {
    let diff_var = var_c + var_t;
    if diff_var <= 0.0 {
        return if mean_t > mean_c { 1.0 } else { 0.0 };
    }
    let z = (mean_t - mean_c) / diff_var.sqrt();
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => 0.5,
    }
}

/// `is_violated` when the test variant trails control by more than
/// [`DEFAULT_GUARDRAIL_MARGIN`] in the direction that matters.
pub fn evaluate_guardrail(metric_name: &str, control: &VariantSample, test: &VariantSample, higher_is_better: bool) -> GuardrailResult {
    let is_violated = if higher_is_better {
        test.mean < control.mean * (1.0 - DEFAULT_GUARDRAIL_MARGIN)
    } else {
        test.mean > control.mean * (1.0 + DEFAULT_GUARDRAIL_MARGIN)
    };
    GuardrailResult {
        metric_name: metric_name.to_string(),
        is_violated,
        control_value: control.mean,
        test_value: test.mean,
    }
}

pub fn analyze(input: AnalysisInput) -> Result<AnalysisReport> {
    let underpowered = input.control.n < input.minimum_sample_size || input.test.n < input.minimum_sample_size;

    let frequentist = match input.analysis_type {
        AnalysisType::Frequentist | AnalysisType::Both => Some(if input.is_rate_metric {
            two_proportion_z_test(&input.control, &input.test, input.confidence_level)?
        } else {
            welch_t_test(&input.control, &input.test, input.confidence_level)?
        }),
        AnalysisType::Bayesian => None,
    };

    let bayesian = match input.analysis_type {
        AnalysisType::Bayesian | AnalysisType::Both => Some(BayesianResult {
            probability_test_beats_control: if input.is_rate_metric {
                beta_binomial_probability(&input.control, &input.test)
            } else {
                normal_normal_probability(&input.control, &input.test)
            },
        }),
        AnalysisType::Frequentist => None,
    };

    let any_guardrail_violated = input.guardrails.iter().any(|g| g.is_violated);

    let recommendation = if underpowered {
        Recommendation::Continue
    } else if any_guardrail_violated {
        Recommendation::Rollback
    } else if let Some(freq) = &frequentist {
        if freq.significant && freq.effect_size > 0.0 {
            Recommendation::Ship
        } else if freq.significant {
            Recommendation::Rollback
        } else {
            Recommendation::Inconclusive
        }
    } else if let Some(bayes) = &bayesian {
        if bayes.probability_test_beats_control >= input.confidence_level {
            Recommendation::Ship
        } else if bayes.probability_test_beats_control <= 1.0 - input.confidence_level {
            Recommendation::Rollback
        } else {
            Recommendation::Inconclusive
        }
    } else {
        Recommendation::Inconclusive
    };

    Ok(AnalysisReport {
        metric_name: input.metric_name,
        confidence_level: input.confidence_level,
        frequentist,
        bayesian,
        guardrails: input.guardrails,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize, mean: f64, variance: f64, successes: f64) -> VariantSample {
        VariantSample { variant_name: "v".to_string(), is_control: false, n, mean, variance, successes }
    }

    #[test]
    fn welch_t_test_p_value_is_in_unit_interval() {
        let control = sample(200, 4.1, 0.8, 0.0);
        let test = sample(210, 4.4, 0.9, 0.0);
        let result = welch_t_test(&control, &test, 0.95).unwrap();
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn two_proportion_z_test_flags_large_lift_as_significant() {
        let control = sample(5000, 0.0, 0.0, 500.0);
        let test = sample(5000, 0.0, 0.0, 900.0);
        let result = two_proportion_z_test(&control, &test, 0.95).unwrap();
        assert!(result.significant);
        assert!(result.effect_size > 0.0);
    }

    #[test]
    fn beta_binomial_probability_favors_the_better_variant() {
        let control = sample(1000, 0.0, 0.0, 100.0);
        let test = sample(1000, 0.0, 0.0, 160.0);
        let p = beta_binomial_probability(&control, &test);
        assert!(p > 0.9);
    }

    #[test]
    fn guardrail_flags_regression_beyond_margin() {
        let control = sample(1000, 0.05, 0.0, 0.0);
        let test = sample(1000, 0.03, 0.0, 0.0);
        let result = evaluate_guardrail("error_rate", &control, &test, false);
        assert!(!result.is_violated);

        let control = sample(1000, 0.02, 0.0, 0.0);
        let test = sample(1000, 0.06, 0.0, 0.0);
        let result = evaluate_guardrail("error_rate", &control, &test, false);
        assert!(result.is_violated);
    }

    #[test]
    fn underpowered_samples_recommend_continue() {
        let control = sample(10, 0.0, 0.0, 2.0);
        let test = sample(10, 0.0, 0.0, 3.0);
        let report = analyze(AnalysisInput {
            metric_name: "conversion_rate".to_string(),
            analysis_type: AnalysisType::Frequentist,
            confidence_level: 0.95,
            minimum_sample_size: 1000,
            is_rate_metric: true,
            control,
            test,
            guardrails: vec![],
        })
        .unwrap();
        assert_eq!(report.recommendation, Recommendation::Continue);
    }

    #[test]
    fn guardrail_violation_overrides_a_positive_effect() {
        let control = sample(5000, 0.0, 0.0, 500.0);
        let test = sample(5000, 0.0, 0.0, 900.0);
        let report = analyze(AnalysisInput {
            metric_name: "conversion_rate".to_string(),
            analysis_type: AnalysisType::Frequentist,
            confidence_level: 0.95,
            minimum_sample_size: 100,
            is_rate_metric: true,
            control,
            test,
            guardrails: vec![GuardrailResult {
                metric_name: "latency_p99".to_string(),
                is_violated: true,
                control_value: 200.0,
                test_value: 400.0,
            }],
        })
        .unwrap();
        assert_eq!(report.recommendation, Recommendation::Rollback);
    }
}
