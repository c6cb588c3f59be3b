//! Terminal formatting.
//!
//! We keep formatting code in one place so the estimation code stays free of
//! presentation concerns.

use crate::domain::{CovarianceModel, RunRecord, TrialSummary};

/// Format one private estimate (plus its error when the truth is known).
pub fn format_run_summary(record: &RunRecord) -> String {
    let est = &record.estimate;
    let mut out = String::new();

    out.push_str("=== dplr - private linear regression ===\n");
    out.push_str(&format!("Samples: n={} | d={}\n", est.n, est.d));
    out.push_str(&format!(
        "Budget: rho={} | spent={} | mean stages={}",
        est.rho_total,
        est.rho_spent,
        fmt_vec(&est.mean_stages)
    ));
    if !est.covariance_stages.is_empty() {
        out.push_str(&format!(
            " | covariance stages={}",
            fmt_vec(&est.covariance_stages)
        ));
    }
    out.push('\n');
    out.push_str(&format!(
        "Covariance: {}\n",
        describe_covariance(&record.config.covariance)
    ));
    out.push_str(&format!("Scale: s={:.6}\n", est.scale));
    out.push_str(&format!("Seed: {}\n", record.seed));

    out.push_str("\nEstimate:\n");
    out.push_str(&format!("- mean(xy): {}\n", fmt_vec(&est.mean_estimate)));
    out.push_str(&format!("- beta_hat: {}\n", fmt_vec(&est.beta_hat)));
    if let Some(truth) = &record.truth {
        out.push_str(&format!("- beta    : {}\n", fmt_vec(truth)));
    }
    if let Some(err) = record.l2_error {
        out.push_str(&format!("- L2 error: {err:.6}\n"));
    }

    out
}

/// Format a trials summary.
pub fn format_trials_summary(summary: &TrialSummary, n: usize, d: usize, rho: f64) -> String {
    let mut out = String::new();
    out.push_str("=== dplr - trials ===\n");
    out.push_str(&format!(
        "Design: n={n} | d={d} | rho={rho} | trials={} | failures={}\n",
        summary.trials, summary.failures
    ));
    out.push_str(&format!(
        "L2 error: mean={:.6} | median={:.6} | p90={:.6}\n",
        summary.mean_error, summary.median_error, summary.p90_error
    ));
    out
}

fn describe_covariance(model: &CovarianceModel) -> String {
    match model {
        CovarianceModel::Identity => "identity (assumed)".to_string(),
        CovarianceModel::Estimated {
            share,
            upper_bound,
            iterations,
        } => format!("estimated (share={share}, upper_bound={upper_bound}, iterations={iterations})"),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
