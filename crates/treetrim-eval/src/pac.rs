#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PacError {
    #[error("error rate {0} must lie strictly between 0 and 1")]
    ErrorRate(f64),
    #[error("confidence {0} must lie strictly between 0 and 1")]
    Confidence(f64),
    #[error("{n} samples are too few for error rate {epsilon} at confidence {delta}")]
    TooFewSamples { n: u64, epsilon: f64, delta: f64 },
}

/// The largest `h` with `P[Binomial(n, epsilon) <= h] <= delta`.
///
/// Terms are accumulated in log space so large `n` does not underflow.
pub fn compute_k(n: u64, epsilon: f64, delta: f64) -> Result<u64, PacError> {
    if !is_probability(epsilon) {
        return Err(PacError::ErrorRate(epsilon));
    }
    if !is_probability(delta) {
        return Err(PacError::Confidence(delta));
    }

    let odds = epsilon.ln() - (1.0 - epsilon).ln();
    let mut log_term = 0.0;
    let mut cumulative = 0.0;

    for h in 0..=n {
        log_term = if h == 0 {
            n as f64 * (1.0 - epsilon).ln()
        } else {
            log_term + ((n - h + 1) as f64).ln() - (h as f64).ln() + odds
        };
        cumulative += log_term.exp();

        if cumulative > delta {
            return match h.checked_sub(1) {
                Some(k) => Ok(k),
                None => Err(PacError::TooFewSamples { n, epsilon, delta }),
            };
        }
    }
    Ok(n)
}

fn is_probability(value: f64) -> bool {
    value > 0.0 && value < 1.0
}
