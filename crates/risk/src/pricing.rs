//! Black-Scholes delta.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    #[must_use]
    pub const fn from_is_call(is_call: bool) -> Self {
        if is_call {
            Self::Call
        } else {
            Self::Put
        }
    }
}

/// Per-unit delta of a European option.
///
/// Calls return `N(d1)` in `[0, 1]`, puts `N(d1) - 1` in `[-1, 0]`. When
/// time or volatility is not positive the option is priced at expiry and the
/// delta collapses to its intrinsic value.
#[must_use]
pub fn delta(
    spot: f64,
    strike: f64,
    time_years: f64,
    volatility: f64,
    rate: f64,
    kind: OptionKind,
) -> f64 {
    if time_years <= 0.0 || volatility <= 0.0 || strike <= 0.0 || spot <= 0.0 {
        return match kind {
            OptionKind::Call if spot > strike => 1.0,
            OptionKind::Put if spot < strike => -1.0,
            _ => 0.0,
        };
    }

    let d1 = ((spot / strike).ln() + (rate + volatility * volatility / 2.0) * time_years)
        / (volatility * time_years.sqrt());

    match kind {
        OptionKind::Call => normal_cdf(d1),
        OptionKind::Put => normal_cdf(d1) - 1.0,
    }
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTE: f64 = 1.0 / 365.0 / 6.0;

    #[test]
    fn normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(1.5) + normal_cdf(-1.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn at_the_money_call_is_about_half() {
        let d = delta(2000.0, 2000.0, TTE, 0.6, 0.04, OptionKind::Call);
        assert!((d - 0.5).abs() < 0.01, "delta was {d}");
    }

    #[test]
    fn put_call_parity_of_deltas() {
        for strike in [1500.0, 1950.0, 2000.0, 2100.0] {
            let call = delta(2000.0, strike, TTE, 0.8, 0.04, OptionKind::Call);
            let put = delta(2000.0, strike, TTE, 0.8, 0.04, OptionKind::Put);
            assert!((call - put - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn deep_moneyness_saturates() {
        let itm_call = delta(3000.0, 2000.0, TTE, 0.5, 0.04, OptionKind::Call);
        let otm_put = delta(3000.0, 2000.0, TTE, 0.5, 0.04, OptionKind::Put);
        assert!(itm_call > 0.999);
        assert!(otm_put > -0.001 && otm_put <= 0.0);
    }

    #[test]
    fn expired_or_zero_vol_is_intrinsic() {
        assert_eq!(delta(2100.0, 2000.0, 0.0, 0.5, 0.04, OptionKind::Call), 1.0);
        assert_eq!(delta(1900.0, 2000.0, 0.0, 0.5, 0.04, OptionKind::Call), 0.0);
        assert_eq!(delta(1900.0, 2000.0, TTE, 0.0, 0.04, OptionKind::Put), -1.0);
        assert_eq!(delta(2100.0, 2000.0, TTE, 0.0, 0.04, OptionKind::Put), 0.0);
    }
}
