use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode, Signed};
use rand::Rng;

/// Lower (inclusive) and upper (exclusive) bounds of the GDP multiplier.
pub const MULTIPLIER_MIN: i64 = 1000;
pub const MULTIPLIER_MAX: i64 = 2000;

/// Decimal places the multiplier is drawn with.
const MULTIPLIER_SCALE: i64 = 6;

/// Supplies the per-call multiplier in `[MULTIPLIER_MIN, MULTIPLIER_MAX)`.
pub trait MultiplierSource: Send + Sync {
    fn next_multiplier(&self) -> BigDecimal;
}

/// Uniform draw from the thread RNG, a fresh value on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMultiplier;

impl MultiplierSource for RandomMultiplier {
    fn next_multiplier(&self) -> BigDecimal {
        let unit = 10i64.pow(MULTIPLIER_SCALE as u32);
        let raw = rand::thread_rng().gen_range(MULTIPLIER_MIN * unit..MULTIPLIER_MAX * unit);
        BigDecimal::new(BigInt::from(raw), MULTIPLIER_SCALE)
    }
}

/// Always returns the same multiplier.
#[derive(Debug, Clone)]
pub struct FixedMultiplier(pub BigDecimal);

impl MultiplierSource for FixedMultiplier {
    fn next_multiplier(&self) -> BigDecimal {
        self.0.clone()
    }
}

/// `population * multiplier / rate`, truncated to cents so the estimate
/// never reaches `population * MULTIPLIER_MAX / rate`.
///
/// `None` when there is no usable rate (absent, zero or negative).
pub fn estimate_gdp(
    population: i64,
    exchange_rate: Option<&BigDecimal>,
    multiplier: &dyn MultiplierSource,
) -> Option<BigDecimal> {
    let rate = exchange_rate?;
    if !rate.is_positive() {
        return None;
    }
    let gdp = BigDecimal::from(population) * multiplier.next_multiplier() / rate;
    Some(gdp.with_scale_round(2, RoundingMode::Down))
}
