//! HLL-lite: a HyperLogLog-style cardinality estimator tuned for the small
//! per-column payloads the column profiler streams.

/// Default register precision. `register_count = 2^precision`.
pub const DEFAULT_PRECISION: u32 = 10;

#[derive(Debug, Clone)]
pub struct HyperLogLogLite {
    precision: u32,
    register_count: usize,
    registers: Vec<u8>,
}

impl HyperLogLogLite {
    #[must_use]
    pub fn new(precision: u32) -> Self {
        let precision = precision.clamp(4, 16);
        let register_count = 1usize << precision;
        Self {
            precision,
            register_count,
            registers: vec![0u8; register_count],
        }
    }

    /// Hashes `value` with blake3 (truncated to 8 bytes, matching the
    /// original's blake2b-8 digest), and bumps the indexed register to the
    /// observed leading-zero run if it grew.
    pub fn add(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        let digest = blake3::hash(value.as_bytes());
        let bytes: [u8; 8] = digest.as_bytes()[..8].try_into().unwrap();
        let hashed = u64::from_be_bytes(bytes);

        let index = (hashed & (self.register_count as u64 - 1)) as usize;
        let w = hashed >> self.precision;
        let bits = 64 - self.precision;
        let leading = rho(w, bits);
        if leading > self.registers[index] {
            self.registers[index] = leading;
        }
    }

    /// `alpha * m^2 / sum(2^-R_j)`, with a small-range linear-counting
    /// correction applied when at least one register is empty and the raw
    /// estimate is below `2.5m`.
    #[must_use]
    pub fn estimate(&self) -> u64 {
        let m = self.register_count as f64;
        let alpha = 0.7213 / (1.0 + 1.079 / m);
        let indicator: f64 = self.registers.iter().map(|&r| 2f64.powi(-(r as i32))).sum();
        if indicator == 0.0 {
            return 0;
        }
        let raw = alpha * m * m / indicator;
        let zero_registers = self.registers.iter().filter(|&&r| r == 0).count();
        if zero_registers > 0 && raw < 2.5 * m {
            return (m * (m / zero_registers as f64).ln()) as u64;
        }
        raw as u64
    }
}

impl Default for HyperLogLogLite {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

/// Position (1-indexed) of the leading one bit in the low `bits` bits of
/// `value`, or `bits + 1` if `value` is all zero in that range.
fn rho(value: u64, bits: u32) -> u8 {
    if value == 0 {
        return (bits + 1) as u8;
    }
    let mut leading = 1u32;
    while leading <= bits && (value >> (bits - leading)) & 1 == 0 {
        leading += 1;
    }
    leading as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_zero_for_empty_counter() {
        assert_eq!(HyperLogLogLite::default().estimate(), 0);
    }

    #[test]
    fn estimate_is_monotonically_non_decreasing() {
        let mut hll = HyperLogLogLite::default();
        let mut last = 0u64;
        for i in 0..5000 {
            hll.add(&format!("value-{i}"));
            let estimate = hll.estimate();
            assert!(estimate >= last, "estimate decreased: {last} -> {estimate}");
            last = estimate;
        }
    }

    #[test]
    fn estimate_is_within_reasonable_error_for_known_cardinality() {
        let mut hll = HyperLogLogLite::default();
        for i in 0..10_000 {
            hll.add(&format!("distinct-{i}"));
        }
        let estimate = hll.estimate() as f64;
        let error = (estimate - 10_000.0).abs() / 10_000.0;
        assert!(error < 0.1, "relative error too high: {error}");
    }

    #[test]
    fn repeated_values_do_not_inflate_the_estimate() {
        let mut hll = HyperLogLogLite::default();
        for _ in 0..1000 {
            hll.add("same-value");
        }
        assert!(hll.estimate() <= 2);
    }
}
