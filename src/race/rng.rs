//! Injectable random streams for the lap simulator. SplitMix64 for throughput and good
//! statistical quality; deterministic (same seed, same sequence), not cryptographically secure.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// 2^-53, maps the top 53 bits of a u64 onto [0, 1).
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

/// Source of uniform draws in [0, 1). Anything that can produce them can drive a simulation,
/// which is how tests script exact outcomes.
pub trait RandomStream {
    fn next_unit(&mut self) -> f64;
}

impl<R: RandomStream + ?Sized> RandomStream for &mut R {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }
}

impl RandomStream for SplitMix64 {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * UNIT_SCALE
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedStream {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedStream {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "scripted stream needs at least one value");
        assert!(
            values.iter().all(|v| (0.0..1.0).contains(v)),
            "scripted stream values must lie in [0, 1)"
        );
        Self { values, cursor: 0 }
    }

    /// A stream that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomStream for ScriptedStream {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

/// Map a unit draw onto `0..bound`.
#[inline]
pub fn unit_to_index(unit: f64, bound: usize) -> usize {
    debug_assert!(bound > 0);
    ((unit * bound as f64) as usize).min(bound - 1)
}

/// Combine a base seed with a salt into a well-spread child seed.
#[inline]
pub fn mix_seed(base: u64, salt: u64) -> u64 {
    let mut rng = SplitMix64::new(base ^ salt.wrapping_mul(SPLITMIX64_M1));
    rng.next_u64()
}

/// FNV-1a over a string, used to salt seeds with a plan key.
pub fn hash_identifier(value: &str) -> u64 {
    value.bytes().fold(14695981039346656037u64, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(1099511628211)
    })
}

/// Independent stream for one Monte Carlo sample.
pub fn sample_stream(base_seed: u64, sample_index: usize) -> SplitMix64 {
    SplitMix64::new(mix_seed(base_seed, sample_index as u64))
}

/// Seed from OS entropy, for callers that did not pin one. Falls back to the clock.
pub fn entropy_seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(err) => {
            tracing::warn!("entropy source unavailable ({err}); seeding from clock");
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(SPLITMIX64_GOLDEN)
        }
    }
}
