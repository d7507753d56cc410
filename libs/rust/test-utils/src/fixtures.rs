//! Fixed test data.

/// Access-credential secret used by deterministic tests.
pub const ACCESS_SECRET: &str = "fixture-access-secret-0123456789abcdef";

/// Refresh-credential secret used by deterministic tests.
pub const REFRESH_SECRET: &str = "fixture-refresh-secret-fedcba9876543210";

/// PBKDF2 iteration count small enough for fast tests.
pub const FAST_HASH_ITERATIONS: u32 = 1_000;

/// A fixed instant (2024-01-01T00:00:00Z) for clock-driven tests.
pub const EPOCH_2024: i64 = 1_704_067_200;

/// Sample subjects.
pub const SUBJECTS: [&str; 3] = [
    "user-1",
    "7f9c2ba4-e88f-4b2e-9e6a-0c1d2e3f4a5b",
    "c0ffee00c0ffee00c0ffee00c0ffee00",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_secrets_are_usable() {
        assert!(ACCESS_SECRET.len() >= 32);
        assert!(REFRESH_SECRET.len() >= 32);
        assert_ne!(ACCESS_SECRET, REFRESH_SECRET);
    }
}
