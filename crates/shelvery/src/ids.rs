use chrono::Utc;
use rand::Rng;

/// Generate a stable entity id: `<prefix>-<millis>-<4 random alphanumerics>`.
/// The random suffix keeps ids distinct when two entities are created within
/// the same millisecond.
pub(crate) fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();
    format!("{}-{}-{}", prefix, millis, suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_differ() {
        let a = generate_id("shelf");
        let b = generate_id("shelf");
        assert!(a.starts_with("shelf-"));
        assert_ne!(a, b);
    }
}
