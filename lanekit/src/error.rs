/// Configuration errors reported by `Virtualizer::new` and `set_options`.
///
/// Everything past construction degrades gracefully (ranges are clamped,
/// transient inconsistencies yield empty results); only an invalid
/// configuration is a hard error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("lane count must be at least 1")]
    ZeroLanes,
}
