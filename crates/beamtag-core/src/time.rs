/// Wall-clock seconds since the Unix epoch as a float.
///
/// Event timestamps and the match clock share this representation.
pub fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
