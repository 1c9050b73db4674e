use rand::Rng;

/// Latest offset at which a full segment still fits in the recording.
pub fn max_start_ms(duration_ms: i64, segment_duration_ms: u32) -> i64 {
    (duration_ms - segment_duration_ms as i64).max(0)
}

/// Uniform start offset in `[0, max_start)`, or 0 when the segment does not
/// fit inside the recording.
pub fn choose_start_ms<R: Rng + ?Sized>(
    duration_ms: i64,
    segment_duration_ms: u32,
    rng: &mut R,
) -> i64 {
    let max_start = max_start_ms(duration_ms, segment_duration_ms);
    if max_start == 0 {
        return 0;
    }
    rng.random_range(0..max_start)
}
