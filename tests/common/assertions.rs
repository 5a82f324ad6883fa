//! Shared assertions and waiting helpers.

use std::time::Duration;

use ps1tex::services::SessionSnapshot;
use retro_raster::Color;
use tokio::sync::watch;

/// Upper bound for anything a test waits on.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Assert every channel of `actual` is within `tolerance` of `expected`.
pub fn assert_color_close(actual: Color, expected: Color, tolerance: u8) {
    let close = |a: u8, b: u8| a.abs_diff(b) <= tolerance;
    assert!(
        close(actual.r, expected.r)
            && close(actual.g, expected.g)
            && close(actual.b, expected.b)
            && close(actual.a, expected.a),
        "expected {actual} within {tolerance} of {expected}"
    );
}

/// Wait until a published snapshot satisfies `predicate`.
pub async fn wait_for_snapshot(
    rx: &mut watch::Receiver<SessionSnapshot>,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(TIMEOUT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("coordinator dropped")
        .clone()
}
