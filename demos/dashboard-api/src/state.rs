/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// Async handle to the floor tracker. Store queries run on the blocking
    /// pool internally; the current dashboard is read without blocking.
    pub tracker: floorwatch::AsyncFloorTracker,
}
