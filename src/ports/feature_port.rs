//! Feature provider port: turns raw bars into signal-carrying bars.

use crate::domain::bar::Bar;
use crate::domain::signal::EnrichedBar;

/// Pure per-instrument transform from raw bars to enriched bars.
///
/// Row `i` of the output corresponds to raw bar `i`, with `next_open` taken
/// from raw bar `i + 1`. The final raw bar has no following open and is
/// dropped, so `enrich(bars).len() == bars.len().saturating_sub(1)`.
///
/// `Send + Sync` so one provider can serve parallel Monte Carlo trials.
pub trait FeatureProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Column names of `EnrichedBar::features`, in order.
    fn feature_names(&self) -> Vec<String>;

    fn enrich(&self, bars: &[Bar]) -> Vec<EnrichedBar>;
}
