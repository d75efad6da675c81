//! Time-series integration.
//!
//! Successive outer joins on date, then a per-column forward fill. Row order
//! comes from the frame's date index, so sorting is implicit.

use tracing::{info, warn};

use crate::series::frame::MacroFrame;

/// Merge all source frames into one gap-filled dataset.
///
/// The result has one row per distinct date across the inputs. Columns whose
/// source starts later than the merged index stay undefined on the leading
/// rows.
pub fn integrate(frames: &[MacroFrame]) -> MacroFrame {
    for (idx, frame) in frames.iter().enumerate() {
        if frame.is_empty() {
            warn!(
                input = idx,
                columns = ?frame.columns(),
                "Empty series before integration"
            );
        }
    }

    let mut merged = frames
        .iter()
        .fold(MacroFrame::default(), |acc, frame| acc.outer_join(frame));
    merged.forward_fill();

    info!(
        rows = merged.len(),
        columns = merged.columns().len(),
        "Integrated macro dataset"
    );
    merged
}
