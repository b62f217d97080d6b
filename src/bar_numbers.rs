//! Bar-number changes, taken from the cursor boxes.

use crate::model::{BarNumberEvent, CursorBox};

/// One event per change of bar number along the cursor boxes.
pub fn bar_number_events(boxes: &[CursorBox]) -> Vec<BarNumberEvent> {
    let mut current = None;
    let mut events = Vec::new();
    for b in boxes {
        if current != Some(b.bar_number) {
            current = Some(b.bar_number);
            events.push(BarNumberEvent {
                time: b.start_time,
                bar_number: b.bar_number,
            });
        }
    }
    events
}
