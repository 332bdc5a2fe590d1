//! Element patch events understood by the Datastar browser runtime.

use bytes::Bytes;

use crate::SseFrame;

/// Event kind for element patches.
pub const PATCH_ELEMENTS: &str = "datastar-patch-elements";

/// Patches a fragment in place; the client matches it by element id.
pub fn patch_elements(fragment: &str) -> Bytes {
    SseFrame::event(PATCH_ELEMENTS)
        .prefixed_data("elements", fragment)
        .encode()
}

/// Inserts a fragment as the first child of the element matched by `selector`.
pub fn prepend_elements(fragment: &str, selector: &str) -> Bytes {
    SseFrame::event(PATCH_ELEMENTS)
        .prefixed_data("selector", selector)
        .prefixed_data("mode", "prepend")
        .prefixed_data("elements", fragment)
        .encode()
}
