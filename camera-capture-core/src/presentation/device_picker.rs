use crate::models::device::{CaptureDevice, DeviceList, SelectionIndex};
use crate::models::state::SessionSnapshot;

/// UI-side state for the "pick a camera, press start" screen.
///
/// Holds only what the user did (which row, whether start was pressed).
/// Whether the session is actually running is read from a
/// [`SessionSnapshot`], never stored here.
#[derive(Debug, Clone)]
pub struct DevicePicker {
    devices: DeviceList,
    selected: Option<usize>,
    start_requested: bool,
}

impl DevicePicker {
    pub fn new(devices: DeviceList) -> Self {
        Self {
            devices,
            selected: None,
            start_requested: false,
        }
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Row labels in enumeration order.
    pub fn labels(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.name.as_str()).collect()
    }

    /// Highlight row `index`. Returns `false` and keeps the old selection
    /// if there is no such row.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.devices.len() {
            return false;
        }
        self.selected = Some(index);
        true
    }

    pub fn has_selection(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected_device(&self) -> Option<&CaptureDevice> {
        self.selected.and_then(|i| self.devices.get(i))
    }

    pub fn is_start_requested(&self) -> bool {
        self.start_requested
    }

    /// The start button was pressed. Returns the selection to hand to the
    /// controller, or `None` if no row is highlighted.
    pub fn request_start(&mut self) -> Option<SelectionIndex> {
        let index = self.selected?;
        self.start_requested = true;
        Some(self.devices.select(index))
    }

    /// Forget a start request, e.g. after the controller reported an error.
    pub fn clear_start_request(&mut self) {
        self.start_requested = false;
    }

    /// Whether the start button should be enabled.
    pub fn can_start(&self, session: &SessionSnapshot) -> bool {
        self.has_selection() && !self.start_requested && session.state.is_idle()
    }

    /// Whether to swap the picker for the live preview. A session whose
    /// stream died goes back to the picker.
    pub fn shows_preview(&self, session: &SessionSnapshot) -> bool {
        session.state.is_delivering()
    }
}
