/// Open/closed state of the two-pane layout (members on the left, candidates
/// on the right). Everything else the layout shows is derived from `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelState {
    open: bool,
}

impl PanelState {
    pub fn is_open(self) -> bool {
        self.open
    }

    /// The "add people" toggle is hidden while the candidate pane is open so it
    /// cannot be triggered twice.
    pub fn toggle_visible(self) -> bool {
        !self.open
    }

    /// Body-level flag the responsive layout keys off.
    pub fn responsive_layout_flag(self) -> bool {
        self.open
    }

    /// Returns `false` when the panel was already open.
    pub fn open(&mut self) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        true
    }

    /// Returns `false` when the panel was already closed.
    pub fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        true
    }
}
