// src/types.rs

/// Serial endpoint resolved once at startup by matching the Wio Terminal's
/// vendor/product identifier pair. Not re-resolved on disconnect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRef {
    pub port_name: String,
}

/// One bounded recording session: the accepted records' float fields, in
/// arrival order, with the device timestamps already stripped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Capture {
    pub rows: Vec<Vec<f64>>,
}

impl Capture {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
