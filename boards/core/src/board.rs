//! Static board descriptions and device matching criteria.

/// Static information about a board type for detection and CLI
#[derive(Debug, Clone, Copy)]
pub struct BoardInfo {
    pub name: &'static str,
    pub cli_name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
}

impl BoardInfo {
    /// Matching criteria selecting exactly this board type
    pub fn criteria(&self) -> DeviceCriteria {
        DeviceCriteria {
            vendor_id: Some(self.vendor_id),
            product_id: Some(self.product_id),
            usage_page: Some(self.usage_page),
            usage: Some(self.usage),
            path: None,
        }
    }
}

/// Criteria for selecting HID devices. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCriteria {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub usage_page: Option<u16>,
    pub usage: Option<u16>,
    /// Platform device path (on macOS this carries the registry id)
    pub path: Option<String>,
}

impl DeviceCriteria {
    /// Check a device's identifying fields against the criteria
    pub fn matches(
        &self,
        vendor_id: u16,
        product_id: u16,
        usage_page: u16,
        usage: u16,
        path: &str,
    ) -> bool {
        self.vendor_id.is_none_or(|v| v == vendor_id)
            && self.product_id.is_none_or(|p| p == product_id)
            && self.usage_page.is_none_or(|up| up == usage_page)
            && self.usage.is_none_or(|u| u == usage)
            && self.path.as_deref().is_none_or(|p| p == path)
    }
}
