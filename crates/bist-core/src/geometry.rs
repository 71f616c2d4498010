//! Port geometry: address width and 32-bit-lane data width.

use thiserror::Error;

/// Width in bits of one data lane. The host pattern register is one lane
/// wide and is replicated across the port data width.
pub const LANE_BITS: u32 = 32;

/// Maximum number of 32-bit data lanes a port may carry.
///
/// Bounded by the capture-register window exposed to the host: a mismatching
/// word is presented across at most this many 32-bit status fields.
pub const MAX_DATA_LANES: usize = 18;

/// Validation failures for port geometry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum GeometryError {
    /// Address width is zero or wider than the 32-bit address registers.
    #[error("address width must be 1..=32 bits, got {0}")]
    AddressBits(u32),
    /// Data width is zero lanes or wider than the capture window.
    #[error("data width must be 1..={max} lanes of 32 bits, got {0}", max = MAX_DATA_LANES)]
    DataLanes(usize),
}

/// Static shape of a memory port: address width and data width.
///
/// Addresses are word addresses carried in fixed-width unsigned fields;
/// all address arithmetic wraps at the `address_bits` boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PortGeometry {
    address_bits: u32,
    data_lanes: usize,
}

impl PortGeometry {
    /// Creates a validated port geometry.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] when the address width is not `1..=32`
    /// bits or the data width is not `1..=18` lanes.
    pub const fn new(address_bits: u32, data_lanes: usize) -> Result<Self, GeometryError> {
        if address_bits == 0 || address_bits > 32 {
            return Err(GeometryError::AddressBits(address_bits));
        }
        if data_lanes == 0 || data_lanes > MAX_DATA_LANES {
            return Err(GeometryError::DataLanes(data_lanes));
        }
        Ok(Self {
            address_bits,
            data_lanes,
        })
    }

    /// Address width in bits.
    #[must_use]
    pub const fn address_bits(self) -> u32 {
        self.address_bits
    }

    /// Data width in 32-bit lanes.
    #[must_use]
    pub const fn data_lanes(self) -> usize {
        self.data_lanes
    }

    /// Data width in bits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn data_bits(self) -> u32 {
        self.data_lanes as u32 * LANE_BITS
    }

    /// Mask selecting the valid address bits.
    #[must_use]
    pub const fn address_mask(self) -> u32 {
        if self.address_bits == 32 {
            u32::MAX
        } else {
            (1 << self.address_bits) - 1
        }
    }

    /// Largest representable address (all address bits set).
    #[must_use]
    pub const fn max_address(self) -> u32 {
        self.address_mask()
    }

    /// Wrapping addition masked to the address width.
    #[must_use]
    pub const fn wrap_add(self, address: u32, offset: u32) -> u32 {
        address.wrapping_add(offset) & self.address_mask()
    }

    /// Wrapping subtraction masked to the address width.
    #[must_use]
    pub const fn wrap_sub(self, address: u32, offset: u32) -> u32 {
        address.wrapping_sub(offset) & self.address_mask()
    }
}

impl Default for PortGeometry {
    fn default() -> Self {
        Self {
            address_bits: 32,
            data_lanes: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryError, PortGeometry, MAX_DATA_LANES};

    #[test]
    fn rejects_out_of_range_widths() {
        assert_eq!(
            PortGeometry::new(0, 1),
            Err(GeometryError::AddressBits(0))
        );
        assert_eq!(
            PortGeometry::new(33, 1),
            Err(GeometryError::AddressBits(33))
        );
        assert_eq!(PortGeometry::new(24, 0), Err(GeometryError::DataLanes(0)));
        assert_eq!(
            PortGeometry::new(24, MAX_DATA_LANES + 1),
            Err(GeometryError::DataLanes(MAX_DATA_LANES + 1))
        );
    }

    #[test]
    fn validation_errors_render_both_bounds() {
        assert_eq!(
            GeometryError::AddressBits(33).to_string(),
            "address width must be 1..=32 bits, got 33"
        );
        assert_eq!(
            GeometryError::DataLanes(19).to_string(),
            "data width must be 1..=18 lanes of 32 bits, got 19"
        );
    }

    #[test]
    fn mask_covers_exactly_the_address_width() {
        let narrow = PortGeometry::new(8, 1).expect("valid geometry");
        assert_eq!(narrow.address_mask(), 0xFF);
        assert_eq!(narrow.max_address(), 0xFF);

        let full = PortGeometry::new(32, 1).expect("valid geometry");
        assert_eq!(full.address_mask(), u32::MAX);
    }

    #[test]
    fn wrapping_arithmetic_stays_in_range() {
        let geom = PortGeometry::new(8, 1).expect("valid geometry");
        assert_eq!(geom.wrap_add(0xFF, 1), 0x00);
        assert_eq!(geom.wrap_add(0xF0, 0x20), 0x10);
        assert_eq!(geom.wrap_sub(0x00, 1), 0xFF);
    }

    #[test]
    fn data_width_reports_lane_multiple() {
        let geom = PortGeometry::new(24, 4).expect("valid geometry");
        assert_eq!(geom.data_bits(), 128);
        assert_eq!(geom.data_lanes(), 4);
    }
}
