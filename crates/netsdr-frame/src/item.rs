//! Control-item registry.
//!
//! A closed mapping between 16-bit wire codes and the device
//! parameters this client addresses. Lookup of an unknown wire value
//! returns [`ControlItem::None`] rather than failing; the decode path
//! turns that into a soft error so unsupported firmware items can be
//! ignored.

/// A named device parameter addressable via a control-style frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlItem {
    /// Sentinel: no item / unrecognized item. Never transmitted.
    None,
    /// Receiver run/stop state and capture mode.
    ReceiverState,
    /// NCO center frequency per channel.
    ReceiverFrequency,
    /// RF front-end filter selection.
    RFFilter,
    /// A/D converter operating modes.
    ADModes,
    /// IQ output sample rate in Hz.
    IQOutputDataSampleRate,
}

/// Every registered item, in wire-code order.
pub const REGISTERED_ITEMS: [ControlItem; 5] = [
    ControlItem::ReceiverState,
    ControlItem::ReceiverFrequency,
    ControlItem::RFFilter,
    ControlItem::ADModes,
    ControlItem::IQOutputDataSampleRate,
];

impl ControlItem {
    /// Resolve a wire code to its item, `None` if unregistered.
    pub fn from_code(code: u16) -> ControlItem {
        match code {
            0x0018 => ControlItem::ReceiverState,
            0x0020 => ControlItem::ReceiverFrequency,
            0x0044 => ControlItem::RFFilter,
            0x008A => ControlItem::ADModes,
            0x00B8 => ControlItem::IQOutputDataSampleRate,
            _ => ControlItem::None,
        }
    }

    /// The 16-bit wire code. `None` maps to 0x0000, which is not a
    /// registered item and must never be put on the wire.
    pub fn code(self) -> u16 {
        match self {
            ControlItem::None => 0x0000,
            ControlItem::ReceiverState => 0x0018,
            ControlItem::ReceiverFrequency => 0x0020,
            ControlItem::RFFilter => 0x0044,
            ControlItem::ADModes => 0x008A,
            ControlItem::IQOutputDataSampleRate => 0x00B8,
        }
    }

    /// Human-readable item name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ControlItem::None => "None",
            ControlItem::ReceiverState => "ReceiverState",
            ControlItem::ReceiverFrequency => "ReceiverFrequency",
            ControlItem::RFFilter => "RFFilter",
            ControlItem::ADModes => "ADModes",
            ControlItem::IQOutputDataSampleRate => "IQOutputDataSampleRate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_roundtrip() {
        for item in REGISTERED_ITEMS {
            assert_eq!(ControlItem::from_code(item.code()), item);
        }
    }

    #[test]
    fn unknown_code_resolves_to_none() {
        assert_eq!(ControlItem::from_code(0x0000), ControlItem::None);
        assert_eq!(ControlItem::from_code(0x0019), ControlItem::None);
        assert_eq!(ControlItem::from_code(0xFFFF), ControlItem::None);
    }

    #[test]
    fn registry_is_closed() {
        let registered = REGISTERED_ITEMS
            .iter()
            .filter(|item| ControlItem::from_code(item.code()) == **item)
            .count();
        assert_eq!(registered, REGISTERED_ITEMS.len());
    }
}
