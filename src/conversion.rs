//! Conversion of raw RGBC counts into photometric quantities
//!
//! Lux and correlated color temperature follow the ams DN40 application note
//! (Lux and CCT Calculations using ams Color Sensors), including its analog
//! and ripple saturation checks and IR rejection. Everything here is pure and
//! independent of the bus.

/// Duration of one integration cycle in milliseconds
pub const CYCLE_MS: f32 = 2.4;

/// Shortest configurable integration time in milliseconds (1 cycle)
pub const MIN_INTEGRATION_TIME_MS: f32 = 2.4;

/// Longest configurable integration time in milliseconds (256 cycles)
pub const MAX_INTEGRATION_TIME_MS: f32 = 614.4;

/// Gain multipliers, indexed by their CONTROL register encoding
pub const GAINS: [u8; 4] = [1, 4, 16, 60];

/// Interrupt persistence filter values, indexed by their APERS register encoding
pub const CYCLES: [u8; 16] = [0, 1, 2, 3, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60];

// Device specific values (DN40 Table 1 in Appendix I)
const DEVICE_FACTOR: f32 = 310.0;
const R_COEF: f32 = 0.136;
const G_COEF: f32 = 1.0;
const B_COEF: f32 = -0.444;
const CT_COEF: f32 = 3810.0;
const CT_OFFSET: f32 = 1391.0;

/// Raw RGBC measurement data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct RgbcData {
    /// Red channel count
    pub red: u16,
    /// Green channel count
    pub green: u16,
    /// Blue channel count
    pub blue: u16,
    /// Clear (unfiltered) channel count
    pub clear: u16,
}

/// Gamma-corrected 8-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Rgb8 {
    /// Red component
    pub red: u8,
    /// Green component
    pub green: u8,
    /// Blue component
    pub blue: u8,
}

impl Rgb8 {
    /// Pack into a 24-bit `0xRRGGBB` value
    pub fn packed(&self) -> u32 {
        (u32::from(self.red) << 16) | (u32::from(self.green) << 8) | u32::from(self.blue)
    }
}

/// Result of the lux and color temperature computation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Photometric {
    /// The clear channel was not saturated
    Valid {
        /// Illuminance in lux
        lux: f32,
        /// Correlated color temperature in Kelvin
        color_temperature: f32,
    },
    /// The clear channel reached analog or ripple saturation; no reading can be derived
    Saturated,
}

impl Photometric {
    /// Illuminance in lux, `None` when saturated
    pub fn lux(&self) -> Option<f32> {
        match *self {
            Photometric::Valid { lux, .. } => Some(lux),
            Photometric::Saturated => None,
        }
    }

    /// Correlated color temperature in Kelvin, `None` when saturated
    pub fn color_temperature(&self) -> Option<f32> {
        match *self {
            Photometric::Valid {
                color_temperature, ..
            } => Some(color_temperature),
            Photometric::Saturated => None,
        }
    }

    /// True if the sample was usable
    pub fn is_valid(&self) -> bool {
        matches!(self, Photometric::Valid { .. })
    }
}

/// Analog gain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Gain {
    /// 1x gain
    X1 = 0b00,
    /// 4x gain
    X4 = 0b01,
    /// 16x gain
    X16 = 0b10,
    /// 60x gain
    X60 = 0b11,
}

impl Gain {
    /// Decode the low two bits of the CONTROL register
    pub fn from_register(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Gain::X1,
            0b01 => Gain::X4,
            0b10 => Gain::X16,
            _ => Gain::X60,
        }
    }

    /// Amplification factor
    pub fn multiplier(self) -> u8 {
        GAINS[self as usize]
    }
}

impl TryFrom<u8> for Gain {
    type Error = u8;

    /// Convert a multiplier (1, 4, 16 or 60), returning the rejected value otherwise
    fn try_from(multiplier: u8) -> Result<Self, Self::Error> {
        GAINS
            .iter()
            .position(|&g| g == multiplier)
            .map(|index| Gain::from_register(index as u8))
            .ok_or(multiplier)
    }
}

/// Number of integration cycles for an integration time, `None` if out of range
///
/// Times between multiples of 2.4 ms round down.
pub fn integration_cycles(ms: f32) -> Option<u16> {
    if !(MIN_INTEGRATION_TIME_MS..=MAX_INTEGRATION_TIME_MS).contains(&ms) {
        return None;
    }
    // Nudge so exact multiples of 2.4 are not floored one cycle short by f32 rounding
    let cycles = libm::floorf(ms / CYCLE_MS + 1e-4) as u16;
    Some(cycles.clamp(1, 256))
}

/// ATIME register value for a cycle count; the register counts down from 256
pub fn atime_from_cycles(cycles: u16) -> u8 {
    (256 - cycles.clamp(1, 256)) as u8
}

/// Cycle count encoded in an ATIME register value
pub fn cycles_from_atime(atime: u8) -> u16 {
    256 - u16::from(atime)
}

/// APERS register encoding of a persistence filter value
pub fn persistence_index(cycles: u8) -> Option<u8> {
    CYCLES.iter().position(|&c| c == cycles).map(|i| i as u8)
}

/// Approximate sRGB from a raw sample
///
/// Each channel is normalized against clear and gamma corrected with an
/// exponent of 2.5. A dark sample (`clear == 0`) is black.
pub fn rgb_bytes(raw: &RgbcData) -> Rgb8 {
    if raw.clear == 0 {
        return Rgb8::default();
    }
    let clear = f32::from(raw.clear);
    let channel = |value: u16| -> u8 {
        let normalized = libm::floorf(f32::from(value) / clear * 256.0) / 255.0;
        let corrected = libm::powf(normalized, 2.5) * 255.0;
        // Channels brighter than clear overshoot 255
        corrected.min(255.0) as u8
    };
    Rgb8 {
        red: channel(raw.red),
        green: channel(raw.green),
        blue: channel(raw.blue),
    }
}

/// Clear channel count at which a sample counts as saturated
///
/// Below 64 cycles the ADC saturates at 1024 counts per cycle, above it the
/// 16-bit register does. Integration times under 150 ms keep a 25% margin for
/// ripple saturation.
pub fn saturation(atime: u8) -> f32 {
    let cycles = cycles_from_atime(atime);
    let mut saturation = if cycles > 63 {
        65535.0
    } else {
        1024.0 * f32::from(cycles)
    };
    if f32::from(cycles) * CYCLE_MS < 150.0 {
        saturation -= saturation / 4.0;
    }
    saturation
}

/// Compute lux and color temperature with the DN40 algorithm
///
/// `atime` is the raw ATIME register value, `gain` the gain multiplier and
/// `glass_attenuation` the inverse transmissivity of any cover material.
pub fn dn40(raw: &RgbcData, atime: u8, gain: u8, glass_attenuation: f32) -> Photometric {
    let integration_ms = f32::from(cycles_from_atime(atime)) * CYCLE_MS;

    let c = f32::from(raw.clear);
    if c >= saturation(atime) {
        return Photometric::Saturated;
    }

    let r = f32::from(raw.red);
    let g = f32::from(raw.green);
    let b = f32::from(raw.blue);

    // IR rejection (DN40 3.1)
    let ir = if r + g + b > c {
        (r + g + b - c) / 2.0
    } else {
        0.0
    };
    let r2 = r - ir;
    let g2 = g - ir;
    let b2 = b - ir;

    // Lux (DN40 3.2)
    let g1 = R_COEF * r2 + G_COEF * g2 + B_COEF * b2;
    let mut cpl = (integration_ms * f32::from(gain)) / (glass_attenuation * DEVICE_FACTOR);
    if cpl == 0.0 {
        cpl = 0.001;
    }
    let lux = g1 / cpl;

    // CT (DN40 3.4)
    let r2 = if r2 == 0.0 { 0.001 } else { r2 };
    let color_temperature = CT_COEF * b2 / r2 + CT_OFFSET;

    Photometric::Valid {
        lux,
        color_temperature,
    }
}
