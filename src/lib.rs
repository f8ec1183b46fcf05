//! # TCS34725 RGB Color Light-to-Digital Converter Driver
//!
//! This is a platform-agnostic Rust driver for the TCS34725 RGB color sensor with IR filter,
//! built using the [`embedded-hal`] traits for I2C communication.
//!
//! The TCS34725 provides:
//! - Red, Green, Blue and Clear photodiode channels (16-bit each)
//! - Programmable gain (1x, 4x, 16x, 60x)
//! - Programmable integration time (2.4ms to 614.4ms in 2.4ms steps)
//! - Clear channel interrupt with thresholds and a persistence filter
//! - I2C interface (address 0x29)
//!
//! ## Features
//!
//! - **Raw RGBC readings** that leave the power state as they found it
//! - **Lux and color temperature** using the ams DN40 algorithm, with saturation detection
//!   and IR rejection
//! - **sRGB approximation** as bytes or a packed `0xRRGGBB` value
//! - **Interrupt configuration**: thresholds, persistence cycles, clearing
//! - **Async/await support** with feature gating (optional)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tcs34725::Tcs34725;
//!
//! # fn main() {
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! # let delay = embedded_hal_mock::eh1::delay::NoopDelay::new();
//! // Checks the device ID and applies the default 2.4ms integration time
//! let mut sensor = Tcs34725::new(i2c, delay).unwrap();
//!
//! sensor.set_integration_time(153.6).unwrap();
//! sensor.set_gain(4).unwrap();
//!
//! let raw = sensor.read_raw().unwrap();
//! println!("R: {} G: {} B: {} C: {}", raw.red, raw.green, raw.blue, raw.clear);
//!
//! match sensor.read_photometric().unwrap() {
//!     tcs34725::Photometric::Valid { lux, color_temperature } => {
//!         println!("{:.2} lux, {:.0} K", lux, color_temperature);
//!     }
//!     tcs34725::Photometric::Saturated => println!("too bright, lower the gain"),
//! }
//! # }
//! ```
//!
//! ## Async Usage
//!
//! Enable the `async` feature to use async/await patterns:
//!
//! ```toml
//! [dependencies]
//! tcs34725 = { version = "0.1", features = ["async"] }
//! ```
//!
//! ```rust,ignore
//! # #[cfg(feature = "async")]
//! # async fn example() {
//! use tcs34725::Tcs34725;
//!
//! let i2c = /* your async I2C implementation */;
//! let delay = /* your async delay implementation */;
//! let mut sensor = Tcs34725::new_async(i2c, delay).await.unwrap();
//!
//! sensor.set_gain_async(16).await.unwrap();
//! let lux = sensor.read_lux_async().await.unwrap();
//! # }
//! ```
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![no_std]
#![deny(missing_docs)]

mod fmt; // <-- must be first module!

pub mod conversion;
pub mod ll;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c};

#[cfg(feature = "async")]
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c as AsyncI2c;

pub use conversion::{Gain, Photometric, Rgb8, RgbcData, CYCLES, GAINS};
use ll::DeviceInterface;
pub use ll::I2C_ADDRESS;

/// Integration time applied at construction
pub const DEFAULT_INTEGRATION_TIME_MS: f32 = 2.4;

/// Default number of waits for a completed integration before giving up
pub const DEFAULT_MAX_POLLS: u16 = 10;

/// Oscillator settle time between PON and AEN
const POWER_ON_SETTLE_MS: u32 = 3;

/// All possible errors in this crate
#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// The ID register did not match any known TCS34725 revision
    DeviceNotFound {
        /// ID register contents
        found: u8,
    },
    /// A configuration value was outside its valid domain
    OutOfRange(&'static str),
    /// The requested operation is not supported by the hardware
    InvalidOperation(&'static str),
    /// The sensor did not report a completed integration in time
    Timeout,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {e:?}"),
            Error::DeviceNotFound { found } => {
                write!(f, "no TCS34725 found (device ID {found:#04x}), check wiring")
            }
            Error::OutOfRange(msg) => write!(f, "value out of range: {msg}"),
            Error::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            Error::Timeout => write!(f, "timed out waiting for a valid RGBC sample"),
        }
    }
}

/// High-level TCS34725 driver
pub struct Tcs34725<I2C, D> {
    dev: DeviceInterface<I2C>,
    delay: D,
    // Device state tracking
    active: bool,
    cycles: u16,
    glass_attenuation: f32,
    max_polls: u16,
}

/// Wait between two polls of the valid bit: one integration plus 0.9ms
fn poll_interval_us(cycles: u16) -> u32 {
    u32::from(cycles) * 2400 + 900
}

fn integration_cycles<E>(ms: f32) -> Result<u16, Error<E>> {
    conversion::integration_cycles(ms).ok_or(Error::OutOfRange(
        "integration time must be between 2.4 and 614.4 ms",
    ))
}

fn gain_from_multiplier<E>(gain: u8) -> Result<Gain, Error<E>> {
    Gain::try_from(gain).map_err(|_| Error::OutOfRange("gain must be one of 1, 4, 16 or 60"))
}

fn persistence_index<E>(cycles: i8) -> Result<u8, Error<E>> {
    u8::try_from(cycles)
        .ok()
        .and_then(conversion::persistence_index)
        .ok_or(Error::OutOfRange(
            "cycles must be -1 or one of 0, 1, 2, 3, 5, 10, 15, ..., 60",
        ))
}

impl<I2C, D> Tcs34725<I2C, D>
where
    I2C: ErrorType,
{
    fn unchecked(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            dev: DeviceInterface::new(i2c, address),
            delay,
            active: false,
            cycles: 1,
            glass_attenuation: 1.0,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Whether the oscillator and RGBC ADC are enabled
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Integration time in milliseconds, always a multiple of 2.4
    pub fn integration_time(&self) -> f32 {
        f32::from(self.cycles) * conversion::CYCLE_MS
    }

    /// Glass attenuation factor used for lux
    pub fn glass_attenuation(&self) -> f32 {
        self.glass_attenuation
    }

    /// Set the glass attenuation factor (GA)
    ///
    /// GA is the inverse of the transmissivity of whatever covers the sensor: glass passing
    /// 50% of the light gives GA = 2. Without cover use 1. See ams DN40 for details.
    pub fn set_glass_attenuation(&mut self, value: f32) -> Result<(), Error<I2C::Error>> {
        if value.is_nan() || value < 1.0 {
            return Err(Error::OutOfRange("glass attenuation must be at least 1"));
        }
        self.glass_attenuation = value;
        Ok(())
    }

    /// Maximum number of waits for a completed integration in a raw read
    pub fn max_polls(&self) -> u16 {
        self.max_polls
    }

    /// Bound the wait for a completed integration
    ///
    /// Each wait lasts one integration time plus 0.9ms. A read that exhausts the
    /// budget fails with [`Error::Timeout`].
    pub fn set_max_polls(&mut self, max_polls: u16) {
        self.max_polls = max_polls;
    }

    /// 7-bit I2C address in use
    pub fn address(&self) -> u8 {
        self.dev.address
    }

    /// Destroy the driver and return the I2C interface
    pub fn destroy(self) -> I2C {
        self.dev.i2c
    }
}

impl<I2C, E, D> Tcs34725<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Create a driver at the default address and verify the device ID
    pub fn new(i2c: I2C, delay: D) -> Result<Self, Error<E>> {
        Self::new_with_address(i2c, delay, I2C_ADDRESS)
    }

    /// Create a driver at a custom address and verify the device ID
    ///
    /// The integration time is set to 2.4ms and the glass attenuation to 1.
    /// The sensor starts out inactive.
    pub fn new_with_address(i2c: I2C, delay: D, address: u8) -> Result<Self, Error<E>> {
        let mut sensor = Self::unchecked(i2c, delay, address);

        let id = sensor.get_device_id()?;
        if !ll::KNOWN_DEVICE_IDS.contains(&id) {
            error!("unexpected device ID {} at address {}", id, address);
            return Err(Error::DeviceNotFound { found: id });
        }
        info!("TCS34725 found, device ID {}", id);

        sensor.set_integration_time(DEFAULT_INTEGRATION_TIME_MS)?;
        Ok(sensor)
    }

    /// Read the device ID register
    pub fn get_device_id(&mut self) -> Result<u8, Error<E>> {
        self.dev.read_u8(ll::ID)
    }

    /// Power the sensor up or down
    ///
    /// Powering up sets PON, waits for the oscillator, then enables the ADC.
    /// Requesting the current state does nothing.
    pub fn set_active(&mut self, active: bool) -> Result<(), Error<E>> {
        if self.active == active {
            return Ok(());
        }
        let enable = self.dev.read_u8(ll::ENABLE)?;
        if active {
            self.dev.write_u8(ll::ENABLE, enable | ll::ENABLE_PON)?;
            self.delay.delay_ms(POWER_ON_SETTLE_MS);
            self.dev
                .write_u8(ll::ENABLE, enable | ll::ENABLE_PON | ll::ENABLE_AEN)?;
        } else {
            self.dev
                .write_u8(ll::ENABLE, enable & !(ll::ENABLE_PON | ll::ENABLE_AEN))?;
        }
        self.active = active;
        debug!("active: {}", active);
        Ok(())
    }

    /// Set the integration time in milliseconds (2.4 to 614.4)
    ///
    /// The time is rounded down to a multiple of 2.4ms.
    pub fn set_integration_time(&mut self, ms: f32) -> Result<(), Error<E>> {
        let cycles = integration_cycles(ms)?;
        self.dev
            .write_u8(ll::ATIME, conversion::atime_from_cycles(cycles))?;
        self.cycles = cycles;
        debug!("integration cycles: {}", cycles);
        Ok(())
    }

    /// Read the gain multiplier from the device
    pub fn gain(&mut self) -> Result<u8, Error<E>> {
        let control = self.dev.read_u8(ll::CONTROL)?;
        Ok(Gain::from_register(control).multiplier())
    }

    /// Set the gain multiplier, one of 1, 4, 16 or 60
    pub fn set_gain(&mut self, gain: u8) -> Result<(), Error<E>> {
        let gain = gain_from_multiplier(gain)?;
        self.dev.write_u8(ll::CONTROL, gain as u8)?;
        debug!("gain: {}", gain.multiplier());
        Ok(())
    }

    /// Check if an RGBC integration cycle has completed
    pub fn is_data_valid(&mut self) -> Result<bool, Error<E>> {
        let status = self.dev.read_u8(ll::STATUS)?;
        Ok((status & ll::STATUS_AVALID) != 0)
    }

    /// Read one completed RGBC sample
    ///
    /// The sensor is activated for the read if needed and returned to its previous
    /// state afterwards.
    pub fn read_raw(&mut self) -> Result<RgbcData, Error<E>> {
        let was_active = self.active;
        self.set_active(true)?;

        // Restore the power state on every path; a read error wins over a restore error
        let result = self.sample_channels();
        let restored = self.set_active(was_active);
        let data = result?;
        restored?;
        Ok(data)
    }

    fn sample_channels(&mut self) -> Result<RgbcData, Error<E>> {
        let mut polls = 0u16;
        while !self.is_data_valid()? {
            if polls >= self.max_polls {
                warn!("no valid RGBC sample after {} polls", polls);
                return Err(Error::Timeout);
            }
            polls += 1;
            self.delay.delay_us(poll_interval_us(self.cycles));
        }

        let data = RgbcData {
            red: self.dev.read_u16(ll::RDATA)?,
            green: self.dev.read_u16(ll::GDATA)?,
            blue: self.dev.read_u16(ll::BDATA)?,
            clear: self.dev.read_u16(ll::CDATA)?,
        };
        trace!(
            "rgbc: {} {} {} {}",
            data.red,
            data.green,
            data.blue,
            data.clear
        );
        Ok(data)
    }

    /// Read the color as gamma-corrected bytes
    pub fn read_rgb_bytes(&mut self) -> Result<Rgb8, Error<E>> {
        let raw = self.read_raw()?;
        Ok(conversion::rgb_bytes(&raw))
    }

    /// Read the color as a packed `0xRRGGBB` value
    pub fn read_color(&mut self) -> Result<u32, Error<E>> {
        Ok(self.read_rgb_bytes()?.packed())
    }

    /// Read a sample and compute lux and color temperature (DN40)
    pub fn read_photometric(&mut self) -> Result<Photometric, Error<E>> {
        let atime = self.dev.read_u8(ll::ATIME)?;
        let gain = self.gain()?;
        let raw = self.read_raw()?;
        let result = conversion::dn40(&raw, atime, gain, self.glass_attenuation);
        if !result.is_valid() {
            debug!("clear channel saturated: {}", raw.clear);
        }
        Ok(result)
    }

    /// Read illuminance in lux, `None` if the sample was saturated
    pub fn read_lux(&mut self) -> Result<Option<f32>, Error<E>> {
        Ok(self.read_photometric()?.lux())
    }

    /// Read correlated color temperature in Kelvin, `None` if the sample was saturated
    pub fn read_color_temperature(&mut self) -> Result<Option<f32>, Error<E>> {
        Ok(self.read_photometric()?.color_temperature())
    }

    /// Interrupt persistence cycles, or -1 when the interrupt is disabled
    pub fn cycles(&mut self) -> Result<i8, Error<E>> {
        let enable = self.dev.read_u8(ll::ENABLE)?;
        if enable & ll::ENABLE_AIEN == 0 {
            return Ok(-1);
        }
        let apers = self.dev.read_u8(ll::APERS)?;
        Ok(CYCLES[usize::from(apers & 0x0F)] as i8)
    }

    /// Set the interrupt persistence cycles
    ///
    /// -1 disables the interrupt. Any other value must be one of [`CYCLES`] and
    /// enables it.
    pub fn set_cycles(&mut self, cycles: i8) -> Result<(), Error<E>> {
        if cycles == -1 {
            let enable = self.dev.read_u8(ll::ENABLE)?;
            self.dev.write_u8(ll::ENABLE, enable & !ll::ENABLE_AIEN)?;
            debug!("interrupt disabled");
            return Ok(());
        }
        let index = persistence_index(cycles)?;
        let enable = self.dev.read_u8(ll::ENABLE)?;
        self.dev.write_u8(ll::ENABLE, enable | ll::ENABLE_AIEN)?;
        self.dev.write_u8(ll::APERS, index)?;
        debug!("interrupt enabled, persistence: {}", cycles);
        Ok(())
    }

    /// Whether the clear channel interrupt is asserted
    pub fn interrupt(&mut self) -> Result<bool, Error<E>> {
        let status = self.dev.read_u8(ll::STATUS)?;
        Ok((status & ll::STATUS_AINT) != 0)
    }

    /// Set the interrupt flag; only `false` (clearing) is supported
    pub fn set_interrupt(&mut self, value: bool) -> Result<(), Error<E>> {
        if value {
            return Err(Error::InvalidOperation(
                "the interrupt can only be cleared, not set",
            ));
        }
        self.dev.write_raw(&[ll::CLEAR_INTERRUPT])
    }

    /// Clear the interrupt latch
    pub fn clear_interrupt(&mut self) -> Result<(), Error<E>> {
        self.set_interrupt(false)
    }

    /// Low interrupt threshold (AILT)
    pub fn min_value(&mut self) -> Result<u16, Error<E>> {
        self.dev.read_u16(ll::AILT)
    }

    /// Set the low interrupt threshold (AILT)
    pub fn set_min_value(&mut self, value: u16) -> Result<(), Error<E>> {
        self.dev.write_u16(ll::AILT, value)
    }

    /// High interrupt threshold (AIHT)
    pub fn max_value(&mut self) -> Result<u16, Error<E>> {
        self.dev.read_u16(ll::AIHT)
    }

    /// Set the high interrupt threshold (AIHT)
    pub fn set_max_value(&mut self, value: u16) -> Result<(), Error<E>> {
        self.dev.write_u16(ll::AIHT, value)
    }
}

#[cfg(feature = "async")]
impl<I2C, E, D> Tcs34725<I2C, D>
where
    I2C: AsyncI2c<Error = E>,
    D: AsyncDelayNs,
{
    /// Create a driver at the default address and verify the device ID (async version)
    pub async fn new_async(i2c: I2C, delay: D) -> Result<Self, Error<E>> {
        Self::new_async_with_address(i2c, delay, I2C_ADDRESS).await
    }

    /// Create a driver at a custom address and verify the device ID (async version)
    pub async fn new_async_with_address(
        i2c: I2C,
        delay: D,
        address: u8,
    ) -> Result<Self, Error<E>> {
        let mut sensor = Self::unchecked(i2c, delay, address);

        let id = sensor.get_device_id_async().await?;
        if !ll::KNOWN_DEVICE_IDS.contains(&id) {
            error!("unexpected device ID {} at address {}", id, address);
            return Err(Error::DeviceNotFound { found: id });
        }
        info!("TCS34725 found, device ID {}", id);

        sensor
            .set_integration_time_async(DEFAULT_INTEGRATION_TIME_MS)
            .await?;
        Ok(sensor)
    }

    /// Read the device ID register (async version)
    pub async fn get_device_id_async(&mut self) -> Result<u8, Error<E>> {
        self.dev.read_u8_async(ll::ID).await
    }

    /// Power the sensor up or down (async version)
    pub async fn set_active_async(&mut self, active: bool) -> Result<(), Error<E>> {
        if self.active == active {
            return Ok(());
        }
        let enable = self.dev.read_u8_async(ll::ENABLE).await?;
        if active {
            self.dev
                .write_u8_async(ll::ENABLE, enable | ll::ENABLE_PON)
                .await?;
            self.delay.delay_ms(POWER_ON_SETTLE_MS).await;
            self.dev
                .write_u8_async(ll::ENABLE, enable | ll::ENABLE_PON | ll::ENABLE_AEN)
                .await?;
        } else {
            self.dev
                .write_u8_async(ll::ENABLE, enable & !(ll::ENABLE_PON | ll::ENABLE_AEN))
                .await?;
        }
        self.active = active;
        debug!("active: {}", active);
        Ok(())
    }

    /// Set the integration time in milliseconds (async version)
    pub async fn set_integration_time_async(&mut self, ms: f32) -> Result<(), Error<E>> {
        let cycles = integration_cycles(ms)?;
        self.dev
            .write_u8_async(ll::ATIME, conversion::atime_from_cycles(cycles))
            .await?;
        self.cycles = cycles;
        debug!("integration cycles: {}", cycles);
        Ok(())
    }

    /// Read the gain multiplier from the device (async version)
    pub async fn gain_async(&mut self) -> Result<u8, Error<E>> {
        let control = self.dev.read_u8_async(ll::CONTROL).await?;
        Ok(Gain::from_register(control).multiplier())
    }

    /// Set the gain multiplier (async version)
    pub async fn set_gain_async(&mut self, gain: u8) -> Result<(), Error<E>> {
        let gain = gain_from_multiplier(gain)?;
        self.dev.write_u8_async(ll::CONTROL, gain as u8).await?;
        debug!("gain: {}", gain.multiplier());
        Ok(())
    }

    /// Check if an RGBC integration cycle has completed (async version)
    pub async fn is_data_valid_async(&mut self) -> Result<bool, Error<E>> {
        let status = self.dev.read_u8_async(ll::STATUS).await?;
        Ok((status & ll::STATUS_AVALID) != 0)
    }

    /// Read one completed RGBC sample (async version)
    pub async fn read_raw_async(&mut self) -> Result<RgbcData, Error<E>> {
        let was_active = self.active;
        self.set_active_async(true).await?;

        let result = self.sample_channels_async().await;
        let restored = self.set_active_async(was_active).await;
        let data = result?;
        restored?;
        Ok(data)
    }

    async fn sample_channels_async(&mut self) -> Result<RgbcData, Error<E>> {
        let mut polls = 0u16;
        while !self.is_data_valid_async().await? {
            if polls >= self.max_polls {
                warn!("no valid RGBC sample after {} polls", polls);
                return Err(Error::Timeout);
            }
            polls += 1;
            self.delay.delay_us(poll_interval_us(self.cycles)).await;
        }

        Ok(RgbcData {
            red: self.dev.read_u16_async(ll::RDATA).await?,
            green: self.dev.read_u16_async(ll::GDATA).await?,
            blue: self.dev.read_u16_async(ll::BDATA).await?,
            clear: self.dev.read_u16_async(ll::CDATA).await?,
        })
    }

    /// Read the color as gamma-corrected bytes (async version)
    pub async fn read_rgb_bytes_async(&mut self) -> Result<Rgb8, Error<E>> {
        let raw = self.read_raw_async().await?;
        Ok(conversion::rgb_bytes(&raw))
    }

    /// Read the color as a packed `0xRRGGBB` value (async version)
    pub async fn read_color_async(&mut self) -> Result<u32, Error<E>> {
        Ok(self.read_rgb_bytes_async().await?.packed())
    }

    /// Read a sample and compute lux and color temperature (async version)
    pub async fn read_photometric_async(&mut self) -> Result<Photometric, Error<E>> {
        let atime = self.dev.read_u8_async(ll::ATIME).await?;
        let gain = self.gain_async().await?;
        let raw = self.read_raw_async().await?;
        let result = conversion::dn40(&raw, atime, gain, self.glass_attenuation);
        if !result.is_valid() {
            debug!("clear channel saturated: {}", raw.clear);
        }
        Ok(result)
    }

    /// Read illuminance in lux (async version)
    pub async fn read_lux_async(&mut self) -> Result<Option<f32>, Error<E>> {
        Ok(self.read_photometric_async().await?.lux())
    }

    /// Read correlated color temperature in Kelvin (async version)
    pub async fn read_color_temperature_async(&mut self) -> Result<Option<f32>, Error<E>> {
        Ok(self.read_photometric_async().await?.color_temperature())
    }

    /// Interrupt persistence cycles, or -1 when disabled (async version)
    pub async fn cycles_async(&mut self) -> Result<i8, Error<E>> {
        let enable = self.dev.read_u8_async(ll::ENABLE).await?;
        if enable & ll::ENABLE_AIEN == 0 {
            return Ok(-1);
        }
        let apers = self.dev.read_u8_async(ll::APERS).await?;
        Ok(CYCLES[usize::from(apers & 0x0F)] as i8)
    }

    /// Set the interrupt persistence cycles (async version)
    pub async fn set_cycles_async(&mut self, cycles: i8) -> Result<(), Error<E>> {
        if cycles == -1 {
            let enable = self.dev.read_u8_async(ll::ENABLE).await?;
            self.dev
                .write_u8_async(ll::ENABLE, enable & !ll::ENABLE_AIEN)
                .await?;
            debug!("interrupt disabled");
            return Ok(());
        }
        let index = persistence_index(cycles)?;
        let enable = self.dev.read_u8_async(ll::ENABLE).await?;
        self.dev
            .write_u8_async(ll::ENABLE, enable | ll::ENABLE_AIEN)
            .await?;
        self.dev.write_u8_async(ll::APERS, index).await?;
        debug!("interrupt enabled, persistence: {}", cycles);
        Ok(())
    }

    /// Whether the clear channel interrupt is asserted (async version)
    pub async fn interrupt_async(&mut self) -> Result<bool, Error<E>> {
        let status = self.dev.read_u8_async(ll::STATUS).await?;
        Ok((status & ll::STATUS_AINT) != 0)
    }

    /// Set the interrupt flag; only `false` is supported (async version)
    pub async fn set_interrupt_async(&mut self, value: bool) -> Result<(), Error<E>> {
        if value {
            return Err(Error::InvalidOperation(
                "the interrupt can only be cleared, not set",
            ));
        }
        self.dev.write_raw_async(&[ll::CLEAR_INTERRUPT]).await
    }

    /// Clear the interrupt latch (async version)
    pub async fn clear_interrupt_async(&mut self) -> Result<(), Error<E>> {
        self.set_interrupt_async(false).await
    }

    /// Low interrupt threshold (async version)
    pub async fn min_value_async(&mut self) -> Result<u16, Error<E>> {
        self.dev.read_u16_async(ll::AILT).await
    }

    /// Set the low interrupt threshold (async version)
    pub async fn set_min_value_async(&mut self, value: u16) -> Result<(), Error<E>> {
        self.dev.write_u16_async(ll::AILT, value).await
    }

    /// High interrupt threshold (async version)
    pub async fn max_value_async(&mut self) -> Result<u16, Error<E>> {
        self.dev.read_u16_async(ll::AIHT).await
    }

    /// Set the high interrupt threshold (async version)
    pub async fn set_max_value_async(&mut self, value: u16) -> Result<(), Error<E>> {
        self.dev.write_u16_async(ll::AIHT, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    extern crate std;
    use std::vec;
    use std::vec::Vec;

    const ADDR: u8 = I2C_ADDRESS;

    fn read_u8(register: u8, value: u8) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![register | 0x80], vec![value])
    }

    fn read_u16(register: u8, value: u16) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![register | 0x80], value.to_le_bytes().to_vec())
    }

    fn write_u8(register: u8, value: u8) -> I2cTransaction {
        I2cTransaction::write(ADDR, vec![register | 0x80, value])
    }

    /// Construction: ID check, then the default 2.4ms integration time
    fn with_init(rest: &[I2cTransaction]) -> Vec<I2cTransaction> {
        let mut expectations = vec![read_u8(0x12, 0x44), write_u8(0x01, 0xFF)];
        expectations.extend_from_slice(rest);
        expectations
    }

    fn power_up(enable: u8) -> [I2cTransaction; 3] {
        [
            read_u8(0x00, enable),
            write_u8(0x00, enable | 0x01),
            write_u8(0x00, enable | 0x03),
        ]
    }

    fn power_down(enable: u8) -> [I2cTransaction; 2] {
        [read_u8(0x00, enable), write_u8(0x00, enable & !0x03)]
    }

    fn channels(red: u16, green: u16, blue: u16, clear: u16) -> [I2cTransaction; 4] {
        [
            read_u16(0x16, red),
            read_u16(0x18, green),
            read_u16(0x1A, blue),
            read_u16(0x14, clear),
        ]
    }

    fn new_sensor(expectations: &[I2cTransaction]) -> Tcs34725<I2cMock, NoopDelay> {
        Tcs34725::new(I2cMock::new(expectations), NoopDelay::new()).unwrap()
    }

    #[test]
    fn test_device_creation() {
        let expectations = with_init(&[]);
        let sensor = new_sensor(&expectations);
        assert!(!sensor.is_active());
        assert!((sensor.integration_time() - 2.4).abs() < 1e-4);
        assert_eq!(sensor.glass_attenuation(), 1.0);
        assert_eq!(sensor.address(), I2C_ADDRESS);
        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_known_device_ids() {
        for id in [0x44, 0x10, 0x4D] {
            let expectations = [read_u8(0x12, id), write_u8(0x01, 0xFF)];
            let mut i2c = new_sensor(&expectations).destroy();
            i2c.done();
        }
    }

    #[test]
    fn test_unknown_device_id() {
        let expectations = [read_u8(0x12, 0x12)];
        let mut i2c = I2cMock::new(&expectations);

        let result = Tcs34725::new(i2c.clone(), NoopDelay::new());
        assert!(matches!(result, Err(Error::DeviceNotFound { found: 0x12 })));

        i2c.done();
    }

    #[test]
    fn test_custom_address() {
        let expectations = [
            I2cTransaction::write_read(0x30, vec![0x92], vec![0x4D]),
            I2cTransaction::write(0x30, vec![0x81, 0xFF]),
        ];
        let sensor =
            Tcs34725::new_with_address(I2cMock::new(&expectations), NoopDelay::new(), 0x30)
                .unwrap();
        assert_eq!(sensor.address(), 0x30);
        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_active_transitions() {
        let mut expectations = with_init(&power_up(0x10));
        expectations.extend(power_down(0x13));
        let mut sensor = new_sensor(&expectations);

        sensor.set_active(true).unwrap();
        assert!(sensor.is_active());
        // Same state again: no bus traffic
        sensor.set_active(true).unwrap();
        sensor.set_active(false).unwrap();
        assert!(!sensor.is_active());
        sensor.set_active(false).unwrap();

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_integration_time() {
        let expectations = with_init(&[
            write_u8(0x01, 215),
            write_u8(0x01, 56),
            write_u8(0x01, 0x00),
        ]);
        let mut sensor = new_sensor(&expectations);

        sensor.set_integration_time(100.0).unwrap();
        assert!((sensor.integration_time() - 41.0 * 2.4).abs() < 1e-3);
        sensor.set_integration_time(480.0).unwrap();
        assert!((sensor.integration_time() - 480.0).abs() < 1e-3);
        sensor.set_integration_time(614.4).unwrap();
        assert!((sensor.integration_time() - 614.4).abs() < 1e-3);

        for ms in [0.0, 2.3, 614.5, 1000.0, f32::NAN] {
            assert!(matches!(
                sensor.set_integration_time(ms),
                Err(Error::OutOfRange(_))
            ));
        }
        assert!((sensor.integration_time() - 614.4).abs() < 1e-3);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_gain() {
        let expectations = with_init(&[
            write_u8(0x0F, 0),
            write_u8(0x0F, 1),
            write_u8(0x0F, 2),
            write_u8(0x0F, 3),
            read_u8(0x0F, 0x02),
        ]);
        let mut sensor = new_sensor(&expectations);

        for gain in [1, 4, 16, 60] {
            sensor.set_gain(gain).unwrap();
        }
        for gain in [0, 2, 8, 59, 64, 255] {
            assert!(matches!(sensor.set_gain(gain), Err(Error::OutOfRange(_))));
        }
        assert_eq!(sensor.gain().unwrap(), 16);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_glass_attenuation() {
        let expectations = with_init(&[]);
        let mut sensor = new_sensor(&expectations);

        sensor.set_glass_attenuation(2.5).unwrap();
        assert_eq!(sensor.glass_attenuation(), 2.5);
        for value in [0.99, 0.0, -1.0, f32::NAN] {
            assert!(matches!(
                sensor.set_glass_attenuation(value),
                Err(Error::OutOfRange(_))
            ));
        }
        assert_eq!(sensor.glass_attenuation(), 2.5);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_read_raw_restores_inactive_state() {
        let mut expectations = with_init(&power_up(0x00));
        expectations.push(read_u8(0x13, 0x00));
        expectations.push(read_u8(0x13, 0x11));
        expectations.extend(channels(0x0102, 0x0304, 0x0506, 0x0708));
        expectations.extend(power_down(0x03));
        let mut sensor = new_sensor(&expectations);

        let raw = sensor.read_raw().unwrap();
        assert_eq!(
            raw,
            RgbcData {
                red: 0x0102,
                green: 0x0304,
                blue: 0x0506,
                clear: 0x0708,
            }
        );
        assert!(!sensor.is_active());

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_read_raw_keeps_active_state() {
        let mut expectations = with_init(&power_up(0x00));
        expectations.push(read_u8(0x13, 0x01));
        expectations.extend(channels(1, 2, 3, 4));
        let mut sensor = new_sensor(&expectations);

        sensor.set_active(true).unwrap();
        sensor.read_raw().unwrap();
        assert!(sensor.is_active());

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_read_raw_timeout() {
        let mut expectations = with_init(&power_up(0x00));
        expectations.extend([
            read_u8(0x13, 0x00),
            read_u8(0x13, 0x00),
            read_u8(0x13, 0x00),
        ]);
        expectations.extend(power_down(0x03));
        let mut sensor = new_sensor(&expectations);
        sensor.set_max_polls(2);

        assert!(matches!(sensor.read_raw(), Err(Error::Timeout)));
        assert!(!sensor.is_active());

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_read_raw_bus_error_restores_state() {
        let mut expectations = with_init(&power_up(0x00));
        expectations.push(read_u8(0x13, 0x01));
        expectations.push(
            I2cTransaction::write_read(ADDR, vec![0x96], vec![0, 0]).with_error(ErrorKind::Other),
        );
        expectations.extend(power_down(0x03));
        let mut sensor = new_sensor(&expectations);

        assert!(matches!(sensor.read_raw(), Err(Error::I2c(ErrorKind::Other))));
        assert!(!sensor.is_active());

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    fn photometric_read(atime: u8, control: u8, raw: [u16; 4]) -> Vec<I2cTransaction> {
        let mut expectations = vec![read_u8(0x01, atime), read_u8(0x0F, control)];
        expectations.extend(power_up(0x00));
        expectations.push(read_u8(0x13, 0x01));
        expectations.extend(channels(raw[0], raw[1], raw[2], raw[3]));
        expectations.extend(power_down(0x03));
        expectations
    }

    #[test]
    fn test_photometric_saturated_at_one_cycle() {
        let expectations = with_init(&photometric_read(0xFF, 0x01, [1000, 1200, 800, 3000]));
        let mut sensor = new_sensor(&expectations);

        assert_eq!(sensor.read_photometric().unwrap(), Photometric::Saturated);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_photometric_valid_at_200_cycles() {
        let sample = [1000, 1200, 800, 3000];
        let mut expectations = with_init(&photometric_read(56, 0x01, sample));
        expectations.extend(photometric_read(56, 0x01, sample));
        let mut sensor = new_sensor(&expectations);

        // G1 = 0.136 * 1000 + 1200 - 0.444 * 800, CPL = 480 * 4 / 310
        let lux = sensor.read_lux().unwrap().unwrap();
        assert!((lux - 158.358_33).abs() < 1e-3);
        let ct = sensor.read_color_temperature().unwrap().unwrap();
        assert!((ct - 4439.0).abs() < 1e-2);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_color() {
        let mut expectations = with_init(&power_up(0x00));
        expectations.push(read_u8(0x13, 0x01));
        expectations.extend(channels(1000, 500, 0, 2000));
        expectations.extend(power_down(0x03));
        let mut sensor = new_sensor(&expectations);

        assert_eq!(sensor.read_color().unwrap(), 0x2D_08_00);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_cycles_round_trip() {
        let mut rest = Vec::new();
        for (index, _) in CYCLES.iter().enumerate() {
            rest.push(read_u8(0x00, 0x03));
            rest.push(write_u8(0x00, 0x13));
            rest.push(write_u8(0x0C, index as u8));
            rest.push(read_u8(0x00, 0x13));
            rest.push(read_u8(0x0C, index as u8));
        }
        let expectations = with_init(&rest);
        let mut sensor = new_sensor(&expectations);

        for cycles in CYCLES {
            sensor.set_cycles(cycles as i8).unwrap();
            assert_eq!(sensor.cycles().unwrap(), cycles as i8);
        }

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_cycles_disabled() {
        let expectations = with_init(&[
            read_u8(0x00, 0x13),
            write_u8(0x00, 0x03),
            read_u8(0x00, 0x03),
        ]);
        let mut sensor = new_sensor(&expectations);

        sensor.set_cycles(-1).unwrap();
        assert_eq!(sensor.cycles().unwrap(), -1);
        for cycles in [-2, 4, 61, 127, i8::MIN] {
            assert!(matches!(sensor.set_cycles(cycles), Err(Error::OutOfRange(_))));
        }

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_interrupt() {
        let expectations = with_init(&[
            read_u8(0x13, 0x11),
            I2cTransaction::write(ADDR, vec![0xE6]),
            I2cTransaction::write(ADDR, vec![0xE6]),
            read_u8(0x13, 0x01),
        ]);
        let mut sensor = new_sensor(&expectations);

        assert!(sensor.interrupt().unwrap());
        assert!(matches!(
            sensor.set_interrupt(true),
            Err(Error::InvalidOperation(_))
        ));
        sensor.set_interrupt(false).unwrap();
        sensor.clear_interrupt().unwrap();
        assert!(!sensor.interrupt().unwrap());

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_thresholds() {
        let expectations = with_init(&[
            I2cTransaction::write(ADDR, vec![0x84, 0x34, 0x12]),
            I2cTransaction::write(ADDR, vec![0x86, 0xFF, 0xEE]),
            read_u16(0x04, 0x1234),
            read_u16(0x06, 0xEEFF),
        ]);
        let mut sensor = new_sensor(&expectations);

        sensor.set_min_value(0x1234).unwrap();
        sensor.set_max_value(0xEEFF).unwrap();
        assert_eq!(sensor.min_value().unwrap(), 0x1234);
        assert_eq!(sensor.max_value().unwrap(), 0xEEFF);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[test]
    fn test_poll_interval() {
        assert_eq!(poll_interval_us(1), 3300);
        assert_eq!(poll_interval_us(256), 615_300);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_read_raw_async() {
        let mut expectations = with_init(&power_up(0x00));
        expectations.push(read_u8(0x13, 0x00));
        expectations.push(read_u8(0x13, 0x01));
        expectations.extend(channels(10, 20, 30, 60));
        expectations.extend(power_down(0x03));
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Tcs34725::new_async(i2c, NoopDelay::new()).await.unwrap();

        let raw = sensor.read_raw_async().await.unwrap();
        assert_eq!(raw.clear, 60);
        assert!(!sensor.is_active());

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_cycles_async() {
        let expectations = with_init(&[
            read_u8(0x00, 0x00),
            write_u8(0x00, 0x10),
            write_u8(0x0C, 5),
            read_u8(0x00, 0x10),
            read_u8(0x0C, 5),
        ]);
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Tcs34725::new_async(i2c, NoopDelay::new()).await.unwrap();

        sensor.set_cycles_async(10).await.unwrap();
        assert_eq!(sensor.cycles_async().await.unwrap(), 10);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_read_raw_async_bus_error_restores_state() {
        let mut expectations = with_init(&power_up(0x00));
        expectations.push(read_u8(0x13, 0x01));
        expectations.push(read_u16(0x16, 10));
        expectations.push(
            I2cTransaction::write_read(ADDR, vec![0x98], vec![0, 0]).with_error(ErrorKind::Other),
        );
        expectations.extend(power_down(0x03));
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Tcs34725::new_async(i2c, NoopDelay::new()).await.unwrap();

        assert!(matches!(sensor.read_raw_async().await, Err(Error::I2c(ErrorKind::Other))));
        assert!(!sensor.is_active());

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_active_transitions_async() {
        let mut expectations = with_init(&power_up(0x10));
        expectations.extend(power_down(0x13));
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Tcs34725::new_async(i2c, NoopDelay::new()).await.unwrap();

        sensor.set_active_async(true).await.unwrap();
        assert!(sensor.is_active());
        sensor.set_active_async(true).await.unwrap();
        sensor.set_active_async(false).await.unwrap();
        assert!(!sensor.is_active());
        sensor.set_active_async(false).await.unwrap();

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_photometric_valid_at_200_cycles_async() {
        let sample = [1000, 1200, 800, 3000];
        let mut expectations = with_init(&photometric_read(56, 0x01, sample));
        expectations.extend(photometric_read(56, 0x01, sample));
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Tcs34725::new_async(i2c, NoopDelay::new()).await.unwrap();

        match sensor.read_photometric_async().await.unwrap() {
            Photometric::Valid {
                lux,
                color_temperature,
            } => {
                assert!((lux - 158.358_33).abs() < 1e-3);
                assert!((color_temperature - 4439.0).abs() < 1e-2);
            }
            Photometric::Saturated => panic!("sample should not saturate"),
        }
        let lux = sensor.read_lux_async().await.unwrap().unwrap();
        assert!((lux - 158.358_33).abs() < 1e-3);

        let mut i2c = sensor.destroy();
        i2c.done();
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_interrupt_async() {
        let expectations = with_init(&[
            read_u8(0x13, 0x11),
            I2cTransaction::write(ADDR, vec![0xE6]),
            I2cTransaction::write(ADDR, vec![0xE6]),
            read_u8(0x13, 0x01),
        ]);
        let i2c = I2cMock::new(&expectations);
        let mut sensor = Tcs34725::new_async(i2c, NoopDelay::new()).await.unwrap();

        assert!(sensor.interrupt_async().await.unwrap());
        assert!(matches!(
            sensor.set_interrupt_async(true).await,
            Err(Error::InvalidOperation(_))
        ));
        sensor.set_interrupt_async(false).await.unwrap();
        sensor.clear_interrupt_async().await.unwrap();
        assert!(!sensor.interrupt_async().await.unwrap());

        let mut i2c = sensor.destroy();
        i2c.done();
    }
}
