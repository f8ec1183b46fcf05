//! Low-level register and interface definitions for TCS34725
//!
//! Every register access puts the command bit on the address byte. 16-bit
//! registers are little-endian, low byte at the lower address.

use embedded_hal::i2c::I2c;

use crate::Error;

/// Default I2C address of the TCS34725
pub const I2C_ADDRESS: u8 = 0x29;

/// Command bit, set on every register address byte
pub const COMMAND_BIT: u8 = 0x80;

/// Enable register (PON, AEN, WEN, AIEN)
pub const ENABLE: u8 = 0x00;
/// RGBC integration time register
pub const ATIME: u8 = 0x01;
/// Clear channel low interrupt threshold (16-bit)
pub const AILT: u8 = 0x04;
/// Clear channel high interrupt threshold (16-bit)
pub const AIHT: u8 = 0x06;
/// Interrupt persistence filter register
pub const APERS: u8 = 0x0C;
/// Control register (gain)
pub const CONTROL: u8 = 0x0F;
/// Device ID register
pub const ID: u8 = 0x12;
/// Status register
pub const STATUS: u8 = 0x13;
/// Clear channel data (16-bit)
pub const CDATA: u8 = 0x14;
/// Red channel data (16-bit)
pub const RDATA: u8 = 0x16;
/// Green channel data (16-bit)
pub const GDATA: u8 = 0x18;
/// Blue channel data (16-bit)
pub const BDATA: u8 = 0x1A;

/// Power ON
pub const ENABLE_PON: u8 = 0x01;
/// RGBC ADC enable
pub const ENABLE_AEN: u8 = 0x02;
/// RGBC interrupt enable
pub const ENABLE_AIEN: u8 = 0x10;

/// RGBC integration cycle completed
pub const STATUS_AVALID: u8 = 0x01;
/// RGBC clear channel interrupt
pub const STATUS_AINT: u8 = 0x10;

/// Special function command clearing the RGBC interrupt latch
pub const CLEAR_INTERRUPT: u8 = 0xE6;

/// Device ID values of the known silicon revisions (TCS34721/5, TCS34723/7 and later parts)
pub const KNOWN_DEVICE_IDS: [u8; 3] = [0x44, 0x10, 0x4D];

/// Device interface implementation
#[derive(Debug)]
pub struct DeviceInterface<I2C> {
    /// The I2C interface
    pub i2c: I2C,
    /// 7-bit device address
    pub address: u8,
}

impl<I2C> DeviceInterface<I2C> {
    /// Wrap a bus at the given device address
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }
}

impl<I2C, E> DeviceInterface<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Read an 8-bit register
    pub fn read_u8(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register | COMMAND_BIT], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    /// Read a 16-bit little-endian register pair
    pub fn read_u16(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register | COMMAND_BIT], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(u16::from_le_bytes(buffer))
    }

    /// Write an 8-bit register
    pub fn write_u8(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register | COMMAND_BIT, value])
            .map_err(Error::I2c)
    }

    /// Write a 16-bit little-endian register pair
    pub fn write_u16(&mut self, register: u8, value: u16) -> Result<(), Error<E>> {
        let [lo, hi] = value.to_le_bytes();
        self.i2c
            .write(self.address, &[register | COMMAND_BIT, lo, hi])
            .map_err(Error::I2c)
    }

    /// Write bytes as-is, without a register address
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        self.i2c.write(self.address, data).map_err(Error::I2c)
    }
}

#[cfg(feature = "async")]
impl<I2C, E> DeviceInterface<I2C>
where
    I2C: embedded_hal_async::i2c::I2c<Error = E>,
{
    /// Read an 8-bit register (async version)
    pub async fn read_u8_async(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register | COMMAND_BIT], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    /// Read a 16-bit little-endian register pair (async version)
    pub async fn read_u16_async(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register | COMMAND_BIT], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(u16::from_le_bytes(buffer))
    }

    /// Write an 8-bit register (async version)
    pub async fn write_u8_async(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register | COMMAND_BIT, value])
            .await
            .map_err(Error::I2c)
    }

    /// Write a 16-bit little-endian register pair (async version)
    pub async fn write_u16_async(&mut self, register: u8, value: u16) -> Result<(), Error<E>> {
        let [lo, hi] = value.to_le_bytes();
        self.i2c
            .write(self.address, &[register | COMMAND_BIT, lo, hi])
            .await
            .map_err(Error::I2c)
    }

    /// Write bytes as-is, without a register address (async version)
    pub async fn write_raw_async(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, data)
            .await
            .map_err(Error::I2c)
    }
}
