//! Simple TCS34725 reading example
//!
//! Prints the color temperature and lux once per second.

#[cfg(target_os = "linux")]
use embedded_hal::delay::DelayNs;
#[cfg(target_os = "linux")]
use tcs34725::{Photometric, Tcs34725};

// This example uses linux-embedded-hal for demonstration
// Replace with your platform's I2C implementation
#[cfg(target_os = "linux")]
use linux_embedded_hal::{Delay, I2cdev};

#[cfg(target_os = "linux")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let i2c = I2cdev::new("/dev/i2c-1")?;
    let mut sensor = Tcs34725::new(i2c, Delay).map_err(|e| e.to_string())?;
    sensor
        .set_integration_time(153.6)
        .map_err(|e| e.to_string())?;

    let mut delay = Delay;
    loop {
        match sensor.read_photometric() {
            Ok(Photometric::Valid {
                lux,
                color_temperature,
            }) => println!("Temperature: {:.0}K Lux: {:.2}", color_temperature, lux),
            Ok(Photometric::Saturated) => println!("Temperature: ----K Lux: ---- (saturated)"),
            Err(e) => println!("Error reading sensor: {}", e),
        }
        delay.delay_ms(1000);
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {
    println!("This example requires Linux with I2C support.");
    println!("Replace linux-embedded-hal with your platform's HAL to run it elsewhere.");
}
