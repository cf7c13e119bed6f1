//! Sysfs backends against a fake sysfs tree in a temporary directory.
//!
//! | Test | Description |
//! |------|-------------|
//! | `adc_request_read_release` | Request, read and re-request one pin |
//! | `adc_double_request_busy` | Second request of a live pin |
//! | `adc_missing_channel` | Pin without an `in_voltage<N>_raw` file |
//! | `adc_garbage_value` | Non-numeric attribute content |
//! | `gpio_output_lifecycle` | Direction, value writes, no unexport of pre-exported lines |
//! | `gpio_input_edge` | Edge attribute written for inputs |
//! | `gpio_export_rollback` | Export written, unexport on failed configuration |
//! | `pwm_configure_and_control` | Attribute writes for request, setters, release |
//! | `pwm_export_rollback` | Export written, unexport on failed configuration |

use std::fs;
use std::path::{Path, PathBuf};

use artik_core::{
    AdcConfig, AdcManager, AdcModule, GpioConfig, GpioEdge, GpioManager, GpioModule, PwmConfig,
    PwmManager, PwmModule, PwmPolarity, Status,
};
use artik_driver_sysfs::{IioAdc, SysfsGpio, SysfsPwm};
use tempfile::TempDir;

// =============================================================================
// Fake tree helpers
// =============================================================================

fn iio_dir(root: &Path) -> PathBuf {
    root.join("bus/iio/devices/iio:device0")
}

fn fake_iio(values: &[(u32, &str)]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let dir = iio_dir(root.path());
    fs::create_dir_all(&dir).unwrap();
    for (pin, raw) in values {
        fs::write(dir.join(format!("in_voltage{}_raw", pin)), raw).unwrap();
    }
    root
}

fn fake_gpio_line(root: &Path, id: u32, value: &str) -> PathBuf {
    let dir = root.join(format!("class/gpio/gpio{}", id));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("direction"), "in").unwrap();
    fs::write(dir.join("edge"), "none").unwrap();
    fs::write(dir.join("value"), value).unwrap();
    dir
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(path).unwrap().trim().to_string()
}

// =============================================================================
// ADC
// =============================================================================

#[test]
fn adc_request_read_release() {
    let root = fake_iio(&[(0, "2417\n")]);
    let adc = AdcManager::new(IioAdc::new().with_root(root.path()));

    let h = adc.request(&AdcConfig::new(0)).unwrap();
    assert_eq!(adc.get_value(h).unwrap(), 2417);

    fs::write(iio_dir(root.path()).join("in_voltage0_raw"), "98\n").unwrap();
    assert_eq!(adc.get_value(h).unwrap(), 98);

    adc.release(h).unwrap();
    let h2 = adc.request(&AdcConfig::new(0)).unwrap();
    assert_eq!(adc.get_value(h2).unwrap(), 98);
    adc.release(h2).unwrap();
    assert_eq!(adc.active_count(), 0);
}

#[test]
fn adc_double_request_busy() {
    let root = fake_iio(&[(0, "1\n"), (1, "2\n")]);
    let adc = AdcManager::new(IioAdc::new().with_root(root.path()));

    let h0 = adc.request(&AdcConfig::new(0)).unwrap();
    let h1 = adc.request(&AdcConfig::new(1)).unwrap();
    let err = adc.request(&AdcConfig::new(0)).unwrap_err();
    assert_eq!(err.status(), Status::Busy);

    adc.release(h0).unwrap();
    adc.release(h1).unwrap();
    assert_eq!(adc.release(h1).unwrap_err().status(), Status::BadArgs);
}

#[test]
fn adc_missing_channel() {
    let root = fake_iio(&[(0, "1\n")]);
    let adc = AdcManager::new(IioAdc::new().with_root(root.path()));

    let err = adc.request(&AdcConfig::new(7)).unwrap_err();
    assert_eq!(err.status(), Status::BadArgs);
    assert!(err.to_string().contains("in_voltage7_raw"));
    assert_eq!(adc.active_count(), 0);
}

#[test]
fn adc_garbage_value() {
    let root = fake_iio(&[(2, "not-a-number\n")]);
    let adc = AdcManager::new(IioAdc::new().with_root(root.path()));

    let h = adc.request(&AdcConfig::new(2)).unwrap();
    let err = adc.get_value(h).unwrap_err();
    assert_eq!(err.status(), Status::Busy);
    assert!(err.to_string().contains("not-a-number"));
    adc.release(h).unwrap();
}

// =============================================================================
// GPIO
// =============================================================================

#[test]
fn gpio_output_lifecycle() {
    let root = tempfile::tempdir().unwrap();
    let dir = fake_gpio_line(root.path(), 21, "0");
    let gpio = GpioManager::new(SysfsGpio::new().with_root(root.path()));

    let h = gpio.request(&GpioConfig::output(21, true)).unwrap();
    assert_eq!(read(dir.join("direction")), "high");

    gpio.write(h, true).unwrap();
    assert_eq!(read(dir.join("value")), "1");
    assert!(gpio.read(h).unwrap());
    gpio.write(h, false).unwrap();
    assert!(!gpio.read(h).unwrap());

    gpio.release(h).unwrap();
    // already exported by someone else, so left exported
    assert!(!root.path().join("class/gpio/unexport").exists());
}

#[test]
fn gpio_input_edge() {
    let root = tempfile::tempdir().unwrap();
    let dir = fake_gpio_line(root.path(), 4, "1\n");
    let gpio = GpioManager::new(SysfsGpio::new().with_root(root.path()));

    let h = gpio
        .request(&GpioConfig::input(4).with_edge(GpioEdge::Both))
        .unwrap();
    assert_eq!(read(dir.join("direction")), "in");
    assert_eq!(read(dir.join("edge")), "both");
    assert!(gpio.read(h).unwrap());
    assert_eq!(gpio.write(h, false).unwrap_err().status(), Status::BadArgs);
    gpio.release(h).unwrap();
}

#[test]
fn gpio_export_rollback() {
    let root = tempfile::tempdir().unwrap();
    let class = root.path().join("class/gpio");
    fs::create_dir_all(&class).unwrap();
    let gpio = GpioManager::new(SysfsGpio::new().with_root(root.path()));

    // a real kernel would create gpio17/ on export; the fake tree does not
    let err = gpio.request(&GpioConfig::input(17)).unwrap_err();
    assert_eq!(err.status(), Status::BadArgs);
    assert_eq!(read(class.join("export")), "17");
    assert_eq!(read(class.join("unexport")), "17");
    assert_eq!(gpio.active_count(), 0);
}

// =============================================================================
// PWM
// =============================================================================

#[test]
fn pwm_configure_and_control() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("class/pwm/pwmchip0/pwm1");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("enable"), "1").unwrap();
    let pwm = PwmManager::new(SysfsPwm::new().with_root(root.path()));

    let config = PwmConfig::new(1, 1_000_000, 250_000).with_polarity(PwmPolarity::Inversed);
    let h = pwm.request(&config).unwrap();
    assert_eq!(read(dir.join("enable")), "0");
    assert_eq!(read(dir.join("period")), "1000000");
    assert_eq!(read(dir.join("duty_cycle")), "250000");
    assert_eq!(read(dir.join("polarity")), "inversed");

    pwm.enable(h).unwrap();
    assert_eq!(read(dir.join("enable")), "1");
    pwm.set_duty_cycle(h, 500_000).unwrap();
    assert_eq!(read(dir.join("duty_cycle")), "500000");
    pwm.set_period(h, 2_000_000).unwrap();
    assert_eq!(read(dir.join("period")), "2000000");
    pwm.set_polarity(h, PwmPolarity::Normal).unwrap();
    assert_eq!(read(dir.join("polarity")), "normal");
    assert_eq!(read(dir.join("enable")), "1");

    pwm.release(h).unwrap();
    assert_eq!(read(dir.join("enable")), "0");
}

#[test]
fn pwm_export_rollback() {
    let root = tempfile::tempdir().unwrap();
    let chip = root.path().join("class/pwm/pwmchip2");
    fs::create_dir_all(&chip).unwrap();
    let pwm = PwmManager::new(SysfsPwm::new().with_root(root.path()).with_chip(2));

    let err = pwm.request(&PwmConfig::new(0, 1000, 10)).unwrap_err();
    assert_eq!(err.status(), Status::BadArgs);
    assert_eq!(read(chip.join("export")), "0");
    assert_eq!(read(chip.join("unexport")), "0");
}
