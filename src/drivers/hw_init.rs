//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, the HV LEDC timer/channel, the detector edge
//! interrupt and the USB serial driver using raw ESP-IDF sys calls.  Called
//! once from `main()` before the main loop starts.

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(feature = "espidf")]
use log::info;

#[cfg(feature = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
    TimerInitFailed(i32),
    UsbInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::TimerInitFailed(rc) => write!(f, "esp_timer setup failed (rc={})", rc),
            Self::UsbInstallFailed(rc) => write!(f, "USB serial driver install failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

/// Map an `esp_err_t` to `Ok` or the given error variant.
pub fn check(rc: i32, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if rc == 0 { Ok(()) } else { Err(err(rc)) }
}

#[cfg(feature = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the main loop; single-threaded.
    unsafe {
        init_gpio()?;
        init_ledc()?;
        init_usb()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(feature = "espidf")]
unsafe fn init_gpio() -> Result<(), HwInitError> {
    let detector = gpio_config_t {
        pin_bit_mask: 1u64 << pins::DETECTOR_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    check(unsafe { gpio_config(&detector) }, HwInitError::GpioConfigFailed)?;

    let sense = gpio_config_t {
        pin_bit_mask: 1u64 << pins::HV_SENSE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    check(unsafe { gpio_config(&sense) }, HwInitError::GpioConfigFailed)?;

    for pin in [pins::HV_SENSE_EN_GPIO, pins::INDICATOR_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO configured (detector, HV sense, indicator)");
    Ok(())
}

#[cfg(feature = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: register read on an already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(feature = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> i32 {
    // SAFETY: register write on a pin configured in init_gpio(). Main loop only.
    unsafe { gpio_set_level(pin, u32::from(high)) }
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(feature = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: pins::HV_PWM_RESOLUTION_BITS,
        freq_hz: pins::HV_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    check(unsafe { ledc_timer_config(&timer) }, HwInitError::LedcInitFailed)?;

    // Gate stays off until the Instrument writes the power-on duty.
    let channel = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: pins::LEDC_CH_HV,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: pins::HV_PWM_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    check(unsafe { ledc_channel_config(&channel) }, HwInitError::LedcInitFailed)?;

    info!(
        "hw_init: LEDC HV channel at {} Hz, {} bit",
        pins::HV_PWM_FREQ_HZ,
        pins::HV_PWM_RESOLUTION_BITS
    );
    Ok(())
}

#[cfg(feature = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) -> i32 {
    // SAFETY: channel configured in init_ledc(); only the main loop writes duty.
    unsafe {
        let rc = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        if rc != ESP_OK as i32 {
            return rc;
        }
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel)
    }
}

// ── USB serial ────────────────────────────────────────────────

#[cfg(feature = "espidf")]
unsafe fn init_usb() -> Result<(), HwInitError> {
    let mut cfg = usb_serial_jtag_driver_config_t {
        tx_buffer_size: 256,
        rx_buffer_size: 256,
    };
    check(
        unsafe { usb_serial_jtag_driver_install(&mut cfg) },
        HwInitError::UsbInstallFailed,
    )?;
    info!("hw_init: USB serial driver installed");
    Ok(())
}

// ── Detector ISR ──────────────────────────────────────────────

#[cfg(feature = "espidf")]
unsafe extern "C" fn detector_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::pulse::on_detector_edge_timed(
        &crate::shared::SHARED,
        super::hw_timer::ticks_into_window,
    );
}

/// Install the per-pin GPIO ISR service and hook the detector edge.
/// Call after [`init_peripherals`] and the timers.
#[cfg(feature = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    // The handler only touches the critical-section guarded shared state.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        check(
            gpio_isr_handler_add(
                pins::DETECTOR_GPIO,
                Some(detector_gpio_isr),
                core::ptr::null_mut(),
            ),
            HwInitError::IsrInstallFailed,
        )?;
        gpio_intr_enable(pins::DETECTOR_GPIO);
    }
    info!("hw_init: detector ISR installed");
    Ok(())
}
