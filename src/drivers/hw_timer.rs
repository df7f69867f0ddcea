//! Window and wake timers on ESP-IDF's esp_timer API.
//!
//! The 8-bit hardware tick counter the firmware expects is emulated in
//! software:
//!
//! - a periodic timer with the window period closes the window and
//!   restarts the tick count
//! - [`ticks_into_window`] derives the current 8-bit tick from the
//!   microseconds elapsed since the window start kept in the shared state;
//!   the window callback moves that start in the same critical section
//!   that latches the tally
//! - a one-shot timer stands in for the wake compare; it signals the shared
//!   wake flag and notifies the main task, which blocks on task
//!   notifications while asleep
//!
//! Timer callbacks execute in the esp_timer task context (not ISR).

#[cfg(feature = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(feature = "espidf")]
use log::{info, warn};

#[cfg(feature = "espidf")]
use super::hw_init::{HwInitError, check};
#[cfg(feature = "espidf")]
use crate::config::SystemConfig;
#[cfg(feature = "espidf")]
use crate::shared::SHARED;
use crate::shared::SharedState;

/// Whole ticks between `start_us` and `now_us`, saturating at the top of an
/// 8-bit counter.  Both inputs are wrapping microsecond counts.
pub fn ticks_since(start_us: u32, now_us: u32, tick_us: u32) -> u8 {
    let ticks = now_us.wrapping_sub(start_us) / tick_us.max(1);
    ticks.min(u32::from(u8::MAX)) as u8
}

#[cfg(feature = "espidf")]
static mut WINDOW_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(feature = "espidf")]
static mut WAKE_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(feature = "espidf")]
static mut MAIN_TASK: TaskHandle_t = core::ptr::null_mut();
#[cfg(feature = "espidf")]
static TICK_US: AtomicU32 = AtomicU32::new(crate::config::TICK_US);

/// SAFETY: WAKE_TIMER is written once in `start_timers()` before the main
/// loop runs.  Only read from the main task.
#[cfg(feature = "espidf")]
unsafe fn wake_timer() -> esp_timer_handle_t {
    unsafe { WAKE_TIMER }
}

/// SAFETY: Same invariants as `wake_timer()`; read from the timer task only
/// after it has been written.
#[cfg(feature = "espidf")]
unsafe fn main_task() -> TaskHandle_t {
    unsafe { MAIN_TASK }
}

/// Raise the wake flag by hand when arming the wake timer failed (`rc`
/// non-zero), so the sleeper still returns after one wait.  Returns
/// whether the timer was armed.
pub fn wake_if_unarmed(shared: &SharedState, rc: i32) -> bool {
    if rc == 0 {
        return true;
    }
    crate::scheduler::on_wake_timer(shared);
    false
}

#[cfg(feature = "espidf")]
fn now_us() -> u32 {
    // SAFETY: esp_timer_get_time is an RTC counter read, fine in any context.
    (unsafe { esp_timer_get_time() }) as u32
}

/// Current tick of the window that opened at `window_start_us`.  Meant to
/// run inside the critical section that records the edge.
#[cfg(feature = "espidf")]
pub fn ticks_into_window(window_start_us: u32) -> u8 {
    ticks_since(window_start_us, now_us(), TICK_US.load(Ordering::Relaxed))
}

#[cfg(feature = "espidf")]
unsafe extern "C" fn window_cb(_arg: *mut core::ffi::c_void) {
    crate::window::on_window_close_at(&SHARED, now_us());
}

#[cfg(feature = "espidf")]
unsafe extern "C" fn wake_cb(_arg: *mut core::ffi::c_void) {
    crate::scheduler::on_wake_timer(&SHARED);
    // SAFETY: MAIN_TASK is set before the wake timer can first be armed.
    unsafe {
        let task = main_task();
        if !task.is_null() {
            let _ = esp_idf_hal::task::notify_and_yield(task, core::num::NonZeroU32::MIN);
        }
    }
}

/// Create both timers and start the window timer.  Must be called from the
/// task that will run the main loop.
#[cfg(feature = "espidf")]
pub fn start_timers(config: &SystemConfig) -> Result<(), HwInitError> {
    TICK_US.store(config.tick_us, Ordering::Relaxed);

    // SAFETY: WINDOW_TIMER, WAKE_TIMER and MAIN_TASK are written here once at
    // boot from the main task before any callback can fire.
    unsafe {
        MAIN_TASK = xTaskGetCurrentTaskHandle();

        let window_args = esp_timer_create_args_t {
            callback: Some(window_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"window".as_ptr(),
            skip_unhandled_events: false,
        };
        check(
            esp_timer_create(&window_args, &raw mut WINDOW_TIMER),
            HwInitError::TimerInitFailed,
        )?;

        let wake_args = esp_timer_create_args_t {
            callback: Some(wake_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"wake".as_ptr(),
            skip_unhandled_events: false,
        };
        check(
            esp_timer_create(&wake_args, &raw mut WAKE_TIMER),
            HwInitError::TimerInitFailed,
        )?;

        SHARED.start_window_clock(now_us());
        check(
            esp_timer_start_periodic(WINDOW_TIMER, u64::from(config.window_us())),
            HwInitError::TimerInitFailed,
        )?;
    }

    info!(
        "hw_timer: window every {} us, wake after {} us",
        config.window_us(),
        config.wake_period_us()
    );
    Ok(())
}

/// Arm the one-shot wake timer `offset_ticks` from now.
///
/// If the timer cannot be armed the wake flag is raised and the main task
/// notified directly, so the following sleep ends after one wait instead
/// of blocking forever.
#[cfg(feature = "espidf")]
pub fn arm_wake(offset_ticks: u8) {
    let us = u64::from(offset_ticks) * u64::from(TICK_US.load(Ordering::Relaxed));
    // SAFETY: wake_timer() contract; main task only.
    let rc = unsafe {
        let t = wake_timer();
        if t.is_null() { ESP_ERR_INVALID_STATE as i32 } else { esp_timer_start_once(t, us) }
    };
    if !wake_if_unarmed(&SHARED, rc) {
        warn!("hw_timer: wake timer not armed (rc={}), skipping sleep", rc);
        // SAFETY: MAIN_TASK was set in start_timers(); we are that task.
        unsafe {
            let task = main_task();
            if !task.is_null() {
                let _ = esp_idf_hal::task::notify(task, core::num::NonZeroU32::MIN);
            }
        }
    }
}

#[cfg(feature = "espidf")]
pub fn disarm_wake() {
    // SAFETY: wake_timer() contract.  Stopping an expired one-shot returns
    // ESP_ERR_INVALID_STATE, which is fine.
    unsafe {
        let t = wake_timer();
        if !t.is_null() {
            esp_timer_stop(t);
        }
    }
}

/// Block the main task until a timer callback notifies it.
#[cfg(feature = "espidf")]
pub fn wait_for_notification() {
    let _ = esp_idf_hal::task::wait_notification(esp_idf_hal::delay::BLOCK);
}
