//! ESP32 implementations of the clock's time base and hibernation

use core::time::Duration as CoreDuration;

use embassy_time::{Duration, Instant, Timer};
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use esp_println::println;
use matrix_clock_core::night::Hibernate;
use matrix_clock_core::timebase::Timebase;

/// `embassy_time` driven by the esp-rtos timer
pub struct EmbassyTimebase;

impl Timebase for EmbassyTimebase {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        Timer::after(duration).await;
    }

    async fn sleep_until(&self, deadline: Instant) {
        Timer::at(deadline).await;
    }
}

/// Deep sleep with the RTC timer as the only wake source
///
/// Waking is a cold boot.
pub struct DeepSleep {
    rtc: Rtc<'static>,
}

impl DeepSleep {
    pub fn new(rtc: Rtc<'static>) -> Self {
        Self { rtc }
    }
}

impl Hibernate for DeepSleep {
    fn hibernate(&mut self, wake_after: Duration) {
        let timer = TimerWakeupSource::new(CoreDuration::from_micros(wake_after.as_micros()));
        println!("Entering deep sleep for {} seconds...", wake_after.as_secs());

        // Small delay to let serial output flush
        esp_hal::delay::Delay::new().delay_millis(100);

        // Enter deep sleep (never returns - device reboots on wake)
        self.rtc.sleep_deep(&[&timer]);
    }
}
