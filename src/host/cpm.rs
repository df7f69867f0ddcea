//! Count-rate estimation from report lines.
//!
//! The firmware only says how many pulses landed in each 16.384 ms window
//! and the tick of the last one.  [`CpmEstimator`] turns that stream into
//! counts per minute:
//!
//! - the interval leading up to a report is split evenly across its
//!   pulses, and every empty window adds a full window of ticks
//! - the estimate is 60 s over the mean of the last 100 intervals
//! - the history is discarded when it stops describing the source.  Each
//!   test has a false-alarm probability of about [`FALSE_RESET_P`] for a
//!   constant source, using 95 % chi-squared bounds on the mean interval:
//!
//! ```text
//!   silence  current gap     ≫ mean      ──▶ forget everything
//!   slowdown last 3 gaps     ≫ mean      ──▶ forget everything
//!   burst    last 4 gaps     ≪ mean      ──▶ restart from the newest gap
//!            (only while below 100 CPM)
//! ```

use heapless::HistoryBuffer;
use log::debug;

use crate::config::{TICK_US, WINDOW_TICKS};
use crate::report::ReportLine;

/// Intervals averaged for the estimate.
pub const HISTORY: usize = 100;
/// Recent intervals checked by the slowdown and burst tests.
const RECENT: usize = 4;
/// Probability of a spurious reset per test for an unchanged source.
pub const FALSE_RESET_P: f64 = 0.001;
/// The burst test only runs below this rate.
const BURST_CHECK_BELOW_CPM: f64 = 100.0;

/// Inverse chi-squared CDF, upper 95 % point.  Index `i` is for `2 * (i + 1)`
/// degrees of freedom.
#[rustfmt::skip]
const CHI2_UPPER_95: [f64; HISTORY] = [
    7.37776, 11.1433, 14.4494, 17.5345, 20.4832, 23.3367, 26.1189, 28.8454, 31.5264,
    34.1696, 36.7807, 39.3641, 41.9232, 44.4608, 46.9792, 49.4804, 51.966, 54.4373,
    56.8955, 59.3417, 61.7768, 64.2015, 66.6165, 69.0226, 71.4202, 73.8099, 76.192,
    78.5672, 80.9356, 83.2977, 85.6537, 88.0041, 90.3489, 92.6885, 95.0232, 97.3531,
    99.6783, 101.999, 104.316, 106.629, 108.937, 111.242, 113.544, 115.841, 118.136,
    120.427, 122.715, 125.0, 127.282, 129.561, 131.838, 134.111, 136.382, 138.651,
    140.917, 143.18, 145.441, 147.7, 149.957, 152.211, 154.464, 156.714, 158.962,
    161.209, 163.453, 165.696, 167.936, 170.175, 172.412, 174.648, 176.882, 179.114,
    181.344, 183.573, 185.8, 188.026, 190.251, 192.474, 194.695, 196.915, 199.134,
    201.351, 203.567, 205.782, 207.995, 210.208, 212.419, 214.628, 216.837, 219.044,
    221.251, 223.456, 225.66, 227.863, 230.064, 232.265, 234.465, 236.664, 238.861,
    241.058,
];

/// Inverse chi-squared CDF, lower 95 % point.  Same indexing.
#[rustfmt::skip]
const CHI2_LOWER_95: [f64; HISTORY] = [
    0.0506356, 0.484419, 1.23734, 2.17973, 3.24697, 4.40379, 5.62873, 6.90766, 8.23075,
    9.59078, 10.9823, 12.4012, 13.8439, 15.3079, 16.7908, 18.2908, 19.8063, 21.3359,
    22.8785, 24.433, 25.9987, 27.5746, 29.1601, 30.7545, 32.3574, 33.9681, 35.5863,
    37.2116, 38.8435, 40.4817, 42.126, 43.776, 45.4314, 47.092, 48.7576, 50.4279,
    52.1028, 53.7821, 55.4656, 57.1532, 58.8446, 60.5398, 62.2386, 63.9409, 65.6466,
    67.3556, 69.0677, 70.7828, 72.5009, 74.2219, 75.9457, 77.6722, 79.4013, 81.1329,
    82.8671, 84.6036, 86.3425, 88.0837, 89.8271, 91.5726, 93.3203, 95.0701, 96.8219,
    98.5756, 100.331, 102.089, 103.848, 105.609, 107.372, 109.137, 110.903, 112.671,
    114.441, 116.212, 117.985, 119.759, 121.534, 123.312, 125.09, 126.87, 128.651,
    130.434, 132.218, 134.003, 135.79, 137.578, 139.367, 141.157, 142.949, 144.741,
    146.535, 148.33, 150.126, 151.923, 153.721, 155.521, 157.321, 159.122, 160.925,
    162.728,
];

/// Why the history was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reset {
    /// The running gap is far longer than the mean.
    Silence,
    /// The last three gaps are far longer than the mean.
    Slowdown,
    /// The last four gaps are far shorter than the mean.
    Burst,
}

pub struct CpmEstimator {
    intervals: HistoryBuffer<f64, HISTORY>,
    recent: HistoryBuffer<f64, RECENT>,
    /// Pulses represented in the history, capped at [`HISTORY`].
    events: usize,
    /// Ticks since the last pulse.
    pending_ticks: f64,
    cpm: Option<f64>,
    last_reset: Option<Reset>,
    silence_factor: f64,
    slowdown_factor: f64,
    burst_factor: f64,
}

impl Default for CpmEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl CpmEstimator {
    pub fn new() -> Self {
        let p = FALSE_RESET_P;
        Self {
            intervals: HistoryBuffer::new(),
            recent: HistoryBuffer::new(),
            events: 0,
            pending_ticks: 0.0,
            cpm: None,
            last_reset: None,
            silence_factor: -p.ln(),
            slowdown_factor: -p.powf(1.0 / 3.0).ln(),
            burst_factor: -(1.0 - p.powf(0.25)).ln(),
        }
    }

    /// Latest estimate.  `None` before the first pulse, `Some(0.0)` right
    /// after a silence or slowdown reset.
    pub fn cpm(&self) -> Option<f64> {
        self.cpm
    }

    pub fn events(&self) -> usize {
        self.events
    }

    pub fn last_reset(&self) -> Option<Reset> {
        self.last_reset
    }

    /// Feed one raw line from the serial port.  Lines that are not count
    /// reports still run the silence and slowdown tests.
    pub fn push_line(&mut self, line: &str) -> Option<f64> {
        self.check_decay();
        if let Some(report) = ReportLine::parse(line) {
            self.ingest(report);
        }
        self.cpm
    }

    /// Feed one parsed report.
    pub fn push(&mut self, report: ReportLine) -> Option<f64> {
        self.check_decay();
        self.ingest(report);
        self.cpm
    }

    fn ingest(&mut self, report: ReportLine) {
        if report.count == 0 {
            self.pending_ticks += f64::from(WINDOW_TICKS);
            return;
        }

        let share = f64::from(report.last_event) / f64::from(report.count);
        for _ in 0..report.count {
            self.events = (self.events + 1).min(HISTORY);
            self.pending_ticks += share;
            let gap = self.pending_ticks * tick_secs();
            self.intervals.write(gap);
            self.recent.write(gap);

            if let Some(mean) = mean(&self.intervals).filter(|m| *m > 0.0) {
                let cpm = 60.0 / mean;
                self.cpm = Some(cpm);
                if cpm < BURST_CHECK_BELOW_CPM && self.burst(mean) {
                    debug!("cpm: burst at {:.2} CPM, history restarted", cpm);
                    self.clear(Reset::Burst);
                    self.events = 1;
                    self.intervals.write(gap);
                    self.recent.write(gap);
                }
            }
            self.pending_ticks = 0.0;
        }
    }

    fn check_decay(&mut self) {
        if self.events == 0 {
            return;
        }
        let Some(mean) = mean(&self.intervals) else {
            return;
        };
        let bound = 2.0 * self.events as f64 * mean / CHI2_LOWER_95[self.events - 1];

        if self.pending_ticks * tick_secs() > self.silence_factor * bound {
            debug!("cpm: silence, history cleared");
            self.clear(Reset::Silence);
            self.cpm = Some(0.0);
        } else if self.events > 2
            && mean_of_latest(&self.recent, 3).is_some_and(|m| m > self.slowdown_factor * bound)
        {
            debug!("cpm: slowdown, history cleared");
            self.clear(Reset::Slowdown);
            self.cpm = Some(0.0);
        }
    }

    fn burst(&self, mean: f64) -> bool {
        let bound = 2.0 * self.events as f64 * mean / CHI2_UPPER_95[self.events - 1];
        mean_of_latest(&self.recent, RECENT).is_some_and(|m| m < self.burst_factor * bound)
    }

    fn clear(&mut self, why: Reset) {
        self.intervals.clear();
        self.recent.clear();
        self.events = 0;
        self.last_reset = Some(why);
    }
}

fn tick_secs() -> f64 {
    f64::from(TICK_US) / 1e6
}

fn mean<const N: usize>(buf: &HistoryBuffer<f64, N>) -> Option<f64> {
    let len = buf.len();
    if len == 0 {
        return None;
    }
    Some(buf.as_slice().iter().sum::<f64>() / len as f64)
}

fn mean_of_latest<const N: usize>(buf: &HistoryBuffer<f64, N>, n: usize) -> Option<f64> {
    if n == 0 || buf.len() < n {
        return None;
    }
    let sum: f64 = buf.oldest_ordered().skip(buf.len() - n).sum();
    Some(sum / n as f64)
}
