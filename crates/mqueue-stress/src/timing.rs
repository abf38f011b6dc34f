//! Round-trip latency collection and reporting.

use core::{fmt, time::Duration};
use parking_lot::Mutex;

const GRAPH_WIDTH: usize = 69;
const GRAPH_HEIGHT: usize = 20;
const CHAR_PEAK: char = '#';
const CHAR_FILLED: char = '*';
const CHAR_EMPTY: char = ' ';
const CHAR_NONE: char = '.';
const COLOR_DIM: &str = "\x1b[38;5;8m";
const COLOR_PEAK: &str = "\x1b[38;5;9m";
const COLOR_RESET: &str = "\x1b[0m";

/// Thread-safe sink for round-trip latencies.
#[derive(Default)]
pub struct Timing {
    samples: Mutex<Vec<u64>>,
}

impl Timing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.samples.lock().push(nanos);
    }

    /// Returns `None` until at least one sample was recorded.
    pub fn summary(&self) -> Option<Summary> {
        Summary::from_samples(&self.samples.lock())
    }
}

/// Aggregate statistics over recorded latencies, in nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub average: f64,
    pub max: u64,
    pub min: u64,
    /// `bands[9]` counts samples at or above 90% of `max`, `bands[1]` those in
    /// `[10%, 20%)` of `max`. `bands[0]` holds everything below 10%.
    pub bands: [usize; 10],
    pub below_average: usize,
    /// Sample count per histogram column, spanning `min..=max`.
    pub columns: [usize; GRAPH_WIDTH],
}

impl Summary {
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        let count = samples.len();
        let total: u128 = samples.iter().map(|&s| u128::from(s)).sum();
        let average = total as f64 / count as f64;

        let mut bands = [0; 10];
        let mut columns = [0; GRAPH_WIDTH];
        let mut below_average = 0;
        let span = u128::from(max - min) + 1;

        for &sample in samples {
            let band = if max == 0 {
                9
            } else {
                ((sample as f64 / max as f64) * 10.0).floor().min(9.0) as usize
            };
            bands[band] += 1;

            let column = (u128::from(sample - min) * GRAPH_WIDTH as u128 / span) as usize;
            columns[column] += 1;

            if (sample as f64) < average {
                below_average += 1;
            }
        }

        Some(Self {
            count,
            average,
            max,
            min,
            bands,
            below_average,
            columns,
        })
    }

    pub fn below_average_percent(&self) -> f64 {
        self.below_average as f64 * 100.0 / self.count as f64
    }

    /// Renders the latency distribution as a `GRAPH_WIDTH` x `GRAPH_HEIGHT`
    /// character plot, tallest column scaled to full height. The top cell of
    /// each column is drawn as a peak; empty columns show a baseline dot.
    pub fn histogram(&self, color: bool) -> String {
        let tallest = self.columns.iter().copied().max().unwrap_or(0).max(1);
        let heights: Vec<usize> = self
            .columns
            .iter()
            .map(|&n| (n * GRAPH_HEIGHT).div_ceil(tallest))
            .collect();

        let mut out = String::with_capacity((GRAPH_WIDTH + 16) * GRAPH_HEIGHT);
        for row in (0..GRAPH_HEIGHT).rev() {
            let mut current = None;
            for &height in &heights {
                let (ch, style) = match height {
                    0 if row == 0 => (CHAR_NONE, COLOR_DIM),
                    h if row + 1 == h => (CHAR_PEAK, COLOR_PEAK),
                    h if row < h => (CHAR_FILLED, COLOR_DIM),
                    _ => (CHAR_EMPTY, COLOR_DIM),
                };
                if color && current != Some(style) {
                    out.push_str(style);
                    current = Some(style);
                }
                out.push(ch);
            }
            if color {
                out.push_str(COLOR_RESET);
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- TIMINGS ---")?;
        writeln!(f, "- Round-trip count    \t{:>9}", self.count)?;
        writeln!(f, "- Average [ns]        \t{:>12.2}", self.average)?;
        writeln!(f, "- Max [ns]            \t{:>9}", self.max)?;
        writeln!(f, "- Min [ns]            \t{:>9}", self.min)?;
        for band in (1..10).rev() {
            writeln!(
                f,
                "- >{}0% of max         \t{:>9}",
                band, self.bands[band]
            )?;
        }
        writeln!(
            f,
            "- Below average       \t{:>9}\t {:>12.2} %",
            self.below_average,
            self.below_average_percent()
        )
    }
}
