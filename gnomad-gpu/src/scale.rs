/*!
# Scales

Continuous domain → range mappings: linear for genome → screen x, base-10
logarithmic for allele frequency → screen y.
*/

use serde::{Deserialize, Serialize};

/// Smallest frequency placed on the upper (common variant) band
pub const COMMON_FREQUENCY: f64 = 1e-5;
/// Smallest frequency placed on the lower (rare variant) band
pub const RARE_FREQUENCY: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    pub fn domain_width(&self) -> f64 {
        self.domain[1] - self.domain[0]
    }

    pub fn range_width(&self) -> f64 {
        self.range[1] - self.range[0]
    }

    pub fn apply(&self, x: f64) -> f64 {
        let span = self.domain_width();
        if span == 0.0 {
            return (self.range[0] + self.range[1]) / 2.0;
        }
        self.range[0] + (x - self.domain[0]) / span * self.range_width()
    }

    pub fn invert(&self, y: f64) -> f64 {
        let span = self.range_width();
        if span == 0.0 {
            return (self.domain[0] + self.domain[1]) / 2.0;
        }
        self.domain[0] + (y - self.range[0]) / span * self.domain_width()
    }
}

/// Base-10 log scale over a strictly positive domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    log_domain: [f64; 2],
    range: [f64; 2],
}

impl LogScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self {
            log_domain: [domain[0].log10(), domain[1].log10()],
            range,
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        let t = (x.log10() - self.log_domain[0]) / (self.log_domain[1] - self.log_domain[0]);
        self.range[0] + t * (self.range[1] - self.range[0])
    }

    pub fn invert(&self, y: f64) -> f64 {
        let t = (y - self.range[0]) / (self.range[1] - self.range[0]);
        10f64.powf(self.log_domain[0] + t * (self.log_domain[1] - self.log_domain[0]))
    }
}

/// Two-segment allele frequency → y mapping anchored on the legend rows.
///
/// `[1e-5, 1]` spans rows 1..=last, `[1e-8, 1e-5)` spans rows 0..1, and
/// anything rarer (or missing) sits at 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyScale {
    common: LogScale,
    rare: LogScale,
}

impl FrequencyScale {
    pub fn from_label_positions(label_positions: &[f64]) -> Self {
        let pos0 = label_positions.first().copied().unwrap_or(0.0);
        let pos_common = label_positions.get(1).copied().unwrap_or(pos0);
        let pos_one = label_positions.last().copied().unwrap_or(pos_common);

        Self {
            common: LogScale::new([COMMON_FREQUENCY, 1.0], [pos_common, pos_one]),
            rare: LogScale::new([RARE_FREQUENCY, COMMON_FREQUENCY], [pos0, pos_common]),
        }
    }

    /// Band centre for a frequency, or `None` below the rare cutoff
    pub fn band_y(&self, frequency: Option<f64>) -> Option<f64> {
        match frequency {
            Some(af) if af >= COMMON_FREQUENCY => Some(self.common.apply(af)),
            Some(af) if af >= RARE_FREQUENCY => Some(self.rare.apply(af)),
            _ => None,
        }
    }

    /// Top edge of a variant rectangle of `variant_height`, including the
    /// one pixel offset the renderer draws from.
    pub fn y_top(&self, frequency: Option<f64>, variant_height: f64) -> f64 {
        let y = match self.band_y(frequency) {
            Some(centre) => centre - variant_height / 2.0,
            None => 0.0,
        };
        y + 1.0
    }
}
