use std::{
    fmt::{self, Display},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, bail};

use crate::level::Standard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Resolution { width, height }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow!("Resolution must be in WxH format, got {}", s))?;
        let width = width
            .parse()
            .with_context(|| format!("Invalid width value: {}", width))?;
        let height = height
            .parse()
            .with_context(|| format!("Invalid height value: {}", height))?;
        if width == 0 || height == 0 {
            bail!("Resolution must be non-zero, got {}", s);
        }
        Ok(Resolution { width, height })
    }
}

/// Rejects frame rates that are not finite and positive.
pub fn validate_frame_rate(frame_rate: f64) -> Result<f64> {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        bail!("Frame rate must be a finite number greater than 0, got {}", frame_rate);
    }
    Ok(frame_rate)
}

pub fn parse_frame_rate(s: &str) -> Result<f64> {
    let frame_rate = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid frame rate value: {}", s))?;
    validate_frame_rate(frame_rate)
}

/// Constant rate factor. Lower is higher quality.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RateFactor(pub f64);

impl RateFactor {
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Display for RateFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

    /// The preset rate factor for this quality.
    pub const fn rate_factor(self, standard: Standard) -> RateFactor {
        RateFactor(match (standard, self) {
            (Standard::Avc, Quality::High) => 16.0,
            (Standard::Avc, Quality::Medium) => 20.0,
            (Standard::Avc, Quality::Low) => 24.0,
            (Standard::Hevc, Quality::High) => 17.0,
            (Standard::Hevc, Quality::Medium) => 22.0,
            (Standard::Hevc, Quality::Low) => 27.0,
        })
    }

    /// Classifies a rate factor for use in generated profile names.
    pub fn band(standard: Standard, rate_factor: RateFactor) -> Self {
        let (high, medium) = match standard {
            Standard::Avc => (17.0, 22.0),
            Standard::Hevc => (19.0, 24.0),
        };
        if rate_factor.value() <= high {
            Quality::High
        } else if rate_factor.value() <= medium {
            Quality::Medium
        } else {
            Quality::Low
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Quality::High => 'H',
            Quality::Medium => 'M',
            Quality::Low => 'L',
        }
    }
}

impl FromStr for Quality {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_ref() {
            "high" | "h" => Quality::High,
            "medium" | "m" => Quality::Medium,
            "low" | "l" => Quality::Low,
            _ => {
                return Err("Unrecognized quality");
            }
        })
    }
}

/// One preset to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub resolution: Resolution,
    pub frame_rate: f64,
    pub rate_factor: RateFactor,
    pub thread_count: Option<u8>,
}

impl ProfileRequest {
    pub const fn new(resolution: Resolution, frame_rate: f64, rate_factor: RateFactor) -> Self {
        ProfileRequest {
            name: None,
            resolution,
            frame_rate,
            rate_factor,
            thread_count: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub const fn with_threads(mut self, threads: u8) -> Self {
        self.thread_count = Some(threads);
        self
    }

    /// The explicit name, or `WxH@fps-band` when none was given.
    pub fn display_name(&self, standard: Standard) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "{}@{:.2}-{}",
                self.resolution,
                self.frame_rate,
                Quality::band(standard, self.rate_factor).letter()
            ),
        }
    }
}
