use std::fmt::{self, Display};

use crate::{
    level::{Level, LevelTable, Standard},
    profile::{ProfileRequest, Quality, RateFactor, Resolution},
};

pub use self::x265::HevcVariant;

mod x264;
mod x265;

/// Thread count used when neither the request nor the heuristics pick one.
const DEFAULT_THREADS: u8 = 16;

// Lower edges of the width bands, inclusive.
const UHD_WIDTH: u32 = 3840 * 15 / 16;
const QHD_WIDTH: u32 = 2560 * 15 / 16;
const FHD_WIDTH: u32 = 1920 * 7 / 8;
const HD_WIDTH: u32 = 1280 * 7 / 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthBand {
    Uhd,
    Qhd,
    Fhd,
    Hd,
    Sd,
}

impl WidthBand {
    pub const fn from_width(width: u32) -> Self {
        if width >= UHD_WIDTH {
            WidthBand::Uhd
        } else if width >= QHD_WIDTH {
            WidthBand::Qhd
        } else if width >= FHD_WIDTH {
            WidthBand::Fhd
        } else if width >= HD_WIDTH {
            WidthBand::Hd
        } else {
            WidthBand::Sd
        }
    }
}

/// Tuning tier of a rate factor. Both encoders share these edges.
pub fn tuning_tier(rate_factor: RateFactor) -> Quality {
    if rate_factor.value() <= 17.0 {
        Quality::High
    } else if rate_factor.value() <= 22.0 {
        Quality::Medium
    } else {
        Quality::Low
    }
}

/// Settings that follow from the frame width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionFactors {
    pub me_range: u8,
    pub aq_strength: f64,
    pub level_floor: Option<Level>,
    pub threads: Option<u8>,
}

/// Settings that follow from the rate factor and frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateFactorFactors {
    pub ref_frames: u8,
    pub b_frames: u8,
    pub aq_strength_modifier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Main,
    High,
}

impl Tier {
    pub fn for_level(level: Option<Level>) -> Self {
        match level {
            Some(level) if level >= Level::new(40) => Tier::High,
            _ => Tier::Main,
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Tier::Main => "Main",
                Tier::High => "High",
            }
        )
    }
}

/// The full parameter set of one generated preset.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub standard: Standard,
    pub name: String,
    pub resolution: Resolution,
    pub frame_rate: f64,
    pub thread_count: u8,
    pub rate_factor: f64,
    pub rate_factor_max: Option<f64>,
    pub level: Option<Level>,
    pub max_bit_rate_kbps: Option<u32>,
    pub tier: Option<Tier>,
    pub ref_frames: u8,
    pub me_range: u8,
    pub b_frames: u8,
    pub keyframe_interval: u16,
    pub input_lookahead: Option<u8>,
    pub rc_lookahead: u16,
    pub aq_strength: f64,
}

impl EncodeParams {
    /// Template field names and their rendered values.
    ///
    /// Fields that do not apply to the standard are left out.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("encoder", self.standard.encoder_name().to_string()),
            ("name", self.name.clone()),
            ("width", self.resolution.width.to_string()),
            ("height", self.resolution.height.to_string()),
            ("frame_rate", self.frame_rate.to_string()),
            ("thread_count", self.thread_count.to_string()),
            ("rate_factor", self.rate_factor.to_string()),
            (
                "level",
                self.level.map_or_else(|| "0".to_string(), |level| level.to_string()),
            ),
            (
                "max_bit_rate",
                self.max_bit_rate_kbps
                    .map_or_else(|| "0".to_string(), |rate| rate.to_string()),
            ),
            ("ref_frames", self.ref_frames.to_string()),
            ("me_range", self.me_range.to_string()),
            ("b_frames", self.b_frames.to_string()),
            ("keyframe_interval", self.keyframe_interval.to_string()),
            ("rc_lookahead", self.rc_lookahead.to_string()),
            ("aq_strength", format!("{:.2}", self.aq_strength)),
        ];
        if let Some(rate_factor_max) = self.rate_factor_max {
            fields.push(("rate_factor_max", rate_factor_max.to_string()));
        }
        if let Some(tier) = self.tier {
            fields.push(("tier", tier.to_string()));
        }
        if let Some(input_lookahead) = self.input_lookahead {
            fields.push(("input_lookahead", input_lookahead.to_string()));
        }
        fields
    }
}

impl Display for EncodeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level {} ref {} me {} bframes {} keyint {} rc-lookahead {} aq {:.2} threads {}",
            self.level.map_or_else(|| "none".to_string(), |level| level.to_string()),
            self.ref_frames,
            self.me_range,
            self.b_frames,
            self.keyframe_interval,
            self.rc_lookahead,
            self.aq_strength,
            self.thread_count
        )?;
        if let Some(tier) = self.tier {
            write!(f, " tier {}", tier)?;
        }
        Ok(())
    }
}

/// Which preset generator to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    X264,
    X265(HevcVariant),
}

impl Generator {
    pub const fn standard(self) -> Standard {
        match self {
            Generator::X264 => Standard::Avc,
            Generator::X265(_) => Standard::Hevc,
        }
    }

    /// Derives the complete parameter set of one request.
    ///
    /// `table` must belong to this generator's standard.
    pub fn assemble(self, table: &LevelTable, request: &ProfileRequest) -> EncodeParams {
        debug_assert_eq!(table.standard(), self.standard());
        match self {
            Generator::X264 => x264::assemble(table, request),
            Generator::X265(variant) => x265::assemble(table, request, variant),
        }
    }
}

impl Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generator::X264 => write!(f, "x264"),
            Generator::X265(variant) => write!(f, "x265 ({})", variant),
        }
    }
}

fn keyframe_interval(frame_rate: f64) -> u16 {
    (frame_rate.ceil() * 10.0) as u16
}

fn lookahead_from_threads(threads: u8) -> u16 {
    (u16::from(threads) * 5).max(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_band_edges() {
        assert_eq!(UHD_WIDTH, 3600);
        assert_eq!(QHD_WIDTH, 2400);
        assert_eq!(FHD_WIDTH, 1680);
        assert_eq!(HD_WIDTH, 1120);

        assert_eq!(WidthBand::from_width(3840), WidthBand::Uhd);
        assert_eq!(WidthBand::from_width(3600), WidthBand::Uhd);
        assert_eq!(WidthBand::from_width(3599), WidthBand::Qhd);
        assert_eq!(WidthBand::from_width(2400), WidthBand::Qhd);
        assert_eq!(WidthBand::from_width(2399), WidthBand::Fhd);
        assert_eq!(WidthBand::from_width(1680), WidthBand::Fhd);
        assert_eq!(WidthBand::from_width(1679), WidthBand::Hd);
        assert_eq!(WidthBand::from_width(1120), WidthBand::Hd);
        assert_eq!(WidthBand::from_width(1119), WidthBand::Sd);
        assert_eq!(WidthBand::from_width(0), WidthBand::Sd);
    }

    #[test]
    fn test_tuning_tier_edges() {
        assert_eq!(tuning_tier(RateFactor(17.0)), Quality::High);
        assert_eq!(tuning_tier(RateFactor(17.5)), Quality::Medium);
        assert_eq!(tuning_tier(RateFactor(22.0)), Quality::Medium);
        assert_eq!(tuning_tier(RateFactor(22.1)), Quality::Low);
    }

    #[test]
    fn test_keyframe_interval_rounds_frame_rate_up() {
        assert_eq!(keyframe_interval(30.0), 300);
        assert_eq!(keyframe_interval(29.97), 300);
        assert_eq!(keyframe_interval(23.976), 240);
        assert_eq!(keyframe_interval(60.0), 600);
    }

    #[test]
    fn test_lookahead_from_threads() {
        assert_eq!(lookahead_from_threads(1), 30);
        assert_eq!(lookahead_from_threads(16), 80);
        assert_eq!(lookahead_from_threads(255), 1275);
    }

    #[test]
    fn test_tier_for_level() {
        assert_eq!(Tier::for_level(Some(Level::new(40))), Tier::High);
        assert_eq!(Tier::for_level(Some(Level::new(31))), Tier::Main);
        assert_eq!(Tier::for_level(None), Tier::Main);
    }

    #[test]
    fn test_fields_skip_missing_values() {
        let table = LevelTable::avc();
        let request = ProfileRequest::new(Resolution::new(1920, 1080), 30.0, RateFactor(20.0));
        let params = Generator::X264.assemble(&table, &request);
        let fields = params.fields();
        let get = |key: &str| {
            fields
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(get("encoder"), Some("x264"));
        assert_eq!(get("name"), Some("1920x1080@30.00-M"));
        assert_eq!(get("frame_rate"), Some("30"));
        assert_eq!(get("level"), Some("4.0"));
        assert_eq!(get("max_bit_rate"), Some("20000"));
        assert_eq!(get("aq_strength"), Some("1.00"));
        assert_eq!(get("input_lookahead"), Some("80"));
        assert_eq!(get("tier"), None);
        assert_eq!(get("rate_factor_max"), None);
    }

    #[test]
    fn test_fields_render_missing_level_as_zero() {
        let table = LevelTable::hevc();
        let request = ProfileRequest::new(Resolution::new(7680, 4320), 240.0, RateFactor(22.0));
        let params = Generator::X265(HevcVariant::Classic).assemble(&table, &request);
        let fields = params.fields();
        assert!(fields.contains(&("level", "0".to_string())));
        assert!(fields.contains(&("max_bit_rate", "0".to_string())));
        assert!(fields.contains(&("tier", "Main".to_string())));
        assert!(fields.contains(&("rate_factor_max", "17".to_string())));
    }
}
