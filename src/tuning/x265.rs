use std::{
    fmt::{self, Display},
    str::FromStr,
};

use crate::{
    level::{Level, LevelTable},
    profile::{ProfileRequest, Quality, RateFactor},
    tuning::{
        DEFAULT_THREADS, EncodeParams, RateFactorFactors, ResolutionFactors, Tier, WidthBand,
        keyframe_interval, lookahead_from_threads, tuning_tier,
    },
};

/// Upper bound of the rate control lookahead accepted by x265.
const MAX_RC_LOOKAHEAD: u16 = 250;

/// Distance between the CRF and the CRF cap written to the preset.
const RATE_FACTOR_HEADROOM: f64 = 5.0;

/// The two x265 preset families.
///
/// `Classic` leaves the level and thread count to the table and the request.
/// `Revised` also puts a floor under the level and picks a thread count per
/// width band, and runs shallower B-frame chains with stronger AQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HevcVariant {
    #[default]
    Classic,
    Revised,
}

impl FromStr for HevcVariant {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_ref() {
            "classic" => HevcVariant::Classic,
            "revised" => HevcVariant::Revised,
            _ => {
                return Err("Unrecognized x265 variant");
            }
        })
    }
}

impl Display for HevcVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HevcVariant::Classic => "classic",
                HevcVariant::Revised => "revised",
            }
        )
    }
}

pub fn assemble(
    table: &LevelTable,
    request: &ProfileRequest,
    variant: HevcVariant,
) -> EncodeParams {
    let standard = table.standard();
    let resolution_factors = factors_by_resolution(request.resolution.width, variant);
    let rate_factors = factors_by_rate_factor(request.rate_factor, request.frame_rate, variant);

    // The floor only raises a level that resolved; an unresolved one stays unresolved
    let level = table
        .min_level(request.resolution, request.frame_rate)
        .map(|level| {
            resolution_factors
                .level_floor
                .map_or(level, |floor| level.max(floor))
        });
    let limits = level.and_then(|level| table.limits_for_level(level));

    let thread_count = request
        .thread_count
        .or(resolution_factors.threads)
        .unwrap_or(DEFAULT_THREADS);
    let keyframe_interval = keyframe_interval(request.frame_rate);
    let rc_lookahead = match variant {
        HevcVariant::Classic => keyframe_interval.min(MAX_RC_LOOKAHEAD),
        HevcVariant::Revised => keyframe_interval.min(lookahead_from_threads(thread_count)),
    };

    EncodeParams {
        standard,
        name: request.display_name(standard),
        resolution: request.resolution,
        frame_rate: request.frame_rate,
        thread_count,
        rate_factor: request.rate_factor.value(),
        rate_factor_max: Some(request.rate_factor.value() - RATE_FACTOR_HEADROOM),
        level,
        max_bit_rate_kbps: limits.map(|limits| limits.bit_rate_max_kbps),
        tier: Some(Tier::for_level(level)),
        ref_frames: rate_factors.ref_frames,
        me_range: resolution_factors.me_range,
        b_frames: rate_factors.b_frames,
        keyframe_interval,
        input_lookahead: None,
        rc_lookahead,
        aq_strength: resolution_factors.aq_strength + rate_factors.aq_strength_modifier,
    }
}

pub fn factors_by_resolution(width: u32, variant: HevcVariant) -> ResolutionFactors {
    let (me_range, aq_strength, level_floor, threads) = match WidthBand::from_width(width) {
        WidthBand::Uhd => (57, 0.5, 51, 32),
        WidthBand::Qhd => (57, 0.6, 50, 24),
        WidthBand::Fhd => (57, 0.7, 40, 16),
        WidthBand::Hd => (48, 0.9, 30, 12),
        WidthBand::Sd => (32, 0.9, 20, 8),
    };
    match variant {
        HevcVariant::Classic => ResolutionFactors {
            me_range,
            aq_strength,
            level_floor: None,
            threads: None,
        },
        HevcVariant::Revised => ResolutionFactors {
            me_range,
            aq_strength,
            level_floor: Some(Level::new(level_floor)),
            threads: Some(threads),
        },
    }
}

pub fn factors_by_rate_factor(
    rate_factor: RateFactor,
    frame_rate: f64,
    variant: HevcVariant,
) -> RateFactorFactors {
    let base_ref_frames = if frame_rate >= 32.0 { 4 } else { 3 };
    let (extra_ref_frames, b_frames, aq_strength_modifier) =
        match (variant, tuning_tier(rate_factor)) {
            (HevcVariant::Classic, Quality::High) => (2, 16, 0.0),
            (HevcVariant::Classic, Quality::Medium) => (1, 12, 0.05),
            (HevcVariant::Classic, Quality::Low) => (0, 7, 0.1),
            (HevcVariant::Revised, Quality::High) => (2, 12, 0.05),
            (HevcVariant::Revised, Quality::Medium) => (1, 10, 0.1),
            (HevcVariant::Revised, Quality::Low) => (0, 8, 0.15),
        };
    RateFactorFactors {
        ref_frames: base_ref_frames + extra_ref_frames,
        b_frames,
        aq_strength_modifier,
    }
}
