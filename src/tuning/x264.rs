use crate::{
    level::LevelTable,
    profile::{ProfileRequest, Quality, RateFactor},
    tuning::{
        DEFAULT_THREADS, EncodeParams, RateFactorFactors, ResolutionFactors, WidthBand,
        keyframe_interval, lookahead_from_threads, tuning_tier,
    },
};

pub fn assemble(table: &LevelTable, request: &ProfileRequest) -> EncodeParams {
    let standard = table.standard();
    let level = table.min_level(request.resolution, request.frame_rate);
    let limits = level.and_then(|level| table.limits_for_level(level));
    let resolution_factors = factors_by_resolution(request.resolution.width);
    let rate_factors = factors_by_rate_factor(request.rate_factor, request.frame_rate);

    // Without a level there is nothing to clamp against
    let ref_frames = limits
        .and_then(|limits| limits.ref_frame_max)
        .map_or(rate_factors.ref_frames, |max| rate_factors.ref_frames.min(max));
    let thread_count = request.thread_count.unwrap_or(DEFAULT_THREADS);
    let input_lookahead = u8::try_from(lookahead_from_threads(thread_count)).unwrap_or(u8::MAX);

    EncodeParams {
        standard,
        name: request.display_name(standard),
        resolution: request.resolution,
        frame_rate: request.frame_rate,
        thread_count,
        rate_factor: request.rate_factor.value(),
        rate_factor_max: None,
        level,
        max_bit_rate_kbps: limits.map(|limits| limits.bit_rate_max_kbps),
        tier: None,
        ref_frames,
        me_range: resolution_factors.me_range,
        b_frames: rate_factors.b_frames,
        keyframe_interval: keyframe_interval(request.frame_rate),
        input_lookahead: Some(input_lookahead),
        rc_lookahead: (request.frame_rate.ceil() * 2.0) as u16,
        aq_strength: resolution_factors.aq_strength + rate_factors.aq_strength_modifier,
    }
}

/// Motion search range and base AQ strength for the frame width.
pub fn factors_by_resolution(width: u32) -> ResolutionFactors {
    let (me_range, aq_strength) = match WidthBand::from_width(width) {
        WidthBand::Uhd => (64, 0.7),
        WidthBand::Qhd => (48, 0.75),
        WidthBand::Fhd => (32, 0.9),
        WidthBand::Hd => (32, 1.0),
        WidthBand::Sd => (24, 1.1),
    };
    ResolutionFactors {
        me_range,
        aq_strength,
        level_floor: None,
        threads: None,
    }
}

/// Reference frames, B-frames and AQ strength modifier for the rate factor and frame rate.
pub fn factors_by_rate_factor(rate_factor: RateFactor, frame_rate: f64) -> RateFactorFactors {
    let base_ref_frames = if frame_rate >= 32.0 { 5 } else { 3 };
    let (extra_ref_frames, b_frames, aq_strength_modifier) = match tuning_tier(rate_factor) {
        Quality::High => (2, 16, 0.05),
        Quality::Medium => (1, 12, 0.1),
        Quality::Low => (0, 7, 0.15),
    };
    RateFactorFactors {
        ref_frames: base_ref_frames + extra_ref_frames,
        b_frames,
        aq_strength_modifier,
    }
}
