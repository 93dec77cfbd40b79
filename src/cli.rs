use anyhow::{Context, Result, anyhow, bail};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{alpha1, char, digit1},
    combinator::map_res,
    number::complete::double,
    sequence::preceded,
};

use crate::{
    level::Standard,
    profile::{ProfileRequest, Quality, RateFactor, Resolution, validate_frame_rate},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFilter<'a> {
    Name(&'a str),
    Resolution(Resolution),
    FrameRate(f64),
    RateFactor(f64),
    Quality(Quality),
    Threads(u8),
}

/// Parses a comma separated profile spec such as
/// `name=NTSC DVD,res=640x480,fps=29.97,q=20,threads=16`.
pub fn parse_filters(input: &str) -> Result<Vec<ParsedFilter<'_>>> {
    let mut filters = Vec::new();
    let mut input = input.trim_start();
    while !input.is_empty() {
        let (next_input, result) = parse_name(input)
            .or_else(|_| parse_resolution(input))
            .or_else(|_| parse_frame_rate(input))
            .or_else(|_| parse_rate_factor(input))
            .or_else(|_| parse_quality(input))
            .or_else(|_| parse_threads(input))
            .map_err(|_| anyhow!("Unrecognized filter: {}", input))?;
        filters.push(result);
        input = next_input.trim_start().trim_start_matches(',').trim_start();
    }
    Ok(filters)
}

/// Builds a request from a profile spec. Resolution and frame rate are required,
/// quality defaults to the standard's medium preset.
pub fn parse_profile_spec(spec: &str, standard: Standard) -> Result<ProfileRequest> {
    let mut name = None;
    let mut resolution = None;
    let mut frame_rate = None;
    let mut rate_factor = None;
    let mut thread_count = None;
    for filter in parse_filters(spec)? {
        match filter {
            ParsedFilter::Name(value) => name = Some(value.trim().to_string()),
            ParsedFilter::Resolution(value) => resolution = Some(value),
            ParsedFilter::FrameRate(value) => frame_rate = Some(value),
            ParsedFilter::RateFactor(value) => rate_factor = Some(RateFactor(value)),
            ParsedFilter::Quality(quality) => rate_factor = Some(quality.rate_factor(standard)),
            ParsedFilter::Threads(value) => thread_count = Some(value),
        }
    }

    let resolution =
        resolution.ok_or_else(|| anyhow!("Profile '{}' is missing 'res=WxH'", spec))?;
    let frame_rate = frame_rate.ok_or_else(|| anyhow!("Profile '{}' is missing 'fps='", spec))?;
    if resolution.width == 0 || resolution.height == 0 {
        bail!("Resolution must be non-zero, got {}", resolution);
    }
    let frame_rate = validate_frame_rate(frame_rate).context("Invalid 'fps'")?;
    if thread_count == Some(0) {
        bail!("'threads' must be greater than 0");
    }

    Ok(ProfileRequest {
        name,
        resolution,
        frame_rate,
        rate_factor: rate_factor.unwrap_or_else(|| Quality::Medium.rate_factor(standard)),
        thread_count,
    })
}

fn parse_name(input: &str) -> IResult<&str, ParsedFilter<'_>> {
    preceded(tag("name="), take_till1(|c: char| c == ','))
        .parse_complete(input)
        .map(|(input, token)| (input, ParsedFilter::Name(token)))
}

fn parse_resolution(input: &str) -> IResult<&str, ParsedFilter<'_>> {
    preceded(
        tag("res="),
        (
            map_res(digit1, |token: &str| token.parse::<u32>()),
            char('x'),
            map_res(digit1, |token: &str| token.parse::<u32>()),
        ),
    )
    .parse_complete(input)
    .map(|(input, (width, _, height))| {
        (
            input,
            ParsedFilter::Resolution(Resolution::new(width, height)),
        )
    })
}

fn parse_frame_rate(input: &str) -> IResult<&str, ParsedFilter<'_>> {
    preceded(alt((tag("fps="), tag("r="))), double)
        .parse_complete(input)
        .map(|(input, value)| (input, ParsedFilter::FrameRate(value)))
}

fn parse_rate_factor(input: &str) -> IResult<&str, ParsedFilter<'_>> {
    preceded(alt((tag("q="), tag("crf="))), double)
        .parse_complete(input)
        .map(|(input, value)| (input, ParsedFilter::RateFactor(value)))
}

fn parse_quality(input: &str) -> IResult<&str, ParsedFilter<'_>> {
    preceded(
        tag("quality="),
        map_res(alpha1, |token: &str| token.parse::<Quality>()),
    )
    .parse_complete(input)
    .map(|(input, quality)| (input, ParsedFilter::Quality(quality)))
}

fn parse_threads(input: &str) -> IResult<&str, ParsedFilter<'_>> {
    preceded(
        alt((tag("threads="), tag("t="))),
        map_res(digit1, |token: &str| token.parse::<u8>()),
    )
    .parse_complete(input)
    .map(|(input, value)| (input, ParsedFilter::Threads(value)))
}
