use std::{
    fmt::{self, Display},
    str::FromStr,
};

use anyhow::{Result, bail};
use itertools::Itertools;

use crate::profile::Resolution;

/// Pixels covered by one 16x16 AVC macroblock.
const MACROBLOCK_PIXELS: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    Avc,
    Hevc,
}

impl Standard {
    pub const fn encoder_name(self) -> &'static str {
        match self {
            Standard::Avc => "x264",
            Standard::Hevc => "x265",
        }
    }
}

impl Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Standard::Avc => "avc",
                Standard::Hevc => "hevc",
            }
        )
    }
}

impl FromStr for Standard {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_ref() {
            "avc" | "h264" | "x264" => Standard::Avc,
            "hevc" | "h265" | "x265" => Standard::Hevc,
            _ => {
                return Err("Unrecognized standard");
            }
        })
    }
}

/// A level ordinal, e.g. `41` for level 4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    pub const fn new(ordinal: u8) -> Self {
        Level(ordinal)
    }

    pub const fn ordinal(self) -> u8 {
        self.0
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// Constraints of a single level.
///
/// `capacity_max` is counted in macroblocks per second for AVC
/// and luma samples per second for HEVC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelLimit {
    pub level: Level,
    pub capacity_max: u64,
    pub bit_rate_max_kbps: u32,
    pub ref_frame_max: Option<u8>,
}

const fn avc(level: u8, macroblocks: u64, bit_rate: u32, ref_frames: u8) -> LevelLimit {
    LevelLimit {
        level: Level(level),
        capacity_max: macroblocks,
        bit_rate_max_kbps: bit_rate,
        ref_frame_max: Some(ref_frames),
    }
}

const fn hevc(level: u8, luma_samples: u64, bit_rate: u32) -> LevelLimit {
    LevelLimit {
        level: Level(level),
        capacity_max: luma_samples,
        bit_rate_max_kbps: bit_rate,
        ref_frame_max: None,
    }
}

const AVC_LEVELS: [LevelLimit; 19] = [
    avc(10, 1_485, 64, 2),
    avc(11, 3_000, 192, 2),
    avc(12, 6_000, 384, 2),
    avc(13, 11_880, 768, 2),
    avc(20, 11_880, 2_000, 2),
    avc(21, 19_800, 4_000, 2),
    avc(22, 20_250, 4_000, 2),
    avc(30, 40_500, 10_000, 2),
    avc(31, 108_000, 14_000, 3),
    avc(32, 216_000, 20_000, 4),
    avc(40, 245_760, 20_000, 6),
    avc(41, 245_760, 50_000, 6),
    avc(42, 522_240, 50_000, 7),
    avc(50, 589_824, 135_000, 16),
    avc(51, 983_040, 240_000, 16),
    avc(52, 2_073_600, 240_000, 16),
    avc(60, 4_177_920, 240_000, 16),
    avc(61, 8_355_840, 480_000, 16),
    avc(62, 16_711_680, 800_000, 16),
];

const HEVC_LEVELS: [LevelLimit; 13] = [
    hevc(10, 552_960, 128),
    hevc(20, 3_686_400, 1_500),
    hevc(21, 7_372_800, 3_000),
    hevc(30, 16_588_800, 6_000),
    hevc(31, 33_177_600, 10_000),
    hevc(40, 66_846_720, 12_000),
    hevc(41, 133_693_440, 20_000),
    hevc(50, 267_386_880, 25_000),
    hevc(51, 534_773_760, 40_000),
    hevc(52, 1_069_547_520, 60_000),
    hevc(60, 1_069_547_520, 60_000),
    hevc(61, 2_139_095_040, 120_000),
    hevc(62, 4_278_190_080, 240_000),
];

/// Capacity a stream of the given geometry needs, in the unit of the standard's level table.
pub fn required_capacity(standard: Standard, resolution: Resolution, frame_rate: f64) -> u64 {
    let samples = f64::from(resolution.width) * f64::from(resolution.height) * frame_rate;
    match standard {
        Standard::Avc => (samples / MACROBLOCK_PIXELS).floor() as u64,
        Standard::Hevc => samples.floor() as u64,
    }
}

/// Level limits of one standard, ascending by level.
#[derive(Debug, Clone)]
pub struct LevelTable {
    standard: Standard,
    entries: Vec<LevelLimit>,
}

impl LevelTable {
    pub fn new(standard: Standard, entries: Vec<LevelLimit>) -> Self {
        LevelTable { standard, entries }
    }

    pub fn avc() -> Self {
        Self::new(Standard::Avc, AVC_LEVELS.to_vec())
    }

    pub fn hevc() -> Self {
        Self::new(Standard::Hevc, HEVC_LEVELS.to_vec())
    }

    pub fn for_standard(standard: Standard) -> Self {
        match standard {
            Standard::Avc => Self::avc(),
            Standard::Hevc => Self::hevc(),
        }
    }

    pub const fn standard(&self) -> Standard {
        self.standard
    }

    /// Checks that levels are strictly ascending and capacity never shrinks.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            bail!("{} level table is empty", self.standard);
        }
        if let Some((prev, next)) = self.entries.iter().tuple_windows().find(|(prev, next)| {
            prev.level >= next.level || prev.capacity_max > next.capacity_max
        }) {
            bail!(
                "{} level table is out of order between level {} and level {}",
                self.standard,
                prev.level,
                next.level
            );
        }
        Ok(())
    }

    /// Returns the lowest level able to carry the given resolution and frame rate.
    ///
    /// `None` means the input is degenerate or exceeds every level in the table.
    pub fn min_level(&self, resolution: Resolution, frame_rate: f64) -> Option<Level> {
        if resolution.width == 0 || resolution.height == 0 || frame_rate.is_nan() || frame_rate <= 0.0
        {
            return None;
        }
        let required = required_capacity(self.standard, resolution, frame_rate);
        self.entries
            .iter()
            .find(|limit| limit.capacity_max >= required)
            .map(|limit| limit.level)
    }

    pub fn limits_for_level(&self, level: Level) -> Option<LevelLimit> {
        if level.ordinal() == 0 {
            return None;
        }
        self.entries
            .iter()
            .find(|limit| limit.level == level)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn res(width: u32, height: u32) -> Resolution {
        Resolution::new(width, height)
    }

    #[test]
    fn test_builtin_tables_are_ordered() {
        assert!(LevelTable::avc().validate().is_ok());
        assert!(LevelTable::hevc().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_shrinking_capacity() {
        let table = LevelTable::new(
            Standard::Hevc,
            vec![hevc(10, 1_000, 1), hevc(20, 500, 2)],
        );
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::new(41).to_string(), "4.1");
        assert_eq!(Level::new(10).to_string(), "1.0");
        assert_eq!(Level::new(0).to_string(), "0.0");
    }

    #[test]
    fn test_required_capacity_avc_counts_macroblocks() {
        assert_eq!(required_capacity(Standard::Avc, res(640, 480), 30.0), 36_000);
        assert_eq!(required_capacity(Standard::Avc, res(1920, 1080), 30.0), 243_000);
        // 1280 * 720 * 25.5 / 256 = 91800, 640 * 360 * 1 / 256 = 900
        assert_eq!(required_capacity(Standard::Avc, res(1280, 720), 25.5), 91_800);
        assert_eq!(required_capacity(Standard::Avc, res(640, 360), 1.0), 900);
        // Partial macroblocks are floored
        assert_eq!(required_capacity(Standard::Avc, res(16, 16), 1.5), 1);
    }

    #[test]
    fn test_required_capacity_hevc_counts_luma_samples() {
        assert_eq!(
            required_capacity(Standard::Hevc, res(3840, 2160), 60.0),
            497_664_000
        );
        // Does not wrap for geometries beyond 32 bits
        assert_eq!(
            required_capacity(Standard::Hevc, res(16384, 16384), 60.0),
            16_106_127_360
        );
    }

    #[test]
    fn test_avc_min_level_1080p30() {
        assert_eq!(
            LevelTable::avc().min_level(res(1920, 1080), 30.0),
            Some(Level::new(40))
        );
    }

    #[test]
    fn test_avc_min_level_skips_smaller_levels() {
        // 36000 MB/s: 2.0 (11880), 2.1 (19800) and 2.2 (20250) are too small
        assert_eq!(
            LevelTable::avc().min_level(res(640, 480), 30.0),
            Some(Level::new(30))
        );
    }

    #[test]
    fn test_avc_min_level_picks_first_of_shared_capacity() {
        // 1.3 and 2.0 share 11880 MB/s, the lower level wins
        // 352 * 288 * 30 / 256 = 11880
        assert_eq!(
            LevelTable::avc().min_level(res(352, 288), 30.0),
            Some(Level::new(13))
        );
    }

    #[test]
    fn test_hevc_min_level() {
        let table = LevelTable::hevc();
        assert_eq!(table.min_level(res(1920, 1080), 30.0), Some(Level::new(40)));
        assert_eq!(table.min_level(res(1920, 1080), 60.0), Some(Level::new(41)));
        assert_eq!(table.min_level(res(3840, 2160), 60.0), Some(Level::new(51)));
        // 5.2 and 6.0 share a capacity, 5.2 is returned
        assert_eq!(table.min_level(res(3840, 2160), 120.0), Some(Level::new(52)));
    }

    #[test]
    fn test_min_level_capacity_boundary_is_inclusive() {
        let table = LevelTable::hevc();
        // 552960 luma samples per second exactly fills level 1.0
        assert_eq!(table.min_level(res(256, 144), 15.0), Some(Level::new(10)));
        assert_eq!(table.min_level(res(256, 144), 15.1), Some(Level::new(20)));
    }

    #[test]
    fn test_min_level_beyond_table_is_none() {
        assert_eq!(LevelTable::avc().min_level(res(7680, 4320), 240.0), None);
        assert_eq!(LevelTable::hevc().min_level(res(7680, 4320), 240.0), None);
    }

    #[test]
    fn test_min_level_just_below_largest_entry() {
        // 8192 * 4320 * 120 = 4246732800 <= 4278190080
        assert_eq!(
            LevelTable::hevc().min_level(res(8192, 4320), 120.0),
            Some(Level::new(62))
        );
    }

    #[test]
    fn test_min_level_at_largest_avc_entry() {
        // 4096 * 2048 / 256 * 510 = 16711680 macroblocks per second, level 6.2 exactly
        let table = LevelTable::avc();
        assert_eq!(table.min_level(res(4096, 2048), 510.0), Some(Level::new(62)));
        assert_eq!(table.min_level(res(4096, 2048), 510.01), None);
    }

    #[test]
    fn test_min_level_rejects_degenerate_input() {
        for table in [LevelTable::avc(), LevelTable::hevc()] {
            assert_eq!(table.min_level(res(1920, 0), 30.0), None);
            assert_eq!(table.min_level(res(0, 1080), 30.0), None);
            assert_eq!(table.min_level(res(1920, 1080), 0.0), None);
            assert_eq!(table.min_level(res(1920, 1080), -24.0), None);
            assert_eq!(table.min_level(res(1920, 1080), f64::NAN), None);
        }
    }

    #[test]
    fn test_limits_for_resolved_level_cover_requirement() {
        for table in [LevelTable::avc(), LevelTable::hevc()] {
            for (width, height) in [(640, 360), (1280, 720), (1920, 1080), (3840, 2160)] {
                for fps in [23.976, 25.0, 30.0, 50.0, 60.0] {
                    let resolution = res(width, height);
                    let level = table
                        .min_level(resolution, fps)
                        .expect("level should resolve");
                    let limits = table
                        .limits_for_level(level)
                        .expect("resolved level should exist");
                    assert!(
                        limits.capacity_max
                            >= required_capacity(table.standard(), resolution, fps)
                    );
                }
            }
        }
    }

    #[test]
    fn test_limits_for_level() {
        let table = LevelTable::avc();
        let limits = table
            .limits_for_level(Level::new(40))
            .expect("level 4.0 should exist");
        assert_eq!(limits.capacity_max, 245_760);
        assert_eq!(limits.bit_rate_max_kbps, 20_000);
        assert_eq!(limits.ref_frame_max, Some(6));

        let limits = LevelTable::hevc()
            .limits_for_level(Level::new(51))
            .expect("level 5.1 should exist");
        assert_eq!(limits.capacity_max, 534_773_760);
        assert_eq!(limits.ref_frame_max, None);
    }

    #[test]
    fn test_limits_for_unknown_level_is_none() {
        let table = LevelTable::avc();
        assert_eq!(table.limits_for_level(Level::new(0)), None);
        assert_eq!(table.limits_for_level(Level::new(14)), None);
        assert_eq!(LevelTable::hevc().limits_for_level(Level::new(11)), None);
    }

    #[test]
    fn test_limits_are_copies() {
        let table = LevelTable::avc();
        let mut limits = table
            .limits_for_level(Level::new(30))
            .expect("level 3.0 should exist");
        limits.capacity_max = 0;
        assert_eq!(limits.capacity_max, 0);
        assert_eq!(
            table
                .limits_for_level(Level::new(30))
                .map(|limit| limit.capacity_max),
            Some(40_500)
        );
    }

    #[test]
    fn test_min_level_is_repeatable() {
        let table = LevelTable::hevc();
        let first = table.min_level(res(2560, 1440), 50.0);
        assert_eq!(first, table.min_level(res(2560, 1440), 50.0));
    }

    #[test]
    fn test_standard_from_str() {
        assert_eq!("AVC".parse::<Standard>(), Ok(Standard::Avc));
        assert_eq!("x265".parse::<Standard>(), Ok(Standard::Hevc));
        assert!("vp9".parse::<Standard>().is_err());
    }
}
