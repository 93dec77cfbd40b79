use itertools::iproduct;

use crate::{
    level::Standard,
    profile::{ProfileRequest, Quality, Resolution},
};

const DEFAULT_FRAME_RATES: [f64; 4] = [25.0, 30.0, 50.0, 60.0];

const AVC_RESOLUTIONS: [Resolution; 10] = [
    Resolution::new(640, 360),
    Resolution::new(640, 480),
    Resolution::new(960, 540),
    Resolution::new(960, 720),
    Resolution::new(1280, 720),
    Resolution::new(1280, 960),
    Resolution::new(1440, 1080),
    Resolution::new(1920, 816),
    Resolution::new(1920, 1080),
    Resolution::new(1920, 1440),
];

const HEVC_RESOLUTIONS: [Resolution; 10] = [
    Resolution::new(960, 720),
    Resolution::new(1280, 720),
    Resolution::new(1280, 960),
    Resolution::new(1440, 1080),
    Resolution::new(1920, 816),
    Resolution::new(1920, 1080),
    Resolution::new(1920, 1440),
    Resolution::new(2560, 1440),
    Resolution::new(3840, 1600),
    Resolution::new(3840, 2160),
];

/// Thread count of the bundled DVD presets.
const DVD_THREADS: u8 = 16;

/// The set of profiles to generate for one standard.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub resolutions: Vec<Resolution>,
    pub frame_rates: Vec<f64>,
    pub qualities: Vec<Quality>,
    pub thread_count: Option<u8>,
    pub named: Vec<ProfileRequest>,
}

impl BatchPlan {
    /// The stock grid for a standard, plus the DVD presets for AVC.
    pub fn default_for(standard: Standard) -> Self {
        let (resolutions, named) = match standard {
            Standard::Avc => (AVC_RESOLUTIONS.to_vec(), dvd_profiles()),
            Standard::Hevc => (HEVC_RESOLUTIONS.to_vec(), Vec::new()),
        };
        BatchPlan {
            resolutions,
            frame_rates: DEFAULT_FRAME_RATES.to_vec(),
            qualities: Quality::ALL.to_vec(),
            thread_count: None,
            named,
        }
    }

    /// A plan with no grid, generating only hand-specified profiles.
    pub const fn empty() -> Self {
        BatchPlan {
            resolutions: Vec::new(),
            frame_rates: Vec::new(),
            qualities: Vec::new(),
            thread_count: None,
            named: Vec::new(),
        }
    }

    /// Named profiles first, then resolution x frame rate x quality in that nesting order.
    pub fn requests(&self, standard: Standard) -> Vec<ProfileRequest> {
        let grid = iproduct!(
            self.resolutions.iter().copied(),
            self.frame_rates.iter().copied(),
            self.qualities.iter().copied()
        )
        .map(|(resolution, frame_rate, quality)| ProfileRequest {
            name: None,
            resolution,
            frame_rate,
            rate_factor: quality.rate_factor(standard),
            thread_count: self.thread_count,
        });
        self.named.iter().cloned().chain(grid).collect()
    }
}

fn dvd_profiles() -> Vec<ProfileRequest> {
    let medium = Quality::Medium.rate_factor(Standard::Avc);
    [
        ("NTSC DVD", Resolution::new(640, 480), 30.0),
        ("PAL DVD", Resolution::new(768, 576), 25.0),
        ("NTSC-WIDE DVD", Resolution::new(864, 480), 30.0),
        ("PAL-WIDE DVD", Resolution::new(1024, 576), 25.0),
    ]
    .into_iter()
    .map(|(name, resolution, frame_rate)| {
        ProfileRequest::new(resolution, frame_rate, medium)
            .with_name(name)
            .with_threads(DVD_THREADS)
    })
    .collect()
}
