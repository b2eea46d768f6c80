//! Fixed table of inactivity durations offered to the user. The control position space `[0, 100]`
//! is split into contiguous bins that are finer at the low end, each bin mapping to one duration.

pub const UNKNOWN_LABEL: &str = "Unknown";

pub const MIN_POSITION: f64 = 0.;
pub const MAX_POSITION: f64 = 100.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HideAfterOption {
    /// Inclusive upper bound of the bin in position space.
    pub upper_bound: f64,
    /// Position the control snaps to when this option is selected.
    pub snapped_position: f64,
    /// Duration in seconds. 0 means never.
    pub seconds: f64,
    pub label: &'static str,
}

const fn option(
    upper_bound: f64,
    snapped_position: f64,
    seconds: f64,
    label: &'static str,
) -> HideAfterOption {
    HideAfterOption {
        upper_bound,
        snapped_position,
        seconds,
        label,
    }
}

const MINUTE: f64 = 60.;
const HOUR: f64 = 60. * MINUTE;

static OPTIONS: [HideAfterOption; 23] = [
    option(0.5, 0., 30., "30 seconds"),
    option(1., 0.75, MINUTE, "1 minute"),
    option(2., 1.5, 2. * MINUTE, "2 minutes"),
    option(3., 2.5, 3. * MINUTE, "3 minutes"),
    option(4., 3.5, 4. * MINUTE, "4 minutes"),
    option(6., 5., 5. * MINUTE, "5 minutes"),
    option(8., 7., 10. * MINUTE, "10 minutes"),
    option(12., 10., 15. * MINUTE, "15 minutes"),
    option(15., 13.5, 20. * MINUTE, "20 minutes"),
    option(17.5, 16.25, 25. * MINUTE, "25 minutes"),
    option(22.5, 20., 30. * MINUTE, "30 minutes"),
    option(25., 23.75, 35. * MINUTE, "35 minutes"),
    option(27.5, 26.25, 40. * MINUTE, "40 minutes"),
    option(32.5, 30., 45. * MINUTE, "45 minutes"),
    option(35., 33.75, 50. * MINUTE, "50 minutes"),
    option(37.5, 36.25, 55. * MINUTE, "55 minutes"),
    option(45., 40., HOUR, "1 hour"),
    option(55., 50., 2. * HOUR, "2 hours"),
    option(65., 60., 3. * HOUR, "3 hours"),
    option(75., 70., 4. * HOUR, "4 hours"),
    option(85., 80., 5. * HOUR, "5 hours"),
    option(95., 90., 6. * HOUR, "6 hours"),
    option(100., 100., 0., "Never"),
];

pub fn options() -> impl Iterator<Item = &'static HideAfterOption> {
    OPTIONS.iter()
}

/// Returns the option whose bin contains `position`. Bins are checked in ascending order, so a
/// position on a boundary belongs to the lower bin. Positions outside `[0, 100]` have no option.
pub fn option_for_position(position: f64) -> Option<&'static HideAfterOption> {
    if !(MIN_POSITION..=MAX_POSITION).contains(&position) {
        return None;
    }
    OPTIONS.iter().find(|v| position <= v.upper_bound)
}

pub fn option_for_seconds(seconds: f64) -> Option<&'static HideAfterOption> {
    OPTIONS.iter().find(|v| v.seconds == seconds)
}

pub fn position_for_seconds(seconds: f64) -> Option<f64> {
    option_for_seconds(seconds).map(|v| v.snapped_position)
}

pub fn label(seconds: f64) -> &'static str {
    option_for_seconds(seconds).map_or(UNKNOWN_LABEL, |v| v.label)
}
