use thiserror_no_std::Error;

use crate::timebase::CaptureOwner;

/// Why a decoder abandoned the frame it was receiving.
///
/// Faults never leave the decoder as errors. They are logged, kept as the
/// decoder's last fault for diagnostics, and otherwise only visible as the
/// decoder falling back to its idle state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFault {
    #[error("no edge arrived while in {phase}")]
    Timeout { phase: &'static str },
    #[error("{width_us} us pulse outside the {phase} window")]
    PulseOutOfTolerance { phase: &'static str, width_us: u32 },
    #[error("checksum {received:#04x} does not match computed {computed:#04x}")]
    ChecksumMismatch { received: u8, computed: u8 },
    #[error("remote frame abandoned after {bits} bits")]
    FrameGuardTimeout { bits: u8 },
}

/// A one-shot delay the counter cannot represent
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("delay of {0} us spans a full counter period")]
    OutOfRange(u32),
}

/// Reasons a decoder refuses to start listening
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    #[error("an acquisition is already in progress")]
    InProgress,
    #[error("capture channel is held by {0:?}")]
    CaptureBusy(CaptureOwner),
    #[error("failed to drive the sensor line")]
    Line,
    #[error("failed to schedule timeout: {0}")]
    Schedule(ScheduleError),
}

impl From<ScheduleError> for AcquireError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}
