use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use glam::Mat4;

use crate::foundation::{
    error::{TurntableError, TurntableResult},
    math::Axis,
};

/// Whether the sweep's last frame lands on `end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointMode {
    /// `start + (end - start) * i / (N - 1)`; last frame is `end`.
    Inclusive,
    /// `start + (end - start) * i / N`; full-turn loops use this to avoid a duplicate frame.
    #[default]
    Exclusive,
}

/// Evenly spaced rotation angles about one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleSweep {
    pub start_deg: f32,
    pub end_deg: f32,
    pub count: usize,
    pub mode: EndpointMode,
    pub axis: Axis,
}

impl AngleSweep {
    pub fn new(
        start_deg: f32,
        end_deg: f32,
        count: usize,
        mode: EndpointMode,
        axis: Axis,
    ) -> TurntableResult<Self> {
        if count == 0 {
            return Err(TurntableError::validation("frame count must be > 0"));
        }
        if !start_deg.is_finite() || !end_deg.is_finite() {
            return Err(TurntableError::validation("sweep angles must be finite"));
        }
        Ok(Self {
            start_deg,
            end_deg,
            count,
            mode,
            axis,
        })
    }

    /// Angle in degrees for frame `i`. A single inclusive frame sits at `start`.
    pub fn angle(&self, i: usize) -> f32 {
        let denom = match self.mode {
            EndpointMode::Inclusive => self.count.saturating_sub(1),
            EndpointMode::Exclusive => self.count,
        };
        if denom == 0 {
            return self.start_deg;
        }
        let t = i as f64 / denom as f64;
        (self.start_deg as f64 + (self.end_deg as f64 - self.start_deg as f64) * t) as f32
    }

    pub fn angles(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.count).map(|i| self.angle(i))
    }

    pub fn rotation(&self, i: usize) -> Mat4 {
        self.axis.rotation(self.angle(i))
    }
}

/// Cooperative abort signal, checked between frames.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    Rendering { index: usize },
    Done,
    Cancelled { next: usize },
}

/// `Idle -> Rendering(0..N-1) -> Done`, one step per written frame.
///
/// The caller renders and writes frame `index`, then calls [`FrameSequencer::complete`].
/// Frames can neither be skipped nor reordered.
#[derive(Clone, Debug)]
pub struct FrameSequencer {
    sweep: AngleSweep,
    state: SequenceState,
    cancel: CancelFlag,
}

impl FrameSequencer {
    pub fn new(sweep: AngleSweep, cancel: CancelFlag) -> Self {
        Self {
            sweep,
            state: SequenceState::Idle,
            cancel,
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn sweep(&self) -> &AngleSweep {
        &self.sweep
    }

    /// Next frame to render as `(index, angle_deg, rotation)`, or `None` when finished.
    pub fn next_frame(&mut self) -> Option<(usize, f32, Mat4)> {
        let index = match self.state {
            SequenceState::Idle => 0,
            SequenceState::Rendering { index } => index,
            SequenceState::Done | SequenceState::Cancelled { .. } => return None,
        };
        self.state = SequenceState::Rendering { index };
        Some((index, self.sweep.angle(index), self.sweep.rotation(index)))
    }

    /// Mark the current frame written and advance. The abort point is here,
    /// after the file exists and before the next angle is computed.
    pub fn complete(&mut self, index: usize) -> TurntableResult<SequenceState> {
        let SequenceState::Rendering { index: current } = self.state else {
            return Err(TurntableError::validation(format!(
                "frame {index} completed while sequencer is {:?}",
                self.state
            )));
        };
        if index != current {
            return Err(TurntableError::validation(format!(
                "frame {index} completed out of order (expected {current})"
            )));
        }
        let next = index + 1;
        self.state = if next >= self.sweep.count {
            SequenceState::Done
        } else if self.cancel.is_cancelled() {
            SequenceState::Cancelled { next }
        } else {
            SequenceState::Rendering { index: next }
        };
        Ok(self.state)
    }
}
