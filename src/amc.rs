//! Parser for AMC motion-channel descriptions.
//!
//! An AMC file is a flat stream: a keyword header, then for each frame a
//! 1-indexed frame number followed by one line per joint holding that
//! joint's channel values in degrees (the root's three translation values
//! come first). Nothing here is validated against a skeleton; a frame may
//! name joints the skeleton never declared, and channel counts are only
//! checked when the FK engine consumes them.

use std::collections::HashMap;

use crate::asf::Lines;
use crate::error::{Error, Result};

/// One frame's channel values, keyed by joint name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionFrame {
    /// Frame number as written in the file (1-indexed).
    pub index: usize,
    channels: HashMap<String, Vec<f64>>,
}

impl MotionFrame {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            channels: HashMap::new(),
        }
    }

    /// Set the channel values for a joint (used when building frames
    /// programmatically; the parser fills frames the same way).
    pub fn insert(&mut self, joint: impl Into<String>, values: Vec<f64>) {
        self.channels.insert(joint.into(), values);
    }

    /// Channel values for a joint, if the frame carries any.
    pub fn channels(&self, joint: &str) -> Option<&[f64]> {
        self.channels.get(joint).map(Vec::as_slice)
    }

    /// Number of joints with channel values in this frame.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Parse an AMC motion description into its ordered frame sequence.
pub fn parse_amc(src: &str) -> Result<Vec<MotionFrame>> {
    let mut lines = Lines::new(src);
    let mut frames: Vec<MotionFrame> = Vec::new();

    while let Some(tokens) = lines.next() {
        // Header keywords (:FULLY-SPECIFIED, :DEGREES, ...) carry no data
        if tokens[0].starts_with(':') {
            continue;
        }

        if let Ok(index) = tokens[0].parse::<usize>() {
            if tokens.len() > 1 {
                return Err(Error::MalformedMotion(format!(
                    "unexpected tokens after frame number {index}"
                )));
            }
            if let Some(previous) = frames.last() {
                if index != previous.index + 1 {
                    log::warn!(
                        "non-sequential frame numbers: {} follows {}",
                        index,
                        previous.index
                    );
                }
            }
            frames.push(MotionFrame::new(index));
            continue;
        }

        // Joint line: name followed by its channel values
        let frame = frames.last_mut().ok_or_else(|| {
            Error::MalformedMotion(format!(
                "channel group `{}` before the first frame number",
                tokens[0]
            ))
        })?;
        let mut values = Vec::with_capacity(tokens.len() - 1);
        for token in &tokens[1..] {
            values.push(token.parse::<f64>().map_err(|_| {
                Error::MalformedMotion(format!(
                    "non-numeric value `{token}` for joint `{}` in frame {}",
                    tokens[0], frame.index
                ))
            })?);
        }
        frame.insert(tokens[0], values);
    }

    log::debug!("parsed {} motion frames", frames.len());
    Ok(frames)
}
