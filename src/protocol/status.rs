//! Status response parsing.
//!
//! Parses the notification sent by the Bot in reply to a status query.

use tracing::trace;

use crate::error::{Error, Result};

/// Status byte signalling a successful response.
pub const STATUS_SUCCESS: u8 = 0x01;

/// Wire layout of a status response.
///
/// Two firmware generations answer the status query differently. Both start
/// with status, battery, firmware and strength at bytes 0-3; they differ in
/// the width of the ADC and motor calibration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusLayout {
    /// ADC and motor calibration as big-endian u16 (bytes 4-5, 6-7), 11 bytes.
    #[default]
    Extended,
    /// ADC and motor calibration as single bytes (bytes 4, 5), 9 bytes.
    Compact,
    /// Pick `Extended` or `Compact` from the frame length.
    Detect,
}

impl StatusLayout {
    /// Length of a full frame in this layout (`Detect` reports the shortest).
    pub fn frame_len(&self) -> usize {
        match self {
            Self::Extended => 11,
            Self::Compact | Self::Detect => 9,
        }
    }

    /// Resolve `Detect` against an actual frame.
    fn resolve(self, frame: &[u8]) -> Self {
        match self {
            Self::Detect if frame.len() >= Self::Extended.frame_len() => Self::Extended,
            Self::Detect => Self::Compact,
            fixed => fixed,
        }
    }
}

/// Device status decoded from a successful status response.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusRecord {
    /// Battery level (0-100).
    pub battery_percent: u8,
    /// Firmware version, e.g. `4.9`.
    pub firmware_version: f64,
    /// Push strength setting.
    pub push_strength: u8,
    /// ADC value read from the sensor.
    pub adc_value: u16,
    /// Motor calibration value.
    pub motor_calibration: u16,
    /// Number of configured timers.
    pub timer_count: u8,
    /// Raw act mode byte.
    pub act_mode: u8,
    /// Hold-and-press count.
    pub hold_press_count: u8,
}

impl StatusRecord {
    /// Raw firmware byte (version in tenths).
    pub fn firmware_raw(&self) -> u8 {
        (self.firmware_version * 10.0).round().clamp(0.0, 255.0) as u8
    }
}

/// Decode a status response using the extended (16-bit) layout.
pub fn decode_status(frame: &[u8]) -> Result<StatusRecord> {
    decode_status_with_layout(frame, StatusLayout::Extended)
}

/// Decode a status response using the given layout.
///
/// Fails with [`Error::ResponseStatus`] when byte 0 is not the success code
/// and with [`Error::MalformedFrame`] when the frame is shorter than the
/// layout requires.
pub fn decode_status_with_layout(frame: &[u8], layout: StatusLayout) -> Result<StatusRecord> {
    trace!("Decoding status frame ({:?}): {:02X?}", layout, frame);

    let code = *frame.first().ok_or_else(|| Error::MalformedFrame {
        context: "Empty status frame".to_string(),
    })?;
    if code != STATUS_SUCCESS {
        return Err(Error::ResponseStatus { code });
    }

    let layout = layout.resolve(frame);
    let required = layout.frame_len();
    if frame.len() < required {
        return Err(Error::MalformedFrame {
            context: format!(
                "Status frame too short: {} bytes (need at least {})",
                frame.len(),
                required
            ),
        });
    }

    // Bytes 1-3 are shared by both layouts
    let battery_percent = frame[1];
    let firmware_version = f64::from(frame[2]) / 10.0;
    let push_strength = frame[3];

    let (adc_value, motor_calibration, tail) = match layout {
        StatusLayout::Compact => (u16::from(frame[4]), u16::from(frame[5]), &frame[6..9]),
        _ => (
            u16::from_be_bytes([frame[4], frame[5]]),
            u16::from_be_bytes([frame[6], frame[7]]),
            &frame[8..11],
        ),
    };

    Ok(StatusRecord {
        battery_percent,
        firmware_version,
        push_strength,
        adc_value,
        motor_calibration,
        timer_count: tail[0],
        act_mode: tail[1],
        hold_press_count: tail[2],
    })
}

/// Build a successful status response frame for a record.
///
/// `Detect` encodes as `Extended`. The compact layout truncates ADC and
/// motor calibration to their low byte.
pub fn encode_status(record: &StatusRecord, layout: StatusLayout) -> Vec<u8> {
    let mut frame = vec![
        STATUS_SUCCESS,
        record.battery_percent,
        record.firmware_raw(),
        record.push_strength,
    ];

    match layout {
        StatusLayout::Compact => {
            frame.push(record.adc_value as u8);
            frame.push(record.motor_calibration as u8);
        }
        StatusLayout::Extended | StatusLayout::Detect => {
            frame.extend_from_slice(&record.adc_value.to_be_bytes());
            frame.extend_from_slice(&record.motor_calibration.to_be_bytes());
        }
    }

    frame.extend_from_slice(&[
        record.timer_count,
        record.act_mode,
        record.hold_press_count,
    ]);
    frame
}
