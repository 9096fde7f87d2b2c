//! Input validation utilities for configuration values

use crate::error::{Result, TranscodeError};
use crate::types::{BITRATE_RANGE, MAX_PACKET_BYTES, SUPPORTED_CHANNELS, SUPPORTED_SAMPLE_RATES};

/// Validate a sample rate against what the perceptual codec accepts
pub fn validate_sample_rate(sample_rate: u32) -> Result<()> {
    if !SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
        return Err(TranscodeError::InvalidSampleRate {
            rate: sample_rate,
            supported: SUPPORTED_SAMPLE_RATES.to_vec(),
        });
    }

    Ok(())
}

/// Validate a channel count
pub fn validate_channels(channels: u8) -> Result<()> {
    if !SUPPORTED_CHANNELS.contains(&channels) {
        return Err(TranscodeError::InvalidChannelCount {
            channels,
            supported: SUPPORTED_CHANNELS.to_vec(),
        });
    }

    Ok(())
}

/// Validate a target bitrate
pub fn validate_bitrate(bitrate: u32) -> Result<()> {
    let (min, max) = BITRATE_RANGE;

    if bitrate < min || bitrate > max {
        return Err(TranscodeError::InvalidBitrate { bitrate, min, max });
    }

    Ok(())
}

/// Validate a pool capacity
pub fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(TranscodeError::invalid_config(
            "pool capacity must be a positive integer",
        ));
    }

    Ok(())
}

/// Validate the scratch size reserved for one compressed packet
pub fn validate_packet_size(max_packet_bytes: usize) -> Result<()> {
    if max_packet_bytes == 0 {
        return Err(TranscodeError::invalid_config(
            "max packet size must be at least one byte",
        ));
    }

    if max_packet_bytes > MAX_PACKET_BYTES {
        return Err(TranscodeError::invalid_config(format!(
            "max packet size {} exceeds the {} byte limit",
            max_packet_bytes, MAX_PACKET_BYTES
        )));
    }

    Ok(())
}
