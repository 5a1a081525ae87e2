//! Frame encoders and decoders for the servo board protocol.
//!
//! Every frame starts with the `0xff` header followed by a command byte.
//! Nothing here touches a transport; callers write the returned bytes.

use std::ops::Deref;

use strum_macros::Display;

use crate::{
    constants::*,
    error::{RangeField, Result, RobotError},
    types::Units,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[repr(u8)]
pub enum Opcode {
    Heartbeat = CMD_HEARTBEAT,
    SetSpeed = CMD_SET_SPEED,
    SetPosition = CMD_SET_POSITION,
    ExecuteActionGroup = CMD_EXECUTE_ACTION_GROUP,
    Emergency = CMD_EMERGENCY,
}

/// One encoded hardware command.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
    opcode: Opcode,
    bytes: Vec<u8>,
}

impl Frame {
    fn new(opcode: Opcode, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(2 + payload.len());
        bytes.push(HEADER);
        bytes.push(opcode as u8);
        bytes.extend_from_slice(payload);
        Frame { opcode, bytes }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

fn check_channel(channel: i32) -> Result<u8> {
    RobotError::check_range(RangeField::Channel, channel, MIN_CHANNEL, MAX_CHANNEL)?;
    Ok(channel as u8)
}

/// Linear map from [0, 180] degrees onto [500, 2500] pulse units.
pub fn angle_to_pulse(angle: i32) -> u16 {
    let span = (MAX_PULSE - MIN_PULSE) as f64 / (MAX_ANGLE - MIN_ANGLE) as f64;
    (angle as f64 * span + MIN_PULSE as f64).round() as u16
}

fn position_frame(channel: u8, pulse: u16) -> Frame {
    let [low, high] = pulse.to_le_bytes();
    Frame::new(Opcode::SetPosition, &[channel, low, high])
}

pub fn encode_position(channel: i32, angle: i32) -> Result<Frame> {
    let channel = check_channel(channel)?;
    RobotError::check_range(RangeField::Angle, angle, MIN_ANGLE, MAX_ANGLE)?;
    Ok(position_frame(channel, angle_to_pulse(angle)))
}

/// Position command for callers that already speak raw pulse widths.
pub fn encode_pulse(channel: i32, pulse: i32) -> Result<Frame> {
    let channel = check_channel(channel)?;
    RobotError::check_range(RangeField::Pulse, pulse, MIN_PULSE, MAX_PULSE)?;
    Ok(position_frame(channel, pulse as u16))
}

pub fn encode_target(units: Units, channel: i32, value: i32) -> Result<Frame> {
    match units {
        Units::Degrees => encode_position(channel, value),
        Units::Pulse => encode_pulse(channel, value),
    }
}

/// Pulse carried by a set-position frame, `None` for any other frame.
pub fn decode_pulse(frame: &[u8]) -> Option<u16> {
    match frame {
        [HEADER, CMD_SET_POSITION, _, low, high] => Some(u16::from_le_bytes([*low, *high])),
        _ => None,
    }
}

/// Speed is sticky per channel on the board until changed.
pub fn encode_speed(channel: i32, speed: i32) -> Result<Frame> {
    let channel = check_channel(channel)?;
    RobotError::check_range(RangeField::Speed, speed, MIN_SPEED, MAX_SPEED)?;
    Ok(Frame::new(Opcode::SetSpeed, &[channel, speed as u8, 0x00]))
}

pub fn encode_heartbeat() -> Frame {
    Frame::new(Opcode::Heartbeat, &HEARTBEAT_REQUEST[2..])
}

/// An empty response means the read timed out.
pub fn decode_heartbeat(response: &[u8]) -> Result<()> {
    if response.is_empty() {
        Err(RobotError::Timeout)
    } else if response == HEARTBEAT_ACK {
        Ok(())
    } else {
        Err(RobotError::Protocol {
            bytes: response.to_vec(),
        })
    }
}

fn emergency_frame(flag: u8) -> Frame {
    let mut payload = vec![0x00, flag, 0x00];
    payload.resize(payload.len() + EMERGENCY_PADDING, 0x00);
    Frame::new(Opcode::Emergency, &payload)
}

pub fn encode_emergency_stop() -> Frame {
    emergency_frame(0x01)
}

pub fn encode_emergency_recovery() -> Frame {
    emergency_frame(0x00)
}

/// Runs a move sequence stored on the board itself.
pub fn encode_execute_action_group(group: i32) -> Result<Frame> {
    RobotError::check_range(RangeField::ActionGroup, group, MIN_ACTION_GROUP, MAX_ACTION_GROUP)?;
    Ok(Frame::new(Opcode::ExecuteActionGroup, &[0x00, group as u8, 0x00]))
}
