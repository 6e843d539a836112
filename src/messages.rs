// Command wire format shared by the controller and the robot
//
// Payload format: [CommandId, Params...]
// - MotorSpeed: [0x03, left as i8, right as i8]
// - MotorStop:  [0x04]

use serde::{Deserialize, Serialize};

/// Motor speeds are percentages in this range
pub const MAX_SPEED_PERCENT: i8 = 100;

/// Command id byte at the start of every payload
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandId {
    MotorSettings = 2, // reserved by the robot firmware, never sent by the controller
    MotorSpeed = 3,
    MotorStop = 4,
}

impl TryFrom<u8> for CommandId {
    type Error = CommandError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            2 => Ok(CommandId::MotorSettings),
            3 => Ok(CommandId::MotorSpeed),
            4 => Ok(CommandId::MotorStop),
            other => Err(CommandError::UnknownCommand(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty payload")]
    Empty,

    #[error("Unknown command id 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("Command {id:?} expects {expected} bytes, got {got}")]
    Length { id: CommandId, expected: usize, got: usize },

    #[error("Command {0:?} is not supported")]
    Unsupported(CommandId),

    #[error("Motor speed {0} outside of -100..=100")]
    SpeedOutOfRange(i8),
}

/// Command sent to the robot
///
/// Build speed commands through [`MotorCommand::speed`] so that a zero
/// speed pair always becomes [`MotorCommand::Stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorCommand {
    Speed { left: i8, right: i8 },
    Stop,
}

impl MotorCommand {
    /// Clamp to -100..=100 and turn (0, 0) into Stop
    pub fn speed(left: i8, right: i8) -> Self {
        let left = left.clamp(-MAX_SPEED_PERCENT, MAX_SPEED_PERCENT);
        let right = right.clamp(-MAX_SPEED_PERCENT, MAX_SPEED_PERCENT);

        if left == 0 && right == 0 {
            MotorCommand::Stop
        } else {
            MotorCommand::Speed { left, right }
        }
    }

    pub fn id(&self) -> CommandId {
        match self {
            MotorCommand::Speed { .. } => CommandId::MotorSpeed,
            MotorCommand::Stop => CommandId::MotorStop,
        }
    }

    /// Left and right speeds; both zero for Stop
    pub fn speeds(&self) -> (i8, i8) {
        match *self {
            MotorCommand::Speed { left, right } => (left, right),
            MotorCommand::Stop => (0, 0),
        }
    }

    /// Same command with speeds clamped and a zero pair turned into Stop
    pub fn normalized(&self) -> Self {
        match *self {
            MotorCommand::Speed { left, right } => MotorCommand::speed(left, right),
            MotorCommand::Stop => MotorCommand::Stop,
        }
    }

    /// Serialize to the byte payload handed to the SDK
    ///
    /// Hand-built `Speed` values are normalized first, so `Speed { 0, 0 }`
    /// goes out as Stop and every encoded speed decodes again.
    pub fn encode(&self) -> Vec<u8> {
        match self.normalized() {
            MotorCommand::Speed { left, right } => {
                vec![CommandId::MotorSpeed as u8, left as u8, right as u8]
            }
            MotorCommand::Stop => vec![CommandId::MotorStop as u8],
        }
    }

    /// Parse a payload as received by the robot
    pub fn decode(payload: &[u8]) -> Result<Self, CommandError> {
        let (&first, params) = payload.split_first().ok_or(CommandError::Empty)?;

        match CommandId::try_from(first)? {
            CommandId::MotorSpeed => {
                let &[left, right] = params else {
                    return Err(CommandError::Length {
                        id: CommandId::MotorSpeed,
                        expected: 3,
                        got: payload.len(),
                    });
                };
                let (left, right) = (left as i8, right as i8);
                for speed in [left, right] {
                    if !(-MAX_SPEED_PERCENT..=MAX_SPEED_PERCENT).contains(&speed) {
                        return Err(CommandError::SpeedOutOfRange(speed));
                    }
                }
                Ok(MotorCommand::speed(left, right))
            }
            CommandId::MotorStop => {
                if !params.is_empty() {
                    return Err(CommandError::Length {
                        id: CommandId::MotorStop,
                        expected: 1,
                        got: payload.len(),
                    });
                }
                Ok(MotorCommand::Stop)
            }
            CommandId::MotorSettings => Err(CommandError::Unsupported(CommandId::MotorSettings)),
        }
    }
}

impl std::fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotorCommand::Speed { left, right } => write!(f, "MotorSpeed({}, {})", left, right),
            MotorCommand::Stop => write!(f, "MotorStop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_single_byte() {
        assert_eq!(MotorCommand::Stop.encode(), vec![0x04]);
    }

    #[test]
    fn test_speed_is_twos_complement() {
        let cmd = MotorCommand::speed(-50, 60);
        assert_eq!(cmd.encode(), vec![0x03, 0xCE, 0x3C]);
    }

    #[test]
    fn test_zero_speed_becomes_stop() {
        assert_eq!(MotorCommand::speed(0, 0), MotorCommand::Stop);
        assert_eq!(MotorCommand::speed(0, 0).encode(), vec![0x04]);
        assert_eq!(
            MotorCommand::speed(0, -1),
            MotorCommand::Speed { left: 0, right: -1 }
        );
    }

    #[test]
    fn test_encode_normalizes_hand_built_speeds() {
        let zero = MotorCommand::Speed { left: 0, right: 0 };
        assert_eq!(zero.normalized(), MotorCommand::Stop);
        assert_eq!(zero.encode(), vec![0x04]);

        let wild = MotorCommand::Speed { left: 127, right: -128 };
        assert_eq!(wild.encode(), vec![0x03, 100, (-100i8) as u8]);
        assert_eq!(
            MotorCommand::decode(&wild.encode()),
            Ok(MotorCommand::Speed { left: 100, right: -100 })
        );
    }

    #[test]
    fn test_speed_is_clamped() {
        assert_eq!(
            MotorCommand::speed(i8::MIN, 127),
            MotorCommand::Speed { left: -100, right: 100 }
        );
    }

    #[test]
    fn test_decode_speed() {
        assert_eq!(
            MotorCommand::decode(&[0x03, 0xCE, 0x3C]),
            Ok(MotorCommand::Speed { left: -50, right: 60 })
        );
        assert_eq!(MotorCommand::decode(&[0x03, 0, 0]), Ok(MotorCommand::Stop));
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        assert_eq!(MotorCommand::decode(&[]), Err(CommandError::Empty));
        assert_eq!(
            MotorCommand::decode(&[0x7F]),
            Err(CommandError::UnknownCommand(0x7F))
        );
        assert_eq!(
            MotorCommand::decode(&[0x03, 0x10]),
            Err(CommandError::Length {
                id: CommandId::MotorSpeed,
                expected: 3,
                got: 2
            })
        );
        assert_eq!(
            MotorCommand::decode(&[0x04, 0x00]),
            Err(CommandError::Length {
                id: CommandId::MotorStop,
                expected: 1,
                got: 2
            })
        );
        assert_eq!(
            MotorCommand::decode(&[0x03, 0x7F, 0x00]),
            Err(CommandError::SpeedOutOfRange(127))
        );
        assert_eq!(
            MotorCommand::decode(&[0x02]),
            Err(CommandError::Unsupported(CommandId::MotorSettings))
        );
    }

    #[test]
    fn test_display_matches_log_format() {
        assert_eq!(MotorCommand::speed(10, -20).to_string(), "MotorSpeed(10, -20)");
        assert_eq!(MotorCommand::Stop.to_string(), "MotorStop");
    }
}
