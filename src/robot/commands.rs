//! Gesture and command vocabulary.
//!
//! Gestures arrive as raw tokens from an intake (keyboard, TCP client, wristband classifier).
//! [`Gesture::parse`] is total: every token maps to a variant, unknown ones to [`Gesture::Idle`].
//! The state machine turns gestures into [`Command`]s, the only vocabulary the scheduler accepts.
use core::fmt::Display;

use crate::GESTURE_TOKEN_SIZE;

/// Raw token as received from a gesture source.
pub type GestureToken = heapless::String<GESTURE_TOKEN_SIZE>;

/// Travel direction handed to the gait engine. `InPlace` only exists for jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    InPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// The `none` token: the operator is not gesturing.
    Rest,
    Stop,
    Idle,
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Jump,
    JumpForward,
    JumpBackward,
    JumpLeft,
    JumpRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Idle,
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Jump,
    JumpForward,
    JumpBackward,
    JumpLeft,
    JumpRight,
}

// word tokens first, then the keyboard aliases
const GESTURE_TOKENS: [(&str, Gesture); 24] = [
    ("none", Gesture::Rest),
    ("stop", Gesture::Stop),
    ("idle", Gesture::Idle),
    ("forward", Gesture::Forward),
    ("backward", Gesture::Backward),
    ("turn_left", Gesture::TurnLeft),
    ("turn_right", Gesture::TurnRight),
    ("jump", Gesture::Jump),
    ("jump_forward", Gesture::JumpForward),
    ("jump_backward", Gesture::JumpBackward),
    ("jump_left", Gesture::JumpLeft),
    ("jump_right", Gesture::JumpRight),
    ("w", Gesture::Forward),
    ("x", Gesture::Backward),
    ("a", Gesture::TurnLeft),
    ("d", Gesture::TurnRight),
    ("s", Gesture::Stop),
    ("space", Gesture::Stop),
    ("j", Gesture::Jump),
    ("jw", Gesture::JumpForward),
    ("jx", Gesture::JumpBackward),
    ("ja", Gesture::JumpLeft),
    ("jd", Gesture::JumpRight),
    ("", Gesture::Rest),
];

impl Gesture {
    /// Case-insensitive, whitespace-tolerant and total.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        GESTURE_TOKENS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, gesture)| *gesture)
            .unwrap_or(Gesture::Idle)
    }

    /// Walking gestures that lift the robot out of `Idle` or `SafetyStop`.
    pub fn starts_motion(self) -> bool {
        matches!(
            self,
            Gesture::Forward | Gesture::TurnLeft | Gesture::TurnRight
        )
    }

    pub fn command(self) -> Command {
        match self {
            Gesture::Rest | Gesture::Stop | Gesture::Idle => Command::Idle,
            Gesture::Forward => Command::Forward,
            Gesture::Backward => Command::Backward,
            Gesture::TurnLeft => Command::TurnLeft,
            Gesture::TurnRight => Command::TurnRight,
            Gesture::Jump => Command::Jump,
            Gesture::JumpForward => Command::JumpForward,
            Gesture::JumpBackward => Command::JumpBackward,
            Gesture::JumpLeft => Command::JumpLeft,
            Gesture::JumpRight => Command::JumpRight,
        }
    }
}

impl From<&str> for Gesture {
    fn from(token: &str) -> Self {
        Gesture::parse(token)
    }
}

impl Command {
    /// Total: unknown tokens are `Idle`.
    pub fn parse(token: &str) -> Self {
        Gesture::parse(token).command()
    }

    /// Walking direction, `None` for idle and for jumps.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Command::Forward => Some(Direction::Forward),
            Command::Backward => Some(Direction::Backward),
            Command::TurnLeft => Some(Direction::Left),
            Command::TurnRight => Some(Direction::Right),
            _ => None,
        }
    }

    /// Jump gait and direction for the jump commands.
    pub fn jump(self) -> Option<(&'static str, Direction)> {
        use crate::robot::gaits::{JUMP, JUMP_BACKWARD, JUMP_FORWARD};

        match self {
            Command::Jump => Some((JUMP, Direction::InPlace)),
            Command::JumpForward => Some((JUMP_FORWARD, Direction::Forward)),
            Command::JumpBackward => Some((JUMP_BACKWARD, Direction::Backward)),
            Command::JumpLeft => Some((JUMP_FORWARD, Direction::Left)),
            Command::JumpRight => Some((JUMP_FORWARD, Direction::Right)),
            _ => None,
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Command::Idle => "idle",
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::TurnLeft => "turn_left",
            Command::TurnRight => "turn_right",
            Command::Jump => "jump",
            Command::JumpForward => "jump_forward",
            Command::JumpBackward => "jump_backward",
            Command::JumpLeft => "jump_left",
            Command::JumpRight => "jump_right",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_and_keys() {
        assert_eq!(Gesture::parse("forward"), Gesture::Forward);
        assert_eq!(Gesture::parse("  TURN_LEFT\n"), Gesture::TurnLeft);
        assert_eq!(Gesture::parse("jd"), Gesture::JumpRight);
        assert_eq!(Gesture::parse("S"), Gesture::Stop);
        assert_eq!(Gesture::parse("none"), Gesture::Rest);
        assert_eq!(Gesture::parse(""), Gesture::Rest);
    }

    #[test]
    fn unknown_tokens_are_idle() {
        assert_eq!(Gesture::parse("moonwalk"), Gesture::Idle);
        assert_eq!(Gesture::parse("forward!"), Gesture::Idle);
        assert_eq!(Command::parse("fist_clench"), Command::Idle);
    }

    #[test]
    fn every_word_round_trips_through_display() {
        for command in [
            Command::Idle,
            Command::Forward,
            Command::Backward,
            Command::TurnLeft,
            Command::TurnRight,
            Command::Jump,
            Command::JumpForward,
            Command::JumpBackward,
            Command::JumpLeft,
            Command::JumpRight,
        ] {
            let mut buf = GestureToken::new();
            core::fmt::write(&mut buf, format_args!("{command}")).unwrap();
            assert_eq!(Command::parse(&buf), command);
        }
    }

    #[test]
    fn jump_commands_pick_their_gait() {
        assert_eq!(Command::Jump.jump(), Some(("JUMP", Direction::InPlace)));
        assert_eq!(
            Command::JumpBackward.jump(),
            Some(("JUMP_BACKWARD", Direction::Backward))
        );
        assert_eq!(Command::Forward.jump(), None);
        assert_eq!(Command::JumpLeft.direction(), None);
        assert_eq!(Command::TurnRight.direction(), Some(Direction::Right));
    }
}
