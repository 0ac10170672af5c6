use core::fmt::Display;
use core::ops::{Index, IndexMut};

use crate::LEG_COUNT;

/// Legs in physical joint order. The discriminant is the leg's slot in every per-leg array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    FrontLeft = 0,
    FrontRight = 1,
    RearLeft = 2,
    RearRight = 3,
}

/// The two diagonal pairs of a trot. Legs of the same pair move in phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagonal {
    /// front left + rear right
    A,
    /// front right + rear left
    B,
}

impl Leg {
    pub const ALL: [Leg; LEG_COUNT] = [
        Leg::FrontLeft,
        Leg::FrontRight,
        Leg::RearLeft,
        Leg::RearRight,
    ];

    pub fn is_left(self) -> bool {
        matches!(self, Leg::FrontLeft | Leg::RearLeft)
    }

    pub fn diagonal(self) -> Diagonal {
        match self {
            Leg::FrontLeft | Leg::RearRight => Diagonal::A,
            Leg::FrontRight | Leg::RearLeft => Diagonal::B,
        }
    }
}

impl Display for Leg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Leg::FrontLeft => f.write_str("front left"),
            Leg::FrontRight => f.write_str("front right"),
            Leg::RearLeft => f.write_str("rear left"),
            Leg::RearRight => f.write_str("rear right"),
        }
    }
}

impl TryFrom<usize> for Leg {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Leg::ALL.get(value).copied().ok_or(value)
    }
}

impl<T> Index<Leg> for [T; LEG_COUNT] {
    type Output = T;

    fn index(&self, leg: Leg) -> &Self::Output {
        &self[leg as usize]
    }
}

impl<T> IndexMut<Leg> for [T; LEG_COUNT] {
    fn index_mut(&mut self, leg: Leg) -> &mut Self::Output {
        &mut self[leg as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_pairs() {
        assert_eq!(Leg::FrontLeft.diagonal(), Leg::RearRight.diagonal());
        assert_eq!(Leg::FrontRight.diagonal(), Leg::RearLeft.diagonal());
        assert_ne!(Leg::FrontLeft.diagonal(), Leg::FrontRight.diagonal());
    }

    #[test]
    fn index_by_leg() {
        let mut heights = [0.0; LEG_COUNT];
        heights[Leg::RearLeft] = 4.0;
        assert_eq!(heights[2], 4.0);
        assert_eq!(Leg::try_from(3), Ok(Leg::RearRight));
        assert_eq!(Leg::try_from(4), Err(4));
    }
}
