use crate::Type;
use std::fmt::Display;
use strum::{EnumIter, IntoStaticStr};

/// Functions exported by the turtle runtime that generated code links against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Primitive {
    RtInit,
    RtShutdown,
    MoveForward,
    MoveBackward,
    TurnRight,
    TurnLeft,
    SetPosition,
    SetX,
    SetY,
    SetHeading,
    GetHeading,
    PenUp,
    PenDown,
    HideTurtle,
    CenterTurtle,
    SetColor,
    SleepMs,
    RandInt,
    PowInt,
}

impl Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Primitive {
    pub fn symbol(self) -> &'static str {
        self.into()
    }

    pub fn params(self) -> &'static [Type] {
        use Primitive::*;
        match self {
            RtInit | RtShutdown | GetHeading | PenUp | PenDown | HideTurtle | CenterTurtle => &[],
            MoveForward | MoveBackward | TurnRight | TurnLeft | SetX | SetY | SetHeading
            | SetColor | SleepMs | RandInt => &[Type::I32],
            SetPosition | PowInt => &[Type::I32, Type::I32],
        }
    }

    pub fn ret(self) -> Type {
        use Primitive::*;
        match self {
            GetHeading | RandInt | PowInt => Type::I32,
            _ => Type::Void,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Primitive;
    use crate::Type;
    use strum::IntoEnumIterator;

    #[test]
    fn symbols_match_runtime_names() {
        let names: Vec<_> = Primitive::iter().map(Primitive::symbol).collect();
        assert!(names.contains(&"move_forward"));
        assert!(names.contains(&"center_turtle"));
        assert!(names.contains(&"sleep_ms"));
        assert!(names.contains(&"rand_int"));
        assert!(names.contains(&"pow_int"));
        assert!(names.contains(&"set_x"));
        assert_eq!(Primitive::RtShutdown.to_string(), "rt_shutdown");
    }

    #[test]
    fn every_primitive_is_exported_by_the_c_runtime() {
        const EXPORTS: &[&str] = &[
            "rt_init", "rt_shutdown", "move_forward", "move_backward", "turn_right", "turn_left",
            "set_position", "set_xy", "set_x", "set_y", "set_heading", "get_heading", "pen_up",
            "pen_down", "hide_turtle", "set_color", "sleep_ms", "delay_ms", "rand_int",
            "center_turtle", "pow_int",
        ];
        for p in Primitive::iter() {
            assert!(EXPORTS.contains(&p.symbol()), "{p}");
        }
    }

    #[test]
    fn signatures() {
        assert_eq!(Primitive::SetPosition.params(), &[Type::I32, Type::I32]);
        assert_eq!(Primitive::RandInt.ret(), Type::I32);
        assert_eq!(Primitive::PenUp.ret(), Type::Void);
        assert!(Primitive::GetHeading.params().is_empty());
    }
}
