use easy_ext::ext;
use logo_ir::Primitive;
use syntax::Command;

#[ext(CommandExt)]
impl Command {
    pub fn primitive(self) -> Primitive {
        match self {
            Command::Forward => Primitive::MoveForward,
            Command::Back => Primitive::MoveBackward,
            Command::Right => Primitive::TurnRight,
            Command::Left => Primitive::TurnLeft,
            Command::SetPos => Primitive::SetPosition,
            Command::SetX => Primitive::SetX,
            Command::SetY => Primitive::SetY,
            Command::SetHeading => Primitive::SetHeading,
            Command::Heading => Primitive::GetHeading,
            Command::PenDown => Primitive::PenDown,
            Command::PenUp => Primitive::PenUp,
            Command::HideTurtle => Primitive::HideTurtle,
            Command::Center => Primitive::CenterTurtle,
            Command::SetColor => Primitive::SetColor,
            Command::Wait => Primitive::SleepMs,
        }
    }
}

/// Index of a named pen colour in the runtime palette.
pub fn palette_index(name: &str) -> Option<i32> {
    Some(match name.to_lowercase().as_str() {
        "negro" | "black" => 0,
        "rojo" | "red" => 1,
        "azul" | "blue" => 2,
        "verde" | "green" => 3,
        "naranja" | "orange" => 4,
        "morado" | "purple" => 5,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_arity_matches_its_primitive() {
        use Command::*;
        for c in [
            Forward, Back, Right, Left, SetPos, SetX, SetY, SetHeading, Heading, PenDown, PenUp,
            HideTurtle, Center, SetColor, Wait,
        ] {
            assert_eq!(c.arity(), c.primitive().params().len(), "{}", c.keyword());
        }
    }

    #[test]
    fn palette_accepts_both_languages() {
        assert_eq!(palette_index("Rojo"), Some(1));
        assert_eq!(palette_index("purple"), Some(5));
        assert_eq!(palette_index("magenta"), None);
    }
}
