use crate::foundation::core::ColorCode;

/// Acknowledgement sent back to the consuming application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    /// Snapshot decoded into the live buffer.
    InitedMapSnapshot,
    /// First bitmap drawn; the frame loop is running.
    Inited,
    /// Playback origin loaded.
    PbInited,
    /// Playback buffer displayed at its origin.
    PbStarted,
    /// A playback bitmap was drawn; the consumer may send the next step.
    Tick,
    /// Per delta, the colour code it replaced.
    Reverse(Vec<ColorCode>),
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitedMapSnapshot => f.write_str("initedMapSnapshot"),
            Self::Inited => f.write_str("inited"),
            Self::PbInited => f.write_str("pbInited"),
            Self::PbStarted => f.write_str("pbStarted"),
            Self::Tick => f.write_str("tick"),
            Self::Reverse(codes) => {
                for (i, c) in codes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/ack.rs"]
mod tests;
