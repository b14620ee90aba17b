//! Wire commands from the consuming application.
//!
//! A command is one text line of comma separated fields; the first field names the
//! command. Lines are decoded once into [`Command`] and everything past this module
//! works with the typed value.

use crate::foundation::core::{ColorCode, Delta, MapSize};
use crate::foundation::error::{PixelwallError, PixelwallResult};
use crate::pixels::palette::Palette;
use crate::transform::viewport::TransUpdate;

/// Arguments of `initMapSnapshot`.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotInit {
    /// Initial translation, zoom and window size.
    pub view: TransUpdate,
    /// Map dimensions in pixels.
    pub size: MapSize,
    /// Colour palette, code `i` at position `i`.
    pub palette: Palette,
    /// Snapshot image URL.
    pub url: String,
}

/// One decoded wire command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `initMapSnapshot,dx,dy,zoom,winW,winH,mapW,mapH,<palette hex>...,imageUrl`
    InitMapSnapshot(SnapshotInit),
    /// `initLatestColors,(index,code)*`
    InitLatestColors(Vec<Delta>),
    /// `trans,dx,dy[,zoom[,winW,winH]]`; a lone `winW` is ignored.
    Trans(TransUpdate),
    /// `update,(index,code)*`
    Update(Vec<Delta>),
    /// `redrawmm`
    RedrawMinimap,
    /// `pbInit,imageUrl`; an empty URL means a blank origin.
    PbInit {
        /// Origin image URL.
        url: String,
    },
    /// `pbStart`
    PbStart,
    /// `pbPlayAgain`
    PbPlayAgain,
    /// `pbForward,(index,code)*`
    PbForward(Vec<Delta>),
    /// `pbRewind,(index,code)*`, the same pairs that were sent forward. They are undone
    /// last-first.
    PbRewind(Vec<Delta>),
    /// `pbSpeed,code`; codes other than 1, 2 and 4 are ignored by the engine.
    PbSpeed(u32),
    /// `pbEnd`
    PbEnd,
    /// `reverse,(index,code)*`
    Reverse(Vec<Delta>),
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitMapSnapshot(_) => "initMapSnapshot",
            Self::InitLatestColors(_) => "initLatestColors",
            Self::Trans(_) => "trans",
            Self::Update(_) => "update",
            Self::RedrawMinimap => "redrawmm",
            Self::PbInit { .. } => "pbInit",
            Self::PbStart => "pbStart",
            Self::PbPlayAgain => "pbPlayAgain",
            Self::PbForward(_) => "pbForward",
            Self::PbRewind(_) => "pbRewind",
            Self::PbSpeed(_) => "pbSpeed",
            Self::PbEnd => "pbEnd",
            Self::Reverse(_) => "reverse",
        }
    }

    /// Decode one wire line. Unknown command names decode to `Ok(None)`.
    pub fn decode(line: &str) -> PixelwallResult<Option<Self>> {
        let line = line.trim();
        let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
        let Some((&name, args)) = fields.split_first() else {
            return Ok(None);
        };

        let cmd = match name {
            "initMapSnapshot" => Self::InitMapSnapshot(decode_snapshot_init(args)?),
            "initLatestColors" => Self::InitLatestColors(decode_deltas(args)?),
            "trans" => Self::Trans(decode_trans(args)?),
            "update" => Self::Update(decode_deltas(args)?),
            "redrawmm" => Self::RedrawMinimap,
            "pbInit" => Self::PbInit {
                url: args.first().map(|s| s.to_string()).unwrap_or_default(),
            },
            "pbStart" => Self::PbStart,
            "pbPlayAgain" => Self::PbPlayAgain,
            "pbForward" => Self::PbForward(decode_deltas(args)?),
            "pbRewind" => Self::PbRewind(decode_deltas(args)?),
            "pbSpeed" => {
                let code = args
                    .first()
                    .ok_or_else(|| PixelwallError::validation("pbSpeed needs a speed code"))?;
                Self::PbSpeed(parse_int(code, "speed code")?)
            }
            "pbEnd" => Self::PbEnd,
            "reverse" => Self::Reverse(decode_deltas(args)?),
            other => {
                tracing::debug!(command = other, "ignoring unknown command");
                return Ok(None);
            }
        };
        Ok(Some(cmd))
    }
}

/// Flat `index,code,index,code,...` list.
pub fn decode_deltas(args: &[&str]) -> PixelwallResult<Vec<Delta>> {
    // `update,` carries one empty trailing field when the list is empty
    let args = match args.split_last() {
        Some((last, rest)) if last.is_empty() => rest,
        _ => args,
    };
    if !args.len().is_multiple_of(2) {
        return Err(PixelwallError::protocol(format!(
            "delta list has odd length {}",
            args.len()
        )));
    }
    args.chunks_exact(2)
        .map(|pair| {
            Ok(Delta {
                index: parse_int(pair[0], "pixel index")?,
                code: ColorCode::parse(pair[1])?,
            })
        })
        .collect()
}

fn decode_trans(args: &[&str]) -> PixelwallResult<TransUpdate> {
    let ints = args
        .iter()
        .map(|s| parse_int::<i32>(s, "trans argument"))
        .collect::<PixelwallResult<Vec<_>>>()?;
    let mut update = match ints.as_slice() {
        [dx, dy, ..] => TransUpdate::translate(f64::from(*dx), f64::from(*dy)),
        _ => return Err(PixelwallError::validation("trans needs at least dx,dy")),
    };
    match ints.as_slice() {
        [_, _] => {}
        // a window width without a height leaves the size alone
        [_, _, zoom] | [_, _, zoom, _] => update = update.with_scale(f64::from(*zoom)),
        [_, _, zoom, w, h] => {
            update = update
                .with_scale(f64::from(*zoom))
                .with_resize(non_negative(*w, "winW")?, non_negative(*h, "winH")?);
        }
        other => {
            return Err(PixelwallError::validation(format!(
                "trans takes 2 to 5 arguments, got {}",
                other.len()
            )));
        }
    }
    Ok(update)
}

fn decode_snapshot_init(args: &[&str]) -> PixelwallResult<SnapshotInit> {
    // 7 integers, at least one palette colour, then the url
    if args.len() < 9 {
        return Err(PixelwallError::validation(format!(
            "initMapSnapshot needs at least 9 arguments, got {}",
            args.len()
        )));
    }
    let (ints, rest) = args.split_at(7);
    let ints = ints
        .iter()
        .map(|s| parse_int::<i32>(s, "initMapSnapshot argument"))
        .collect::<PixelwallResult<Vec<_>>>()?;
    let (url, palette) = rest
        .split_last()
        .ok_or_else(|| PixelwallError::validation("initMapSnapshot needs an image url"))?;

    let view = TransUpdate::translate(f64::from(ints[0]), f64::from(ints[1]))
        .with_scale(f64::from(ints[2]))
        .with_resize(non_negative(ints[3], "winW")?, non_negative(ints[4], "winH")?);
    let size = MapSize::new(non_negative(ints[5], "mapW")?, non_negative(ints[6], "mapH")?)?;

    Ok(SnapshotInit {
        view,
        size,
        palette: Palette::from_hex_codes(palette.iter().copied())?,
        url: url.to_string(),
    })
}

fn parse_int<T: std::str::FromStr>(s: &str, what: &str) -> PixelwallResult<T>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| PixelwallError::validation(format!("bad {what} '{s}': {e}")))
}

fn non_negative(v: i32, what: &str) -> PixelwallResult<u32> {
    u32::try_from(v).map_err(|_| PixelwallError::validation(format!("{what} must be >= 0, got {v}")))
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/command.rs"]
mod tests;
