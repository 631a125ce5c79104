use nom::bytes::complete::tag;
use nom::character::complete::{digit1, space0, space1};
use nom::combinator::{map_res, rest};
use nom::sequence::{preceded, separated_pair, terminated};
use nom::IResult;

use super::types::Seq;

fn number<T: std::str::FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, |s: &str| s.parse::<T>())(input)
}

/// `+OK nn mm` → `nn`.
fn stat(input: &str) -> IResult<&str, Seq> {
    preceded(terminated(tag("+OK"), space1), number)(input)
}

/// `msg uid` → `(msg, uid)`; the uid is whatever follows, trimmed.
fn uidl_line(input: &str) -> IResult<&str, (Seq, &str)> {
    separated_pair(preceded(space0, number), space1, rest)(input)
}

/// `msg octets` → `(msg, octets)`.
fn list_line(input: &str) -> IResult<&str, (Seq, u64)> {
    separated_pair(preceded(space0, number), space1, number)(input)
}

/// The message count from a positive `STAT` status line.
///
/// A malformed status line yields 0 rather than an error.
pub fn parse_stat(status: &str) -> Seq {
    match stat(status.trim()) {
        Ok((_, count)) => count,
        Err(_) => {
            log::debug!("unparseable STAT response {:?}", status);
            0
        }
    }
}

/// One line of a `UIDL` listing.
pub fn parse_uidl_line(line: &str) -> Option<(Seq, String)> {
    match uidl_line(line.trim_end()) {
        Ok((_, (seq, uidl))) if !uidl.trim().is_empty() => Some((seq, uidl.trim().to_string())),
        _ => {
            log::debug!("UIDL error: {:?}", line);
            None
        }
    }
}

/// One line of a `LIST` listing.
pub fn parse_list_line(line: &str) -> Option<(Seq, u64)> {
    match list_line(line.trim_end()) {
        Ok((_, entry)) => Some(entry),
        Err(_) => {
            log::debug!("LIST error: {:?}", line);
            None
        }
    }
}
