use nom::{
    character::complete::{char, digit1, one_of, space0},
    combinator::{all_consuming, map_res, opt, recognize},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use tracing::trace;

fn unpack_ires<T>((_, param): (&str, T)) -> T {
    param
}

pub(super) fn handle_opt_ires<'a, NomFunc, T>(f: NomFunc, input: &'a str) -> Option<T>
where
    NomFunc: FnOnce(&'a str) -> IResult<&'a str, T>,
    T: 'a,
{
    f(input).map_or_else(
        |e| {
            trace!("Received Nom error for field {input:?}:\n{:?}", e);
            None
        },
        |r| Some(unpack_ires(r)),
    )
}

/// A decimal number surrounded by optional spaces, and nothing else
pub fn parse_number(input: &str) -> IResult<&str, f64> {
    all_consuming(delimited(space0, double, space0))(input)
}

/// A signed integer surrounded by optional spaces, and nothing else
pub fn parse_integer(input: &str) -> IResult<&str, i32> {
    all_consuming(delimited(
        space0,
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i32>()
        }),
        space0,
    ))(input)
}

pub fn parse_dimension(input: &str) -> IResult<&str, u32> {
    all_consuming(delimited(
        space0,
        map_res(digit1, |s: &str| s.parse::<u32>()),
        space0,
    ))(input)
}

/// A UTM zone number, optionally followed by its latitude band letter (e.g. `33` or `33T`)
pub fn parse_zone(input: &str) -> IResult<&str, u8> {
    preceded(space0, map_res(digit1, |s: &str| s.parse::<u8>()))(input)
}

/// One of `N`, `S`, `E`, `W`
pub fn parse_hemisphere(input: &str) -> IResult<&str, char> {
    all_consuming(terminated(
        preceded(space0, one_of("NSEWnsew")),
        space0,
    ))(input)
}

/// Combines a degree field, a decimal minute field and a hemisphere field into signed degrees.
///
/// A missing hemisphere counts as north/east.
pub fn parse_degrees_minutes(degrees: &str, minutes: &str, hemisphere: &str) -> Option<f64> {
    let degrees = handle_opt_ires(parse_number, degrees)?;
    let minutes = handle_opt_ires(parse_number, minutes)?;
    let value = degrees.abs() + minutes / 60.0;
    match handle_opt_ires(parse_hemisphere, hemisphere) {
        Some('S' | 's' | 'W' | 'w') => Some(-value),
        _ => Some(value),
    }
}
